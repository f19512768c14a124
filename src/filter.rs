//! Row filtering over a loaded [`Dataset`].
//!
//! Each searchable field takes an optional fragment. Active fragments are
//! combined with AND, matched case-insensitively as plain substrings.

use crate::dataset::{normalize_column, Dataset, EmailRow, Field};

/// Fields the user can search on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchField {
    Username,
    Email,
    Department,
    Body,
}

impl SearchField {
    pub const ALL: [SearchField; 4] = [
        SearchField::Username,
        SearchField::Email,
        SearchField::Department,
        SearchField::Body,
    ];

    pub fn field(self) -> Field {
        match self {
            SearchField::Username => Field::Username,
            SearchField::Email => Field::Email,
            SearchField::Department => Field::Department,
            SearchField::Body => Field::Body,
        }
    }

    /// Resolve a field name, normalized the same way CSV headers are
    pub fn from_name(name: &str) -> Option<Self> {
        let name = normalize_column(name);
        Self::ALL
            .into_iter()
            .find(|field| field.field().name() == name)
    }
}

impl std::fmt::Display for SearchField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field().name())
    }
}

/// Per-field search fragments. Empty fragments are treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySet {
    pub username: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub body: Option<String>,
}

impl QuerySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fragment for one field
    pub fn with(mut self, field: SearchField, fragment: impl Into<String>) -> Self {
        let fragment = Some(fragment.into());
        match field {
            SearchField::Username => self.username = fragment,
            SearchField::Email => self.email = fragment,
            SearchField::Department => self.department = fragment,
            SearchField::Body => self.body = fragment,
        }
        self
    }

    /// Build from `(field name, fragment)` pairs; unknown names are skipped
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        pairs
            .into_iter()
            .fold(Self::new(), |queries, (name, fragment)| {
                match SearchField::from_name(name.as_ref()) {
                    Some(field) => queries.with(field, fragment),
                    None => {
                        tracing::debug!(field = name.as_ref(), "ignoring query on unsearchable field");
                        queries
                    }
                }
            })
    }

    /// The fragment for a field, if it is non-empty
    pub fn get(&self, field: SearchField) -> Option<&str> {
        let fragment = match field {
            SearchField::Username => &self.username,
            SearchField::Email => &self.email,
            SearchField::Department => &self.department,
            SearchField::Body => &self.body,
        };
        fragment.as_deref().filter(|f| !f.is_empty())
    }

    /// Active `(field, fragment)` pairs in a fixed field order
    pub fn active(&self) -> impl Iterator<Item = (SearchField, &str)> + '_ {
        SearchField::ALL
            .into_iter()
            .filter_map(|field| self.get(field).map(|fragment| (field, fragment)))
    }

    pub fn is_empty(&self) -> bool {
        self.active().next().is_none()
    }
}

/// Non-fatal problems found while filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterWarning {
    /// A fragment was given for a column the dataset does not have
    MissingColumn(SearchField),
}

impl std::fmt::Display for FilterWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterWarning::MissingColumn(field) => {
                write!(f, "Column '{}' not found in CSV.", field)
            }
        }
    }
}

/// Matching rows, in dataset order, plus any warnings raised on the way
#[derive(Debug, Clone)]
pub struct FilterResult<'a> {
    pub rows: Vec<&'a EmailRow>,
    pub warnings: Vec<FilterWarning>,
}

impl FilterResult<'_> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A lower-cased fragment bound to the field it applies to
struct Predicate {
    field: Field,
    needle: String,
}

impl Predicate {
    fn matches(&self, row: &EmailRow) -> bool {
        row.get(self.field)
            .is_some_and(|value| value.to_lowercase().contains(&self.needle))
    }
}

/// Select the rows that satisfy every active fragment.
///
/// A fragment on a column the dataset lacks is reported as a warning and
/// otherwise ignored, so it never excludes rows.
pub fn filter<'a>(dataset: &'a Dataset, queries: &QuerySet) -> FilterResult<'a> {
    let mut warnings = Vec::new();
    let mut predicates = Vec::new();

    for (field, fragment) in queries.active() {
        if !dataset.has_field(field.field()) {
            tracing::warn!(column = %field, "search column not found in dataset");
            warnings.push(FilterWarning::MissingColumn(field));
            continue;
        }
        predicates.push(Predicate {
            field: field.field(),
            needle: fragment.to_lowercase(),
        });
    }

    let rows: Vec<&EmailRow> = dataset
        .rows()
        .iter()
        .filter(|row| predicates.iter().all(|p| p.matches(row)))
        .collect();

    tracing::debug!(
        matched = rows.len(),
        total = dataset.len(),
        predicates = predicates.len(),
        "filtered dataset"
    );

    FilterResult { rows, warnings }
}

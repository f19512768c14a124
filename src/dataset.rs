//! Email dataset loading.
//!
//! Reads a CSV export into schema-aware [`EmailRow`] records. Column names are
//! normalized once here (trimmed, lower-cased); everything downstream looks up
//! fields through [`Field`].

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Upload ceiling in megabytes
pub const MAX_FILE_SIZE_MB: u64 = 500;

/// Upload ceiling in bytes
pub const MAX_FILE_SIZE_BYTES: u64 = MAX_FILE_SIZE_MB * 1024 * 1024;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error(
        "File is too large! Maximum size is {limit_mb}MB. Your file is {:.2}MB.",
        megabytes(.actual_bytes)
    )]
    TooLarge { limit_mb: u64, actual_bytes: u64 },
    #[error("CSV must have a 'body' column.")]
    MissingBody,
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
}

fn megabytes(bytes: &u64) -> f64 {
    *bytes as f64 / (1024.0 * 1024.0)
}

/// Columns the application understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Username,
    Email,
    Department,
    Subject,
    Date,
    Body,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Username,
        Field::Email,
        Field::Department,
        Field::Subject,
        Field::Date,
        Field::Body,
    ];

    /// Normalized column name
    pub fn name(self) -> &'static str {
        match self {
            Field::Username => "username",
            Field::Email => "email",
            Field::Department => "department",
            Field::Subject => "subject",
            Field::Date => "date",
            Field::Body => "body",
        }
    }

    /// Match an already-normalized column name
    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Trim and lower-case a header
pub fn normalize_column(name: &str) -> String {
    name.trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// Reject files over [`MAX_FILE_SIZE_BYTES`] before any parsing happens
pub fn check_size(actual_bytes: u64) -> Result<(), LoadError> {
    if actual_bytes > MAX_FILE_SIZE_BYTES {
        return Err(LoadError::TooLarge {
            limit_mb: MAX_FILE_SIZE_MB,
            actual_bytes,
        });
    }
    Ok(())
}

/// One email from the dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmailRow {
    /// Position in the source file, unaffected by filtering
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub body: String,
    /// Unrecognized columns, passed through untouched
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl EmailRow {
    /// Value of a recognized field; `None` when the cell is empty or absent
    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Username => self.username.as_deref(),
            Field::Email => self.email.as_deref(),
            Field::Department => self.department.as_deref(),
            Field::Subject => self.subject.as_deref(),
            Field::Date => self.date.as_deref(),
            Field::Body => Some(self.body.as_str()),
        }
    }

    pub fn subject_label(&self) -> &str {
        self.subject.as_deref().unwrap_or("No Subject")
    }

    pub fn sender_label(&self) -> &str {
        self.username
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("Unknown Sender")
    }

    pub fn date_label(&self) -> &str {
        self.date.as_deref().unwrap_or("")
    }

    fn set(&mut self, field: Field, value: &str) {
        let slot = match field {
            Field::Body => {
                self.body = value.to_string();
                return;
            }
            Field::Username => &mut self.username,
            Field::Email => &mut self.email,
            Field::Department => &mut self.department,
            Field::Subject => &mut self.subject,
            Field::Date => &mut self.date,
        };
        *slot = (!value.is_empty()).then(|| value.to_string());
    }
}

/// Where a CSV column ends up in an [`EmailRow`]
#[derive(Debug, Clone)]
enum Slot {
    Known(Field),
    Extra(String),
    Ignored,
}

/// A loaded email export
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<EmailRow>,
}

impl Dataset {
    /// Load a CSV file, enforcing the size ceiling first
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let size = std::fs::metadata(path)?.len();
        check_size(size)?;

        tracing::info!(path = %path.display(), bytes = size, "loading dataset");
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse CSV from any reader. No size check is applied.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = reader.headers()?.iter().map(normalize_column).collect();
        let slots = Self::assign_slots(&columns);

        if !slots
            .iter()
            .any(|slot| matches!(slot, Slot::Known(Field::Body)))
        {
            return Err(LoadError::MissingBody);
        }

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            let mut row = EmailRow {
                index,
                ..EmailRow::default()
            };
            for (slot, value) in slots.iter().zip(record.iter()) {
                match slot {
                    Slot::Known(field) => row.set(*field, value),
                    Slot::Extra(name) if !value.is_empty() => {
                        row.extra.insert(name.clone(), value.to_string());
                    }
                    _ => {}
                }
            }
            rows.push(row);
        }

        tracing::info!(rows = rows.len(), columns = columns.len(), "dataset loaded");
        Ok(Self { columns, rows })
    }

    /// Build a dataset from records already in memory
    pub fn from_rows<I, S>(columns: I, rows: Vec<EmailRow>) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let columns: Vec<String> = columns
            .into_iter()
            .map(|c| normalize_column(c.as_ref()))
            .collect();
        if !columns.iter().any(|c| c == Field::Body.name()) {
            return Err(LoadError::MissingBody);
        }
        Ok(Self { columns, rows })
    }

    fn assign_slots(columns: &[String]) -> Vec<Slot> {
        let mut seen = std::collections::HashSet::new();
        columns
            .iter()
            .map(|name| {
                if !seen.insert(name.as_str()) {
                    tracing::warn!(column = %name, "duplicate column ignored");
                    return Slot::Ignored;
                }
                match Field::from_column(name) {
                    Some(field) => Slot::Known(field),
                    None => Slot::Extra(name.clone()),
                }
            })
            .collect()
    }

    /// Normalized column names in file order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_field(&self, field: Field) -> bool {
        self.columns.iter().any(|c| c == field.name())
    }

    pub fn rows(&self) -> &[EmailRow] {
        &self.rows
    }

    /// Row by its position in the source file
    pub fn get(&self, index: usize) -> Option<&EmailRow> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_headers() {
        assert_eq!(normalize_column("  Body "), "body");
        assert_eq!(normalize_column("\u{feff}UserName"), "username");
        assert_eq!(normalize_column("DEPARTMENT"), "department");
    }

    #[test]
    fn size_check_allows_exact_limit() {
        assert!(check_size(MAX_FILE_SIZE_BYTES).is_ok());
        assert!(check_size(0).is_ok());
    }

    #[test]
    fn size_check_names_limit_and_actual_size() {
        let err = check_size(600 * 1024 * 1024).unwrap_err();
        assert_eq!(
            err.to_string(),
            "File is too large! Maximum size is 500MB. Your file is 600.00MB."
        );
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let dataset = Dataset::from_reader("body,subject\n".as_bytes()).unwrap();
        assert!(dataset.is_empty());
        assert!(dataset.has_field(Field::Subject));
    }

    #[test]
    fn empty_input_is_missing_body() {
        let result = Dataset::from_reader("".as_bytes());
        assert!(matches!(result, Err(LoadError::MissingBody)));
    }

    #[test]
    fn empty_cells_are_none_and_unknown_columns_pass_through() {
        let csv = "Subject,Body,Priority\n,hello there,high\n";
        let dataset = Dataset::from_reader(csv.as_bytes()).unwrap();
        let row = &dataset.rows()[0];

        assert_eq!(row.subject, None);
        assert_eq!(row.subject_label(), "No Subject");
        assert_eq!(row.body, "hello there");
        assert_eq!(row.extra.get("priority").map(String::as_str), Some("high"));
    }

    #[test]
    fn duplicate_headers_keep_first() {
        let csv = "body,Body\nfirst,second\n";
        let dataset = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(dataset.rows()[0].body, "first");
    }

    #[test]
    fn ragged_rows_are_padded() {
        let csv = "body,username\nonly body\n";
        let dataset = Dataset::from_reader(csv.as_bytes()).unwrap();
        let row = &dataset.rows()[0];
        assert_eq!(row.body, "only body");
        assert_eq!(row.username, None);
    }

    #[test]
    fn sender_label_falls_back() {
        let mut row = EmailRow {
            email: Some("jane@corp.com".into()),
            ..EmailRow::default()
        };
        assert_eq!(row.sender_label(), "jane@corp.com");

        row.username = Some("jane".into());
        assert_eq!(row.sender_label(), "jane");

        assert_eq!(EmailRow::default().sender_label(), "Unknown Sender");
    }

    #[test]
    fn from_rows_requires_body_column() {
        let result = Dataset::from_rows(["subject"], Vec::new());
        assert!(matches!(result, Err(LoadError::MissingBody)));
        assert!(Dataset::from_rows([" BODY "], Vec::new()).is_ok());
    }
}

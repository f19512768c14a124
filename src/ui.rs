//! Terminal presentation.
//!
//! Renders email cards and summaries, and drives the interactive browser.

use crate::agent;
use crate::dataset::EmailRow;
use crate::filter::FilterResult;
use crate::model::ModelHandle;
use crate::summary::Outcome;
use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use serde::Serialize;

/// Characters of body shown on a search card
const PREVIEW_CHARS: usize = 160;

pub fn print_header(count: usize) {
    println!(
        "Found {} emails matching your criteria.\n",
        count.to_string().bold()
    );
}

pub fn print_no_results() {
    println!(
        "{}",
        "No emails found matching those specific criteria. Try clearing some filters.".cyan()
    );
}

pub fn print_warnings(result: &FilterResult<'_>) {
    for warning in &result.warnings {
        eprintln!("{} {}", "⚠".yellow(), warning.to_string().yellow());
    }
}

/// Subject, sender and date for one email, plus a short body preview
pub fn print_card(row: &EmailRow) {
    println!("{}", row.subject_label().blue().bold());
    println!(
        "{}",
        format!("From: {}  |  {}", row.sender_label(), row.date_label()).dimmed()
    );
    println!("  {}", preview(&row.body, PREVIEW_CHARS));
}

/// Full body, as shown when an email is expanded
pub fn print_body(row: &EmailRow) {
    println!();
    for line in row.body.lines() {
        println!("  {}", line);
    }
    println!();
}

pub fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Summary(text) => println!("✨ {}", text.green()),
        Outcome::TooShort => println!("{}", outcome.message().cyan()),
        Outcome::Failure(reason) => println!("{}", reason.red()),
    }
}

/// One JSON line per row, as emitted by `search --json`
#[derive(Debug, Serialize)]
pub struct JsonRow<'a> {
    #[serde(flatten)]
    pub row: &'a EmailRow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Outcome>,
}

/// First `max` characters of `text` on a single line
fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max).collect();
    format!("{}…", cut.trim_end())
}

fn menu_label(row: &EmailRow) -> String {
    format!(
        "{}  ·  {}  {}",
        row.subject_label(),
        row.sender_label(),
        row.date_label()
    )
}

/// Pick emails from `result` one at a time and summarise them on demand.
///
/// Returns when the user dismisses the picker (Esc or q).
pub async fn browse(result: &FilterResult<'_>, handle: &ModelHandle) -> anyhow::Result<()> {
    let labels: Vec<String> = result.rows.iter().map(|row| menu_label(row)).collect();
    let theme = ColorfulTheme::default();
    let mut cursor = 0;

    loop {
        let choice = Select::with_theme(&theme)
            .with_prompt("View email & summarize (Esc to quit)")
            .items(&labels)
            .default(cursor)
            .interact_opt()?;

        let Some(index) = choice else {
            return Ok(());
        };
        cursor = index;

        let row = result.rows[index];
        print_card(row);
        print_body(row);

        println!("{}", "AI is analyzing...".dimmed());
        let outcome = agent::summarize(&row.body, handle).await;
        print_outcome(&outcome);
        println!();
    }
}

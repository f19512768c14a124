//! Mailsumma CLI - search email exports and summarise messages
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use mailsumma::{agent, filter, ui, Config, Dataset, ModelHandle, QuerySet};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mailsumma")]
#[command(author, version, about = "Search email exports and get instant AI summaries", long_about = None)]
struct Cli {
    /// Path to a mailsumma.toml config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Search by username
    #[arg(long)]
    username: Option<String>,
    /// Search by email address
    #[arg(long)]
    email: Option<String>,
    /// Search by department
    #[arg(long)]
    department: Option<String>,
    /// Keyword in body
    #[arg(long)]
    body: Option<String>,
}

impl From<FilterArgs> for QuerySet {
    fn from(args: FilterArgs) -> Self {
        QuerySet {
            username: args.username,
            email: args.email,
            department: args.department,
            body: args.body,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Filter emails in a CSV export
    Search {
        /// CSV file with at least a `body` column
        csv: PathBuf,
        #[command(flatten)]
        filters: FilterArgs,
        /// Summarise every matching email
        #[arg(long)]
        summarize: bool,
        /// Emit one JSON object per matching email
        #[arg(long)]
        json: bool,
    },
    /// Summarise a single email by its row number
    Summarize {
        /// CSV file with at least a `body` column
        csv: PathBuf,
        /// Zero-based row number in the file
        #[arg(long)]
        row: usize,
    },
    /// Pick matching emails interactively and summarise them
    Browse {
        /// CSV file with at least a `body` column
        csv: PathBuf,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Print shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    mailsumma::setup_logging(cli.verbose);

    match cli.command {
        Commands::Search {
            csv,
            filters,
            summarize,
            json,
        } => {
            let dataset = load_dataset(&csv)?;
            let result = filter(&dataset, &filters.into());
            ui::print_warnings(&result);

            let handle = if summarize {
                Some(ModelHandle::from_config(&load_config(cli.config.as_deref())?))
            } else {
                None
            };

            if json {
                for &row in &result.rows {
                    let summary = match &handle {
                        Some(handle) => Some(agent::summarize(&row.body, handle).await),
                        None => None,
                    };
                    let line = serde_json::to_string(&ui::JsonRow { row, summary })?;
                    println!("{}", line);
                }
                return Ok(());
            }

            if result.is_empty() {
                ui::print_no_results();
                return Ok(());
            }

            ui::print_header(result.len());
            for &row in &result.rows {
                ui::print_card(row);
                if let Some(handle) = &handle {
                    let outcome = agent::summarize(&row.body, handle).await;
                    ui::print_outcome(&outcome);
                }
                println!();
            }
        }
        Commands::Summarize { csv, row } => {
            let dataset = load_dataset(&csv)?;
            let email = dataset.get(row).with_context(|| {
                format!("row {} is out of range ({} emails loaded)", row, dataset.len())
            })?;

            let handle = ModelHandle::from_config(&load_config(cli.config.as_deref())?);
            ui::print_card(email);
            ui::print_body(email);
            let outcome = agent::summarize(&email.body, &handle).await;
            ui::print_outcome(&outcome);
        }
        Commands::Browse { csv, filters } => {
            let dataset = load_dataset(&csv)?;
            let result = filter(&dataset, &filters.into());
            ui::print_warnings(&result);

            if result.is_empty() {
                ui::print_no_results();
                return Ok(());
            }

            ui::print_header(result.len());
            let handle = ModelHandle::from_config(&load_config(cli.config.as_deref())?);
            ui::browse(&result, &handle).await?;
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "mailsumma", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Load the dataset; size and schema problems stop the command here
fn load_dataset(path: &Path) -> anyhow::Result<Dataset> {
    Dataset::open(path).with_context(|| format!("cannot load {}", path.display()))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    Ok(Config::load_with(path)?)
}

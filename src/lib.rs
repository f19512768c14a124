//! # Mailsumma
//!
//! Search an email export and summarise individual messages on demand.
//!
//! ## Features
//!
//! - **Row filtering**: case-insensitive substring search on username, email, department and body
//! - **On-demand summaries**: abstractive summaries from a pre-trained BART model, loaded once per process
//! - **Graceful degradation**: missing optional columns and model failures become warnings and inline messages

pub mod agent;
pub mod config;
pub mod dataset;
pub mod filter;
pub mod hosted;
#[cfg(feature = "local-model")]
pub mod local;
pub mod model;
pub mod summary;
pub mod ui;

pub use config::Config;
pub use dataset::{Dataset, EmailRow, LoadError};
pub use filter::{filter, FilterResult, QuerySet, SearchField};
pub use model::{ModelHandle, SummaryModel};
pub use summary::Outcome;

/// Install the stderr log subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `verbosity` picks warn, info or debug.
/// Calling this more than once is harmless.
pub fn setup_logging(verbosity: u8) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

//! Summariser adapter.
//!
//! Applies the length and truncation policy, runs the cached model and turns
//! every failure into an [`Outcome::Failure`]. Nothing here returns an error.

pub use crate::summary::Outcome;

use crate::model::{panic_message, ModelHandle, GENERATION};

/// Texts shorter than this (in characters) are not sent to the model
pub const MIN_INPUT_CHARS: usize = 50;

/// Only this many leading characters are passed to the model
pub const MAX_INPUT_CHARS: usize = 1024;

/// Summarise `text` with the model behind `handle`.
///
/// Short input returns [`Outcome::TooShort`] without touching the handle, so
/// the model is never loaded on its behalf.
pub async fn summarize(text: &str, handle: &ModelHandle) -> Outcome {
    if text.chars().count() < MIN_INPUT_CHARS {
        return Outcome::TooShort;
    }

    let model = match handle.get().await {
        Ok(model) => model,
        Err(e) => return Outcome::Failure(format!("Model not loaded: {}", e)),
    };

    let input = truncate_chars(text, MAX_INPUT_CHARS).to_string();
    tracing::debug!(
        model = model.name(),
        chars = input.chars().count(),
        "generating summary"
    );

    // Own task, so a panicking backend surfaces as a JoinError
    let mut task = tokio::spawn(async move { model.generate(&input, &GENERATION).await });

    let joined = match handle.timeout() {
        Some(limit) => match tokio::time::timeout(limit, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                task.abort();
                tracing::warn!(secs = limit.as_secs(), "summary generation timed out");
                return failure(format!("timed out after {}s", limit.as_secs()));
            }
        },
        None => task.await,
    };

    match joined {
        Ok(Ok(summary)) => Outcome::Summary(summary.trim().to_string()),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "summary generation failed");
            failure(e)
        }
        Err(e) if e.is_panic() => {
            let reason = panic_message(e.into_panic());
            tracing::error!(%reason, "summarisation backend panicked");
            failure(reason)
        }
        Err(e) => failure(e),
    }
}

fn failure(reason: impl std::fmt::Display) -> Outcome {
    Outcome::Failure(format!("Error during summarization: {}", reason))
}

/// Longest prefix of `text` holding at most `max` characters
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

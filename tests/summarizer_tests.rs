use async_trait::async_trait;
use mailsumma::agent::{self, MAX_INPUT_CHARS, MIN_INPUT_CHARS};
use mailsumma::model::{GenerationParams, ModelError, SharedModel};
use mailsumma::summary::TOO_SHORT_MESSAGE;
use mailsumma::{ModelHandle, Outcome, SummaryModel};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Returns a deterministic digest of whatever it is given, and records inputs
#[derive(Default)]
struct Recorder {
    inputs: Mutex<Vec<String>>,
}

#[async_trait]
impl SummaryModel for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn generate(&self, text: &str, params: &GenerationParams) -> Result<String, ModelError> {
        self.inputs.lock().unwrap().push(text.to_string());
        Ok(format!(
            "  {} chars, {}..{} tokens  ",
            text.chars().count(),
            params.min_length,
            params.max_length
        ))
    }
}

struct Failing;

#[async_trait]
impl SummaryModel for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _text: &str, _params: &GenerationParams) -> Result<String, ModelError> {
        Err(ModelError::Generation("tokenizer exploded".to_string()))
    }
}

struct Panicking;

#[async_trait]
impl SummaryModel for Panicking {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn generate(&self, _text: &str, _params: &GenerationParams) -> Result<String, ModelError> {
        panic!("index out of bounds in decoder");
    }
}

struct Slow;

#[async_trait]
impl SummaryModel for Slow {
    fn name(&self) -> &str {
        "slow"
    }

    async fn generate(&self, _text: &str, _params: &GenerationParams) -> Result<String, ModelError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok("too late".to_string())
    }
}

fn long_text(len: usize) -> String {
    "The quarterly budget review moved to Thursday. "
        .chars()
        .cycle()
        .take(len)
        .collect()
}

#[tokio::test]
async fn test_short_text_returns_sentinel_without_loading() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();
    let handle = ModelHandle::with_loader(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok(Arc::new(Recorder::default()) as SharedModel) }
    });

    let almost = "x".repeat(MIN_INPUT_CHARS - 1);
    for text in ["", "hi", almost.as_str()] {
        let outcome = agent::summarize(text, &handle).await;
        assert_eq!(outcome, Outcome::TooShort);
        assert_eq!(outcome.to_string(), "Email is too short to summarize.");
    }
    assert_eq!(loads.load(Ordering::SeqCst), 0);
    assert!(!handle.is_initialized());
}

#[tokio::test]
async fn test_length_threshold_counts_characters() {
    let handle = ModelHandle::ready(Arc::new(Recorder::default()));
    // 49 two-byte characters: 98 bytes but still too short
    let outcome = agent::summarize(&"é".repeat(MIN_INPUT_CHARS - 1), &handle).await;
    assert_eq!(outcome.message(), TOO_SHORT_MESSAGE);

    let outcome = agent::summarize(&"é".repeat(MIN_INPUT_CHARS), &handle).await;
    assert!(outcome.is_summary());
}

#[tokio::test]
async fn test_summary_is_trimmed_and_uses_fixed_parameters() {
    let handle = ModelHandle::ready(Arc::new(Recorder::default()));
    let outcome = agent::summarize(&long_text(200), &handle).await;

    assert_eq!(outcome, Outcome::Summary("200 chars, 30..130 tokens".to_string()));
}

#[tokio::test]
async fn test_only_prefix_reaches_model() {
    let recorder = Arc::new(Recorder::default());
    let handle = ModelHandle::ready(recorder.clone());

    let text = long_text(5000);
    let mut other = text.chars().take(MAX_INPUT_CHARS).collect::<String>();
    other.push_str("completely different tail content that the model never sees");

    let first = agent::summarize(&text, &handle).await;
    let second = agent::summarize(&other, &handle).await;
    assert_eq!(first, second);

    let inputs = recorder.inputs.lock().unwrap();
    assert_eq!(inputs.len(), 2);
    assert_eq!(inputs[0], inputs[1]);
    assert_eq!(inputs[0].chars().count(), MAX_INPUT_CHARS);
}

#[tokio::test]
async fn test_generation_error_becomes_failure() {
    let handle = ModelHandle::ready(Arc::new(Failing));
    let outcome = agent::summarize(&long_text(120), &handle).await;

    assert!(outcome.is_failure());
    assert!(outcome.message().starts_with("Error during summarization:"));
    assert!(outcome.message().contains("tokenizer exploded"));
}

#[tokio::test]
async fn test_backend_panic_becomes_failure() {
    let handle = ModelHandle::ready(Arc::new(Panicking));
    let outcome = agent::summarize(&long_text(120), &handle).await;

    assert!(outcome.is_failure());
    assert!(outcome.message().contains("index out of bounds in decoder"));
}

#[tokio::test]
async fn test_load_failure_is_memoized() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();
    let handle = ModelHandle::with_loader(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async {
            Err(ModelError::Load {
                name: "sshleifer/distilbart-cnn-12-6".to_string(),
                reason: "network unreachable".to_string(),
            })
        }
    });

    for _ in 0..3 {
        let outcome = agent::summarize(&long_text(300), &handle).await;
        assert!(outcome.message().starts_with("Model not loaded:"));
        assert!(outcome.message().contains("network unreachable"));
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

async fn incompatible_runtime() -> Result<SharedModel, ModelError> {
    panic!("libtorch: incompatible runtime")
}

#[tokio::test]
async fn test_panicking_load_becomes_memoized_failure() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();
    let handle = Arc::new(ModelHandle::with_loader(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        incompatible_runtime()
    }));

    for _ in 0..2 {
        let handle = handle.clone();
        let outcome = tokio::spawn(async move { agent::summarize(&long_text(200), &handle).await })
            .await
            .expect("summarize must not panic");
        assert!(outcome.message().starts_with("Model not loaded:"));
        assert!(outcome.message().contains("libtorch: incompatible runtime"));
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalidate_allows_reload() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let mut handle = ModelHandle::with_loader(move || {
        let attempt = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if attempt == 0 {
                Err(ModelError::Load {
                    name: "flaky".to_string(),
                    reason: "weights still downloading".to_string(),
                })
            } else {
                Ok(Arc::new(Recorder::default()) as SharedModel)
            }
        }
    });

    assert!(agent::summarize(&long_text(100), &handle).await.is_failure());
    handle.invalidate();
    assert!(agent::summarize(&long_text(100), &handle).await.is_summary());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_becomes_failure() {
    let handle = ModelHandle::ready(Arc::new(Slow)).with_timeout(Duration::from_secs(5));
    let outcome = agent::summarize(&long_text(100), &handle).await;

    assert_eq!(
        outcome,
        Outcome::Failure("Error during summarization: timed out after 5s".to_string())
    );
}

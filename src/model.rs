//! Summarisation model capability and its process-wide handle.
//!
//! The model is a black box behind [`SummaryModel`]. [`ModelHandle`] builds it
//! lazily on first use and remembers the outcome, including a failed load.

use crate::config::{Backend, Config};
use async_trait::async_trait;
use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to load model '{name}': {reason}")]
    Load { name: String, reason: String },
    #[error("the '{0}' backend is not available in this build")]
    BackendUnavailable(String),
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("inference API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("model returned no summary")]
    EmptyOutput,
    #[error("generation failed: {0}")]
    Generation(String),
    /// A previous load attempt failed; the message is the original error
    #[error("{0}")]
    NotLoaded(String),
}

/// Decoding parameters passed to every generation call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Upper bound on output length, in tokens
    pub max_length: usize,
    /// Lower bound on output length, in tokens
    pub min_length: usize,
    pub num_beams: usize,
    pub length_penalty: f64,
    pub early_stopping: bool,
    pub do_sample: bool,
}

/// Beam search settings used for every summary
pub const GENERATION: GenerationParams = GenerationParams {
    max_length: 130,
    min_length: 30,
    num_beams: 4,
    length_penalty: 2.0,
    early_stopping: true,
    do_sample: false,
};

/// A text-in, text-out summarisation model
#[async_trait]
pub trait SummaryModel: Send + Sync {
    /// Model identifier, for logs
    fn name(&self) -> &str;

    /// Produce a summary of `text`
    async fn generate(&self, text: &str, params: &GenerationParams) -> Result<String, ModelError>;
}

pub type SharedModel = Arc<dyn SummaryModel>;

type LoadFuture = Pin<Box<dyn Future<Output = Result<SharedModel, ModelError>> + Send>>;
type Loader = Box<dyn Fn() -> LoadFuture + Send + Sync>;

/// Lazily constructed, cached model.
///
/// The first [`get`](Self::get) runs the loader; concurrent callers wait on
/// the same attempt. Success and failure are both cached until
/// [`invalidate`](Self::invalidate).
pub struct ModelHandle {
    loader: Loader,
    cell: OnceCell<Result<SharedModel, String>>,
    timeout: Option<Duration>,
}

impl ModelHandle {
    /// Handle whose loader builds the backend selected in `config`
    pub fn from_config(config: &Config) -> Self {
        let config = config.clone();
        // zero would fail every call at once; treat it as unbounded
        let timeout = config
            .model
            .timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        let mut handle = Self::with_loader(move || load_backend(config.clone()));
        handle.timeout = timeout;
        handle
    }

    /// Handle with a custom loader
    pub fn with_loader<F, Fut>(loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<SharedModel, ModelError>> + Send + 'static,
    {
        Self {
            loader: Box::new(move || Box::pin(loader())),
            cell: OnceCell::new(),
            timeout: None,
        }
    }

    /// Handle around a model that is already constructed
    pub fn ready(model: SharedModel) -> Self {
        let fallback = model.clone();
        Self {
            loader: Box::new(move || {
                let model = fallback.clone();
                Box::pin(async move { Ok(model) })
            }),
            cell: OnceCell::new_with(Some(Ok(model))),
            timeout: None,
        }
    }

    /// Bound each generation call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The cached model, loading it on first call.
    ///
    /// The loader runs on its own task, so a panic while loading is cached as
    /// a failure like any other load error.
    pub async fn get(&self) -> Result<SharedModel, ModelError> {
        let cached = self
            .cell
            .get_or_init(|| async {
                tracing::info!("loading summarisation model");
                let loaded = match tokio::spawn((self.loader)()).await {
                    Ok(loaded) => loaded,
                    Err(e) if e.is_panic() => Err(ModelError::Load {
                        name: "summarisation model".to_string(),
                        reason: format!("loader panicked: {}", panic_message(e.into_panic())),
                    }),
                    Err(e) => Err(ModelError::Load {
                        name: "summarisation model".to_string(),
                        reason: e.to_string(),
                    }),
                };
                match loaded {
                    Ok(model) => {
                        tracing::info!(model = model.name(), "summarisation model ready");
                        Ok(model)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to load summarisation model");
                        Err(e.to_string())
                    }
                }
            })
            .await;

        match cached {
            Ok(model) => Ok(model.clone()),
            Err(message) => Err(ModelError::NotLoaded(message.clone())),
        }
    }

    /// Whether a load has been attempted since construction or invalidation
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    /// Drop the cached model or failure so the next call loads again
    pub fn invalidate(&mut self) {
        if self.cell.take().is_some() {
            tracing::info!("summarisation model cache invalidated");
        }
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("initialized", &self.is_initialized())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Readable text from a caught panic payload
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "backend panicked".to_string()
    }
}

async fn load_backend(config: Config) -> Result<SharedModel, ModelError> {
    match config.model.backend {
        Backend::Hosted => {
            let model = crate::hosted::HostedModel::new(&config)?;
            Ok(Arc::new(model))
        }
        Backend::Local => load_local(config).await,
    }
}

#[cfg(feature = "local-model")]
async fn load_local(config: Config) -> Result<SharedModel, ModelError> {
    let name = config.model.name.clone();
    // rust-bert fetches weights with blocking I/O
    let model = tokio::task::spawn_blocking(move || crate::local::LocalModel::load(&config.model))
        .await
        .map_err(|e| ModelError::Load {
            name,
            reason: e.to_string(),
        })??;
    Ok(Arc::new(model))
}

#[cfg(not(feature = "local-model"))]
async fn load_local(_config: Config) -> Result<SharedModel, ModelError> {
    Err(ModelError::BackendUnavailable(Backend::Local.to_string()))
}

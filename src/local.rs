//! In-process BART summarisation on the CPU via rust-bert.

use crate::config::ModelConfig;
use crate::model::{GenerationParams, ModelError, SummaryModel, GENERATION};
use async_trait::async_trait;
use rust_bert::pipelines::common::{ModelResource, ModelType};
use rust_bert::pipelines::summarization::{SummarizationConfig, SummarizationModel};
use rust_bert::resources::{LocalResource, RemoteResource, ResourceProvider};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tch::Device;

type Resource = Box<dyn ResourceProvider + Send>;

/// Files making up a converted BART checkpoint
struct Resources {
    model: Resource,
    config: Resource,
    vocab: Resource,
    merges: Resource,
}

impl Resources {
    fn from_dir(dir: &Path) -> Self {
        let file = |name: &str| -> Resource {
            Box::new(LocalResource {
                local_path: dir.join(name),
            })
        };
        Self {
            model: file("rust_model.ot"),
            config: file("config.json"),
            vocab: file("vocab.json"),
            merges: file("merges.txt"),
        }
    }

    fn from_hub(name: &str) -> Self {
        let file = |file_name: &str| -> Resource {
            let url = format!("https://huggingface.co/{}/resolve/main/{}", name, file_name);
            Box::new(RemoteResource::new(&url, name))
        };
        Self {
            model: file("rust_model.ot"),
            config: file("config.json"),
            vocab: file("vocab.json"),
            merges: file("merges.txt"),
        }
    }
}

/// A BART-family checkpoint loaded into memory
pub struct LocalModel {
    name: String,
    // tch tensors are Send but not Sync
    inner: Arc<Mutex<SummarizationModel>>,
}

impl LocalModel {
    /// Fetch (or read) the weights and build the model. Blocking.
    pub fn load(config: &ModelConfig) -> Result<Self, ModelError> {
        let resources = match &config.weights_dir {
            Some(dir) => Resources::from_dir(dir),
            None => Resources::from_hub(&config.name),
        };

        let summarization_config = SummarizationConfig {
            model_type: ModelType::Bart,
            model_resource: ModelResource::Torch(resources.model),
            config_resource: resources.config,
            vocab_resource: resources.vocab,
            merges_resource: Some(resources.merges),
            min_length: GENERATION.min_length as i64,
            max_length: Some(GENERATION.max_length as i64),
            num_beams: GENERATION.num_beams as i64,
            length_penalty: GENERATION.length_penalty,
            early_stopping: GENERATION.early_stopping,
            do_sample: GENERATION.do_sample,
            device: Device::Cpu,
            ..Default::default()
        };

        let model = SummarizationModel::new(summarization_config).map_err(|e| ModelError::Load {
            name: config.name.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            name: config.name.clone(),
            inner: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait]
impl SummaryModel for LocalModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, text: &str, params: &GenerationParams) -> Result<String, ModelError> {
        if *params != GENERATION {
            tracing::warn!("local model uses the parameters it was built with");
        }

        let inner = self.inner.clone();
        let input = text.to_string();
        let mut output = tokio::task::spawn_blocking(move || {
            let model = inner
                .lock()
                .map_err(|_| ModelError::Generation("model lock poisoned".to_string()))?;
            model
                .summarize(&[input])
                .map_err(|e| ModelError::Generation(e.to_string()))
        })
        .await
        .map_err(|e| ModelError::Generation(e.to_string()))??;

        output.pop().ok_or(ModelError::EmptyOutput)
    }
}

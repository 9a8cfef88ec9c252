use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::config::Config;
use crate::features::TextFeatureExtractor;
use crate::models::{ModelRegistry, TrainingParams};
use crate::store::AnswerStore;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    config: Arc<Config>,
    extractor: Arc<TextFeatureExtractor>,
    registry: Arc<ModelRegistry>,
    store: AnswerStore,
}

impl AppState {
    pub fn new(config: Config, store: AnswerStore) -> Self {
        let extractor = TextFeatureExtractor::from_flag(config.syntax_analysis_enabled);
        let params = TrainingParams {
            n_clusters: config.comprehension_clusters,
            ..Default::default()
        };
        let registry = ModelRegistry::new(config.model_dir.clone(), params);
        Self::with_parts(config, store, extractor, registry)
    }

    pub fn with_parts(
        config: Config,
        store: AnswerStore,
        extractor: TextFeatureExtractor,
        registry: ModelRegistry,
    ) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            config: Arc::new(config),
            extractor: Arc::new(extractor),
            registry: Arc::new(registry),
            store,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn extractor(&self) -> Arc<TextFeatureExtractor> {
        Arc::clone(&self.extractor)
    }

    pub fn registry(&self) -> Arc<ModelRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn store(&self) -> &AnswerStore {
        &self.store
    }
}

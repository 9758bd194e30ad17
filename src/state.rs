use std::collections::HashMap;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::data::loader::{self, LoadedDataset, Source};
use crate::error::{LoadError, PipelineError};
use crate::pipeline::{Pipeline, PipelineOutput, PipelineRequest};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// What one interaction produced: the load failure (if the source could not
/// be loaded) and the pipeline output over whatever dataset is available.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub load_error: Option<LoadError>,
    pub output: PipelineOutput,
}

/// Per-session context: configuration plus the cache of loaded datasets.
///
/// Datasets are loaded on first use and shared read-only afterwards, so
/// repeated interactions never regenerate or re-fetch.
pub struct Session {
    config: PipelineConfig,
    pipeline: Pipeline,
    cache: HashMap<Source, Arc<LoadedDataset>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl Session {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            pipeline: Pipeline::from_config(&config),
            config,
            cache: HashMap::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load a source, or return the cached result of an earlier load.
    /// Failed loads are cached too; the error stays visible until
    /// [`Session::forget`] is called.
    pub fn load(&mut self, source: &Source) -> Arc<LoadedDataset> {
        if let Some(hit) = self.cache.get(source) {
            log::debug!("cache hit for {}", source.label());
            return Arc::clone(hit);
        }
        let loaded = Arc::new(loader::load(source, &self.config));
        self.cache.insert(source.clone(), Arc::clone(&loaded));
        loaded
    }

    /// Drop a cached source so the next interaction loads it again.
    pub fn forget(&mut self, source: &Source) -> bool {
        self.cache.remove(source).is_some()
    }

    pub fn cached_sources(&self) -> usize {
        self.cache.len()
    }

    /// Load (or reuse) the source and run one pipeline request over it.
    pub fn run(
        &mut self,
        source: &Source,
        request: &PipelineRequest,
    ) -> Result<Interaction, PipelineError> {
        let loaded = self.load(source);
        if let Some(e) = &loaded.error {
            return Ok(Interaction {
                load_error: Some(e.clone()),
                output: PipelineOutput::NoData,
            });
        }
        let output = self.pipeline.run(&loaded.dataset, request)?;
        Ok(Interaction {
            load_error: None,
            output,
        })
    }
}

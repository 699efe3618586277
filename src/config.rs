use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::export::AnimationSettings;
use crate::pipeline::orchestration::DEFAULT_MAX_CONCURRENCY;
use crate::pipeline::PipelineConfig;

pub const ENV_PREFIX: &str = "HUESORT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub pipeline: PipelineConfig,
    /// Files decoded and analyzed at the same time
    pub max_concurrency: usize,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory receiving renamed copies, if any
    pub output_dir: Option<PathBuf>,
    /// Zip archive receiving renamed copies, if any
    pub zip_file: Option<PathBuf>,
    pub animation: AnimationSettings,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            export: ExportConfig::default(),
        }
    }
}

impl Configuration {
    /// Defaults, then the optional file at `path`, then `HUESORT_*` variables.
    ///
    /// Nested keys use `__` in variable names, e.g.
    /// `HUESORT_PIPELINE__MIN_CHROMA=12`.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let configuration: Configuration = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_concurrency == 0 {
            return Err(AppError::InvalidConfig(
                "max_concurrency must be greater than 0".to_string(),
            ));
        }
        if self.export.animation.max_edge == 0 {
            return Err(AppError::InvalidConfig(
                "export.animation.max_edge must be greater than 0".to_string(),
            ));
        }
        self.pipeline.validate()
    }
}

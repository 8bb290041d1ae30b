use crate::backend::{BackendOptions, ExecutionProvider};
use crate::processing::ModelKind;
use common::{env_opt, env_or};
use std::path::PathBuf;

pub use common::Environment;

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub environment: Environment,
    pub model_path: PathBuf,
    pub model_kind: ModelKind,
    /// Overrides for the model input size; unset sides use the kind's default.
    pub input_width: Option<u32>,
    pub input_height: Option<u32>,
    pub confidence_threshold: f32,
    pub intra_threads: usize,
    pub provider: ExecutionProvider,
    pub records_path: Option<PathBuf>,
    pub otel_endpoint: Option<String>,
}

impl AnalyzerConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            environment: Environment::from_env(),
            model_path: env_opt("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("models/rice_model.onnx")),
            model_kind: env_or("MODEL_KIND", ModelKind::Classifier),
            input_width: env_opt("INPUT_WIDTH").and_then(|s| s.parse().ok()),
            input_height: env_opt("INPUT_HEIGHT").and_then(|s| s.parse().ok()),
            confidence_threshold: env_or("CONFIDENCE_THRESHOLD", 0.25),
            intra_threads: env_or("INTRA_THREADS", 4),
            provider: env_or("EXECUTION_PROVIDER", ExecutionProvider::Cpu),
            records_path: env_opt("RECORDS_PATH").map(PathBuf::from),
            otel_endpoint: env_opt("OTEL_ENDPOINT"),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            anyhow::bail!(
                "confidence threshold must be within [0, 1], got {}",
                self.confidence_threshold
            );
        }
        if self.intra_threads == 0 {
            anyhow::bail!("intra_threads must be at least 1");
        }
        if self.input_width == Some(0) || self.input_height == Some(0) {
            anyhow::bail!("input size must be non-zero");
        }
        Ok(())
    }

    /// Effective (width, height) fed to the model.
    pub fn input_size(&self) -> (u32, u32) {
        let (width, height) = self.model_kind.default_input_size();
        (
            self.input_width.unwrap_or(width),
            self.input_height.unwrap_or(height),
        )
    }

    pub fn backend_options(&self) -> BackendOptions {
        BackendOptions {
            intra_threads: self.intra_threads,
            provider: self.provider,
        }
    }

    /// Create default configuration for testing
    #[cfg(test)]
    pub fn test_default() -> Self {
        Self {
            environment: Environment::Development,
            model_path: PathBuf::from("models/rice_model.onnx"),
            model_kind: ModelKind::Classifier,
            input_width: None,
            input_height: None,
            confidence_threshold: 0.25,
            intra_threads: 4,
            provider: ExecutionProvider::Cpu,
            records_path: None,
            otel_endpoint: None,
        }
    }
}

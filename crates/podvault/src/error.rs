use thiserror::Error;

/// Top-level error for the engine. Component errors convert via `?`.
#[derive(Error, Debug)]
pub enum PodvaultError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),

    #[error("Legal hold error: {0}")]
    Hold(#[from] crate::holds::HoldError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] crate::lifecycle::LifecycleError),

    #[error("Retention error: {0}")]
    Retention(#[from] crate::retention::RetentionError),

    #[error("Archive error: {0}")]
    Archive(#[from] crate::archive::ArchiveError),

    #[error("External collaborator error: {0}")]
    External(#[from] crate::external::ExternalError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),
}

/// Errors raised while loading or validating the engine configuration.
///
/// All of these are surfaced at load time, so a running engine never holds
/// an invalid weight set or threshold.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Routing weights must sum to 1.0 (±0.001), got {sum}")]
    WeightSum { sum: f64 },

    #[error("Threshold '{name}' must lie in [0,1], got {value}")]
    ThresholdRange { name: String, value: f64 },

    #[error("Invalid retention policy '{id}': {reason}")]
    InvalidPolicy { id: String, reason: String },
}

pub type Result<T> = std::result::Result<T, PodvaultError>;

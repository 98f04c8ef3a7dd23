pub mod context;
pub mod error;
pub mod runner;

pub use context::{IngestContext, Stage, StageOutcome, StageResult};
pub use error::PipelineError;
pub use runner::{IngestPipeline, IngestReport};

pub mod archive;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod external;
pub mod holds;
pub mod lifecycle;
pub mod logging;
pub mod matcher;
pub mod pipeline;
pub mod retention;
pub mod routing;
pub mod sanitize;
pub mod similarity;

pub use archive::{ArchiveManager, ArchiveRecord, ArchiveStatus};
pub use config::{load_config, load_config_from_str, Config};
pub use context::{CorrelationId, OpContext};
pub use db::Database;
pub use error::{ConfigError, PodvaultError, Result};
pub use holds::{HoldRegistry, HoldStatus, LegalHold};
pub use lifecycle::{Document, DocumentStatus, Lifecycle};
pub use matcher::{find_match, ExtractedFields, JobRecord, MatchResult, MatchType};
pub use pipeline::{IngestContext, IngestPipeline, IngestReport};
pub use retention::{CleanupReport, RetentionAction, RetentionEvaluator};
pub use routing::{Decision, NextAction, ReasonCode, RoutingDecision, RoutingEngine};

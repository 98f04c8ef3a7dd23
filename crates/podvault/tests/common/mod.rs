pub mod builders;
pub mod harness;

pub use builders::{extracted, job, PolicyBuilder, RoutingConfigBuilder};
pub use harness::{EngineHarness, FailingClassifier, FailingExtractor};

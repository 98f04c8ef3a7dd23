pub mod document;
pub mod machine;
pub mod status;

pub use document::Document;
pub use machine::{Lifecycle, LifecycleError};
pub use status::DocumentStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Collaborator failed: {0}")]
    External(#[from] crate::external::ExternalError),

    #[error("Lifecycle transition failed: {0}")]
    Lifecycle(#[from] crate::lifecycle::LifecycleError),

    #[error("Store failed: {0}")]
    Store(#[from] crate::db::DbError),
}

//! Explicit operation context threaded through every state-mutating call.
//!
//! Correlation ids are passed as values, never stored in thread-local or
//! other ambient state. Callers that fan out over a batch reuse one
//! context so every audit event for the batch shares a correlation id.

use std::fmt;

use uuid::Uuid;

/// Correlation id tying together the audit events of one logical operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Who is performing an operation, and under which correlation id.
#[derive(Debug, Clone)]
pub struct OpContext {
    pub correlation_id: CorrelationId,
    pub actor: String,
}

impl OpContext {
    /// Context for an operation initiated by a named actor (user or service).
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            actor: actor.into(),
        }
    }

    /// Context for internally-triggered operations (cleanup sweeps, expiry).
    pub fn system() -> Self {
        Self::new("system")
    }

    /// Same actor, fresh correlation id.
    pub fn child(&self) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            actor: self.actor.clone(),
        }
    }
}

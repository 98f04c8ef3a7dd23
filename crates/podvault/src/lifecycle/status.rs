use serde::{Deserialize, Serialize};

/// The authoritative status model for a document. Stored as text in SQLite
/// but parsed through this closed enum at every read, so an illegal status
/// is a construction-time error rather than a runtime string typo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Review,
    Out,
    Quarantine,
    Archived,
    PendingDelete,
    Deleted,
    Restored,
}

impl DocumentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Review => "REVIEW",
            DocumentStatus::Out => "OUT",
            DocumentStatus::Quarantine => "QUARANTINE",
            DocumentStatus::Archived => "ARCHIVED",
            DocumentStatus::PendingDelete => "PENDING_DELETE",
            DocumentStatus::Deleted => "DELETED",
            DocumentStatus::Restored => "RESTORED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "REVIEW" => Some(DocumentStatus::Review),
            "OUT" => Some(DocumentStatus::Out),
            "QUARANTINE" => Some(DocumentStatus::Quarantine),
            "ARCHIVED" => Some(DocumentStatus::Archived),
            "PENDING_DELETE" => Some(DocumentStatus::PendingDelete),
            "DELETED" => Some(DocumentStatus::Deleted),
            "RESTORED" => Some(DocumentStatus::Restored),
            _ => None,
        }
    }

    /// Transitions into these states are gated on the legal hold registry.
    pub fn requires_hold_check(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Archived | DocumentStatus::PendingDelete | DocumentStatus::Deleted
        )
    }

    /// The legal transition table.
    ///
    /// `PendingDelete` back-transitions (undelete) are listed here in full;
    /// the state machine additionally requires the target to equal the
    /// status captured at soft-delete time. `Restored` documents are new
    /// records minted by the archive manager, never a transition of the
    /// archived original.
    pub fn can_transition(self, to: DocumentStatus) -> bool {
        use DocumentStatus::*;
        matches!(
            (self, to),
            (Review, Out)
                | (Review, Quarantine)
                | (Review, Archived)
                | (Review, PendingDelete)
                | (Out, Archived)
                | (Out, PendingDelete)
                | (Quarantine, Archived)
                | (Quarantine, PendingDelete)
                | (Restored, Archived)
                | (Restored, PendingDelete)
                | (Archived, PendingDelete)
                | (PendingDelete, Deleted)
                | (PendingDelete, Review)
                | (PendingDelete, Out)
                | (PendingDelete, Quarantine)
                | (PendingDelete, Archived)
                | (PendingDelete, Restored)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Deleted)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

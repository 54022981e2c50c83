//! Typed outcome of turning a document into an indexable entity.
//!
//! Parsing never raises. A document either yields an [`Entity`] or a
//! [`Rejection`] that callers may count and log, while the index simply
//! holds fewer entities than there are documents.

use super::{Entity, EntityId};
use thiserror::Error;

/// Why a document was not admitted to the index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// The document has no `---` frontmatter block.
    #[error("no frontmatter block")]
    MissingFrontmatter,

    /// The frontmatter block is not valid YAML (or not a mapping).
    #[error("malformed frontmatter: {0}")]
    MalformedFrontmatter(String),

    /// Neither `time_start` nor `born` is present.
    #[error("missing required field 'time_start'")]
    MissingTimeStart,

    /// A start value is present but cannot be read as an instant.
    #[error("unparseable time_start '{raw}'")]
    MalformedTimeStart {
        /// The raw frontmatter value.
        raw: String,
    },

    /// Reading the document failed while scanning.
    #[error("failed to read document: {0}")]
    ScanFault(String),
}

impl RejectReason {
    /// Whether this is an expected outcome for ordinary notes.
    ///
    /// Notes without frontmatter or without a start date are routine in a
    /// vault; everything else points at a broken document.
    pub fn is_routine(&self) -> bool {
        matches!(self, Self::MissingFrontmatter | Self::MissingTimeStart)
    }
}

/// A document that was not admitted, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    id: EntityId,
    reason: RejectReason,
}

impl Rejection {
    /// Rejection of `id` for `reason`.
    pub fn new(id: EntityId, reason: RejectReason) -> Self {
        Self { id, reason }
    }

    /// Id of the rejected document.
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// Why the document was rejected.
    pub fn reason(&self) -> &RejectReason {
        &self.reason
    }
}

/// Result of parsing one document.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Parsed into an entity.
    Admitted(Entity),
    /// Turned away, with the reason.
    Rejected(Rejection),
}

impl Admission {
    /// Shorthand for `Admission::Rejected(Rejection::new(id, reason))`.
    pub fn rejected(id: EntityId, reason: RejectReason) -> Self {
        Self::Rejected(Rejection::new(id, reason))
    }

    /// Whether the document became an entity.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted(_))
    }

    /// Id of the document this outcome is about.
    pub fn id(&self) -> &EntityId {
        match self {
            Self::Admitted(entity) => entity.id(),
            Self::Rejected(rejection) => rejection.id(),
        }
    }

    /// The admitted entity, if any.
    pub fn entity(self) -> Option<Entity> {
        match self {
            Self::Admitted(entity) => Some(entity),
            Self::Rejected(_) => None,
        }
    }
}

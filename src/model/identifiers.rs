//! Entity identifier newtype with a smart constructor.
//!
//! Identifiers are opaque, non-empty strings (for vault documents, the
//! `/`-separated path relative to the vault root). A rename never mutates an
//! id in place; it is a remove of the old id followed by an insert of the new.

use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;

/// Stable identity of an indexed entity.
/// NEVER export the constructor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Smart constructor: validates non-empty id
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidEntityId> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(InvalidEntityId::Empty);
        }
        Ok(Self(raw))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final path component without its extension.
    ///
    /// Used as the display-name fallback for documents whose frontmatter
    /// carries no `name`.
    pub fn file_stem(&self) -> &str {
        let last = self.0.rsplit('/').next().unwrap_or(&self.0);
        match last.rfind('.') {
            Some(dot) if dot > 0 => &last[..dot],
            _ => last,
        }
    }

    /// Participant references that name this id: the id itself, the id
    /// without its `.md` extension, and the file stem. Deduplicated.
    pub fn reference_forms(&self) -> Vec<&str> {
        let mut forms = vec![self.as_str()];
        for form in [self.0.strip_suffix(".md"), Some(self.file_stem())]
            .into_iter()
            .flatten()
        {
            if !forms.contains(&form) {
                forms.push(form);
            }
        }
        forms
    }

    /// Whether `reference` is one of [`Self::reference_forms`].
    pub fn is_named_by(&self, reference: &str) -> bool {
        reference == self.as_str()
            || self.0.strip_suffix(".md") == Some(reference)
            || reference == self.file_stem()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Hash/Eq delegate to the inner String, so lookups by &str agree with lookups by id.
impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ===== Error Types =====

/// Rejected entity id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidEntityId {
    /// The id was empty.
    #[error("Entity ID cannot be empty")]
    Empty,
}

// ===== Tests =====

//! Timestamped entity records.
//!
//! An [`Entity`] is immutable by replacement: the index never edits a record
//! in place, it swaps the whole value under the same [`EntityId`].

use super::EntityId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Kind of entity extracted from a document.
///
/// Unrecognized input maps to [`EntityType::Event`] via [`EntityType::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// A person, with a lifespan.
    Person,
    /// Something that happened. Also the fallback for unknown types.
    #[default]
    Event,
    /// An idea or movement.
    Concept,
    /// A place.
    Location,
}

impl EntityType {
    /// All variants in declaration order.
    pub const ALL: [EntityType; 4] = [
        EntityType::Person,
        EntityType::Event,
        EntityType::Concept,
        EntityType::Location,
    ];

    /// Parse a type name case-insensitively, defaulting to `Event`.
    pub fn parse(raw: &str) -> Self {
        Self::try_parse(raw).unwrap_or_default()
    }

    /// Parse a type name case-insensitively, `None` if unrecognized.
    pub fn try_parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "person" => Some(Self::Person),
            "event" => Some(Self::Event),
            "concept" => Some(Self::Concept),
            "location" => Some(Self::Location),
            _ => None,
        }
    }

    /// Lowercase name, as written in frontmatter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Event => "event",
            Self::Concept => "concept",
            Self::Location => "location",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Importance rating, always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Importance(u8);

/// Error returned when an importance rating is outside `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Importance must be within 1..=5 (got {0})")]
pub struct InvalidImportance(pub i64);

impl Importance {
    /// Lowest accepted importance.
    pub const MIN: u8 = 1;
    /// Highest accepted importance.
    pub const MAX: u8 = 5;

    /// Smart constructor that validates the 1..=5 range.
    pub fn new(value: i64) -> Result<Self, InvalidImportance> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(InvalidImportance(value))
        }
    }

    /// Raw value in `MIN..=MAX`.
    pub fn get(&self) -> u8 {
        self.0
    }
}

/// A timestamped record extracted from a source document.
///
/// `time_start` is required by construction: records without one are never
/// admitted (see [`crate::model::Admission`]). `time_end`, when present, is
/// never earlier than `time_start`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    id: EntityId,
    #[serde(rename = "type")]
    entity_type: EntityType,
    name: String,
    time_start: DateTime<Utc>,
    time_end: Option<DateTime<Utc>>,
    participants: Vec<String>,
    tags: Vec<String>,
    importance: Option<Importance>,
    location: Option<String>,
}

impl Entity {
    /// Create an entity with the required fields; optional fields start empty.
    pub fn new(
        id: EntityId,
        entity_type: EntityType,
        name: impl Into<String>,
        time_start: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            entity_type,
            name: name.into(),
            time_start,
            time_end: None,
            participants: Vec::new(),
            tags: Vec::new(),
            importance: None,
            location: None,
        }
    }

    /// Set the end instant.
    ///
    /// An end earlier than `time_start` is dropped, leaving a point entity.
    pub fn with_time_end(mut self, time_end: Option<DateTime<Utc>>) -> Self {
        self.time_end = time_end.filter(|end| *end >= self.time_start);
        self
    }

    /// Sets the participant references.
    pub fn with_participants(mut self, participants: Vec<String>) -> Self {
        self.participants = participants;
        self
    }

    /// Sets the tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Sets the importance.
    pub fn with_importance(mut self, importance: Option<Importance>) -> Self {
        self.importance = importance;
        self
    }

    /// Sets the free-text location.
    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    /// Document id.
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// Entity kind.
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start instant.
    pub fn time_start(&self) -> DateTime<Utc> {
        self.time_start
    }

    /// End instant. `None` for point entities.
    pub fn time_end(&self) -> Option<DateTime<Utc>> {
        self.time_end
    }

    /// End of the entity's interval, falling back to the start for point entities.
    pub fn effective_end(&self) -> DateTime<Utc> {
        self.time_end.unwrap_or(self.time_start)
    }

    /// Participant references, as written in frontmatter.
    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    /// Tags, as written in frontmatter.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Importance, if set.
    pub fn importance(&self) -> Option<Importance> {
        self.importance
    }

    /// Free-text location, if set.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Case-insensitive substring match against name and participants.
    ///
    /// `lowered_query` must already be lowercase.
    pub fn matches_query(&self, lowered_query: &str) -> bool {
        self.name.to_lowercase().contains(lowered_query)
            || self
                .participants
                .iter()
                .any(|p| p.to_lowercase().contains(lowered_query))
    }
}

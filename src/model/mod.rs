//! Domain model types (pure).
//!
//! All types in this module are pure data with smart constructors.

pub mod admission;
pub mod entity;
pub mod error;
pub mod identifiers;
pub mod time_range;

// Re-export for convenience
pub use admission::{Admission, RejectReason, Rejection};
pub use entity::{Entity, EntityType, Importance, InvalidImportance};
pub use error::{AppError, InputError};
pub use identifiers::{EntityId, InvalidEntityId};
pub use time_range::TimeRange;

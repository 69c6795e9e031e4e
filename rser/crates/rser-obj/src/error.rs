//! Error Module - Reference Counting Violations
//!
//! Every variant here is a programmer error: the handle types treat them as
//! fatal and only the `try_*` counter operations hand them back as values.
//!
//! # Error Categories
//!
//! ## Memory-safety violations
//! - `UseAfterDelete` - Counter already carries the deleted sentinel
//! - `DoubleDelete` - Second destruction of the same object
//! - `Corrupted` - Counter word fails the validity check
//!
//! ## Usage violations
//! - `ReferenceOverflow` - Too many live handles
//! - `ReleaseUnreferenced` - Release without a matching acquire
//! - `CanDeleteAlreadySet` / `CanDeleteAfterUse` - Heap flag misuse
//! - `DeleteReferenced` / `DeleteInStack` - Destruction in the wrong state

use thiserror::Error;

/// Error type for reference counter operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectError {
    /// Acquire would overflow the reference count field
    #[error("Reference overflow: object already has {count} references")]
    ReferenceOverflow { count: usize },

    /// The object has been deleted
    #[error("Use of deleted object")]
    UseAfterDelete,

    /// The object was deleted twice
    #[error("Double deletion of object")]
    DoubleDelete,

    /// Counter bits do not describe any valid state
    #[error("Corrupted object counter: {raw:#x}")]
    Corrupted { raw: usize },

    /// Release called on an object without references
    #[error("Release of unreferenced object")]
    ReleaseUnreferenced,

    /// `set_can_delete` called twice
    #[error("Can-delete flag already set")]
    CanDeleteAlreadySet,

    /// `set_can_delete` called after the first reference was taken
    #[error("Can-delete flag set on object already in use ({count} references)")]
    CanDeleteAfterUse { count: usize },

    /// Destruction requested while handles still exist
    #[error("Delete of referenced object ({count} references)")]
    DeleteReferenced { count: usize },

    /// Destruction requested for an object that does not own its storage
    #[error("Delete of object not allocated in heap")]
    DeleteInStack,
}

impl ObjectError {
    /// True for violations that mean memory has already been misused,
    /// as opposed to a handle being driven through the wrong transition
    pub fn is_memory_violation(&self) -> bool {
        matches!(
            self,
            ObjectError::UseAfterDelete | ObjectError::DoubleDelete | ObjectError::Corrupted { .. }
        )
    }
}

/// Result type alias for counter operations
pub type Result<T> = std::result::Result<T, ObjectError>;

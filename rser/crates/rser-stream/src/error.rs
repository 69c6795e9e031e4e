//! Error Module - Stream Failures
//!
//! Every stream error is an [`ErrorKind`] located by byte offset and frame
//! path. The first error also sets a [`FailFlags`] bit on the stream; after
//! that the stream refuses further work with [`ErrorKind::Failed`].
//!
//! # Error Categories
//!
//! ## Data errors (reading)
//! - `UnexpectedEof`, `Format`, `Overflow`, `InvalidObjectIndex`,
//!   `TrailingData`, `NotAllRead`
//!
//! ## Usage errors (both directions)
//! - `TypeMismatch`, `IncompatibleType`, `AlreadyWritten`, `NotAllWritten`,
//!   `IllegalCall`
//!
//! ## Environment
//! - `Io`, `Type`, `LimitExceeded`, `Config`

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use rser_type::{ObjectId, TypeError};
use thiserror::Error;

/// Stream state bits
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FailFlags(u8);

impl FailFlags {
    pub const NONE: FailFlags = FailFlags(0);
    /// Input ended inside a value
    pub const EOF: FailFlags = FailFlags(1);
    /// The underlying reader or writer failed
    pub const READ_ERROR: FailFlags = FailFlags(1 << 1);
    /// Malformed data
    pub const FORMAT_ERROR: FailFlags = FailFlags(1 << 2);
    /// Number or size out of range
    pub const OVERFLOW: FailFlags = FailFlags(1 << 3);
    /// API used in the wrong state or with the wrong value
    pub const ILLEGAL_CALL: FailFlags = FailFlags(1 << 4);
    /// Generic failure, e.g. an abandoned list
    pub const FAIL: FailFlags = FailFlags(1 << 5);
    /// The stream was never usable, e.g. built with invalid limits
    pub const NOT_OPEN: FailFlags = FailFlags(1 << 6);

    const NAMES: [(FailFlags, &'static str); 7] = [
        (Self::EOF, "EOF"),
        (Self::READ_ERROR, "READ_ERROR"),
        (Self::FORMAT_ERROR, "FORMAT_ERROR"),
        (Self::OVERFLOW, "OVERFLOW"),
        (Self::ILLEGAL_CALL, "ILLEGAL_CALL"),
        (Self::FAIL, "FAIL"),
        (Self::NOT_OPEN, "NOT_OPEN"),
    ];

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: FailFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: FailFlags) {
        self.0 |= other.0;
    }
}

impl BitOr for FailFlags {
    type Output = FailFlags;

    fn bitor(self, rhs: FailFlags) -> FailFlags {
        FailFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for FailFlags {
    fn bitor_assign(&mut self, rhs: FailFlags) {
        self.insert(rhs);
    }
}

impl fmt::Display for FailFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("OK");
        }
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FailFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FailFlags({})", self)
    }
}

/// What went wrong
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("unexpected end of data")]
    UnexpectedEof,

    #[error("{0}")]
    Format(String),

    #[error("overflow: {0}")]
    Overflow(String),

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("value does not match {expected}: found {found}")]
    TypeMismatch { expected: String, found: &'static str },

    #[error("incompatible type: {found} is not a {expected}")]
    IncompatibleType { expected: String, found: String },

    #[error("invalid object index {index} ({count} objects known)")]
    InvalidObjectIndex { index: u64, count: usize },

    #[error("object {id} already written")]
    AlreadyWritten { id: ObjectId },

    #[error("not all elements written: {written} of {expected}")]
    NotAllWritten { written: usize, expected: usize },

    #[error("not all elements read")]
    NotAllRead,

    #[error("unexpected trailing data: {remaining} bytes")]
    TrailingData { remaining: usize },

    #[error("illegal call: {0}")]
    IllegalCall(String),

    #[error("stream already failed ({0})")]
    Failed(FailFlags),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("type error: {0}")]
    Type(#[from] TypeError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl ErrorKind {
    pub fn format(message: impl Into<String>) -> Self {
        ErrorKind::Format(message.into())
    }

    /// Flag set on the stream when this error occurs
    pub fn flag(&self) -> FailFlags {
        match self {
            ErrorKind::UnexpectedEof => FailFlags::EOF,
            ErrorKind::Io(_) => FailFlags::READ_ERROR,
            ErrorKind::Format(_)
            | ErrorKind::InvalidObjectIndex { .. }
            | ErrorKind::TrailingData { .. }
            | ErrorKind::NotAllRead => FailFlags::FORMAT_ERROR,
            ErrorKind::Overflow(_) | ErrorKind::LimitExceeded(_) => FailFlags::OVERFLOW,
            ErrorKind::TypeMismatch { .. }
            | ErrorKind::IncompatibleType { .. }
            | ErrorKind::AlreadyWritten { .. }
            | ErrorKind::NotAllWritten { .. }
            | ErrorKind::IllegalCall(_)
            | ErrorKind::Type(_) => FailFlags::ILLEGAL_CALL,
            ErrorKind::Failed(_) => FailFlags::FAIL,
            ErrorKind::Config(_) => FailFlags::NOT_OPEN,
        }
    }
}

/// A located stream error
#[derive(Debug, Error)]
#[error("offset {offset} at {path}: {kind}")]
pub struct StreamError {
    pub kind: ErrorKind,
    /// Byte offset in the stream
    pub offset: usize,
    /// Frame path such as `Root.children[]`
    pub path: String,
}

impl StreamError {
    pub fn new(kind: ErrorKind, offset: usize, path: impl Into<String>) -> Self {
        Self {
            kind,
            offset,
            path: path.into(),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn flag(&self) -> FailFlags {
        self.kind.flag()
    }
}

/// Result type alias for stream operations
pub type Result<T> = std::result::Result<T, StreamError>;

/// Invalid stream configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid max_depth: {0}")]
    InvalidMaxDepth(String),

    #[error("Invalid max_length: {0}")]
    InvalidMaxLength(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_flags_display() {
        assert_eq!(FailFlags::NONE.to_string(), "OK");
        let flags = FailFlags::EOF | FailFlags::FAIL;
        assert_eq!(flags.to_string(), "EOF|FAIL");
        assert!(flags.contains(FailFlags::EOF));
        assert!(!flags.contains(FailFlags::OVERFLOW));
    }

    #[test]
    fn test_error_display_carries_location() {
        let err = StreamError::new(
            ErrorKind::format("unexpected member: [7]"),
            42,
            "Root.children[]",
        );
        assert_eq!(
            err.to_string(),
            "offset 42 at Root.children[]: unexpected member: [7]"
        );
        assert_eq!(err.flag(), FailFlags::FORMAT_ERROR);
    }

    #[test]
    fn test_flags_by_kind() {
        assert_eq!(ErrorKind::UnexpectedEof.flag(), FailFlags::EOF);
        assert_eq!(
            ErrorKind::Overflow("x".into()).flag(),
            FailFlags::OVERFLOW
        );
        assert_eq!(
            ErrorKind::NotAllWritten {
                written: 1,
                expected: 2
            }
            .flag(),
            FailFlags::ILLEGAL_CALL
        );
        assert_eq!(
            ErrorKind::from(ConfigError::InvalidMaxLength("0".into())).flag(),
            FailFlags::NOT_OPEN
        );
    }
}

//! Error types for the type registry and schema loading

use thiserror::Error;

/// Error type for type registration and lookup
#[derive(Debug, Error)]
pub enum TypeError {
    /// A type with this name is already registered
    #[error("Duplicate type: {name}")]
    DuplicateType { name: String },

    /// No type with this name
    #[error("Unknown type: {name}")]
    UnknownType { name: String },

    /// No member or variant with this name
    #[error("Unknown member '{member}' in {type_name}")]
    UnknownMember { type_name: String, member: String },

    /// A type used where another kind of type is required
    #[error("{type_name} is not a {expected} type")]
    WrongKind {
        type_name: String,
        expected: &'static str,
    },

    /// Type id outside the registry
    #[error("Unknown type id: {id}")]
    UnknownTypeId { id: u32 },

    /// Type was declared but never defined
    #[error("Type declared but not defined: {name}")]
    Undefined { name: String },

    /// `define` called on a type that already has a definition
    #[error("Type already defined: {name}")]
    AlreadyDefined { name: String },

    /// Two members or variants share a tag
    #[error("Duplicate tag [{tag}] in {type_name}")]
    DuplicateTag { type_name: String, tag: u32 },

    /// Two members or variants share a name
    #[error("Duplicate member '{member}' in {type_name}")]
    DuplicateMember { type_name: String, member: String },

    /// Two enumeration items share a name or value
    #[error("Duplicate enumeration item '{item}' in {type_name}")]
    DuplicateEnumItem { type_name: String, item: String },

    /// Parent of a class is not a class
    #[error("Parent of {type_name} is not a class: {parent}")]
    InvalidParent { type_name: String, parent: String },

    /// Pointee whose own encoding collides with the pointer markers
    #[error("{type_name} cannot point to {pointee}: pointee is a {kind} type")]
    InvalidPointee {
        type_name: String,
        pointee: String,
        kind: &'static str,
    },

    /// A choice with no variants
    #[error("Choice {type_name} has no variants")]
    EmptyChoice { type_name: String },

    /// A default value does not fit its member type
    #[error("Invalid default for {type_name}.{member}")]
    InvalidDefault { type_name: String, member: String },

    /// Default value construction looped through mandatory members
    #[error("Cannot build default value: {type_name} contains itself")]
    RecursiveDefault { type_name: String },

    /// Error in a schema document
    #[error("Schema error: {0}")]
    Schema(String),

    /// I/O error while reading a schema file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for TypeError {
    fn from(err: toml::de::Error) -> Self {
        TypeError::Schema(err.to_string())
    }
}

impl From<serde_json::Error> for TypeError {
    fn from(err: serde_json::Error) -> Self {
        TypeError::Schema(err.to_string())
    }
}

/// Result type alias for type operations
pub type Result<T> = std::result::Result<T, TypeError>;

//! rser-type - Type Descriptors and Values
//!
//! The object streams are driven by data, not by generated code: a
//! [`TypeRegistry`] describes every type that can appear on the wire, and a
//! [`Value`] holds an instance of any of them. Shared objects are
//! [`Object`]s behind counted [`ObjectRef`] handles, which is how a value
//! tree becomes a graph.
//!
//! Registries are built through the Rust API ([`ClassBuilder`] and friends)
//! or loaded from a [`Schema`] file. There is no global registry; streams
//! borrow the one they are given.

pub mod error;
pub mod info;
pub mod registry;
pub mod schema;
pub mod value;

pub use error::{Result, TypeError};
pub use info::{
    ChoiceBuilder, ChoiceInfo, ClassBuilder, ClassInfo, ContainerInfo, EnumBuilder, EnumValues,
    MemberInfo, PointerInfo, TypeId, TypeInfo, TypeKind,
};
pub use registry::TypeRegistry;
pub use schema::{Literal, Schema};
pub use value::{isomorphic, ChoiceValue, ClassValue, Object, ObjectId, ObjectRef, Value};

//! rser-stream - Graph-Preserving BER Object Streams
//!
//! ============================================================================
//! MODULE OVERVIEW
//! ============================================================================
//!
//! [`ObjectOStream`] writes values described by a
//! [`TypeRegistry`](rser_type::TypeRegistry) as BER;
//! [`ObjectIStream`] reads them back. Objects reachable through more than
//! one pointer are written once and referenced by number afterwards, so
//! aliasing and cycles survive a round trip.
//!
//! ```text
//! Value ──discover──> ObjectTable ──emit──> BerWriter ──> bytes
//! bytes ──> BerReader ──decode──> ReadTable ──> Value
//! ```
//!
//! [`hooks`] lets callers take over single types, class members, choice
//! variants or container elements on either stream.
//!
//! The [`ber`] module works without a registry: [`ber::dump`] renders any
//! input as a TLV tree and [`ber::check`] validates its framing.
//!
//! # Examples
//!
//! ```
//! use rser_stream::{ObjectIStream, ObjectOStream};
//! use rser_type::{isomorphic, Object, TypeRegistry, Value};
//!
//! let mut registry = TypeRegistry::new();
//! let int_ref = registry.pointer("IntRef", TypeRegistry::INT).unwrap();
//! let pair = registry.sequence_of("Pair", int_ref).unwrap();
//!
//! let shared = Object::new(TypeRegistry::INT, Value::Int(7));
//! let value = Value::List(vec![shared.clone().into(), shared.into()]);
//!
//! let mut output = ObjectOStream::new(Vec::new(), &registry);
//! output.write_root(&value, pair).unwrap();
//! let bytes = output.into_inner().unwrap();
//!
//! let mut input = ObjectIStream::new(&bytes, &registry);
//! let copy = input.read_root(pair).unwrap();
//! assert!(isomorphic(&value, &copy));
//! ```

pub mod ber;
pub mod config;
pub mod error;
pub mod frame;
pub mod graph;
pub mod hooks;
pub mod istream;
pub mod ostream;

pub use config::{StreamConfig, DEFAULT_MAX_DEPTH, DEFAULT_MAX_LENGTH, MAX_DEPTH_LIMIT};
pub use error::{ConfigError, ErrorKind, FailFlags, Result, StreamError};
pub use frame::{Frame, FrameStack};
pub use graph::{ObjectIndex, ObjectTable, ReadTable};
pub use hooks::{
    HookResult, ReadElementHook, ReadHooks, ReadMemberHook, ReadObjectHook, WriteElementHook,
    WriteHooks, WriteMemberHook, WriteObjectHook,
};
pub use istream::{ListReader, ObjectIStream};
pub use ostream::{ListWriter, ObjectOStream};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

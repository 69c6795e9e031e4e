//! rser-util - Foundation types shared by the rser crates
//!
//! ============================================================================
//! MODULE OVERVIEW
//! ============================================================================
//!
//! The object streams keep several side tables that are addressed by small
//! integers: the type registry hands out type ids, the output stream numbers
//! every shared object it discovers, and the input stream numbers every
//! object in the order it first appears on the wire. Mixing those number
//! spaces up is the classic way to corrupt a serialized graph, so each one
//! gets its own index type.
//!
//! DESIGN PRINCIPLES:
//! ------------------
//! 1. TYPED INDICES
//!    `IndexVec<I, T>` only accepts the index type it was declared with.
//!    An `ObjectIndex` cannot be used to look up a type descriptor.
//!
//! 2. EXPLICIT IDENTITY
//!    Object identity is an integer handed out by [`IdGenerator`], never a
//!    pointer value. Side tables hash that integer.
//
// INDEX SPACES:
// -------------
// ```
// TypeRegistry   IndexVec<TypeId, TypeInfo>        registration order
// ObjectTable    IndexVec<ObjectIndex, WriteEntry> discovery order
// ReadTable      IndexVec<ObjectIndex, ObjectRef>  wire order
// ```
// Discovery order and wire order are the same walk, which is what lets the
// reader rebuild the writer's numbering without it ever being transmitted.

pub mod error;
pub mod id_gen;
pub mod index_vec;

pub use error::{IndexVecError, IndexVecResult};
pub use id_gen::IdGenerator;
pub use index_vec::{Idx, IndexVec};

// Re-export commonly used types
pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;

//! # rser-obj - Reference-Counted Object Base
//!
//! Every shared object in an rser value graph lives in an [`ObjectCell`]:
//! the value plus one atomic counter word. [`Ref<T>`] is the owning handle.
//!
//! ## Overview
//!
//! - **Counter state machine**: [`ObjectCounter`] packs the heap flag, a
//!   validity magic and the reference count into a single `usize`
//! - **Checked transitions**: acquire, release, can-delete and delete are
//!   checked against the current state; violations are [`ObjectError`]s
//! - **Fatal reporting**: the handle treats every violation as a bug and
//!   reports it through [`diag::fatal`], which runs the installed hook and
//!   panics
//!
//! ## Quick Start
//!
//! ```rust
//! use rser_obj::Ref;
//!
//! let first = Ref::new(vec![1u8, 2, 3]);
//! let second = first.clone();
//! assert_eq!(Ref::reference_count(&first), 2);
//! drop(second);
//! assert_eq!(first.len(), 3);
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//!   ObjectCell::new ──► InStack ──set_can_delete──► InHeap
//!                          │                          │
//!                       acquire                    acquire
//!                          ▼                          ▼
//!              Referenced{in_heap:false}   Referenced{in_heap:true}
//!                          │                          │
//!                   last release                last release
//!                          ▼                          ▼
//!                       InStack                Destroy ──► Deleted
//! ```

pub mod counter;
pub mod diag;
pub mod error;
pub mod handle;

pub use counter::{CounterState, ObjectCounter, Release, COUNTER_DELETED, MAX_REFERENCES};
pub use diag::{clear_fatal_hook, set_fatal_hook, FatalHook};
pub use error::{ObjectError, Result};
pub use handle::{ObjectCell, Ref};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

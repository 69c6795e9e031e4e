//! BER building blocks
//!
//! `tag` and `codec` are pure functions over bytes, `reader` and `writer`
//! move through a buffer or sink, and `dump` works on any input without a
//! type registry.

pub mod codec;
pub mod dump;
pub mod reader;
pub mod tag;
pub mod writer;

pub use dump::{check, check_with_config, dump, dump_with_config, TlvNode};
pub use reader::{BerReader, End, Length};
pub use tag::{Tag, TagClass};
pub use writer::BerWriter;

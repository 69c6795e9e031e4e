//! Command modules for the rsert CLI.
//!
//! This module contains implementations for all available subcommands.
//! Each subcommand is implemented in its own file following the same
//! pattern: an `Args` struct, a command type and a `run_*` entry point.

pub mod common;
pub mod traits;

pub mod check;
pub mod decode;
pub mod dump;
pub mod encode;
pub mod init;

pub use check::{run_check, CheckArgs};
pub use decode::{run_decode, DecodeArgs};
pub use dump::{run_dump, DumpArgs};
pub use encode::{run_encode, EncodeArgs};
pub use init::{run_init, InitArgs};

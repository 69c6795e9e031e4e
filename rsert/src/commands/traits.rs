//! Command trait for the rsert CLI.
//!
//! Every subcommand is built from its arguments and executed once.

use crate::error::Result;

/// Standard command trait that all rsert commands implement.
pub trait Command {
    /// The arguments type for this command.
    type Args;

    /// The output type returned by this command.
    type Output;

    /// Create a new command instance with the given arguments.
    fn new(args: Self::Args) -> Self;

    /// Execute the command.
    fn execute(&self) -> Result<Self::Output>;

    /// Get the command name.
    fn name() -> &'static str;
}

/// Build and execute a command, logging its name.
pub fn run<C: Command>(args: C::Args) -> Result<C::Output> {
    tracing::debug!("running {}", C::name());
    C::new(args).execute()
}

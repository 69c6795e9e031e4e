//! Dump command implementation.
//!
//! Prints the TLV structure of a BER file without needing its schema:
//! offsets, tags, lengths, decoded primitive content and object references.

use std::io::Write;
use std::path::PathBuf;

use rser_stream::{ber, StreamConfig};

use crate::commands::common::map_input;
use crate::commands::traits::{self, Command};
use crate::error::Result;

/// Arguments for the dump command.
#[derive(Debug, Clone, Default)]
pub struct DumpArgs {
    /// Enable verbose output.
    pub verbose: bool,
    /// File to dump.
    pub input: PathBuf,
    /// Limits applied while parsing.
    pub stream: StreamConfig,
}

/// Dump command handler.
pub struct DumpCommand {
    args: DumpArgs,
}

impl DumpCommand {
    /// Render the dump of the input file.
    pub fn render(&self) -> Result<String> {
        let map = map_input(&self.args.input)?;
        let nodes = ber::dump_with_config(&map, &self.args.stream)?;

        let text: String = nodes.iter().map(ToString::to_string).collect();
        if self.args.verbose {
            let count: usize = nodes.iter().map(|node| node.count()).sum();
            eprintln!(
                "ℹ️ {}: {} top-level value(s), {} TLVs, {} bytes",
                self.args.input.display(),
                nodes.len(),
                count,
                map.len()
            );
        }
        Ok(text)
    }
}

impl Command for DumpCommand {
    type Args = DumpArgs;
    type Output = ();

    fn new(args: Self::Args) -> Self {
        Self { args }
    }

    fn execute(&self) -> Result<Self::Output> {
        let text = self.render()?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }

    fn name() -> &'static str {
        "dump"
    }
}

/// Run the dump command with the given arguments.
pub fn run_dump(args: DumpArgs) -> Result<()> {
    traits::run::<DumpCommand>(args)
}

//! Encode command implementation.
//!
//! The inverse of decode: reads a JSON graph document, builds the value
//! graph against the schema and writes it as BER.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use rser_stream::{ObjectOStream, StreamConfig};

use crate::commands::common::{output_messages, TypedInput};
use crate::commands::decode::check_output;
use crate::commands::traits::{self, Command};
use crate::error::Result;
use crate::json;

/// Arguments for the encode command.
#[derive(Debug, Clone, Default)]
pub struct EncodeArgs {
    /// Enable verbose output.
    pub verbose: bool,
    /// JSON document to encode.
    pub input: PathBuf,
    /// Schema file describing the types.
    pub schema: PathBuf,
    /// Type of the value at the top of the document.
    pub root: String,
    /// BER output file.
    pub output: PathBuf,
    /// Overwrite an existing output file.
    pub force: bool,
    /// Limits and encoding options.
    pub stream: StreamConfig,
}

/// Encode command handler.
pub struct EncodeCommand {
    args: EncodeArgs,
}

impl Command for EncodeCommand {
    type Args = EncodeArgs;
    type Output = ();

    fn new(args: Self::Args) -> Self {
        Self { args }
    }

    fn execute(&self) -> Result<Self::Output> {
        check_output(&self.args.output, self.args.force)?;

        let typed = TypedInput::load(&self.args.schema, &self.args.root)?;
        let (registry, root) = typed.registry()?;
        let text = std::fs::read_to_string(&self.args.input)?;
        let document: serde_json::Value = serde_json::from_str(&text)?;
        let value = json::from_json(&registry, &document, root, self.args.stream.max_depth)?;

        let sink = BufWriter::new(File::create(&self.args.output)?);
        let mut output = ObjectOStream::new(sink, &registry).with_config(self.args.stream.clone());
        output.write_root(&value, root)?;
        let (objects, references, bytes) = (
            output.objects_written(),
            output.references_written(),
            output.bytes_written(),
        );
        output.into_inner()?.flush()?;

        if self.args.verbose {
            eprintln!(
                "{} {} ({} bytes, {} object(s), {} reference(s))",
                output_messages::CREATED_FILE,
                self.args.output.display(),
                bytes,
                objects,
                references
            );
        }
        Ok(())
    }

    fn name() -> &'static str {
        "encode"
    }
}

/// Run the encode command with the given arguments.
pub fn run_encode(args: EncodeArgs) -> Result<()> {
    traits::run::<EncodeCommand>(args)
}

//! Decode command implementation.
//!
//! Reads one value graph of a schema type from a BER file and prints it in
//! the JSON graph form, see [`crate::json`].

use std::io::Write;
use std::path::{Path, PathBuf};

use rser_stream::{ObjectIStream, StreamConfig};

use crate::commands::common::{error_messages, map_input, output_messages, TypedInput};
use crate::commands::traits::{self, Command};
use crate::error::{RsertError, Result};
use crate::json;

/// Arguments for the decode command.
#[derive(Debug, Clone, Default)]
pub struct DecodeArgs {
    /// Enable verbose output.
    pub verbose: bool,
    /// BER file to decode.
    pub input: PathBuf,
    /// Schema file describing the types.
    pub schema: PathBuf,
    /// Type of the value at the top of the file.
    pub root: String,
    /// Output file; standard output when absent.
    pub output: Option<PathBuf>,
    /// Print JSON on one line.
    pub compact: bool,
    /// Overwrite an existing output file.
    pub force: bool,
    /// Limits applied while reading.
    pub stream: StreamConfig,
}

/// Decode command handler.
pub struct DecodeCommand {
    args: DecodeArgs,
}

impl DecodeCommand {
    /// Decode the input into a JSON document.
    pub fn decode(&self) -> Result<serde_json::Value> {
        let typed = TypedInput::load(&self.args.schema, &self.args.root)?;
        let (registry, root) = typed.registry()?;
        let map = map_input(&self.args.input)?;

        let mut input = ObjectIStream::new(&map, &registry).with_config(self.args.stream.clone());
        let value = input.read_root(root)?;
        input.expect_end()?;
        if self.args.verbose {
            eprintln!(
                "ℹ️ Read {} object(s), {} reference(s)",
                input.objects_read(),
                input.references_read()
            );
        }

        json::to_json(&registry, &value, root, self.args.stream.max_depth)
    }

    fn render(&self, document: &serde_json::Value) -> Result<String> {
        let mut text = if self.args.compact {
            serde_json::to_string(document)?
        } else {
            serde_json::to_string_pretty(document)?
        };
        text.push('\n');
        Ok(text)
    }
}

/// Refuse to replace an existing output file unless forced.
pub(crate) fn check_output(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(RsertError::Validation(format!(
            "{} {}",
            error_messages::OUTPUT_FILE_EXISTS,
            path.display()
        )));
    }
    Ok(())
}

impl Command for DecodeCommand {
    type Args = DecodeArgs;
    type Output = ();

    fn new(args: Self::Args) -> Self {
        Self { args }
    }

    fn execute(&self) -> Result<Self::Output> {
        if let Some(output) = &self.args.output {
            check_output(output, self.args.force)?;
        }
        let document = self.decode()?;
        let text = self.render(&document)?;

        match &self.args.output {
            Some(output) => {
                std::fs::write(output, text)?;
                if self.args.verbose {
                    eprintln!("{} {}", output_messages::CREATED_FILE, output.display());
                }
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(text.as_bytes())?;
                stdout.flush()?;
            }
        }
        Ok(())
    }

    fn name() -> &'static str {
        "decode"
    }
}

/// Run the decode command with the given arguments.
pub fn run_decode(args: DecodeArgs) -> Result<()> {
    traits::run::<DecodeCommand>(args)
}

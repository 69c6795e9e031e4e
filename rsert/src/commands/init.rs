//! Init command implementation.
//!
//! Writes a default `rsert.toml` and a small example schema into a
//! directory, ready for `rsert encode` and `rsert decode`.

use std::path::{Path, PathBuf};

use crate::commands::common::{error_messages, output_messages};
use crate::commands::traits::{self, Command};
use crate::config::{Config, CONFIG_FILE_NAME};
use crate::error::{RsertError, Result};

/// Name of the example schema file.
pub const SCHEMA_FILE_NAME: &str = "schema.toml";

/// Example schema: labelled nodes linked into a graph.
pub const EXAMPLE_SCHEMA: &str = r#"# Types are declared by name and may refer to each other in any order.
# Encode a graph with:  rsert encode graph.json -s schema.toml -t NodeRef -o graph.ber

[[types]]
name = "Node"
kind = "sequence"
members = [
    { name = "label", tag = 0, type = "VisibleString" },
    { name = "next", tag = 1, type = "NodeRef", optional = true },
    { name = "children", tag = 2, type = "NodeList" },
]

[[types]]
name = "NodeRef"
kind = "pointer"
pointee = "Node"

[[types]]
name = "NodeList"
kind = "sequence-of"
element = "NodeRef"
"#;

/// Arguments for the init command.
#[derive(Debug, Clone, Default)]
pub struct InitArgs {
    /// Enable verbose output.
    pub verbose: bool,
    /// Overwrite existing files.
    pub force: bool,
    /// Directory to initialize (default: current directory).
    pub path: Option<PathBuf>,
}

/// Init command handler.
pub struct InitCommand {
    args: InitArgs,
}

impl InitCommand {
    fn target_path(&self) -> PathBuf {
        self.args
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn validate_directory(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::create_dir_all(path)?;
            return Ok(());
        }
        if !path.is_dir() {
            return Err(RsertError::Validation(format!(
                "{} {}",
                error_messages::TARGET_NOT_DIR,
                path.display()
            )));
        }
        Ok(())
    }

    /// Write `path` with `write` unless it exists and `--force` is off.
    fn create_file(&self, path: &Path, write: impl FnOnce(&Path) -> Result<()>) -> Result<bool> {
        if path.exists() && !self.args.force {
            if self.args.verbose {
                eprintln!("{} {}", output_messages::SKIPPED_FILE, path.display());
            }
            return Ok(false);
        }
        write(path)?;
        if self.args.verbose {
            eprintln!("{} {}", output_messages::CREATED_FILE, path.display());
        }
        Ok(true)
    }
}

impl Command for InitCommand {
    type Args = InitArgs;
    /// Number of files written
    type Output = usize;

    fn new(args: Self::Args) -> Self {
        Self { args }
    }

    fn execute(&self) -> Result<Self::Output> {
        let target = self.target_path();
        self.validate_directory(&target)?;

        let mut created = 0;
        if self.create_file(&target.join(CONFIG_FILE_NAME), |path| {
            Config::default().save_to_path(path)
        })? {
            created += 1;
        }
        if self.create_file(&target.join(SCHEMA_FILE_NAME), |path| {
            Ok(std::fs::write(path, EXAMPLE_SCHEMA)?)
        })? {
            created += 1;
        }
        tracing::info!("initialized {} ({} file(s) written)", target.display(), created);
        Ok(created)
    }

    fn name() -> &'static str {
        "init"
    }
}

/// Run the init command with the given arguments.
pub fn run_init(args: InitArgs) -> Result<()> {
    traits::run::<InitCommand>(args).map(|_| ())
}

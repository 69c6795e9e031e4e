//! Check command implementation.
//!
//! Validates BER files in parallel. Without a schema only the framing is
//! checked; with `--schema` and `--type` every top-level value is read as
//! an object graph of the given type, so references, member tags and
//! derived class names are checked too.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use rser_stream::{ber, ObjectIStream, StreamConfig};
use rser_type::{TypeId, TypeRegistry};

use crate::commands::common::{error_messages, map_input, output_messages, TypedInput};
use crate::commands::traits::{self, Command};
use crate::error::{RsertError, Result};

/// Arguments for the check command.
#[derive(Debug, Clone, Default)]
pub struct CheckArgs {
    /// Enable verbose output.
    pub verbose: bool,
    /// Files to check.
    pub input: Vec<PathBuf>,
    /// Schema file for typed checks.
    pub schema: Option<PathBuf>,
    /// Root type name for typed checks.
    pub root: Option<String>,
    /// Number of parallel jobs.
    pub jobs: usize,
    /// Limits applied while reading.
    pub stream: StreamConfig,
}

/// Result of checking one file.
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    /// TLV count for framing checks, root count for typed checks
    pub outcome: Result<usize>,
}

/// Check command handler.
pub struct CheckCommand {
    args: CheckArgs,
}

impl CheckCommand {
    /// Check every input file and report per file.
    pub fn check_all(&self) -> Result<Vec<FileReport>> {
        if self.args.input.is_empty() {
            return Err(RsertError::Validation(
                error_messages::NO_INPUT_FILES.to_string(),
            ));
        }
        let typed = match (&self.args.schema, &self.args.root) {
            (Some(schema), Some(root)) => Some(TypedInput::load(schema, root)?),
            (None, None) => None,
            _ => {
                return Err(RsertError::Validation(
                    error_messages::SCHEMA_NEEDS_TYPE.to_string(),
                ))
            }
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.args.jobs.max(1))
            .build()
            .map_err(|e| RsertError::CommandExecution(format!("Failed to start workers: {}", e)))?;

        // Registries hold values that are not Sync, so each worker builds its own
        let reports: Vec<FileReport> = pool.install(|| {
            self.args
                .input
                .par_iter()
                .map_init(
                    || typed.as_ref().map(TypedInput::registry),
                    |registry, path| FileReport {
                        path: path.clone(),
                        outcome: self.check_file(path, registry),
                    },
                )
                .collect()
        });
        Ok(reports)
    }

    fn check_file(
        &self,
        path: &Path,
        registry: &Option<Result<(TypeRegistry, TypeId)>>,
    ) -> Result<usize> {
        let map = map_input(path)?;
        match registry {
            None => Ok(ber::check_with_config(&map, &self.args.stream)?),
            Some(Ok((registry, root))) => {
                let mut input =
                    ObjectIStream::new(&map, registry).with_config(self.args.stream.clone());
                let mut roots = 0;
                while !input.at_end() {
                    input.read_root(*root)?;
                    roots += 1;
                }
                tracing::debug!(
                    "{}: {} objects, {} references",
                    path.display(),
                    input.objects_read(),
                    input.references_read()
                );
                Ok(roots)
            }
            Some(Err(e)) => Err(RsertError::Config(e.to_string())),
        }
    }

    fn report(&self, reports: &[FileReport]) -> usize {
        let mut failed = 0;
        for report in reports {
            match &report.outcome {
                Ok(count) => {
                    let unit = if self.args.schema.is_some() { "values" } else { "TLVs" };
                    println!(
                        "{} {}: {} {}",
                        output_messages::OK,
                        report.path.display(),
                        count,
                        unit
                    );
                }
                Err(e) => {
                    failed += 1;
                    eprintln!(
                        "{} {}: {}",
                        output_messages::ERROR,
                        report.path.display(),
                        e
                    );
                }
            }
        }
        failed
    }
}

impl Command for CheckCommand {
    type Args = CheckArgs;
    type Output = ();

    fn new(args: Self::Args) -> Self {
        Self { args }
    }

    fn execute(&self) -> Result<Self::Output> {
        let start_time = Instant::now();
        let reports = self.check_all()?;
        let failed = self.report(&reports);

        if self.args.verbose {
            eprintln!(
                "ℹ️ Checked {} file(s) in {:.2}s",
                reports.len(),
                start_time.elapsed().as_secs_f64()
            );
        }
        if failed > 0 {
            return Err(RsertError::CommandExecution(format!(
                "{} {}{}",
                failed,
                error_messages::FILES_FAILED,
                failed_names(&reports)
            )));
        }
        Ok(())
    }

    fn name() -> &'static str {
        "check"
    }
}

fn failed_names(reports: &[FileReport]) -> String {
    reports
        .iter()
        .filter(|report| report.outcome.is_err())
        .map(|report| format!(" {}", report.path.display()))
        .collect()
}

/// Run the check command with the given arguments.
pub fn run_check(args: CheckArgs) -> Result<()> {
    traits::run::<CheckCommand>(args)
}

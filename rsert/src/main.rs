//! Rsert CLI - inspect, check and convert rser object streams.
//!
//! This is the main entry point for the rsert CLI application.
//! It uses clap for argument parsing and dispatches to the command
//! handlers in [`commands`].

mod commands;
mod config;
mod error;
mod json;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{
    run_check, run_decode, run_dump, run_encode, run_init, CheckArgs, DecodeArgs, DumpArgs,
    EncodeArgs, InitArgs,
};
use config::Config;
use error::{Result, RsertError};

/// Rsert - inspect, check and convert rser object streams
///
/// Works on BER encoded object graphs as written by rser-stream, with or
/// without the schema that describes their types.
#[derive(Parser, Debug)]
#[command(name = "rsert")]
#[command(author = "Rser Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect, check and convert rser object streams", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, env = "RSERT_VERBOSE")]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "RSERT_CONFIG")]
    config: Option<PathBuf>,

    /// Disable color output
    #[arg(long, global = true, env = "RSERT_NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the rsert CLI.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the TLV structure of a BER file
    ///
    /// Needs no schema: shows offsets, tags, lengths, primitive content
    /// and object references.
    Dump(DumpCommand),

    /// Validate BER files
    ///
    /// Checks the framing of every file, or with a schema reads every
    /// top-level value as an object graph of the given type.
    Check(CheckCommand),

    /// Convert a BER file to the JSON graph form
    Decode(DecodeCommand),

    /// Convert a JSON graph document to BER
    Encode(EncodeCommand),

    /// Write a default rsert.toml and an example schema
    Init(InitCommand),
}

/// Arguments for the dump subcommand.
#[derive(Parser, Debug)]
struct DumpCommand {
    /// File to dump
    input: PathBuf,
}

/// Arguments for the check subcommand.
#[derive(Parser, Debug)]
struct CheckCommand {
    /// Files to check
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Schema file (TOML or JSON)
    #[arg(short, long, requires = "root")]
    schema: Option<PathBuf>,

    /// Type of each top-level value
    #[arg(short = 't', long = "type", requires = "schema")]
    root: Option<String>,

    /// Number of parallel jobs (default: from config)
    #[arg(short, long)]
    jobs: Option<usize>,
}

/// Arguments for the decode subcommand.
#[derive(Parser, Debug)]
struct DecodeCommand {
    /// BER file to decode
    input: PathBuf,

    /// Schema file (TOML or JSON)
    #[arg(short, long)]
    schema: PathBuf,

    /// Type of the top-level value
    #[arg(short = 't', long = "type")]
    root: String,

    /// Output file (default: standard output)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print JSON on a single line
    #[arg(long)]
    compact: bool,

    /// Overwrite an existing output file
    #[arg(short, long)]
    force: bool,
}

/// Arguments for the encode subcommand.
#[derive(Parser, Debug)]
struct EncodeCommand {
    /// JSON document to encode
    input: PathBuf,

    /// Schema file (TOML or JSON)
    #[arg(short, long)]
    schema: PathBuf,

    /// Type of the top-level value
    #[arg(short = 't', long = "type")]
    root: String,

    /// BER output file
    #[arg(short, long)]
    output: PathBuf,

    /// Leave members equal to their default out of the output
    #[arg(long)]
    omit_defaults: bool,

    /// Overwrite an existing output file
    #[arg(short, long)]
    force: bool,
}

/// Arguments for the init subcommand.
#[derive(Parser, Debug)]
struct InitCommand {
    /// Directory to initialize (default: current directory)
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Overwrite existing files
    #[arg(short, long)]
    force: bool,
}

/// Main entry point for the rsert CLI.
///
/// Errors are printed with their message rather than their debug form.
fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging, load configuration and dispatch to the command handler.
fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.no_color)?;

    let config = load_config(cli.config.as_deref())?;

    execute_command(cli.command, cli.verbose, config)
}

/// Initialize the logging system.
///
/// Records from the `log` facade used by the rser crates are forwarded to
/// the same subscriber. Everything goes to standard error so decoded
/// output on standard output stays clean.
fn init_logging(verbose: bool, no_color: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let subscriber = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .try_init()
        .map_err(|e| RsertError::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(config_path: Option<&std::path::Path>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

/// Execute the selected command.
fn execute_command(command: Commands, verbose: bool, config: Config) -> Result<()> {
    let stream = config.stream_config()?;
    match command {
        Commands::Dump(args) => run_dump(DumpArgs {
            verbose,
            input: args.input,
            stream,
        }),
        Commands::Check(args) => run_check(CheckArgs {
            verbose,
            input: args.input,
            schema: args.schema,
            root: args.root,
            jobs: args.jobs.unwrap_or(config.check.jobs),
            stream,
        }),
        Commands::Decode(args) => run_decode(DecodeArgs {
            verbose,
            input: args.input,
            schema: args.schema,
            root: args.root,
            output: args.output,
            compact: args.compact,
            force: args.force,
            stream,
        }),
        Commands::Encode(args) => run_encode(EncodeArgs {
            verbose,
            input: args.input,
            schema: args.schema,
            root: args.root,
            output: args.output,
            force: args.force,
            stream: rser_stream::StreamConfig {
                omit_defaults: stream.omit_defaults || args.omit_defaults,
                ..stream
            },
        }),
        Commands::Init(args) => run_init(InitArgs {
            verbose,
            force: args.force,
            path: args.path,
        }),
    }
}

//! CWB CLI - command-line front end for the case workbench
//!
//! Subcommands:
//! - `fill`: fill a plan summary template and write the manifest
//! - `hash`: content hash of a metadata record
//! - `seal`: metadata manifest for a validated record
//! - `validate`: check a metadata record against the schema
//! - `canonicalize`: print the canonical form of a JSON / YAML file
//! - `blank`: print a blank metadata document
//!
//! Structured inputs ending in `.yaml` / `.yml` are read as YAML, anything
//! else as JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

/// Command outcome, mapped to the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command succeeded
    Ok,
    /// Command ran but reported a failure (invalid metadata, strict fill miss)
    Failed,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Ok => Self::SUCCESS,
            Status::Failed => Self::FAILURE,
        }
    }
}

/// Case workbench command line
#[derive(Debug, Parser)]
#[command(name = "cwb")]
#[command(about = "Case workbench - label-driven template filling with provenance manifests")]
#[command(version)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fill a template from metadata and answers
    Fill(FillArgs),

    /// Print the content hash of a metadata record
    Hash(MetadataArgs),

    /// Write the metadata manifest for a record
    Seal {
        #[command(flatten)]
        metadata: MetadataArgs,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Validate a metadata record
    Validate(MetadataArgs),

    /// Print the canonical form of a JSON or YAML file
    Canonicalize {
        /// Input file
        input: PathBuf,
    },

    /// Print a blank metadata document
    Blank {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Metadata record input
#[derive(Debug, Args)]
pub struct MetadataArgs {
    /// Metadata record (JSON or YAML)
    #[arg(short, long)]
    pub metadata: PathBuf,

    /// JSON Schema to validate against instead of the built-in one
    #[arg(long)]
    pub schema: Option<PathBuf>,
}

/// Inputs and options for `fill`
#[derive(Debug, Args)]
pub struct FillArgs {
    /// Template archive
    #[arg(short, long)]
    pub template: PathBuf,

    /// Answer record (JSON or YAML)
    #[arg(short, long)]
    pub answers: PathBuf,

    #[command(flatten)]
    pub metadata: MetadataArgs,

    /// Fill configuration (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Template profile (TOML); overrides the configured profile
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Text placed before appended values
    #[arg(long)]
    pub separator: Option<String>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,

    /// File name of the filled archive
    #[arg(long)]
    pub name: Option<String>,

    /// Fail unless every field was filled
    #[arg(long)]
    pub strict: bool,
}

/// Install the tracing subscriber (`RUST_LOG`, default `info`) on stderr
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().without_time().with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(err) = result {
        eprintln!("tracing not installed: {err}");
    }
}

/// Run a parsed command line
///
/// # Errors
/// Unreadable inputs, undecodable records, and fatal fill failures
pub async fn execute(cli: Cli) -> anyhow::Result<Status> {
    match cli.command {
        Command::Fill(args) => commands::fill(args).await,
        Command::Hash(args) => commands::hash(args).await,
        Command::Seal { metadata, out } => commands::seal(metadata, out).await,
        Command::Validate(args) => commands::validate(args).await,
        Command::Canonicalize { input } => commands::canonicalize(input).await,
        Command::Blank { out } => commands::blank(out).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fill_arguments() {
        let cli = Cli::try_parse_from([
            "cwb", "fill", "-t", "t.docx", "-a", "answers.yaml", "-m", "meta.json", "--strict",
        ])
        .unwrap();
        let Command::Fill(args) = cli.command else {
            panic!("expected fill");
        };
        assert_eq!(args.template, PathBuf::from("t.docx"));
        assert_eq!(args.out, PathBuf::from("."));
        assert!(args.strict);
        assert!(args.metadata.schema.is_none());
    }

    #[test]
    fn global_log_flag() {
        let cli = Cli::try_parse_from(["cwb", "blank", "--log-json"]).unwrap();
        assert!(cli.log_json);
    }

    #[test]
    fn fill_requires_inputs() {
        assert!(Cli::try_parse_from(["cwb", "fill", "-t", "t.docx"]).is_err());
    }
}

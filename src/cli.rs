use crate::domain::{ScanConfig, TraversalBackend};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TraversalChoice {
    #[value(help = "Walker from the ignore crate")]
    Walk,
    #[value(help = "Plain std::fs::read_dir")]
    Std,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
    Tree,
}

impl From<TraversalChoice> for TraversalBackend {
    fn from(choice: TraversalChoice) -> Self {
        match choice {
            TraversalChoice::Walk => TraversalBackend::Walk,
            TraversalChoice::Std => TraversalBackend::Std,
        }
    }
}

#[derive(Parser)]
#[command(name = "bqc")]
#[command(about = "Quality control review of subject PNG/GIF images")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(
        long = "traversal",
        help = "Directory traversal backend",
        value_enum,
        default_value = "walk",
        global = true
    )]
    pub traversal: TraversalChoice,

    #[arg(
        long = "no-fallback",
        help = "Do not retry failed directories with the std backend",
        global = true
    )]
    pub no_fallback: bool,

    #[arg(short = 'q', long = "quiet", help = "Suppress progress output", global = true)]
    pub quiet: bool,

    #[arg(short = 'v', long = "verbose", help = "Enable debug logging", global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Scan a QC directory and list its subjects and images
    Scan {
        #[arg(help = "Root directory holding <subject>.gif files and png/")]
        root: PathBuf,

        #[arg(short = 'f', long = "filter", help = "Subject filter (regex, or plain text if invalid)")]
        filter: Option<String>,

        #[arg(
            long = "format",
            help = "Output format",
            value_enum,
            default_value = "text"
        )]
        output_format: OutputFormat,

        #[arg(short = 'o', long = "output", help = "Output file path (stdout if not specified)")]
        output_file: Option<PathBuf>,

        #[arg(long = "summary-only", help = "Show only totals, not the subject list")]
        summary_only: bool,
    },

    /// Review images interactively, accepting or rejecting each one
    Review {
        #[arg(help = "Root directory holding <subject>.gif files and png/")]
        root: Option<PathBuf>,

        #[arg(short = 'f', long = "filter", help = "Subject filter (regex, or plain text if invalid)")]
        filter: Option<String>,

        #[arg(short = 'c', long = "checkpoint", help = "Checkpoint file to save to")]
        checkpoint: Option<PathBuf>,

        #[arg(
            long = "resume",
            help = "Resume from the checkpoint file",
            requires = "checkpoint"
        )]
        resume: bool,
    },

    /// Write results files from a checkpoint
    Export {
        #[arg(help = "Checkpoint file")]
        checkpoint: PathBuf,

        #[arg(help = "Results file (.json is appended if missing)")]
        output: PathBuf,
    },
}

impl Cli {
    pub fn to_scan_config(&self, root: PathBuf, filter: Option<String>) -> ScanConfig {
        ScanConfig::new()
            .with_root(root)
            .with_filter(filter)
            .with_backend(self.traversal.into())
            .with_fallback(!self.no_fallback)
    }
}

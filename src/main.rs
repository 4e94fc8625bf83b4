use anyhow::{bail, Context, Result};
use bqc::adapters::{
    traversal_for, CheckpointAdapter, ConsoleOutputAdapter, CsvOutputAdapter, InteractiveReviewAdapter,
    JsonOutputAdapter, ProgressBarAdapter, StdTraversal, TreeOutputAdapter,
};
use bqc::cli::{Cli, Command, OutputFormat};
use bqc::domain::{ScanConfig, Session};
use bqc::ports::{OutputPort, ProgressPort, TraversalPort};
use bqc::services::{DirectoryIndex, ReviewSession};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;

fn init_logging(verbose: bool) {
    let env = env_logger::Env::default().filter_or("BQC_LOGGER_LEVEL", "info");
    let mut builder = env_logger::Builder::from_env(env);
    builder.format_timestamp_secs();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn build_index(
    config: &ScanConfig,
    quiet: bool,
) -> DirectoryIndex<Box<dyn TraversalPort + Send + Sync>, ProgressBarAdapter> {
    let progress = ProgressBarAdapter::new().with_quiet(quiet);
    let index = DirectoryIndex::new(traversal_for(config.backend), progress);
    if config.use_fallback {
        index.with_fallback(Box::new(StdTraversal::new()))
    } else {
        index
    }
}

fn output_for(format: &OutputFormat, output_file: Option<&Path>, summary_only: bool) -> Result<Box<dyn OutputPort>> {
    let output: Box<dyn OutputPort> = match (format, output_file) {
        (OutputFormat::Text, _) => Box::new(ConsoleOutputAdapter::new().with_summary_only(summary_only)),
        (OutputFormat::Json, Some(path)) => Box::new(JsonOutputAdapter::with_file(path)?),
        (OutputFormat::Json, None) => Box::new(JsonOutputAdapter::with_stdout()),
        (OutputFormat::Csv, Some(path)) => Box::new(CsvOutputAdapter::with_file(path)?),
        (OutputFormat::Csv, None) => Box::new(CsvOutputAdapter::with_stdout()),
        (OutputFormat::Tree, Some(path)) => Box::new(TreeOutputAdapter::with_file(path)?),
        (OutputFormat::Tree, None) => Box::new(TreeOutputAdapter::with_stdout()),
    };
    Ok(output)
}

fn start_review<T, P>(
    index: &mut DirectoryIndex<T, P>,
    config: &ScanConfig,
    resumed: Option<Session>,
) -> ReviewSession
where
    T: TraversalPort + Send + Sync,
    P: ProgressPort + Send + Sync,
{
    let images = index.scan(config).to_vec();
    match resumed {
        Some(session) => ReviewSession::resume(session, images),
        None => ReviewSession::new(config.root.clone(), images),
    }
}

fn load_checkpoint(path: &Path) -> Result<Session> {
    CheckpointAdapter::new()
        .load_checkpoint(path)
        .with_context(|| format!("Failed to load checkpoint {}", path.display()))
}

fn run(args: &Cli) -> Result<()> {
    match &args.command {
        Command::Scan {
            root,
            filter,
            output_format,
            output_file,
            summary_only,
        } => {
            let config = args.to_scan_config(root.clone(), filter.clone());
            let mut index = build_index(&config, args.quiet);
            index.scan(&config);

            let output = output_for(output_format, output_file.as_deref(), *summary_only)?;
            output.write_results(index.result())?;
        }
        Command::Review {
            root,
            filter,
            checkpoint,
            resume,
        } => {
            let resumed = match (*resume, checkpoint) {
                (true, Some(path)) => Some(load_checkpoint(path)?),
                (true, None) => bail!("--resume needs a checkpoint file"),
                (false, _) => None,
            };
            let root: PathBuf = match (root, &resumed) {
                (Some(root), _) => root.clone(),
                (None, Some(session)) => session.input_dir.clone(),
                (None, None) => bail!("A root directory is required unless resuming from a checkpoint"),
            };
            if !root.is_dir() {
                bail!("Input directory does not exist: {}", root.display());
            }

            let config = args.to_scan_config(root, filter.clone());
            let mut index = build_index(&config, args.quiet);
            let mut review = start_review(&mut index, &config, resumed);

            InteractiveReviewAdapter::new()
                .with_checkpoint_path(checkpoint.clone())
                .run(&mut index, &mut review)?;
        }
        Command::Export { checkpoint, output } => {
            let session = load_checkpoint(checkpoint)?;
            let files = CheckpointAdapter::new()
                .save_results(output, &session)
                .context("Failed to save results")?;
            println!("Results:  {}", files.results.display());
            println!("Rejected: {}", files.rejected.display());
            println!("Description: {}", files.description.display());
        }
    }

    Ok(())
}

fn main() {
    let args = Cli::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

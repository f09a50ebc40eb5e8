//! CLI tool for reconstructing customer-support conversations.
//!
//! This tool reads a TWCS-style tweet table (one CSV file or a directory of
//! CSV shards) and writes validated, structured conversations as JSONL,
//! together with a `metadata.json` summary of the run.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use twcs_threads_core::{
    run_pipeline, write_jsonl_output, CsvTweetSource, PipelineConfig, PipelineOutput,
    UserSelection, DEFAULT_MAX_BRANCH_DEPTH, DEFAULT_SEED,
};

/// Reconstruct support threads from a tweet table.
#[derive(Parser, Debug)]
#[command(name = "twcs-threads")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CSV file, or directory containing CSV files
    #[arg(long)]
    input: PathBuf,

    /// Output directory for the JSONL file
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Number of distinct inbound users to sample (-1 = all)
    #[arg(long, default_value = "-1", allow_negative_numbers = true)]
    unique_users: i64,

    /// Seed for user sampling
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Maximum tweets per reply branch
    #[arg(long, default_value_t = DEFAULT_MAX_BRANCH_DEPTH)]
    max_depth: usize,

    /// Also write skipped records to skipped.jsonl
    #[arg(long)]
    write_skipped: bool,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();
}

fn write_skipped(output: &PipelineOutput, args: &Args) -> Result<PathBuf, Box<dyn std::error::Error>> {
    use std::io::Write;

    let path = args.output_dir.join("skipped.jsonl");
    let mut file = std::io::BufWriter::new(std::fs::File::create(&path)?);
    for skip in &output.skipped {
        writeln!(file, "{}", serde_json::to_string(skip)?)?;
    }
    file.flush()?;
    Ok(path)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let args = Args::parse();

    let config = PipelineConfig {
        users: UserSelection::from_count(args.unique_users),
        seed: args.seed,
        max_depth: args.max_depth,
    };

    tracing::info!(input = ?args.input, "Loading raw data");
    let source = CsvTweetSource::new(&args.input);
    let output = run_pipeline(&source, &config)?;

    let file_stem = format!("twcs_structured_users-{}", args.unique_users);
    let conversations_path = write_jsonl_output(&output.conversations, &args.output_dir, &file_stem)?;

    let skipped_path = if args.write_skipped {
        Some(write_skipped(&output, &args)?)
    } else {
        None
    };

    let report = &output.report;
    let metadata_path = args.output_dir.join("metadata.json");
    let metadata = serde_json::json!({
        "config": {
            "input": args.input.to_string_lossy(),
            "output_dir": args.output_dir.to_string_lossy(),
            "unique_users": args.unique_users,
            "seed": args.seed,
            "max_depth": args.max_depth,
        },
        "report": report,
        "stats": {
            "avg_turns_per_conversation": if report.retained_conversations > 0 {
                report.total_turns as f64 / report.retained_conversations as f64
            } else {
                0.0
            },
        },
        "files": {
            "conversations_path": conversations_path.to_string_lossy(),
            "skipped_path": skipped_path.as_ref().map(|p| p.to_string_lossy()),
        },
    });
    std::fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)?)?;

    println!("\n[summary]");
    println!("  Tweets loaded: {}", report.total_tweets);
    println!("  Rows rejected: {}", report.rows_rejected);
    println!("  Users selected: {}", report.selected_users);
    println!("  Conversations extracted: {}", report.extracted_conversations);
    println!("  Subsets removed: {}", report.subsets_removed);
    println!("  Dropped by validation: {}", report.dropped.values().sum::<usize>());
    println!("  Skipped while structuring: {}", output.skipped.len());
    println!("  Conversations retained: {}", report.retained_conversations);
    println!("  Output: {:?}", conversations_path);
    println!("  Metadata: {:?}", metadata_path);

    Ok(())
}

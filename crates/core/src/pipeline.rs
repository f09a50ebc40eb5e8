//! Pipeline for turning a tweet table into structured conversations.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::conversation::ConversationRecord;
use crate::dedup::remove_subsets;
use crate::error::{PipelineError, Result};
use crate::helpers::normalize_records;
use crate::sampler::{sample_users, UserSelection};
use crate::structure::{structure_records, SkippedRecord};
use crate::thread::{ThreadBuilder, ThreadBuilderConfig, TraversalStats};
use crate::tweet::{
    parse_tweet_id, ResponsePointers, TweetBatch, TweetRecord, TweetTable, NO_TWEET,
};
use crate::validate::{retain_valid, DropReason};
use crate::{TweetSource, DEFAULT_MAX_BRANCH_DEPTH, DEFAULT_SEED};

/// A row from the support-table CSV file.
#[derive(Debug, Deserialize)]
struct CsvRow {
    tweet_id: String,
    author_id: String,
    inbound: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    response_tweet_id: Option<String>,
    #[serde(default)]
    in_response_to_tweet_id: Option<String>,
}

fn parse_inbound(raw: &str) -> Option<bool> {
    match raw.trim() {
        "True" | "true" | "TRUE" | "1" => Some(true),
        "False" | "false" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}

impl CsvRow {
    fn into_record(self, line: u64) -> Result<TweetRecord> {
        let invalid = |reason: String| PipelineError::InvalidRow { line, reason };

        let id = parse_tweet_id(&self.tweet_id)
            .ok_or_else(|| invalid(format!("bad tweet_id {:?}", self.tweet_id)))?;
        let is_inbound = parse_inbound(&self.inbound)
            .ok_or_else(|| invalid(format!("bad inbound flag {:?}", self.inbound)))?;
        let in_response_to = match self.in_response_to_tweet_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match parse_tweet_id(raw) {
                Some(NO_TWEET) => None,
                Some(parent) => Some(parent),
                None => return Err(invalid(format!("bad in_response_to_tweet_id {:?}", raw))),
            },
        };

        Ok(TweetRecord {
            id,
            author_id: self.author_id,
            is_inbound,
            text: self.text.unwrap_or_default(),
            in_response_to,
            responses: ResponsePointers::parse(self.response_tweet_id.as_deref()),
        })
    }
}

/// Discover all CSV files in a directory.
pub fn discover_csv_files(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "csv"))
        .map(|e| e.path().to_path_buf())
        .collect();
    paths.sort();
    paths
}

/// Load every readable row of a single CSV file.
///
/// Rows with unreadable fields are skipped with a warning and counted in
/// `rows_rejected`. Only I/O failures abort the load.
pub fn load_tweets_csv(csv_path: &Path) -> Result<TweetBatch> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut batch = TweetBatch::default();

    for (idx, result) in reader.deserialize::<CsvRow>().enumerate() {
        // Line 1 is the header
        let line = idx as u64 + 2;
        let record = match result {
            Ok(row) => row.into_record(line),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => Err(PipelineError::InvalidRow {
                line,
                reason: e.to_string(),
            }),
        };

        match record {
            Ok(tweet) => batch.tweets.push(tweet),
            Err(e) => {
                warn!(path = %csv_path.display(), error = %e, "Skipping row");
                batch.rows_rejected += 1;
            }
        }
    }

    if batch.rows_rejected > 0 {
        warn!(
            path = %csv_path.display(),
            rejected = batch.rows_rejected,
            "Some rows failed to load"
        );
    }
    info!(path = %csv_path.display(), rows = batch.tweets.len(), "Loaded raw data");
    Ok(batch)
}

/// Reads the raw table from a CSV file or from every CSV file under a directory.
#[derive(Debug, Clone)]
pub struct CsvTweetSource {
    path: PathBuf,
}

impl CsvTweetSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TweetSource for CsvTweetSource {
    fn load_tweets(&self) -> Result<TweetBatch> {
        if self.path.is_file() {
            return load_tweets_csv(&self.path);
        }

        let csv_files = discover_csv_files(&self.path);
        if csv_files.is_empty() {
            return Err(PipelineError::NoInputFiles(self.path.clone()));
        }

        let mut batch = TweetBatch::default();
        for csv_path in csv_files {
            let part = load_tweets_csv(&csv_path)?;
            batch.tweets.extend(part.tweets);
            batch.rows_rejected += part.rows_rejected;
        }
        Ok(batch)
    }
}

/// Configuration for the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    pub users: UserSelection,
    pub seed: u64,
    pub max_depth: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            users: UserSelection::All,
            seed: DEFAULT_SEED,
            max_depth: DEFAULT_MAX_BRANCH_DEPTH,
        }
    }
}

/// Aggregate counts for a pipeline run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PipelineReport {
    pub total_tweets: usize,
    /// Input rows left out at load time.
    pub rows_rejected: usize,
    pub selected_users: usize,
    pub traversal: TraversalStats,
    pub extracted_conversations: usize,
    pub subsets_removed: usize,
    pub dropped: BTreeMap<DropReason, usize>,
    pub skipped: BTreeMap<&'static str, usize>,
    pub retained_conversations: usize,
    pub total_turns: usize,
}

/// Result of a pipeline run.
#[derive(Debug)]
pub struct PipelineOutput {
    pub conversations: Vec<ConversationRecord>,
    pub skipped: Vec<SkippedRecord>,
    pub report: PipelineReport,
}

/// Run every stage over an already loaded table.
pub fn process_table(table: &TweetTable, config: &PipelineConfig) -> PipelineOutput {
    info!("Starting conversation pipeline");
    let mut report = PipelineReport {
        total_tweets: table.len(),
        ..Default::default()
    };

    let users = sample_users(table, config.users, config.seed);
    report.selected_users = users.len();
    info!(users = users.len(), "Selected inbound users");

    let builder = ThreadBuilder::new(
        table,
        ThreadBuilderConfig {
            max_depth: config.max_depth,
        },
    );
    let harvest = builder.build_all(&users);
    report.traversal = harvest.stats;
    report.extracted_conversations = harvest.records.len();

    let (mut records, removed) = remove_subsets(harvest.records);
    report.subsets_removed = removed;

    normalize_records(&mut records);

    let (records, dropped) = retain_valid(records);
    report.dropped = dropped;

    let (conversations, skipped) = structure_records(records);
    for skip in &skipped {
        *report.skipped.entry(skip.kind).or_insert(0) += 1;
    }

    report.retained_conversations = conversations.len();
    report.total_turns = conversations.iter().map(|c| c.turns.len()).sum();
    info!(
        retained = report.retained_conversations,
        "Finished conversation pipeline"
    );

    PipelineOutput {
        conversations,
        skipped,
        report,
    }
}

/// Load the table from `source` and run every stage.
pub fn run_pipeline<S>(source: &S, config: &PipelineConfig) -> Result<PipelineOutput>
where
    S: TweetSource,
{
    let batch = source.load_tweets()?;
    let table = TweetTable::new(batch.tweets);
    let mut output = process_table(&table, config);
    output.report.rows_rejected = batch.rows_rejected;
    Ok(output)
}

/// Write conversations to `<output_dir>/<file_stem>.jsonl`, one record per line.
pub fn write_jsonl_output(
    conversations: &[ConversationRecord],
    output_dir: &Path,
    file_stem: &str,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join(format!("{}.jsonl", file_stem));
    let mut file = BufWriter::new(File::create(&path)?);

    for conv in conversations {
        let json_line = serde_json::to_string(conv)?;
        writeln!(file, "{}", json_line)?;
    }
    file.flush()?;

    info!(path = %path.display(), conversations = conversations.len(), "Saved conversations");
    Ok(path)
}

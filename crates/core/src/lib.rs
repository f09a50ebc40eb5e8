//! Core reconstruction logic for customer-support tweet threads.
//!
//! This crate turns a flat table of tweets with reply pointers into
//! de-duplicated, role-tagged conversations. The stages run in order:
//! user sampling, reply-graph traversal, subset deduplication, text cleanup,
//! validation and turn structuring. [`pipeline::process_table`] runs them all.

/// Trait for loading the raw tweet table.
///
/// Implementors provide the rows in table order. The engine never reads
/// files itself; the CSV loader is one implementation, an in-memory `Vec`
/// is another. Unreadable rows are left out and counted, not fatal.
pub trait TweetSource {
    /// Load every readable row of the table.
    fn load_tweets(&self) -> error::Result<TweetBatch>;
}

// Blanket implementation for references to TweetSources
impl<T: TweetSource + ?Sized> TweetSource for &T {
    fn load_tweets(&self) -> error::Result<TweetBatch> {
        (*self).load_tweets()
    }
}

impl TweetSource for Vec<TweetRecord> {
    fn load_tweets(&self) -> error::Result<TweetBatch> {
        Ok(TweetBatch::from(self.clone()))
    }
}

mod conversation;
mod dedup;
pub mod error;
mod helpers;
pub mod pipeline;
mod sampler;
mod structure;
mod thread;
mod tweet;
mod validate;

pub use conversation::{customer_query, ConversationRecord, Role, Turn};
pub use dedup::{find_subsets, remove_subsets};
pub use error::PipelineError;
pub use helpers::{clean_transcript, normalize_records};
pub use pipeline::{
    discover_csv_files, load_tweets_csv, process_table, run_pipeline, write_jsonl_output,
    CsvTweetSource, PipelineConfig, PipelineOutput, PipelineReport,
};
pub use sampler::{inbound_authors, sample_users, UserSelection};
pub use structure::{
    marker_offsets, pair_markers, structure_records, structure_transcript, SkippedRecord,
    StructuringError,
};
pub use thread::{ThreadBuilder, ThreadBuilderConfig, ThreadHarvest, TraversalStats};
pub use tweet::{
    parse_tweet_id, ResponsePointers, TweetBatch, TweetId, TweetRecord, TweetTable, NO_TWEET,
};
pub use validate::{retain_valid, validate, DropReason};

/// Marker word prefixing customer lines.
pub const CUSTOMER_MARKER: &str = "Customer";

/// Marker word prefixing company lines.
pub const COMPANY_MARKER: &str = "Company";

/// Default bound on tweets per branch
pub const DEFAULT_MAX_BRANCH_DEPTH: usize = 1024;

/// Default sampling seed
pub const DEFAULT_SEED: u64 = 42;

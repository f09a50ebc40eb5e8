//! Reply-graph traversal that turns root tweets into linear transcripts.
//!
//! Each root fans out into one transcript per terminal branch. A branch ends
//! at a leaf tweet, a malformed pointer cell, a dangling id, a repeated id
//! (cycle) or the configured depth bound. None of these are errors; they are
//! counted in [`TraversalStats`].

use std::collections::HashSet;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::conversation::{ConversationRecord, Role};
use crate::tweet::{ResponsePointers, TweetId, TweetRecord, TweetTable};
use crate::DEFAULT_MAX_BRANCH_DEPTH;

#[derive(Debug, Clone, Copy)]
pub struct ThreadBuilderConfig {
    /// Maximum number of tweets in a single branch, root included.
    pub max_depth: usize,
}

impl Default for ThreadBuilderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_BRANCH_DEPTH,
        }
    }
}

/// Counters for everything the traversal recovered from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TraversalStats {
    pub roots: usize,
    pub branches: usize,
    pub malformed_pointers: usize,
    pub dangling_references: usize,
    pub cycles: usize,
    pub depth_limited: usize,
}

impl TraversalStats {
    pub fn merge(&mut self, other: &TraversalStats) {
        self.roots += other.roots;
        self.branches += other.branches;
        self.malformed_pointers += other.malformed_pointers;
        self.dangling_references += other.dangling_references;
        self.cycles += other.cycles;
        self.depth_limited += other.depth_limited;
    }
}

/// Records produced by a traversal together with its counters.
#[derive(Debug, Default)]
pub struct ThreadHarvest {
    pub records: Vec<ConversationRecord>,
    pub stats: TraversalStats,
}

impl ThreadHarvest {
    fn append(&mut self, mut other: ThreadHarvest) {
        self.records.append(&mut other.records);
        self.stats.merge(&other.stats);
    }
}

/// A partially walked path from a root.
#[derive(Debug, Clone)]
struct Branch {
    tip: TweetId,
    transcript: String,
    company: Option<String>,
    visited: HashSet<TweetId>,
    depth: usize,
}

impl Branch {
    fn root(tweet: &TweetRecord) -> Self {
        Self {
            tip: tweet.id,
            transcript: Role::Customer.line(&tweet.text),
            company: None,
            visited: HashSet::from([tweet.id]),
            depth: 1,
        }
    }

    fn extend(&self, tweet: &TweetRecord) -> Self {
        let role = Role::for_tweet(tweet.is_inbound);
        let transcript = format!("{}\n{}", self.transcript, role.line(&tweet.text));

        let company = match (&self.company, role) {
            (None, Role::Company) => Some(tweet.author_id.clone()),
            (existing, _) => existing.clone(),
        };

        let mut visited = self.visited.clone();
        visited.insert(tweet.id);

        Self {
            tip: tweet.id,
            transcript,
            company,
            visited,
            depth: self.depth + 1,
        }
    }
}

/// Work item on the traversal stack.
enum Step {
    Expand(Branch),
    /// The branch is terminal; emit it as-is.
    Emit(Branch),
}

/// Walks reply pointers over a shared, read-only [`TweetTable`].
pub struct ThreadBuilder<'a> {
    table: &'a TweetTable,
    config: ThreadBuilderConfig,
}

impl<'a> ThreadBuilder<'a> {
    pub fn new(table: &'a TweetTable, config: ThreadBuilderConfig) -> Self {
        Self { table, config }
    }

    /// Reconstruct every branch for every root tweet written by `user_id`.
    pub fn build_for_user(&self, user_id: &str) -> ThreadHarvest {
        let mut harvest = ThreadHarvest::default();
        for root in self.table.roots_by(user_id) {
            harvest.stats.roots += 1;
            self.walk_root(user_id, root, &mut harvest);
        }
        harvest
    }

    /// Reconstruct threads for many users in parallel.
    ///
    /// Output order follows `users`, then root order, then depth-first branch
    /// order, regardless of how rayon schedules the work.
    pub fn build_all(&self, users: &[String]) -> ThreadHarvest {
        let per_user: Vec<ThreadHarvest> = users
            .par_iter()
            .map(|user| self.build_for_user(user))
            .collect();

        let mut harvest = ThreadHarvest::default();
        for part in per_user {
            harvest.append(part);
        }

        info!(
            users = users.len(),
            roots = harvest.stats.roots,
            branches = harvest.stats.branches,
            malformed = harvest.stats.malformed_pointers,
            dangling = harvest.stats.dangling_references,
            cycles = harvest.stats.cycles,
            depth_limited = harvest.stats.depth_limited,
            "Extracted conversations"
        );
        harvest
    }

    fn walk_root(&self, user_id: &str, root: &TweetRecord, harvest: &mut ThreadHarvest) {
        let mut stack = vec![Step::Expand(Branch::root(root))];

        while let Some(step) = stack.pop() {
            let branch = match step {
                Step::Emit(branch) => {
                    Self::emit(user_id, branch, harvest);
                    continue;
                }
                Step::Expand(branch) => branch,
            };

            // The root is already in hand; a lookup by id could land on an
            // earlier row sharing its id.
            let tip = if branch.depth == 1 {
                Some(root)
            } else {
                self.table.get(branch.tip)
            };
            let Some(tweet) = tip else {
                Self::emit(user_id, branch, harvest);
                continue;
            };

            let ids = match &tweet.responses {
                ResponsePointers::Ids(ids) => ids,
                ResponsePointers::Malformed(raw) => {
                    debug!(tweet_id = tweet.id, raw = %raw, "Unparseable response ids, ending branch");
                    harvest.stats.malformed_pointers += 1;
                    Self::emit(user_id, branch, harvest);
                    continue;
                }
            };

            if ids.is_empty() {
                Self::emit(user_id, branch, harvest);
                continue;
            }

            if branch.depth >= self.config.max_depth {
                debug!(tweet_id = tweet.id, depth = branch.depth, "Branch depth limit reached");
                harvest.stats.depth_limited += 1;
                Self::emit(user_id, branch, harvest);
                continue;
            }

            let mut children = Vec::with_capacity(ids.len());
            for &id in ids {
                if branch.visited.contains(&id) {
                    debug!(tweet_id = tweet.id, repeated = id, "Reply cycle detected");
                    harvest.stats.cycles += 1;
                    children.push(Step::Emit(branch.clone()));
                    continue;
                }
                match self.table.get(id) {
                    Some(next) => children.push(Step::Expand(branch.extend(next))),
                    None => {
                        debug!(tweet_id = tweet.id, missing = id, "Dangling response id");
                        harvest.stats.dangling_references += 1;
                        children.push(Step::Emit(branch.clone()));
                    }
                }
            }

            // Reverse so the first response is expanded first
            stack.extend(children.into_iter().rev());
        }
    }

    fn emit(user_id: &str, branch: Branch, harvest: &mut ThreadHarvest) {
        harvest.stats.branches += 1;
        harvest.records.push(ConversationRecord::new(
            user_id,
            branch.company,
            branch.transcript,
        ));
    }
}

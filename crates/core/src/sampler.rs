//! Deterministic selection of inbound (customer) authors.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::tweet::TweetTable;

/// How many distinct customers to process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum UserSelection {
    #[default]
    All,
    Count(usize),
}

impl UserSelection {
    /// Map the command-line convention where any negative count means "all".
    pub fn from_count(count: i64) -> Self {
        if count < 0 {
            UserSelection::All
        } else {
            UserSelection::Count(count as usize)
        }
    }
}

/// Distinct inbound author ids in order of first appearance.
pub fn inbound_authors(table: &TweetTable) -> Vec<String> {
    let mut seen = HashSet::new();
    table
        .rows()
        .iter()
        .filter(|row| row.is_inbound)
        .filter(|row| seen.insert(row.author_id.as_str()))
        .map(|row| row.author_id.clone())
        .collect()
}

/// Select customers to process.
///
/// The same `seed` over the same table always yields the same users. Selected
/// users are returned in first-appearance order.
pub fn sample_users(table: &TweetTable, selection: UserSelection, seed: u64) -> Vec<String> {
    let pool = inbound_authors(table);

    let k = match selection {
        UserSelection::Count(k) if k < pool.len() => k,
        _ => return pool,
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = rand::seq::index::sample(&mut rng, pool.len(), k).into_vec();
    picked.sort_unstable();

    picked.into_iter().map(|idx| pool[idx].clone()).collect()
}

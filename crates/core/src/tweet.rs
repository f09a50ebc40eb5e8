//! Tweet rows and the read-only lookup table the traversal walks.

use std::collections::HashMap;

use serde::Serialize;

/// Tweet identifier as found in the raw table.
pub type TweetId = i64;

/// Sentinel used by the raw table for "no tweet".
pub const NO_TWEET: TweetId = -1;

/// Parse a single id cell. Accepts `123` and the float-rendered `123.0`.
pub fn parse_tweet_id(raw: &str) -> Option<TweetId> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<TweetId>() {
        return Some(id);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Some(f as TweetId),
        _ => None,
    }
}

/// Parsed form of the `response_tweet_id` cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ResponsePointers {
    /// Ordered reply ids. Empty for leaf tweets.
    Ids(Vec<TweetId>),
    /// The cell could not be read as ids; the raw value is kept for diagnostics.
    Malformed(String),
}

impl ResponsePointers {
    pub fn none() -> Self {
        ResponsePointers::Ids(Vec::new())
    }

    /// Parse a single id or a comma-separated id list.
    ///
    /// Absent, empty and `-1` cells mean "no responses". A cell where any
    /// element fails to parse is malformed as a whole.
    pub fn parse(raw: Option<&str>) -> Self {
        let raw = match raw.map(str::trim) {
            None | Some("") => return Self::none(),
            Some(r) => r,
        };

        let mut ids = Vec::new();
        for part in raw.split(',') {
            match parse_tweet_id(part) {
                Some(NO_TWEET) => {}
                Some(id) => ids.push(id),
                None => return ResponsePointers::Malformed(raw.to_string()),
            }
        }
        ResponsePointers::Ids(ids)
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, ResponsePointers::Malformed(_))
    }
}

impl From<Vec<TweetId>> for ResponsePointers {
    fn from(ids: Vec<TweetId>) -> Self {
        ResponsePointers::Ids(ids)
    }
}

/// One row of the raw support table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TweetRecord {
    pub id: TweetId,
    pub author_id: String,
    /// True when a customer wrote the tweet.
    pub is_inbound: bool,
    pub text: String,
    /// `None` for root tweets.
    pub in_response_to: Option<TweetId>,
    pub responses: ResponsePointers,
}

impl TweetRecord {
    pub fn is_root(&self) -> bool {
        self.in_response_to.is_none()
    }
}

/// Rows handed over by a [`TweetSource`](crate::TweetSource).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TweetBatch {
    pub tweets: Vec<TweetRecord>,
    /// Input rows that could not be read and were left out.
    pub rows_rejected: usize,
}

impl From<Vec<TweetRecord>> for TweetBatch {
    fn from(tweets: Vec<TweetRecord>) -> Self {
        Self {
            tweets,
            rows_rejected: 0,
        }
    }
}

/// Read-only arena of tweets indexed by id.
///
/// Rows keep their input order. When an id occurs more than once the first
/// row wins.
#[derive(Debug, Default)]
pub struct TweetTable {
    rows: Vec<TweetRecord>,
    by_id: HashMap<TweetId, usize>,
}

impl TweetTable {
    pub fn new(rows: Vec<TweetRecord>) -> Self {
        let mut by_id = HashMap::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            by_id.entry(row.id).or_insert(idx);
        }
        Self { rows, by_id }
    }

    pub fn get(&self, id: TweetId) -> Option<&TweetRecord> {
        self.by_id.get(&id).map(|&idx| &self.rows[idx])
    }

    pub fn rows(&self) -> &[TweetRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Root tweets written by `author_id`, in table order.
    pub fn roots_by<'a>(&'a self, author_id: &'a str) -> impl Iterator<Item = &'a TweetRecord> + 'a {
        self.rows
            .iter()
            .filter(move |row| row.author_id == author_id && row.is_root())
    }
}

impl FromIterator<TweetRecord> for TweetTable {
    fn from_iter<I: IntoIterator<Item = TweetRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

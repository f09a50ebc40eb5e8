//! Removal of transcripts wholly contained in a sibling transcript.
//!
//! Fan-out in the thread builder emits every branch of a root separately,
//! so a short branch often repeats the prefix of a longer one. Records are
//! grouped by `(user_id, company_name)` and compared pairwise within each
//! group.

use std::collections::{BTreeSet, HashMap};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::conversation::ConversationRecord;

/// Group key. A missing company is still a key of its own.
type GroupKey<'a> = (&'a str, Option<&'a str>);

fn group_indices(records: &[ConversationRecord]) -> Vec<Vec<usize>> {
    let mut order: Vec<GroupKey<'_>> = Vec::new();
    let mut groups: HashMap<GroupKey<'_>, Vec<usize>> = HashMap::new();

    for (idx, record) in records.iter().enumerate() {
        let key = (record.user_id.as_str(), record.company_name.as_deref());
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(idx);
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .collect()
}

/// Whether member `i` of a group is redundant given member `j`.
///
/// Identical transcripts are each other's subset; only the later copy is
/// redundant so exactly one survives.
fn is_redundant(records: &[ConversationRecord], i: usize, j: usize) -> bool {
    let a = records[i].raw_transcript.as_str();
    let b = records[j].raw_transcript.as_str();
    if a.len() == b.len() {
        a == b && j < i
    } else {
        a.len() < b.len() && b.contains(a)
    }
}

/// Indices (into `records`) of transcripts that are subsets of a sibling.
pub fn find_subsets(records: &[ConversationRecord]) -> BTreeSet<usize> {
    group_indices(records)
        .into_par_iter()
        .flat_map_iter(|members| {
            members
                .iter()
                .copied()
                .filter(|&i| members.iter().any(|&j| i != j && is_redundant(records, i, j)))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Drop subset transcripts, keeping survivors in input order.
///
/// Returns the survivors and the number of records removed. Running this on
/// its own output removes nothing.
pub fn remove_subsets(records: Vec<ConversationRecord>) -> (Vec<ConversationRecord>, usize) {
    let marked = find_subsets(&records);
    let removed = marked.len();

    let kept: Vec<ConversationRecord> = records
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| !marked.contains(idx))
        .map(|(_, record)| record)
        .collect();

    debug!(removed, "Subset scan complete");
    info!(kept = kept.len(), removed, "Removed subset conversations");
    (kept, removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user: &str, company: Option<&str>, transcript: &str) -> ConversationRecord {
        ConversationRecord::new(user, company.map(str::to_string), transcript)
    }

    #[test]
    fn test_prefix_branch_is_removed() {
        let records = vec![
            record("u1", Some("Acme"), "Customer: Hi\nCompany: Hello"),
            record("u1", Some("Acme"), "Customer: Hi\nCompany: Hello\nCustomer: Thanks"),
        ];
        let (kept, removed) = remove_subsets(records);
        assert_eq!(removed, 1);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].raw_transcript, "Customer: Hi\nCompany: Hello\nCustomer: Thanks");
    }

    #[test]
    fn test_groups_are_separate() {
        let records = vec![
            record("u1", Some("Acme"), "Customer: Hi"),
            record("u2", Some("Acme"), "Customer: Hi\nCompany: Hello"),
            record("u1", Some("Globex"), "Customer: Hi\nCompany: Hello"),
        ];
        assert!(find_subsets(&records).is_empty());
    }

    #[test]
    fn test_missing_company_is_its_own_group() {
        let records = vec![
            record("u1", None, "Customer: Hi"),
            record("u1", None, "Customer: Hi\nCustomer: anyone?"),
            record("u1", Some("Acme"), "Customer: Hi\nCompany: Hello"),
        ];
        let marked = find_subsets(&records);
        assert_eq!(marked.into_iter().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_identical_transcripts_keep_first() {
        let records = vec![
            record("u1", Some("Acme"), "Customer: Hi\nCompany: Hello"),
            record("u1", Some("Acme"), "Customer: Other\nCompany: Reply"),
            record("u1", Some("Acme"), "Customer: Hi\nCompany: Hello"),
        ];
        let marked = find_subsets(&records);
        assert_eq!(marked.into_iter().collect::<Vec<_>>(), vec![2]);

        let (kept, removed) = remove_subsets(records);
        assert_eq!(removed, 1);
        assert_eq!(kept[0].raw_transcript, "Customer: Hi\nCompany: Hello");
        assert_eq!(kept[1].raw_transcript, "Customer: Other\nCompany: Reply");
    }

    #[test]
    fn test_chain_of_subsets() {
        let records = vec![
            record("u1", Some("Acme"), "Customer: Hi"),
            record("u1", Some("Acme"), "Customer: Hi\nCompany: Hello\nCustomer: Thanks"),
            record("u1", Some("Acme"), "Customer: Hi\nCompany: Hello"),
        ];
        let (kept, removed) = remove_subsets(records);
        assert_eq!(removed, 2);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].line_count(), 3);
    }

    #[test]
    fn test_idempotent() {
        let records = vec![
            record("u1", Some("Acme"), "Customer: Hi"),
            record("u1", Some("Acme"), "Customer: Hi\nCompany: Hello"),
            record("u1", Some("Acme"), "Customer: Hi\nCompany: Hello"),
            record("u1", Some("Acme"), "Customer: Hi\nCompany: Try again"),
            record("u1", None, "Customer: Hi"),
            record("u2", Some("Acme"), "Customer: Hi\nCompany: Hello"),
        ];
        let (once, _) = remove_subsets(records);
        let (twice, removed_again) = remove_subsets(once.clone());
        assert_eq!(removed_again, 0);
        assert_eq!(once, twice);
    }
}

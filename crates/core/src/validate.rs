//! Gatekeeping before structuring.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::conversation::ConversationRecord;
use crate::{COMPANY_MARKER, CUSTOMER_MARKER};

/// Why a record was dropped. Dropped records are not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Text cleanup never ran on the record.
    NotNormalized,
    MissingCustomerTurn,
    MissingCompanyTurn,
    /// No company tweet was seen on the branch.
    UnresolvedCompany,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DropReason::NotNormalized => "transcript was not cleaned",
            DropReason::MissingCustomerTurn => "no customer turn",
            DropReason::MissingCompanyTurn => "no company turn",
            DropReason::UnresolvedCompany => "company not resolved",
        };
        f.write_str(s)
    }
}

/// Check that a cleaned record has a company and both roles.
///
/// Checks run in that order, so an unanswered thread reports
/// [`DropReason::UnresolvedCompany`].
pub fn validate(record: &ConversationRecord) -> Result<(), DropReason> {
    let cleaned = record
        .cleaned_transcript
        .as_deref()
        .ok_or(DropReason::NotNormalized)?;

    if record.company_name.is_none() {
        return Err(DropReason::UnresolvedCompany);
    }
    if !cleaned.contains(CUSTOMER_MARKER) {
        return Err(DropReason::MissingCustomerTurn);
    }
    if !cleaned.contains(COMPANY_MARKER) {
        return Err(DropReason::MissingCompanyTurn);
    }
    Ok(())
}

/// Keep records that pass [`validate`], counting the rest by reason.
pub fn retain_valid(
    records: Vec<ConversationRecord>,
) -> (Vec<ConversationRecord>, BTreeMap<DropReason, usize>) {
    let mut dropped: BTreeMap<DropReason, usize> = BTreeMap::new();
    let mut kept = Vec::with_capacity(records.len());

    for record in records {
        match validate(&record) {
            Ok(()) => kept.push(record),
            Err(reason) => {
                debug!(user_id = %record.user_id, %reason, "Dropping conversation");
                *dropped.entry(reason).or_insert(0) += 1;
            }
        }
    }

    info!(
        kept = kept.len(),
        dropped = dropped.values().sum::<usize>(),
        "Validated structure"
    );
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaned(company: Option<&str>, text: &str) -> ConversationRecord {
        let mut record = ConversationRecord::new("u1", company.map(str::to_string), text);
        record.cleaned_transcript = Some(text.to_string());
        record
    }

    #[test]
    fn test_valid_record() {
        assert_eq!(validate(&cleaned(Some("Acme"), "Customer Hi\nCompany Hello")), Ok(()));
    }

    #[test]
    fn test_drop_reasons() {
        assert_eq!(
            validate(&cleaned(Some("Acme"), "Company Hello")),
            Err(DropReason::MissingCustomerTurn)
        );
        assert_eq!(
            validate(&cleaned(Some("Acme"), "Customer Hi")),
            Err(DropReason::MissingCompanyTurn)
        );
        assert_eq!(
            validate(&cleaned(None, "Customer Hi\nCompany Hello")),
            Err(DropReason::UnresolvedCompany)
        );
        assert_eq!(validate(&cleaned(None, "Customer Hi")), Err(DropReason::UnresolvedCompany));
        let raw_only = ConversationRecord::new("u1", Some("Acme".into()), "Customer: Hi\nCompany: Hello");
        assert_eq!(validate(&raw_only), Err(DropReason::NotNormalized));
    }

    #[test]
    fn test_retain_valid_counts() {
        let records = vec![
            cleaned(Some("Acme"), "Customer Hi\nCompany Hello"),
            cleaned(None, "Customer Hi"),
            cleaned(None, "Customer Hi\nCompany Hello"),
            cleaned(Some("Acme"), "Customer Hi\nCompany Hello again"),
        ];
        let (kept, dropped) = retain_valid(records);
        assert_eq!(kept.len(), 2);
        assert_eq!(dropped.get(&DropReason::UnresolvedCompany), Some(&2));
        assert_eq!(dropped.get(&DropReason::MissingCompanyTurn), None);
        assert!(kept.iter().all(|r| r.company_name.is_some()));
    }
}

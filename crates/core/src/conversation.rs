//! Conversation records and role-tagged turns.

use std::fmt;

use serde::Serialize;

use crate::{COMPANY_MARKER, CUSTOMER_MARKER};

/// Who wrote a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Role {
    Customer,
    Company,
}

impl Role {
    /// Role for a tweet, from its `inbound` flag.
    pub fn for_tweet(is_inbound: bool) -> Self {
        if is_inbound {
            Role::Customer
        } else {
            Role::Company
        }
    }

    /// Literal marker word that prefixes this role's lines.
    pub fn marker(self) -> &'static str {
        match self {
            Role::Customer => CUSTOMER_MARKER,
            Role::Company => COMPANY_MARKER,
        }
    }

    /// Prefixed transcript line, e.g. `Customer: my order is late`.
    pub fn line(self, text: &str) -> String {
        format!("{}: {}", self.marker(), text)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// A single role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub message: String,
}

impl Turn {
    pub fn customer(message: impl Into<String>) -> Self {
        Self {
            role: Role::Customer,
            message: message.into(),
        }
    }

    pub fn company(message: impl Into<String>) -> Self {
        Self {
            role: Role::Company,
            message: message.into(),
        }
    }
}

/// Wrap a bare customer message as a one-turn conversation.
///
/// Query-side consumers use this to present an incoming question in the same
/// shape as the reconstructed threads.
pub fn customer_query(input: &str) -> Vec<Turn> {
    vec![Turn::customer(input.trim())]
}

/// One reconstructed thread as it moves through the stages.
///
/// `raw_transcript` is set by the thread builder. `cleaned_transcript` is
/// filled by normalization and `turns` by structuring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationRecord {
    pub user_id: String,
    pub company_name: Option<String>,
    pub raw_transcript: String,
    pub cleaned_transcript: Option<String>,
    pub turns: Vec<Turn>,
}

impl ConversationRecord {
    pub fn new(
        user_id: impl Into<String>,
        company_name: Option<String>,
        raw_transcript: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            company_name,
            raw_transcript: raw_transcript.into(),
            cleaned_transcript: None,
            turns: Vec::new(),
        }
    }

    /// Number of transcript lines (one per tweet visited).
    pub fn line_count(&self) -> usize {
        self.raw_transcript.lines().count()
    }

    /// True when turns start with a customer and strictly alternate.
    pub fn turns_alternate(&self) -> bool {
        !self.turns.is_empty()
            && self.turns.iter().enumerate().all(|(i, turn)| {
                let expected = if i % 2 == 0 { Role::Customer } else { Role::Company };
                turn.role == expected
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_lines() {
        assert_eq!(Role::Customer.line("Hi"), "Customer: Hi");
        assert_eq!(Role::Company.line("Hello"), "Company: Hello");
        assert_eq!(Role::for_tweet(true), Role::Customer);
        assert_eq!(Role::for_tweet(false), Role::Company);
    }

    #[test]
    fn test_customer_query() {
        let turns = customer_query("  where is my parcel  ");
        assert_eq!(turns, vec![Turn::customer("where is my parcel")]);
    }

    #[test]
    fn test_turns_alternate() {
        let mut record = ConversationRecord::new("u1", Some("AppleSupport".into()), "Customer: Hi");
        assert!(!record.turns_alternate());

        record.turns = vec![Turn::customer("Hi"), Turn::company("Hello"), Turn::customer("Thanks")];
        assert!(record.turns_alternate());

        record.turns = vec![Turn::customer("Hi"), Turn::customer("again")];
        assert!(!record.turns_alternate());
    }

    #[test]
    fn test_record_serializes_roles_as_names() {
        let mut record = ConversationRecord::new("u1", Some("Acme".into()), "Customer: Hi\nCompany: Hello");
        record.turns = vec![Turn::customer("Hi"), Turn::company("Hello")];
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["turns"][0]["role"], "Customer");
        assert_eq!(json["turns"][1]["message"], "Hello");
        assert_eq!(record.line_count(), 2);
    }
}

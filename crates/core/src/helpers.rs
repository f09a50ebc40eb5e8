//! Helper functions for transcript text cleanup.

use regex::Regex;
use std::sync::LazyLock;

use tracing::info;

use crate::conversation::ConversationRecord;

static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@\w+").unwrap());
static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"http\S+|www\S+").unwrap());
// Newlines are whitespace, so turn boundaries survive.
static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());
static INLINE_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

/// Clean a transcript for structuring.
///
/// In order: drop `@mentions`, drop URL-like tokens, drop everything that is
/// not a word character or whitespace, squeeze runs of spaces and tabs, trim.
/// Role marker words are plain word characters and pass through unchanged;
/// only the colon after them is removed.
pub fn clean_transcript(text: &str) -> String {
    let s = MENTION_RE.replace_all(text, "");
    let s = URL_RE.replace_all(&s, "");
    let s = NON_WORD_RE.replace_all(&s, "");
    let s = INLINE_SPACE_RE.replace_all(&s, " ");
    s.trim().to_string()
}

/// Fill `cleaned_transcript` on every record.
pub fn normalize_records(records: &mut [ConversationRecord]) {
    for record in records.iter_mut() {
        record.cleaned_transcript = Some(clean_transcript(&record.raw_transcript));
    }
    info!(records = records.len(), "Cleaned text");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_transcript_strips_mentions_and_urls() {
        assert_eq!(
            clean_transcript("Customer: @AppleSupport my phone died https://t.co/xyz"),
            "Customer my phone died"
        );
        assert_eq!(clean_transcript("Company: see www.example.com/help ok"), "Company see ok");
    }

    #[test]
    fn test_clean_transcript_keeps_newlines() {
        let raw = "Customer: Hi!!\nCompany: Hello,   there.\t:)";
        assert_eq!(clean_transcript(raw), "Customer Hi\nCompany Hello there");
    }

    #[test]
    fn test_clean_transcript_trims() {
        assert_eq!(clean_transcript("  ...Customer: ok  "), "Customer ok");
        assert_eq!(clean_transcript("@only"), "");
    }

    #[test]
    fn test_clean_transcript_keeps_unicode_words() {
        assert_eq!(clean_transcript("Customer: café über 🙂"), "Customer café über");
    }

    #[test]
    fn test_normalize_records() {
        let mut records = vec![ConversationRecord::new("u1", None, "Customer: Hi!")];
        normalize_records(&mut records);
        assert_eq!(records[0].cleaned_transcript.as_deref(), Some("Customer Hi"));
        assert_eq!(records[0].raw_transcript, "Customer: Hi!");
    }
}

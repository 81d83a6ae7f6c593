//! Local keyword gate run over a draft before the similarity round-trip.
//!
//! Two checks in order: a prohibited-term scan over the combined text, then
//! a topic allow-list the draft must hit at least once. Both are plain
//! keyword heuristics; the authoritative duplicate decision stays with the
//! server-side similarity search.

use crate::similarity;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    #[error("The draft contains prohibited content")]
    ProhibitedContent,
    #[error("The draft does not look related to studying abroad or education loans")]
    OffTopic,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ModerationVerdict {
    Allowed,
    Blocked(BlockReason),
}

/// Term lists for the local gate. The defaults cover the education-loan
/// forum; tests inject smaller lists.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ModerationPolicy {
    prohibited: Vec<String>,
    topics: Vec<String>,
}

impl ModerationPolicy {
    #[must_use]
    pub fn new(prohibited: Vec<String>, topics: Vec<String>) -> Self {
        Self {
            prohibited: prohibited.into_iter().map(|t| t.to_lowercase()).collect(),
            topics: topics.into_iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    /// Prohibited terms match as substrings (they include multi-word
    /// phrases); topic words match whole tokens only.
    #[must_use]
    pub fn review(&self, text: &str) -> ModerationVerdict {
        let lowered = text.to_lowercase();

        if self.prohibited.iter().any(|term| lowered.contains(term)) {
            return ModerationVerdict::Blocked(BlockReason::ProhibitedContent);
        }

        let tokens: HashSet<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .collect();

        if self.topics.iter().any(|topic| tokens.contains(topic.as_str())) {
            ModerationVerdict::Allowed
        } else {
            ModerationVerdict::Blocked(BlockReason::OffTopic)
        }
    }
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        let prohibited = [
            "porn",
            "escort",
            "casino",
            "gambling",
            "betting tips",
            "narcotic",
            "fake degree",
            "fake documents",
            "forged certificate",
            "money laundering",
            "hack into",
        ];
        let topics = [
            "loan", "loans", "lender", "lenders", "bank", "banks", "emi", "interest",
            "collateral", "cosigner", "sanction", "disbursement", "moratorium", "finance",
            "university", "universities", "college", "colleges", "campus", "admit", "admits",
            "admission", "admissions", "semester", "tuition", "course", "courses", "degree",
            "masters", "bachelors", "mba", "phd", "visa", "visas", "i20", "sevis",
            "scholarship", "scholarships", "stipend", "sop", "gre", "gmat", "ielts", "toefl",
            "abroad", "study", "studying", "budget", "lakhs", "mentor", "mentorship",
        ];

        Self::new(
            prohibited.iter().map(|&t| t.to_owned()).collect(),
            topics.iter().map(|&t| t.to_owned()).collect(),
        )
    }
}

/// Advisory tag suggestions from the combined draft text. Empty until the
/// text exceeds `min_combined_len` characters; never blocks anything.
#[must_use]
pub fn suggest_tags(title: &str, content: &str, min_combined_len: usize, max: usize) -> Vec<String> {
    let combined = format!("{title} {content}");
    if combined.trim().chars().count() <= min_combined_len {
        return Vec::new();
    }

    let mut suggestions = similarity::keywords(&combined);
    suggestions.truncate(max);
    suggestions
}

#[cfg(test)]
mod tests {
    use crate::moderation::{
        BlockReason, ModerationPolicy, ModerationVerdict, suggest_tags,
    };

    #[test]
    fn on_topic_draft_is_allowed() {
        let policy = ModerationPolicy::default();
        let verdict = policy.review(
            "How do I compare IDFC vs Auxilo for MS in USA? \
             I got admits from two universities and need to pick a lender. Budget is 40 lakhs.",
        );
        assert_eq!(verdict, ModerationVerdict::Allowed);
    }

    #[test]
    fn prohibited_terms_win_over_topic_match() {
        let policy = ModerationPolicy::default();
        let verdict =
            policy.review("Education loan approved with fake documents, asking for a friend");
        assert_eq!(
            verdict,
            ModerationVerdict::Blocked(BlockReason::ProhibitedContent)
        );
    }

    #[test]
    fn off_topic_draft_is_blocked() {
        let policy = ModerationPolicy::default();
        let verdict = policy.review("Best biryani places near the railway station?");
        assert_eq!(verdict, ModerationVerdict::Blocked(BlockReason::OffTopic));
    }

    #[test]
    fn topic_words_match_whole_tokens_only() {
        let policy = ModerationPolicy::new(vec![], vec!["visa".to_owned()]);
        assert_eq!(
            policy.review("advisable choices everywhere"),
            ModerationVerdict::Blocked(BlockReason::OffTopic)
        );
        assert_eq!(policy.review("my visa interview"), ModerationVerdict::Allowed);
    }

    #[test]
    fn tag_suggestions_respect_minimum_length() {
        assert_eq!(suggest_tags("abc", "", 5, 5), Vec::<String>::new());

        let suggestions = suggest_tags(
            "IDFC education loan",
            "collateral free options for masters",
            5,
            5,
        );
        assert_eq!(
            suggestions,
            vec!["idfc", "education", "loan", "collateral", "free"]
        );
    }

    #[test]
    fn block_reason_serializes_as_tag() {
        assert_eq!(
            serde_json::to_string(&BlockReason::ProhibitedContent).unwrap(),
            "\"prohibited_content\""
        );
        assert_eq!(
            serde_json::to_string(&BlockReason::OffTopic).unwrap(),
            "\"off_topic\""
        );
    }
}

//! Keyword extraction and overlap ranking for the duplicate check.
//!
//! Candidates come from the store as recent post summaries; ranking happens
//! in-process by counting shared title keywords.

use crate::model::post::PostSummary;

pub const KEYWORD_MIN_LEN: usize = 4;

/// Filler words that carry no topical signal even above the length cutoff.
const STOPWORDS: &[&str] = &[
    "about", "after", "also", "anyone", "been", "best", "could", "does", "everyone", "from",
    "have", "help", "here", "into", "just", "know", "much", "need", "please", "should", "some",
    "than", "thanks", "that", "their", "them", "then", "there", "they", "this", "very", "want",
    "what", "when", "where", "which", "will", "with", "would", "your",
];

/// Lowercased topical words of the text, deduplicated in order of first
/// appearance.
#[must_use]
pub fn keywords(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        let word = word.to_lowercase();
        if word.chars().count() < KEYWORD_MIN_LEN
            || STOPWORDS.contains(&word.as_str())
            || found.contains(&word)
        {
            continue;
        }
        found.push(word);
    }
    found
}

#[must_use]
pub fn overlap(a: &[String], b: &[String]) -> usize {
    a.iter().filter(|word| b.contains(word)).count()
}

/// Candidates sharing at least `min_overlap` title keywords with the query,
/// strongest match first, at most `limit` results. Ties keep the incoming
/// (most recent first) order.
#[must_use]
pub fn rank(title: &str, candidates: Vec<PostSummary>, min_overlap: usize, limit: usize) -> Vec<PostSummary> {
    let query = keywords(title);

    let mut scored: Vec<(usize, PostSummary)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let score = overlap(&query, &keywords(candidate.title.get()));
            (score >= min_overlap).then_some((score, candidate))
        })
        .collect();

    scored.sort_by(|(a, _), (b, _)| b.cmp(a));
    scored.truncate(limit);
    scored.into_iter().map(|(_, candidate)| candidate).collect()
}

#[cfg(test)]
mod tests {
    use crate::{
        model::{
            Id,
            post::{Category, PostSummary, Title},
        },
        similarity::{keywords, overlap, rank},
    };

    fn summary(id: u64, title: &str) -> PostSummary {
        PostSummary {
            id: Id::from(id),
            author_id: Id::from(1_u64),
            title: Title::new(title.to_owned()).unwrap(),
            category: Category::Loans,
            tags: Vec::new(),
            like_count: 0,
            comment_count: 0,
            pinned: false,
        }
    }

    #[test]
    fn keywords_skip_short_words_and_stopwords() {
        assert_eq!(
            keywords("How do I compare IDFC vs Auxilo for MS in USA?"),
            vec!["compare", "idfc", "auxilo"]
        );
        assert_eq!(keywords("What should I do?"), Vec::<String>::new());
    }

    #[test]
    fn keywords_deduplicate() {
        assert_eq!(
            keywords("loan loan LOAN collateral loan"),
            vec!["loan", "collateral"]
        );
    }

    #[test]
    fn overlap_counts_shared_words() {
        let a = keywords("IDFC education loan collateral requirements");
        let b = keywords("Does IDFC need collateral for education loans?");
        assert_eq!(overlap(&a, &b), 3);
    }

    #[test]
    fn rank_orders_by_score_and_respects_minimum() {
        let candidates = vec![
            summary(1, "Weather discussion thread for admits"),
            summary(2, "IDFC versus Auxilo comparison for masters"),
            summary(3, "Need help to compare IDFC and Auxilo rates"),
        ];

        let ranked = rank(
            "How do I compare IDFC vs Auxilo for MS in USA?",
            candidates,
            2,
            5,
        );

        let ids: Vec<u64> = ranked.iter().map(|c| c.id.into()).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn rank_truncates_to_limit() {
        let candidates: Vec<_> = (0..10)
            .map(|n| summary(n, "IDFC Auxilo education loan comparison"))
            .collect();

        let ranked = rank("Compare IDFC and Auxilo education loan", candidates, 2, 5);
        assert_eq!(ranked.len(), 5);
    }
}

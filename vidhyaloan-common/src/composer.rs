//! The posting wizard: a tagged-union state machine for the duplicate gate.
//!
//! `Title → Description → Checking → {Duplicate | Appreciate} → Posting →
//! Done`, with a terminal `Blocked` reachable from `Description`. The
//! machine performs no I/O itself; a driver runs the similarity search and
//! the create call and feeds the outcomes back in, so the whole gate is
//! testable without a runtime.

use crate::{
    model::{
        Id,
        post::{
            Category, InvalidPostBodyError, InvalidTitleError, PostBody, PostDraft, PostMarker,
            PostSummary, Title,
        },
    },
    moderation::{BlockReason, ModerationPolicy, ModerationVerdict},
};
use thiserror::Error;

/// Knobs of the duplicate gate. Explicit configuration rather than module
/// constants so the gate can be tested with different thresholds.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct GateConfig {
    /// Candidate count at or above which a draft counts as a duplicate.
    pub duplicate_threshold: usize,
    /// Maximum candidates kept from a similarity search.
    pub similar_limit: usize,
    /// Shared title keywords required before a candidate counts at all.
    pub min_keyword_overlap: usize,
    /// Combined draft length above which tag suggestions appear.
    pub suggest_after: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold: 2,
            similar_limit: 5,
            min_keyword_overlap: 2,
            suggest_after: 5,
        }
    }
}

/// The similarity search failed to complete. The gate fails open on this:
/// posting proceeds as if no duplicates were found.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The similarity search did not complete")]
pub struct SearchUnavailable;

/// Driver-reported outcome of the create call.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum PostOutcome {
    Created(Id<PostMarker>),
    /// The server's own duplicate check rejected the create, which can
    /// happen even on a forced submission.
    Duplicate {
        matches: Vec<PostSummary>,
        message: String,
    },
    Failed(String),
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ComposerState {
    Title,
    Description {
        title: Title,
    },
    Checking {
        draft: PostDraft,
    },
    Duplicate {
        draft: PostDraft,
        matches: Vec<PostSummary>,
    },
    Appreciate {
        draft: PostDraft,
        error: Option<String>,
    },
    Posting {
        draft: PostDraft,
        force: bool,
    },
    Done {
        post_id: Id<PostMarker>,
    },
    Blocked {
        reason: BlockReason,
    },
}

impl ComposerState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ComposerState::Title => "title",
            ComposerState::Description { .. } => "description",
            ComposerState::Checking { .. } => "checking",
            ComposerState::Duplicate { .. } => "duplicate",
            ComposerState::Appreciate { .. } => "appreciate",
            ComposerState::Posting { .. } => "posting",
            ComposerState::Done { .. } => "done",
            ComposerState::Blocked { .. } => "blocked",
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum ComposerError {
    #[error(transparent)]
    Title(#[from] InvalidTitleError),
    #[error(transparent)]
    Content(#[from] InvalidPostBodyError),
    #[error("{action} is not available in the {state} step")]
    WrongState {
        state: &'static str,
        action: &'static str,
    },
}

pub struct Composer {
    config: GateConfig,
    policy: ModerationPolicy,
    state: ComposerState,
}

impl Composer {
    #[must_use]
    pub fn new(config: GateConfig, policy: ModerationPolicy) -> Self {
        Self {
            config,
            policy,
            state: ComposerState::Title,
        }
    }

    #[must_use]
    pub fn state(&self) -> &ComposerState {
        &self.state
    }

    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Validation failure leaves the machine in place so the same step can
    /// be re-prompted; nothing invalid ever reaches the server.
    pub fn submit_title(&mut self, raw: &str) -> Result<(), ComposerError> {
        if !matches!(self.state, ComposerState::Title) {
            return Err(self.wrong_state("submit_title"));
        }

        let title = Title::new(raw.to_owned())?;
        self.state = ComposerState::Description { title };
        Ok(())
    }

    /// Validates the content, then runs the local moderation gate over the
    /// combined text. Blocked drafts are terminal until re-edited; allowed
    /// drafts move to `Checking`, where the driver is expected to run the
    /// similarity search.
    pub fn submit_description(
        &mut self,
        raw: &str,
        category: Category,
        tags: Vec<String>,
    ) -> Result<(), ComposerError> {
        let ComposerState::Description { title } = &self.state else {
            return Err(self.wrong_state("submit_description"));
        };

        let content = PostBody::new(raw.to_owned())?;
        let combined = format!("{} {}", title.get(), content.get());
        let title = title.clone();

        self.state = match self.policy.review(&combined) {
            ModerationVerdict::Blocked(reason) => ComposerState::Blocked { reason },
            ModerationVerdict::Allowed => ComposerState::Checking {
                draft: PostDraft::new(title, content, category, tags),
            },
        };
        Ok(())
    }

    /// Feeds the similarity search outcome back in. A failed search is
    /// fail-open: the draft proceeds as if no duplicates were found.
    pub fn similarity_result(
        &mut self,
        outcome: Result<Vec<PostSummary>, SearchUnavailable>,
    ) -> Result<(), ComposerError> {
        let draft = match self.take_state() {
            ComposerState::Checking { draft } => draft,
            other => {
                self.state = other;
                return Err(self.wrong_state("similarity_result"));
            }
        };

        let mut matches = outcome.unwrap_or_default();
        matches.truncate(self.config.similar_limit);

        self.state = if matches.len() >= self.config.duplicate_threshold {
            ComposerState::Duplicate { draft, matches }
        } else {
            ComposerState::Appreciate { draft, error: None }
        };
        Ok(())
    }

    /// Back from the duplicate warning to the description step; the title
    /// is kept, the content is re-entered.
    pub fn edit(&mut self) -> Result<(), ComposerError> {
        match self.take_state() {
            ComposerState::Duplicate { draft, .. } => {
                self.state = ComposerState::Description { title: draft.title };
                Ok(())
            }
            other => {
                self.state = other;
                Err(self.wrong_state("edit"))
            }
        }
    }

    /// Proceed to posting. From `Appreciate` this is a plain submission;
    /// from `Duplicate` it is a forced one, and the server may still answer
    /// with its own duplicate rejection.
    pub fn confirm(&mut self) -> Result<(), ComposerError> {
        match self.take_state() {
            ComposerState::Appreciate { draft, .. } => {
                self.state = ComposerState::Posting {
                    draft,
                    force: false,
                };
                Ok(())
            }
            ComposerState::Duplicate { draft, .. } => {
                self.state = ComposerState::Posting { draft, force: true };
                Ok(())
            }
            other => {
                self.state = other;
                Err(self.wrong_state("confirm"))
            }
        }
    }

    /// Feeds the create call outcome back in. A server-side duplicate
    /// answer returns to `Duplicate` with the server's candidate list, even
    /// after a forced submission; any other failure returns to `Appreciate`
    /// with the error message.
    pub fn post_result(&mut self, outcome: PostOutcome) -> Result<(), ComposerError> {
        let draft = match self.take_state() {
            ComposerState::Posting { draft, .. } => draft,
            other => {
                self.state = other;
                return Err(self.wrong_state("post_result"));
            }
        };

        self.state = match outcome {
            PostOutcome::Created(post_id) => ComposerState::Done { post_id },
            PostOutcome::Duplicate { matches, .. } => ComposerState::Duplicate { draft, matches },
            PostOutcome::Failed(message) => ComposerState::Appreciate {
                draft,
                error: Some(message),
            },
        };
        Ok(())
    }

    fn take_state(&mut self) -> ComposerState {
        std::mem::replace(&mut self.state, ComposerState::Title)
    }

    fn wrong_state(&self, action: &'static str) -> ComposerError {
        ComposerError::WrongState {
            state: self.state.name(),
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        composer::{
            Composer, ComposerError, ComposerState, GateConfig, PostOutcome, SearchUnavailable,
        },
        model::{
            Id,
            post::{Category, PostSummary, Title},
        },
        moderation::{BlockReason, ModerationPolicy},
    };

    const GOOD_TITLE: &str = "How do I compare IDFC vs Auxilo for MS in USA?";
    const GOOD_CONTENT: &str =
        "I got admits from two universities and need to pick a lender. Budget is 40 lakhs.";

    fn composer() -> Composer {
        Composer::new(GateConfig::default(), ModerationPolicy::default())
    }

    fn candidates(count: u64) -> Vec<PostSummary> {
        (1..=count)
            .map(|n| PostSummary {
                id: Id::from(n),
                author_id: Id::from(1_u64),
                title: Title::new(format!("Existing IDFC Auxilo comparison number {n}")).unwrap(),
                category: Category::Loans,
                tags: Vec::new(),
                like_count: 0,
                comment_count: 0,
                pinned: false,
            })
            .collect()
    }

    fn advance_to_checking(composer: &mut Composer) {
        composer.submit_title(GOOD_TITLE).unwrap();
        composer
            .submit_description(GOOD_CONTENT, Category::Loans, Vec::new())
            .unwrap();
        assert!(matches!(composer.state(), ComposerState::Checking { .. }));
    }

    #[test]
    fn invalid_title_keeps_the_title_step() {
        let mut composer = composer();

        assert!(matches!(
            composer.submit_title("Too short"),
            Err(ComposerError::Title(_))
        ));
        assert!(matches!(
            composer.submit_title("Compare lenders at https://example.com"),
            Err(ComposerError::Title(_))
        ));
        assert!(matches!(composer.state(), ComposerState::Title));
    }

    #[test]
    fn invalid_content_keeps_the_description_step() {
        let mut composer = composer();
        composer.submit_title(GOOD_TITLE).unwrap();

        assert!(matches!(
            composer.submit_description("Nineteen characters", Category::Loans, Vec::new()),
            Err(ComposerError::Content(_))
        ));
        assert!(matches!(
            composer.state(),
            ComposerState::Description { .. }
        ));
    }

    #[test]
    fn threshold_reached_means_duplicate() {
        for count in [2, 3, 5] {
            let mut composer = composer();
            advance_to_checking(&mut composer);

            composer.similarity_result(Ok(candidates(count))).unwrap();
            assert!(
                matches!(composer.state(), ComposerState::Duplicate { .. }),
                "{count} candidates should hit the threshold"
            );
        }
    }

    #[test]
    fn below_threshold_means_appreciate() {
        for count in [0, 1] {
            let mut composer = composer();
            advance_to_checking(&mut composer);

            composer.similarity_result(Ok(candidates(count))).unwrap();
            assert!(
                matches!(composer.state(), ComposerState::Appreciate { .. }),
                "{count} candidates should stay below the threshold"
            );
        }
    }

    #[test]
    fn custom_threshold_is_respected() {
        let config = GateConfig {
            duplicate_threshold: 4,
            ..GateConfig::default()
        };
        let mut composer = Composer::new(config, ModerationPolicy::default());
        advance_to_checking(&mut composer);

        composer.similarity_result(Ok(candidates(3))).unwrap();
        assert!(matches!(composer.state(), ComposerState::Appreciate { .. }));
    }

    #[test]
    fn candidate_list_is_capped_at_the_limit() {
        let mut composer = composer();
        advance_to_checking(&mut composer);

        composer.similarity_result(Ok(candidates(9))).unwrap();
        let ComposerState::Duplicate { matches, .. } = composer.state() else {
            panic!("expected duplicate state");
        };
        assert_eq!(matches.len(), 5);
    }

    #[test]
    fn failed_search_fails_open() {
        let mut composer = composer();
        advance_to_checking(&mut composer);

        composer.similarity_result(Err(SearchUnavailable)).unwrap();
        assert!(matches!(composer.state(), ComposerState::Appreciate { .. }));
    }

    #[test]
    fn forced_submission_still_handles_a_server_duplicate() {
        let mut composer = composer();
        advance_to_checking(&mut composer);
        composer.similarity_result(Ok(candidates(2))).unwrap();

        composer.confirm().unwrap();
        let ComposerState::Posting { force, .. } = composer.state() else {
            panic!("expected posting state");
        };
        assert!(force);

        let server_matches = candidates(3);
        composer
            .post_result(PostOutcome::Duplicate {
                matches: server_matches.clone(),
                message: "A very similar question already exists".to_owned(),
            })
            .unwrap();

        let ComposerState::Duplicate { matches, .. } = composer.state() else {
            panic!("expected duplicate state");
        };
        assert_eq!(*matches, server_matches);
    }

    #[test]
    fn prohibited_content_blocks_before_any_search() {
        let mut composer = composer();
        composer
            .submit_title("Education loan with fake documents possible?")
            .unwrap();
        composer
            .submit_description(
                "Looking for an agent who arranges fake documents for the loan file.",
                Category::Loans,
                Vec::new(),
            )
            .unwrap();

        assert!(matches!(
            composer.state(),
            ComposerState::Blocked {
                reason: BlockReason::ProhibitedContent
            }
        ));
        // A blocked machine refuses the similarity step outright.
        assert!(matches!(
            composer.similarity_result(Ok(Vec::new())),
            Err(ComposerError::WrongState {
                state: "blocked",
                ..
            })
        ));
    }

    #[test]
    fn off_topic_content_blocks_with_the_other_reason() {
        let mut composer = composer();
        composer.submit_title("What happened in the cricket match?").unwrap();
        composer
            .submit_description(
                "Did anyone watch the final over yesterday evening? Absolute chaos.",
                Category::General,
                Vec::new(),
            )
            .unwrap();

        assert!(matches!(
            composer.state(),
            ComposerState::Blocked {
                reason: BlockReason::OffTopic
            }
        ));
    }

    #[test]
    fn edit_returns_to_description_and_keeps_the_title() {
        let mut composer = composer();
        advance_to_checking(&mut composer);
        composer.similarity_result(Ok(candidates(2))).unwrap();

        composer.edit().unwrap();
        let ComposerState::Description { title } = composer.state() else {
            panic!("expected description state");
        };
        assert_eq!(title.get(), GOOD_TITLE);
    }

    #[test]
    fn create_failure_returns_to_appreciate_with_the_message() {
        let mut composer = composer();
        advance_to_checking(&mut composer);
        composer.similarity_result(Ok(Vec::new())).unwrap();
        composer.confirm().unwrap();

        composer
            .post_result(PostOutcome::Failed("The server is on fire".to_owned()))
            .unwrap();

        let ComposerState::Appreciate { error, .. } = composer.state() else {
            panic!("expected appreciate state");
        };
        assert_eq!(error.as_deref(), Some("The server is on fire"));
    }

    #[test]
    fn happy_path_ends_in_done() {
        let mut composer = composer();
        advance_to_checking(&mut composer);

        composer.similarity_result(Ok(Vec::new())).unwrap();
        assert!(matches!(composer.state(), ComposerState::Appreciate { .. }));

        composer.confirm().unwrap();
        let ComposerState::Posting { draft, force } = composer.state() else {
            panic!("expected posting state");
        };
        assert!(!force);
        assert_eq!(draft.title.get(), GOOD_TITLE);

        let post_id = Id::from(99_u64);
        composer.post_result(PostOutcome::Created(post_id)).unwrap();
        assert!(matches!(
            composer.state(),
            ComposerState::Done { post_id: done_id } if *done_id == post_id
        ));
    }

    #[test]
    fn out_of_order_calls_are_rejected() {
        let mut composer = composer();

        assert!(matches!(
            composer.confirm(),
            Err(ComposerError::WrongState { state: "title", .. })
        ));
        assert!(matches!(
            composer.post_result(PostOutcome::Created(Id::from(1_u64))),
            Err(ComposerError::WrongState { state: "title", .. })
        ));

        composer.submit_title(GOOD_TITLE).unwrap();
        assert!(matches!(
            composer.submit_title(GOOD_TITLE),
            Err(ComposerError::WrongState {
                state: "description",
                ..
            })
        ));
    }
}

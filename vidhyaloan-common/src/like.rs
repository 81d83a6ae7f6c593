//! Client-side like state: optimistic toggling with a single-flight guard.
//!
//! The server response is the sole source of truth after each toggle; the
//! optimistic delta exists only to keep the control responsive and is
//! discarded on reconcile or full reload.

use crate::model::LikeOutcome;
use thiserror::Error;

/// The like request did not complete; the optimistic delta is rolled back.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The like request did not complete")]
pub struct ToggleFailed;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct LikeControl {
    liked: bool,
    likes: u64,
    /// State before the optimistic delta; `Some` while a request is in
    /// flight.
    pending: Option<(bool, u64)>,
}

impl LikeControl {
    /// Fresh state from a full reload, discarding anything speculative.
    #[must_use]
    pub fn from_server(outcome: LikeOutcome) -> Self {
        Self {
            liked: outcome.liked,
            likes: outcome.likes,
            pending: None,
        }
    }

    #[must_use]
    pub fn liked(&self) -> bool {
        self.liked
    }

    #[must_use]
    pub fn likes(&self) -> u64 {
        self.likes
    }

    /// Whether the control should render disabled.
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Starts a toggle: applies the optimistic delta and reserves the
    /// control. Returns `false` without issuing anything while a previous
    /// toggle is still in flight, so rapid double-clicks cause exactly one
    /// request.
    pub fn begin_toggle(&mut self) -> bool {
        if self.pending.is_some() {
            return false;
        }

        self.pending = Some((self.liked, self.likes));
        if self.liked {
            self.liked = false;
            self.likes = self.likes.saturating_sub(1);
        } else {
            self.liked = true;
            self.likes += 1;
        }
        true
    }

    /// Adopts the authoritative server pair, or rolls the optimistic delta
    /// back if the request failed. Frees the control either way.
    pub fn reconcile(&mut self, outcome: Result<LikeOutcome, ToggleFailed>) {
        match outcome {
            Ok(server) => {
                self.liked = server.liked;
                self.likes = server.likes;
                self.pending = None;
            }
            Err(ToggleFailed) => {
                if let Some((liked, likes)) = self.pending.take() {
                    self.liked = liked;
                    self.likes = likes;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        like::{LikeControl, ToggleFailed},
        model::LikeOutcome,
    };

    fn control(liked: bool, likes: u64) -> LikeControl {
        LikeControl::from_server(LikeOutcome { liked, likes })
    }

    #[test]
    fn single_click_issues_one_request() {
        let mut control = control(false, 3);

        assert!(control.begin_toggle());
        assert!(control.in_flight());
        assert!(control.liked());
        assert_eq!(control.likes(), 4);

        // The second click of a rapid double-click lands while the first
        // request is still out.
        assert!(!control.begin_toggle());
        assert_eq!(control.likes(), 4);
    }

    #[test]
    fn reconcile_adopts_the_server_pair() {
        let mut control = control(false, 3);
        control.begin_toggle();

        // Another device liked in the meantime; the server pair wins.
        control.reconcile(Ok(LikeOutcome {
            liked: true,
            likes: 6,
        }));

        assert!(!control.in_flight());
        assert!(control.liked());
        assert_eq!(control.likes(), 6);
    }

    #[test]
    fn failed_request_rolls_back() {
        let mut control = control(true, 10);
        control.begin_toggle();
        assert!(!control.liked());
        assert_eq!(control.likes(), 9);

        control.reconcile(Err(ToggleFailed));

        assert!(!control.in_flight());
        assert!(control.liked());
        assert_eq!(control.likes(), 10);
    }

    #[test]
    fn control_is_usable_again_after_reconcile() {
        let mut control = control(false, 0);
        control.begin_toggle();
        control.reconcile(Ok(LikeOutcome {
            liked: true,
            likes: 1,
        }));

        assert!(control.begin_toggle());
        assert!(!control.liked());
        assert_eq!(control.likes(), 0);
    }

    #[test]
    fn unliking_at_zero_saturates() {
        // A stale aggregate can show zero while our own like is recorded.
        let mut control = control(true, 0);
        control.begin_toggle();
        assert_eq!(control.likes(), 0);
    }
}

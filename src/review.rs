//! Review aggregation and the pending/actionable classification built on it.

use chrono::{DateTime, Utc};

use crate::types::{PullRequest, Review, ReviewState};

/// One reviewer's standing on a pull request, collapsed from all of their
/// review events.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedReview {
    pub author: String,
    /// Latest non-COMMENTED verdict, or COMMENTED if there was no other kind.
    pub state: ReviewState,
    /// Most recent event from this reviewer, whichever event set `state`.
    pub created_at: DateTime<Utc>,
}

impl AggregatedReview {
    /// Whether this review went stale: the author pushed after it was given
    /// and it is not an approval. Work-in-progress PRs never have pending
    /// reviews.
    pub fn is_pending(&self, pr: &PullRequest) -> bool {
        if self.state.is_approved() || self.author == pr.author || pr.is_work_in_progress() {
            return false;
        }

        pr.last_pushed_at
            .is_some_and(|pushed_at| pushed_at > self.created_at)
    }
}

/// Collapses raw review events into one entry per reviewer, in order of each
/// reviewer's first appearance. Reviews by the PR author are dropped.
///
/// Events are applied in the order given. Any non-COMMENTED verdict replaces
/// the recorded state, while a COMMENTED event only replaces another COMMENTED,
/// so a verdict is never downgraded by a later comment. The timestamp is
/// tracked separately and is always the latest event seen for that reviewer.
pub fn aggregate_reviews(pr_author: &str, reviews: &[Review]) -> Vec<AggregatedReview> {
    let mut aggregated: Vec<AggregatedReview> = Vec::new();

    for review in reviews.iter().filter(|r| r.author != pr_author) {
        match aggregated.iter_mut().find(|a| a.author == review.author) {
            Some(existing) => {
                if !review.state.is_commented() || existing.state.is_commented() {
                    existing.state = review.state.clone();
                }
                if review.created_at > existing.created_at {
                    existing.created_at = review.created_at;
                }
            }
            None => aggregated.push(AggregatedReview {
                author: review.author.clone(),
                state: review.state.clone(),
                created_at: review.created_at,
            }),
        }
    }

    aggregated
}

impl PullRequest {
    /// Drafts, and titles that open with a `WIP` or `[WIP]` token. The marker
    /// must stand alone, so "Wipe caches" is not work in progress.
    pub fn is_work_in_progress(&self) -> bool {
        let title = self.title.trim_start().to_lowercase();
        let marked = title.starts_with("[wip]")
            || title.strip_prefix("wip").is_some_and(|rest| {
                rest.is_empty()
                    || rest.starts_with(|c: char| c.is_whitespace() || matches!(c, ':' | '-' | ']'))
            });
        self.is_draft || marked
    }

    /// Whole days since the last update; never negative.
    pub fn age_in_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.updated_at).num_days().max(0)
    }

    pub fn aggregated_reviews(&self) -> Vec<AggregatedReview> {
        aggregate_reviews(&self.author, &self.reviews)
    }

    /// Requested reviewers other than the author, deduplicated, in request order.
    pub fn requested_reviewers(&self) -> Vec<&str> {
        let mut reviewers: Vec<&str> = Vec::new();
        for request in &self.review_requests {
            let login = request.reviewer.as_str();
            if login != self.author && !reviewers.contains(&login) {
                reviewers.push(login);
            }
        }
        reviewers
    }

    /// True when the ball is in the author's court: the PR is still a work in
    /// progress, or nobody is waiting to review and no review went stale.
    pub fn is_actionable_by_author(&self) -> bool {
        if self.is_work_in_progress() {
            return true;
        }

        self.requested_reviewers().is_empty()
            && !self
                .aggregated_reviews()
                .iter()
                .any(|review| review.is_pending(self))
    }
}

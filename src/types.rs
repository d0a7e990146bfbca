use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Login GitHub substitutes for accounts that have since been deleted.
pub const GHOST_LOGIN: &str = "ghost";

/// Pull request states accepted by the GraphQL `pullRequests(states:)` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PrState {
    #[default]
    Open,
    Closed,
    Merged,
}

impl PrState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrState::Open => "OPEN",
            PrState::Closed => "CLOSED",
            PrState::Merged => "MERGED",
        }
    }
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict carried by a submitted review.
///
/// GitHub reports these as SCREAMING_SNAKE_CASE strings. Values this crate
/// does not know about are kept verbatim in `Other` so they still render.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
    Other(String),
}

impl ReviewState {
    pub fn as_str(&self) -> &str {
        match self {
            ReviewState::Approved => "APPROVED",
            ReviewState::ChangesRequested => "CHANGES_REQUESTED",
            ReviewState::Commented => "COMMENTED",
            ReviewState::Dismissed => "DISMISSED",
            ReviewState::Pending => "PENDING",
            ReviewState::Other(state) => state,
        }
    }

    pub fn is_commented(&self) -> bool {
        matches!(self, ReviewState::Commented)
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, ReviewState::Approved)
    }
}

impl From<String> for ReviewState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "APPROVED" => ReviewState::Approved,
            "CHANGES_REQUESTED" => ReviewState::ChangesRequested,
            "COMMENTED" => ReviewState::Commented,
            "DISMISSED" => ReviewState::Dismissed,
            "PENDING" => ReviewState::Pending,
            _ => ReviewState::Other(state),
        }
    }
}

impl From<&str> for ReviewState {
    fn from(state: &str) -> Self {
        ReviewState::from(state.to_string())
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single submitted review event, exactly as GitHub reported it.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub author: String,
    pub state: ReviewState,
    pub created_at: DateTime<Utc>,
}

/// A user explicitly asked to review a pull request.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRequest {
    pub reviewer: String,
}

/// An open (or closed/merged, depending on the query) pull request.
#[derive(Debug, Clone, PartialEq)]
pub struct PullRequest {
    pub url: String,
    pub title: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// When the head commit reached GitHub; `None` if GitHub reported no commit.
    pub last_pushed_at: Option<DateTime<Utc>>,
    pub is_draft: bool,
    pub reviews: Vec<Review>,
    pub review_requests: Vec<ReviewRequest>,
}

/// A repository together with the pull requests fetched for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Repository {
    pub name: String,
    pub pull_requests: Vec<PullRequest>,
}

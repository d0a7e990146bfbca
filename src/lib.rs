//! prdigest: a chat-ready digest of an organization's pull requests.
//!
//! Fetches recently updated pull requests across an organization's
//! repositories with one GitHub GraphQL query. Keeps those written by known
//! developers, collapses each reviewer's review history into a single verdict,
//! and works out who owes the next move. The result is rendered as plain text
//! that mentions only the people who need to act.

pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod github;
pub mod graphql;
pub mod query;
pub mod review;
pub mod types;

pub use cli::parse_args;
pub use config::{BearerToken, Config, Identity, IdentityTable};
pub use display::{format_age, format_entry, write_digest};
pub use error::{ConfigError, GatewayError};
pub use github::{Forge, Gateway, GitHub};
pub use query::{DigestEntry, build_digest, fetch_pull_requests, generate_digest, should_display};
pub use review::{AggregatedReview, aggregate_reviews};
pub use types::{PrState, PullRequest, Repository, Review, ReviewRequest, ReviewState};

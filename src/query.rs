use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
    config::{Config, IdentityTable},
    error::GatewayError,
    github::{Forge, Gateway},
    graphql::{QueryData, build_query, convert_graphql_repository, warn_on_truncation},
    review::AggregatedReview,
    types::{PrState, PullRequest, Repository},
};

/// Fetches the organization's repositories with their pull requests in
/// `state`, using exactly one query.
///
/// Repositories without any pull request are skipped. Caps on the number of
/// repositories and pull requests are fixed; see [`crate::graphql`].
pub async fn fetch_pull_requests<F>(
    gateway: &Gateway<F>,
    organization: &str,
    state: PrState,
) -> Result<impl Iterator<Item = Repository>, GatewayError>
where
    F: Forge + Sync,
{
    let query = build_query(organization, state);
    let mut response = gateway.query(&query).await?;

    let data = response
        .get_mut("data")
        .map(serde_json::Value::take)
        .unwrap_or_default();
    let data: QueryData =
        serde_json::from_value(data).map_err(GatewayError::MalformedResponse)?;
    warn_on_truncation(organization, &data);

    Ok(data
        .organization
        .repositories
        .into_items()
        .filter(|repo| repo.pull_requests.items().next().is_some())
        .map(convert_graphql_repository))
}

/// A pull request that made it into the digest, with everything needed to
/// render it.
#[derive(Debug, Clone, PartialEq)]
pub struct DigestEntry {
    pub repository: String,
    pub pull_request: PullRequest,
    pub age_days: i64,
    pub reviews: Vec<AggregatedReview>,
    pub actionable_by_author: bool,
}

impl DigestEntry {
    pub fn new(repository: String, pull_request: PullRequest, now: DateTime<Utc>) -> Self {
        Self {
            age_days: pull_request.age_in_days(now),
            reviews: pull_request.aggregated_reviews(),
            actionable_by_author: pull_request.is_actionable_by_author(),
            repository,
            pull_request,
        }
    }
}

/// Whether a pull request belongs in the digest: written by a known developer
/// and updated less than `max_pr_age` days ago.
pub fn should_display(
    pr: &PullRequest,
    identities: &IdentityTable,
    max_pr_age: u32,
    now: DateTime<Utc>,
) -> bool {
    identities.is_developer(&pr.author) && pr.age_in_days(now) < i64::from(max_pr_age)
}

/// Selects the reportable pull requests and orders them most recently updated
/// first. Entries of equal age keep their fetch order.
pub fn build_digest<I>(repositories: I, config: &Config, now: DateTime<Utc>) -> Vec<DigestEntry>
where
    I: IntoIterator<Item = Repository>,
{
    let mut entries: Vec<DigestEntry> = repositories
        .into_iter()
        .flat_map(|repo| {
            let name = repo.name;
            repo.pull_requests
                .into_iter()
                .map(move |pr| (name.clone(), pr))
        })
        .filter(|(_, pr)| should_display(pr, &config.identities, config.max_pr_age, now))
        .map(|(name, pr)| DigestEntry::new(name, pr, now))
        .collect();

    entries.sort_by_key(|entry| entry.age_days);
    entries
}

/// Fetches and classifies everything for one digest run.
pub async fn generate_digest<F>(
    config: &Config,
    gateway: &Gateway<F>,
    now: DateTime<Utc>,
) -> Result<Vec<DigestEntry>, GatewayError>
where
    F: Forge + Sync,
{
    let repositories = fetch_pull_requests(gateway, &config.organization, config.state).await?;
    let entries = build_digest(repositories, config, now);

    info!(
        organization = %config.organization,
        state = %config.state,
        entries = entries.len(),
        "digest ready"
    );
    debug!(max_pr_age = config.max_pr_age, "age threshold applied");

    Ok(entries)
}

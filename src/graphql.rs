use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::types::*;

/// Page-one caps. Nothing is paginated, so anything past these is dropped by
/// GitHub; [`warn_on_truncation`] reports when that happens.
pub const MAX_REPOSITORIES: u32 = 100;
pub const MAX_PULL_REQUESTS_PER_REPOSITORY: u32 = 20;
pub const MAX_REVIEWS_PER_PULL_REQUEST: u32 = 50;
pub const MAX_REVIEW_REQUESTS_PER_PULL_REQUEST: u32 = 10;

/// Builds the single query that fetches an organization's recently updated
/// repositories and their pull requests in `state`.
pub fn build_query(organization: &str, state: PrState) -> String {
    // A JSON string literal is also a valid GraphQL string literal.
    let login = serde_json::Value::String(organization.to_string());

    format!(
        r#"query {{
    organization(login: {login}) {{
        repositories(first: {MAX_REPOSITORIES}, orderBy: {{ field: UPDATED_AT, direction: DESC }}) {{
            pageInfo {{
                hasNextPage
            }}
            nodes {{
                name
                pullRequests(states: {state}, first: {MAX_PULL_REQUESTS_PER_REPOSITORY}, orderBy: {{ field: UPDATED_AT, direction: DESC }}) {{
                    pageInfo {{
                        hasNextPage
                    }}
                    nodes {{
                        url
                        title
                        isDraft
                        createdAt
                        updatedAt
                        author {{
                            login
                        }}
                        commits(last: 1) {{
                            nodes {{
                                commit {{
                                    committedDate
                                    pushedDate
                                }}
                            }}
                        }}
                        reviews(first: {MAX_REVIEWS_PER_PULL_REQUEST}) {{
                            pageInfo {{
                                hasNextPage
                            }}
                            nodes {{
                                author {{
                                    login
                                }}
                                state
                                createdAt
                            }}
                        }}
                        reviewRequests(first: {MAX_REVIEW_REQUESTS_PER_PULL_REQUEST}) {{
                            pageInfo {{
                                hasNextPage
                            }}
                            nodes {{
                                requestedReviewer {{
                                    ... on User {{
                                        login
                                    }}
                                }}
                            }}
                        }}
                    }}
                }}
            }}
        }}
    }}
}}
"#,
        state = state.as_str(),
    )
}

#[derive(Debug, Deserialize)]
pub struct QueryData {
    pub organization: GraphQLOrganization,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLOrganization {
    pub repositories: Connection<GraphQLRepository>,
}

/// A GraphQL connection. GitHub declares list items nullable, so they are
/// read as options and nulls skipped.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<Option<T>>,
    #[serde(default)]
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.nodes.iter().flatten()
    }

    pub fn into_items(self) -> impl Iterator<Item = T> {
        self.nodes.into_iter().flatten()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRepository {
    pub name: String,
    pub pull_requests: Connection<GraphQLPullRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLPullRequest {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub is_draft: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: Option<GraphQLActor>,
    pub commits: Connection<GraphQLCommitNode>,
    pub reviews: Connection<GraphQLReview>,
    pub review_requests: Connection<GraphQLReviewRequest>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLActor {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLCommitNode {
    pub commit: GraphQLCommit,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLCommit {
    pub committed_date: DateTime<Utc>,
    /// Deprecated by GitHub and null for newer pushes.
    #[serde(default)]
    pub pushed_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLReview {
    pub author: Option<GraphQLActor>,
    pub state: ReviewState,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLReviewRequest {
    pub requested_reviewer: Option<GraphQLRequestedReviewer>,
}

/// Only `User` reviewers carry a login; team requests come back empty.
#[derive(Debug, Deserialize)]
pub struct GraphQLRequestedReviewer {
    #[serde(default)]
    pub login: Option<String>,
}

fn actor_login(actor: Option<GraphQLActor>) -> String {
    actor.map_or_else(|| GHOST_LOGIN.to_string(), |a| a.login)
}

/// Logs every connection in the response that hit its page-one cap.
pub fn warn_on_truncation(organization: &str, data: &QueryData) {
    let repositories = &data.organization.repositories;
    if repositories.page_info.has_next_page {
        warn!(
            organization,
            limit = MAX_REPOSITORIES,
            "more repositories than fetched; least recently updated ones are not reported"
        );
    }

    for repo in repositories.items() {
        if repo.pull_requests.page_info.has_next_page {
            warn!(
                repository = %repo.name,
                limit = MAX_PULL_REQUESTS_PER_REPOSITORY,
                "pull requests truncated"
            );
        }

        for pr in repo.pull_requests.items() {
            if pr.reviews.page_info.has_next_page {
                warn!(
                    url = %pr.url,
                    limit = MAX_REVIEWS_PER_PULL_REQUEST,
                    "reviews truncated"
                );
            }
            if pr.review_requests.page_info.has_next_page {
                warn!(
                    url = %pr.url,
                    limit = MAX_REVIEW_REQUESTS_PER_PULL_REQUEST,
                    "review requests truncated"
                );
            }
        }
    }
}

/// Converts a GraphQL pull request into the domain representation.
pub fn convert_graphql_pull_request(graphql_pr: GraphQLPullRequest) -> PullRequest {
    let last_pushed_at = graphql_pr
        .commits
        .into_items()
        .last()
        .map(|node| node.commit.pushed_date.unwrap_or(node.commit.committed_date));

    let reviews = graphql_pr
        .reviews
        .into_items()
        .map(|review| Review {
            author: actor_login(review.author),
            state: review.state,
            created_at: review.created_at,
        })
        .collect();

    let review_requests = graphql_pr
        .review_requests
        .into_items()
        .filter_map(|request| request.requested_reviewer.and_then(|r| r.login))
        .map(|reviewer| ReviewRequest { reviewer })
        .collect();

    PullRequest {
        url: graphql_pr.url,
        title: graphql_pr.title,
        author: actor_login(graphql_pr.author),
        created_at: graphql_pr.created_at,
        updated_at: graphql_pr.updated_at,
        last_pushed_at,
        is_draft: graphql_pr.is_draft,
        reviews,
        review_requests,
    }
}

pub fn convert_graphql_repository(repo: GraphQLRepository) -> Repository {
    Repository {
        name: repo.name,
        pull_requests: repo
            .pull_requests
            .into_items()
            .map(convert_graphql_pull_request)
            .collect(),
    }
}

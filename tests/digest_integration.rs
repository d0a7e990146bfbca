use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use prdigest::{
    BearerToken, Config, DigestEntry, Forge, Gateway, GatewayError, Identity, IdentityTable,
    PrState, ReviewState, fetch_pull_requests, format_entry, generate_digest, write_digest,
};
use serde_json::{Value, json};

/// Mock GitHub endpoint returning a canned body and recording every payload.
pub struct MockForge {
    pub response: Value,
    pub payloads: Mutex<Vec<Value>>,
}

impl MockForge {
    pub fn new(response: Value) -> Self {
        Self {
            response,
            payloads: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Forge for MockForge {
    async fn graphql(&self, payload: &Value) -> Result<Value, GatewayError> {
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(self.response.clone())
    }
}

/// Collects formatted log output so tests can assert on warnings.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap()
}

fn days_ago(days: i64) -> String {
    (now() - chrono::Duration::days(days)).to_rfc3339()
}

fn hours_ago(hours: i64) -> String {
    (now() - chrono::Duration::hours(hours)).to_rfc3339()
}

fn test_config() -> Config {
    let mut identities = IdentityTable::default();
    identities
        .developers
        .insert("karenc".to_string(), Identity::new("karen", "@karen"));
    identities
        .developers
        .insert("philschatz".to_string(), Identity::new("phil", "@phil"));
    identities
        .reviewers
        .insert("tomjw64".to_string(), Identity::new("Thomas", "@Thomas"));
    identities.reviewers.insert(
        "helenemccarron".to_string(),
        Identity::new("hélène", "@hélène"),
    );

    Config {
        token: BearerToken::new("ghp_test").unwrap(),
        organization: "acme".to_string(),
        state: PrState::Open,
        max_pr_age: 31,
        timeout: Duration::from_secs(30),
        identities,
    }
}

struct PrFixture {
    number: u32,
    author: &'static str,
    title: &'static str,
    updated: String,
    pushed: Option<String>,
    reviews: Vec<Value>,
    requests: Vec<&'static str>,
}

impl PrFixture {
    fn new(number: u32, author: &'static str, updated: String) -> Self {
        Self {
            number,
            author,
            title: "Improve widget throughput",
            updated,
            pushed: None,
            reviews: vec![],
            requests: vec![],
        }
    }

    fn to_json(&self, repo: &str) -> Value {
        let commits: Vec<Value> = self
            .pushed
            .iter()
            .map(|at| json!({ "commit": { "committedDate": at, "pushedDate": at } }))
            .collect();
        let requests: Vec<Value> = self
            .requests
            .iter()
            .map(|login| json!({ "requestedReviewer": { "login": login } }))
            .collect();

        json!({
            "url": format!("https://github.com/acme/{repo}/pull/{}", self.number),
            "title": self.title,
            "isDraft": false,
            "createdAt": days_ago(40),
            "updatedAt": self.updated,
            "author": { "login": self.author },
            "commits": { "nodes": commits },
            "reviews": { "nodes": self.reviews, "pageInfo": { "hasNextPage": false } },
            "reviewRequests": { "nodes": requests, "pageInfo": { "hasNextPage": false } }
        })
    }
}

fn review(author: &str, state: &str, created_at: String) -> Value {
    json!({ "author": { "login": author }, "state": state, "createdAt": created_at })
}

fn response(repos: Vec<(&str, Vec<PrFixture>)>) -> Value {
    let nodes: Vec<Value> = repos
        .into_iter()
        .map(|(name, prs)| {
            let prs: Vec<Value> = prs.iter().map(|pr| pr.to_json(name)).collect();
            json!({
                "name": name,
                "pullRequests": { "nodes": prs, "pageInfo": { "hasNextPage": false } }
            })
        })
        .collect();

    json!({
        "data": {
            "organization": {
                "repositories": { "nodes": nodes, "pageInfo": { "hasNextPage": false } }
            }
        }
    })
}

async fn run_digest(body: Value) -> Result<Vec<DigestEntry>, GatewayError> {
    let config = test_config();
    let gateway = Gateway::new(MockForge::new(body), config.timeout);
    generate_digest(&config, &gateway, now()).await
}

#[tokio::test]
async fn test_sends_single_query_with_caps() {
    let gateway = Gateway::new(MockForge::new(response(vec![])), Duration::from_secs(30));

    let repos: Vec<_> = fetch_pull_requests(&gateway, "acme", PrState::Closed)
        .await
        .unwrap()
        .collect();
    assert!(repos.is_empty());

    let payloads = gateway.forge().payloads.lock().unwrap();
    assert_eq!(payloads.len(), 1);
    let query = payloads[0]["query"].as_str().unwrap();
    assert!(query.contains(r#"organization(login: "acme")"#));
    assert!(query.contains("first: 100"));
    assert!(query.contains("pullRequests(states: CLOSED, first: 20"));
    assert!(query.contains("reviews(first: 50)"));
    assert!(query.contains("reviewRequests(first: 10)"));
    assert_eq!(payloads[0].as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn test_repositories_without_pull_requests_are_skipped() {
    let body = response(vec![
        ("empty", vec![]),
        ("widgets", vec![PrFixture::new(1, "karenc", days_ago(2))]),
        ("also-empty", vec![]),
    ]);
    let gateway = Gateway::new(MockForge::new(body), Duration::from_secs(30));

    let names: Vec<String> = fetch_pull_requests(&gateway, "acme", PrState::Open)
        .await
        .unwrap()
        .map(|repo| repo.name)
        .collect();

    assert_eq!(names, vec!["widgets"]);
}

#[tokio::test]
async fn test_approved_pr_is_on_the_author() {
    let mut pr = PrFixture::new(7, "karenc", days_ago(3));
    pr.pushed = Some(days_ago(4));
    pr.reviews = vec![
        review("tomjw64", "COMMENTED", hours_ago(80)),
        review("tomjw64", "APPROVED", hours_ago(60)),
    ];

    let entries = run_digest(response(vec![("widgets", vec![pr])]))
        .await
        .unwrap();

    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.age_days, 3);
    assert_eq!(entry.reviews.len(), 1);
    assert_eq!(entry.reviews[0].state, ReviewState::Approved);
    assert_eq!(entry.reviews[0].created_at.to_rfc3339(), hours_ago(60));
    assert!(!entry.reviews[0].is_pending(&entry.pull_request));
    assert!(entry.actionable_by_author);

    assert_eq!(
        format_entry(entry, &test_config().identities),
        "@karen submitted widgets \"Improve widget throughput\", updated 3 days ago:\n    \
         - https://github.com/acme/widgets/pull/7\n    \
         - Reviewed by: Thomas (APPROVED)\n    \
         - Pending reviews from: N/A"
    );
}

#[tokio::test]
async fn test_requested_review_is_on_the_reviewer() {
    let mut pr = PrFixture::new(8, "karenc", days_ago(1));
    pr.requests = vec!["helenemccarron"];

    let entries = run_digest(response(vec![("widgets", vec![pr])]))
        .await
        .unwrap();

    let entry = &entries[0];
    assert!(!entry.actionable_by_author);
    assert!(entry.reviews.is_empty());

    let block = format_entry(entry, &test_config().identities);
    assert!(block.starts_with("karen submitted widgets"));
    assert!(block.contains("updated 1 day ago"));
    assert!(!block.contains("Reviewed by"));
    assert!(block.ends_with("    - Pending reviews from: hélène"));
}

#[tokio::test]
async fn test_only_recent_pull_requests_by_developers_are_reported() {
    let body = response(vec![(
        "widgets",
        vec![
            PrFixture::new(1, "karenc", days_ago(30)),
            PrFixture::new(2, "karenc", days_ago(31)),
            PrFixture::new(3, "tomjw64", days_ago(1)),
            PrFixture::new(4, "stranger", days_ago(1)),
            PrFixture::new(5, "philschatz", days_ago(0)),
        ],
    )]);

    let entries = run_digest(body).await.unwrap();
    let urls: Vec<&str> = entries
        .iter()
        .map(|entry| entry.pull_request.url.as_str())
        .collect();

    assert_eq!(
        urls,
        vec![
            "https://github.com/acme/widgets/pull/5",
            "https://github.com/acme/widgets/pull/1",
        ]
    );
}

#[tokio::test]
async fn test_entries_sorted_by_age_with_stable_ties() {
    let body = response(vec![
        (
            "widgets",
            vec![
                PrFixture::new(1, "karenc", days_ago(5)),
                PrFixture::new(2, "karenc", hours_ago(30)),
            ],
        ),
        (
            "gears",
            vec![
                PrFixture::new(3, "philschatz", days_ago(30)),
                PrFixture::new(4, "philschatz", hours_ago(40)),
            ],
        ),
    ]);

    let entries = run_digest(body).await.unwrap();
    let ages: Vec<i64> = entries.iter().map(|entry| entry.age_days).collect();
    let urls: Vec<&str> = entries
        .iter()
        .map(|entry| entry.pull_request.url.as_str())
        .collect();

    assert_eq!(ages, vec![1, 1, 5, 30]);
    assert_eq!(
        urls,
        vec![
            "https://github.com/acme/widgets/pull/2",
            "https://github.com/acme/gears/pull/4",
            "https://github.com/acme/widgets/pull/1",
            "https://github.com/acme/gears/pull/3",
        ]
    );
}

#[tokio::test]
async fn test_stale_review_after_push_mentions_reviewer() {
    let mut pr = PrFixture::new(9, "philschatz", hours_ago(2));
    pr.pushed = Some(hours_ago(2));
    pr.reviews = vec![
        review("helenemccarron", "CHANGES_REQUESTED", hours_ago(20)),
        review("philschatz", "COMMENTED", hours_ago(10)),
        review("tomjw64", "APPROVED", hours_ago(20)),
    ];

    let entries = run_digest(response(vec![("gears", vec![pr])]))
        .await
        .unwrap();
    let block = format_entry(&entries[0], &test_config().identities);

    assert!(block.starts_with("phil submitted gears"));
    assert!(block.contains("updated 0 days ago"));
    assert!(block.contains("Reviewed by: @hélène (CHANGES_REQUESTED), Thomas (APPROVED)"));
    assert!(!block.contains("philschatz"));
}

#[tokio::test]
async fn test_full_digest_output() {
    let mut waiting = PrFixture::new(11, "karenc", days_ago(2));
    waiting.requests = vec!["tomjw64"];
    let ready = PrFixture::new(12, "philschatz", hours_ago(3));

    let config = test_config();
    let gateway = Gateway::new(
        MockForge::new(response(vec![("widgets", vec![waiting, ready])])),
        config.timeout,
    );
    let entries = generate_digest(&config, &gateway, now()).await.unwrap();

    let mut out = Vec::new();
    write_digest(&entries, &config.identities, &mut out).unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "@phil submitted widgets \"Improve widget throughput\", updated 0 days ago:\n\
         \x20   - https://github.com/acme/widgets/pull/12\n\
         \x20   - Pending reviews from: N/A\n\
         karen submitted widgets \"Improve widget throughput\", updated 2 days ago:\n\
         \x20   - https://github.com/acme/widgets/pull/11\n\
         \x20   - Pending reviews from: Thomas\n"
    );
}

#[tokio::test]
async fn test_graphql_errors_are_fatal() {
    let body = json!({
        "data": null,
        "errors": [{ "type": "NOT_FOUND", "message": "Could not resolve to an Organization with the login of 'acme'." }]
    });

    match run_digest(body).await {
        Err(GatewayError::Api { query, errors }) => {
            assert!(query.contains(r#"organization(login: "acme")"#));
            assert_eq!(errors[0]["type"], "NOT_FOUND");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unexpected_shape_is_reported_not_panicked() {
    let body = json!({ "data": { "organization": { "repositories": { "nodes": [
        { "name": "widgets", "pullRequests": { "nodes": [ { "url": 42 } ] } }
    ] } } } });

    let result = run_digest(body).await;
    assert!(matches!(result, Err(GatewayError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_missing_data_is_reported() {
    let result = run_digest(json!({})).await;
    assert!(matches!(result, Err(GatewayError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_truncated_connections_still_produce_digest() {
    let mut body = response(vec![(
        "widgets",
        vec![PrFixture::new(1, "karenc", days_ago(1))],
    )]);
    body["data"]["organization"]["repositories"]["pageInfo"]["hasNextPage"] = json!(true);
    body["data"]["organization"]["repositories"]["nodes"][0]["pullRequests"]["pageInfo"]
        ["hasNextPage"] = json!(true);
    body["data"]["organization"]["repositories"]["nodes"][0]["pullRequests"]["nodes"][0]
        ["reviews"]["pageInfo"]["hasNextPage"] = json!(true);

    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let entries = run_digest(body).await.unwrap();
    assert_eq!(entries.len(), 1);

    let logs = logs.contents();
    assert!(logs.contains("more repositories than fetched"), "{logs}");
    assert!(logs.contains("organization=\"acme\""), "{logs}");
    assert!(logs.contains("pull requests truncated"), "{logs}");
    assert!(logs.contains("repository=widgets"), "{logs}");
    assert!(logs.contains("reviews truncated"), "{logs}");
    assert!(logs.contains("url=https://github.com/acme/widgets/pull/1"), "{logs}");
    assert!(!logs.contains("review requests truncated"), "{logs}");
}

use std::{path::PathBuf, time::Duration};

/// Failures talking to the GitHub GraphQL endpoint.
///
/// Every variant is fatal for a run: there is no retry and no partial report.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// GitHub answered, but with a top-level `errors` payload (bad credentials,
    /// malformed query, rate limiting).
    #[error("GitHub GraphQL API returned errors: {errors}")]
    Api {
        query: String,
        errors: serde_json::Value,
    },

    /// The request never produced a usable HTTP response.
    #[error("GitHub GraphQL request failed")]
    Transport(#[source] octocrab::Error),

    #[error("GitHub GraphQL request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The response did not have the shape the query asked for.
    #[error("unexpected GitHub GraphQL response shape")]
    MalformedResponse(#[source] serde_json::Error),
}

/// Invalid or missing settings, detected before any network call.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required setting {0} is empty")]
    MissingSetting(&'static str),

    #[error("failed to read identity table {}", .path.display())]
    ReadIdentities {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse identity table {}", .path.display())]
    ParseIdentities {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

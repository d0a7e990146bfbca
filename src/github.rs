use std::time::Duration;

use async_trait::async_trait;
use octocrab::Octocrab;
use tracing::{debug, error};

use crate::{config::BearerToken, error::GatewayError};

/// Transport for GraphQL payloads. The real implementation is [`GitHub`];
/// tests substitute canned responses.
#[async_trait]
pub trait Forge {
    /// POSTs `payload` to the GraphQL endpoint and returns the decoded body.
    async fn graphql(&self, payload: &serde_json::Value) -> Result<serde_json::Value, GatewayError>;
}

/// `https://api.github.com/graphql`, authenticated with a bearer token.
pub struct GitHub {
    octocrab: Octocrab,
}

impl GitHub {
    pub fn new(token: &BearerToken) -> Result<Self, GatewayError> {
        let octocrab = Octocrab::builder()
            .personal_token(token.expose().to_string())
            .build()
            .map_err(GatewayError::Transport)?;
        Ok(Self { octocrab })
    }
}

#[async_trait]
impl Forge for GitHub {
    async fn graphql(&self, payload: &serde_json::Value) -> Result<serde_json::Value, GatewayError> {
        self.octocrab
            .graphql(payload)
            .await
            .map_err(GatewayError::Transport)
    }
}

/// Issues GraphQL queries through a [`Forge`] with a bounded timeout and
/// turns GraphQL-level errors into [`GatewayError::Api`].
pub struct Gateway<F> {
    forge: F,
    timeout: Duration,
}

impl<F> Gateway<F>
where
    F: Forge + Sync,
{
    pub fn new(forge: F, timeout: Duration) -> Self {
        Self { forge, timeout }
    }

    pub fn forge(&self) -> &F {
        &self.forge
    }

    pub async fn query(&self, query: &str) -> Result<serde_json::Value, GatewayError> {
        let payload = serde_json::json!({ "query": query });
        debug!(bytes = query.len(), "sending GraphQL query");

        let response = tokio::time::timeout(self.timeout, self.forge.graphql(&payload))
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout))??;

        check_response(query, response)
    }
}

/// Rejects responses that carry a top-level `errors` field, logging the
/// query alongside the payload so the failure can be diagnosed.
pub fn check_response(
    query: &str,
    response: serde_json::Value,
) -> Result<serde_json::Value, GatewayError> {
    match response.get("errors") {
        Some(errors) => {
            error!(%query, %errors, "GitHub rejected GraphQL query");
            Err(GatewayError::Api {
                query: query.to_string(),
                errors: errors.clone(),
            })
        }
        None => Ok(response),
    }
}

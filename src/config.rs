use std::{collections::BTreeMap, fmt, path::Path, time::Duration};

use serde::Deserialize;

use crate::{error::ConfigError, types::PrState};

pub const DEFAULT_MAX_PR_AGE_DAYS: u32 = 31;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub token. Kept out of `Debug` output so configs can be logged.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Result<Self, ConfigError> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(ConfigError::MissingSetting("GITHUB_BEARER_TOKEN"));
        }
        Ok(Self(token))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// How a GitHub user is addressed in chat.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    pub display: String,
    /// Token that notifies the user, e.g. `@karen` or `<@U024BE7LH>`.
    /// Defaults to `@` followed by the display name.
    #[serde(default)]
    pub mention: Option<String>,
}

impl Identity {
    pub fn new(display: impl Into<String>, mention: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            mention: Some(mention.into()),
        }
    }

    pub fn mention(&self) -> String {
        self.mention
            .clone()
            .unwrap_or_else(|| format!("@{}", self.display))
    }
}

/// Maps GitHub logins to chat identities.
///
/// Only `developers` have their pull requests reported. `reviewers` are
/// additional people whose names get translated; every developer is
/// implicitly a reviewer too. Logins in neither table pass through unchanged.
///
/// ```toml
/// [developers.karenc]
/// display = "karen"
///
/// [reviewers.tomjw64]
/// display = "Thomas"
/// mention = "<@U024BE7LH>"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityTable {
    #[serde(default)]
    pub developers: BTreeMap<String, Identity>,
    #[serde(default)]
    pub reviewers: BTreeMap<String, Identity>,
}

impl IdentityTable {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::ReadIdentities {
                path: path.to_path_buf(),
                source,
            })?;
        toml::from_str(&content).map_err(|source| ConfigError::ParseIdentities {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn is_developer(&self, login: &str) -> bool {
        self.developers.contains_key(login)
    }

    fn lookup(&self, login: &str) -> Option<&Identity> {
        self.developers
            .get(login)
            .or_else(|| self.reviewers.get(login))
    }

    pub fn mention(&self, login: &str) -> String {
        self.lookup(login)
            .map(Identity::mention)
            .unwrap_or_else(|| login.to_string())
    }

    pub fn display(&self, login: &str) -> String {
        self.lookup(login)
            .map(|identity| identity.display.clone())
            .unwrap_or_else(|| login.to_string())
    }
}

/// Everything a single digest run needs.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: BearerToken,
    pub organization: String,
    pub state: PrState,
    /// Pull requests idle for this many days or more are left out.
    pub max_pr_age: u32,
    pub timeout: Duration,
    pub identities: IdentityTable,
}

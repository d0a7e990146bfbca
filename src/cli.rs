use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;

use crate::{
    config::{
        BearerToken, Config, DEFAULT_MAX_PR_AGE_DAYS, DEFAULT_TIMEOUT, IdentityTable,
    },
    error::ConfigError,
    types::PrState,
};

const BUILD_INFO_HUMAN: &str = env!("BUILD_INFO_HUMAN");

#[derive(Parser, Debug)]
#[command(
    name = "prdigest",
    about = "Post a digest of an organization's open pull requests, mentioning whoever owes the next move"
)]
#[command(long_version = BUILD_INFO_HUMAN)]
struct CliArgs {
    /// GitHub token used as the bearer credential
    #[arg(
        long,
        env = "GITHUB_BEARER_TOKEN",
        hide_env_values = true,
        value_name = "TOKEN"
    )]
    pub token: String,

    /// GitHub organization whose repositories are scanned
    #[arg(short = 'o', long, env = "ORGANIZATION", value_name = "LOGIN")]
    pub organization: String,

    /// Leave out pull requests idle for this many days or more
    #[arg(long, env = "MAX_PR_AGE", default_value_t = DEFAULT_MAX_PR_AGE_DAYS, value_name = "DAYS")]
    pub max_pr_age: u32,

    /// Pull request state to report on
    #[arg(long, value_enum, default_value_t = PrState::Open)]
    pub state: PrState,

    /// TOML file mapping GitHub logins to chat identities
    #[arg(short = 'i', long, env = "PRDIGEST_IDENTITIES", value_name = "PATH")]
    pub identities: Option<PathBuf>,

    /// Give up on the GitHub request after this many seconds
    #[arg(long, env = "PRDIGEST_TIMEOUT", default_value_t = DEFAULT_TIMEOUT.as_secs(), value_name = "SECONDS")]
    pub timeout: u64,
}

impl CliArgs {
    fn into_config(self) -> Result<Config> {
        let token = BearerToken::new(self.token)?;

        let organization = self.organization.trim().to_string();
        if organization.is_empty() {
            return Err(ConfigError::MissingSetting("ORGANIZATION").into());
        }

        let path = self
            .identities
            .as_deref()
            .ok_or(ConfigError::MissingSetting("PRDIGEST_IDENTITIES"))?;
        let identities = IdentityTable::load(path)?;

        if self.timeout == 0 {
            anyhow::bail!("--timeout must be at least one second");
        }

        Ok(Config {
            token,
            organization,
            state: self.state,
            max_pr_age: self.max_pr_age,
            timeout: Duration::from_secs(self.timeout),
            identities,
        })
    }
}

/// Parses command-line arguments, falling back to the environment for each
/// setting, and loads the identity table.
///
/// Fails before any network traffic if a required setting is missing or the
/// identity table cannot be read.
pub fn parse_args<I, T>(args: I) -> Result<Config>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = CliArgs::try_parse_from(args)?;
    let identities = cli.identities.clone();
    cli.into_config().with_context(|| match identities {
        Some(path) => format!("invalid configuration (identities: {})", path.display()),
        None => "invalid configuration".to_string(),
    })
}

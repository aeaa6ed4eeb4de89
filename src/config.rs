use std::str::FromStr;
use std::time::Duration;
use anyhow::{bail, Context};
use once_cell::sync::OnceCell;
use url::Url;
use crate::endpoints::Endpoints;

pub const ENV_VAR: &str = "SOCIAL_API_ENV";
pub const BASE_URL_VAR: &str = "SOCIAL_API_BASE_URL";
pub const TIMEOUT_VAR: &str = "SOCIAL_API_TIMEOUT_SECS";

const DEVELOPMENT_BASE_URL: &str = "http://localhost:8001/api";
const PRODUCTION_BASE_URL: &str = "https://twitter-b01m.onrender.com/api";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

static GLOBAL_CONFIG: OnceCell<ApiConfig> = OnceCell::new();

fn read_env(name: &str) -> anyhow::Result<Option<String>> {
    match std::env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Could not read {}", name)),
    }
}

/// The deployment the client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {

    /// Detects the environment from [`ENV_VAR`]. \
    /// Falls back to [`Environment::Development`] for debug builds and [`Environment::Production`] otherwise.
    pub fn detect() -> anyhow::Result<Self> {
        Self::detect_with(read_env)
    }

    fn detect_with(lookup: impl Fn(&str) -> anyhow::Result<Option<String>>) -> anyhow::Result<Self> {
        match lookup(ENV_VAR)? {
            Some(value) => value.parse(),
            None => Ok(Self::build_default()),
        }
    }

    fn build_default() -> Self {
        if cfg!(debug_assertions) {
            Self::Development
        } else {
            Self::Production
        }
    }

    pub fn default_base_url(&self) -> Url {
        let url = match self {
            Environment::Development => DEVELOPMENT_BASE_URL,
            Environment::Production => PRODUCTION_BASE_URL,
        };
        Url::parse(url).expect("Default base urls are valid")
    }

}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => bail!("Unknown environment {:?} in {}", other, ENV_VAR),
        }
    }
}

/// Process wide client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub environment: Environment,
    pub base_url: Url,
    pub timeout: Duration,
}

impl ApiConfig {

    /// Configuration for `environment` with its default host
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            base_url: environment.default_base_url(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Reads the configuration from the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(read_env)
    }

    /// Builds the configuration from variables resolved through `lookup`
    fn from_lookup(lookup: impl Fn(&str) -> anyhow::Result<Option<String>>) -> anyhow::Result<Self> {
        let mut config = Self::for_environment(Environment::detect_with(&lookup)?);
        if let Some(base_url) = lookup(BASE_URL_VAR)? {
            config.base_url = Url::parse(base_url.trim())
                .with_context(|| format!("{} is not a valid url", BASE_URL_VAR))?;
        }
        if let Some(timeout) = lookup(TIMEOUT_VAR)? {
            let secs: u64 = timeout.trim().parse()
                .with_context(|| format!("{} must be a whole number of seconds", TIMEOUT_VAR))?;
            config.timeout = Duration::from_secs(secs);
        }
        log::debug!("Resolved api configuration: {:?} at {}", config.environment, config.base_url);
        Ok(config)
    }

    /// The configuration of this process, resolved from the environment on first use
    pub fn global() -> anyhow::Result<&'static ApiConfig> {
        GLOBAL_CONFIG.get_or_try_init(Self::from_env)
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(self.base_url.clone())
    }

}

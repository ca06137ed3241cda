use std::path::Path;
use std::time::Duration;

use pushline_batch::{BatchConfig, PushMode, SpoolConfig};
use pushline_protocol::{ApiKey, Environment, ServiceEndpoints, SourceScope};
use pushline_transport::{HttpSettings, RetryPolicy};
use pushline_types::{ConfigError, DEFAULT_REQUEST_TIMEOUT_SECS, MAX_REQUEST_SIZE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SdkError, SdkResult};

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "PUSHLINE_API_KEY";

/// Everything a [`crate::PushClient`] needs to reach one source.
///
/// Loaded from TOML; every field has a default so a file only needs the
/// organization, the source, and a key (or the key in the environment).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub organization_id: String,
    pub source_id: String,
    pub api_key: Option<ApiKey>,
    pub environment: Environment,
    /// Overrides the environment's Push API base URL.
    pub push_api_url: Option<String>,
    /// Overrides the environment's platform base URL.
    pub platform_url: Option<String>,
    pub mode: PushMode,
    /// Byte ceiling of one batch.
    pub max_request_size: usize,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
    pub spool: Option<SpoolConfig>,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            organization_id: String::new(),
            source_id: String::new(),
            api_key: None,
            environment: Environment::Prod,
            push_api_url: None,
            platform_url: None,
            mode: PushMode::PlainBatch,
            max_request_size: MAX_REQUEST_SIZE,
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
            spool: None,
        }
    }
}

impl PushConfig {
    pub fn new(
        organization_id: impl Into<String>,
        source_id: impl Into<String>,
        api_key: ApiKey,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            source_id: source_id.into(),
            api_key: Some(api_key),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        toml::from_str(text).map_err(|e| ConfigError::Invalid(e.message().to_string()).into())
    }

    /// Read a TOML file and apply the environment override.
    pub fn load(path: &Path) -> SdkResult<Self> {
        debug!(path = %path.display(), "loading config");
        let text = std::fs::read_to_string(path).map_err(|e| SdkError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut config = toml::from_str::<Self>(&text).map_err(|e| SdkError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.message().to_string(),
        })?;
        config.apply_env()?;
        Ok(config)
    }

    /// Take the API key from [`API_KEY_ENV`] when it is set.
    pub fn apply_env(&mut self) -> SdkResult<()> {
        self.override_api_key(std::env::var(API_KEY_ENV).ok())
    }

    pub fn override_api_key(&mut self, key: Option<String>) -> SdkResult<()> {
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            self.api_key = Some(ApiKey::new(key)?);
        }
        Ok(())
    }

    pub fn to_toml(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()).into())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.organization_id.is_empty() {
            return Err(ConfigError::Missing("organization_id"));
        }
        if self.source_id.is_empty() {
            return Err(ConfigError::Missing("source_id"));
        }
        if self.api_key.is_none() && self.spool.is_none() {
            return Err(ConfigError::Missing("api_key"));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be positive".into()));
        }
        self.batch_config().validate()?;
        self.endpoints()?;
        Ok(())
    }

    pub fn endpoints(&self) -> Result<ServiceEndpoints, ConfigError> {
        let defaults = ServiceEndpoints::from(self.environment);
        match (&self.push_api_url, &self.platform_url) {
            (None, None) => Ok(defaults),
            (push, platform) => ServiceEndpoints::custom(
                push.as_deref().unwrap_or(&defaults.push_api),
                platform.as_deref().unwrap_or(&defaults.platform),
            ),
        }
    }

    pub fn scope(&self) -> SourceScope {
        SourceScope::new(&self.organization_id, &self.source_id)
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            ceiling: self.max_request_size,
            mode: self.mode,
            spool: self.spool.clone(),
        }
    }

    pub fn http_settings(&self) -> Result<HttpSettings, ConfigError> {
        let api_key = self.api_key.clone().ok_or(ConfigError::Missing("api_key"))?;
        let mut settings = HttpSettings::new(self.endpoints()?, self.scope(), api_key);
        settings.timeout = Duration::from_secs(self.timeout_secs);
        Ok(settings)
    }
}

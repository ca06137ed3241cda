use std::fmt;
use std::str::FromStr;

use pushline_types::ConfigError;
use serde::{Deserialize, Serialize};
use url::Url;

/// Deployment a client talks to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Prod,
    Hipaa,
    Qa,
    Dev,
}

impl Environment {
    pub fn push_api_url(self) -> &'static str {
        match self {
            Self::Prod => "https://api.cloud.coveo.com/push/v1",
            Self::Hipaa => "https://apihipaa.cloud.coveo.com/push/v1",
            Self::Qa => "https://apiqa.cloud.coveo.com/push/v1",
            Self::Dev => "https://apidev.cloud.coveo.com/push/v1",
        }
    }

    pub fn platform_url(self) -> &'static str {
        match self {
            Self::Prod => "https://platform.cloud.coveo.com",
            Self::Hipaa => "https://platformhipaa.cloud.com",
            Self::Qa => "https://platformqa.cloud.coveo.com",
            Self::Dev => "https://platformdev.cloud.coveo.com",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Prod => "prod",
            Self::Hipaa => "hipaa",
            Self::Qa => "qa",
            Self::Dev => "dev",
        })
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prod" => Ok(Self::Prod),
            "hipaa" => Ok(Self::Hipaa),
            "qa" => Ok(Self::Qa),
            "dev" => Ok(Self::Dev),
            other => Err(ConfigError::Invalid(format!("unknown environment `{other}`"))),
        }
    }
}

/// Base URLs of the two services a client calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub push_api: String,
    pub platform: String,
}

impl ServiceEndpoints {
    /// Explicit base URLs, e.g. a local test server. Trailing slashes are
    /// dropped.
    pub fn custom(push_api: &str, platform: &str) -> Result<Self, ConfigError> {
        for base in [push_api, platform] {
            Url::parse(base).map_err(|e| ConfigError::Invalid(format!("{base}: {e}")))?;
        }
        Ok(Self {
            push_api: push_api.trim_end_matches('/').to_string(),
            platform: platform.trim_end_matches('/').to_string(),
        })
    }
}

impl From<Environment> for ServiceEndpoints {
    fn from(env: Environment) -> Self {
        Self {
            push_api: env.push_api_url().to_string(),
            platform: env.platform_url().to_string(),
        }
    }
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Environment::default().into()
    }
}

/// Organization and source a client pushes into.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceScope {
    pub organization_id: String,
    pub source_id: String,
}

impl SourceScope {
    pub fn new(organization_id: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            source_id: source_id.into(),
        }
    }
}

/// Resource paths, relative to `{push_api}/organizations/{org}` unless noted.
pub mod paths {
    pub fn source_status(src: &str) -> String {
        format!("sources/{src}/status")
    }

    pub const FILES: &str = "files";

    pub fn stream_open(src: &str) -> String {
        format!("sources/{src}/stream/open")
    }

    pub fn stream_chunk(src: &str, stream_id: &str) -> String {
        format!("sources/{src}/stream/{stream_id}/chunk")
    }

    pub fn stream_close(src: &str, stream_id: &str) -> String {
        format!("sources/{src}/stream/{stream_id}/close")
    }

    pub fn stream_update(src: &str) -> String {
        format!("sources/{src}/stream/update")
    }

    pub fn documents(src: &str) -> String {
        format!("sources/{src}/documents")
    }

    pub fn documents_batch(src: &str) -> String {
        format!("sources/{src}/documents/batch")
    }

    pub fn documents_older_than(src: &str) -> String {
        format!("sources/{src}/documents/olderthan")
    }

    pub fn provider_permissions(provider: &str) -> String {
        format!("providers/{provider}/permissions")
    }

    pub fn provider_mappings(provider: &str) -> String {
        format!("providers/{provider}/mappings")
    }

    pub fn provider_permissions_batch(provider: &str) -> String {
        format!("providers/{provider}/permissions/batch")
    }

    pub fn provider_permissions_older_than(provider: &str) -> String {
        format!("providers/{provider}/permissions/olderthan")
    }

    /// Relative to `{platform}/rest/organizations/{org}`.
    pub fn security_provider(provider: &str) -> String {
        format!("securityproviders/{provider}")
    }
}

/// Query parameter names.
pub mod params {
    pub const STATUS_TYPE: &str = "statusType";
    pub const FILE_ID: &str = "fileId";
    pub const ORDERING_ID: &str = "orderingId";
    pub const DOCUMENT_ID: &str = "documentId";
    pub const QUEUE_DELAY: &str = "queueDelay";
    pub const DELETE_CHILDREN: &str = "deleteChildren";
    pub const COMPRESSION_TYPE: &str = "compressionType";
}

/// Headers required on blob uploads.
pub mod headers {
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const JSON: &str = "application/json";
    pub const SERVER_SIDE_ENCRYPTION: &str = "x-amz-server-side-encryption";
    pub const SERVER_SIDE_ENCRYPTION_VALUE: &str = "AES256";
}

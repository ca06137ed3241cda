use std::fmt;
use std::sync::LazyLock;

use pushline_types::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};

static API_KEY_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\w{10}-\w{4}-\w{4}-\w{4}-\w{12}$").expect("API key pattern is valid")
});

/// API key presented as a bearer token on every service call.
///
/// The format is checked at construction; the value never shows up in
/// `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into();
        if !API_KEY_FORMAT.is_match(&key) {
            return Err(ConfigError::MalformedCredential);
        }
        Ok(Self(key))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Value of the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl TryFrom<String> for ApiKey {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ApiKey> for String {
    fn from(key: ApiKey) -> Self {
        key.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "ApiKey({prefix}****)")
    }
}

/// How a request authenticates.
#[derive(Clone, Debug, Default)]
pub enum AuthMethod {
    /// `Authorization: Bearer <key>`, used for Push and Platform API calls.
    Bearer(ApiKey),
    /// No credentials; pre-signed upload URIs carry their own.
    #[default]
    Anonymous,
}

impl AuthMethod {
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Anonymous)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Bearer(_) => "bearer-token",
            Self::Anonymous => "anonymous",
        }
    }

    pub fn header_value(&self) -> Option<String> {
        match self {
            Self::Bearer(key) => Some(key.bearer()),
            Self::Anonymous => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "xx12345678-abcd-ef01-2345-6789abcdef01";

    #[test]
    fn accepts_well_formed_key() {
        let key = ApiKey::new(KEY).unwrap();
        assert_eq!(key.expose(), KEY);
        assert_eq!(key.bearer(), format!("Bearer {KEY}"));
    }

    #[test]
    fn rejects_malformed_keys() {
        for bad in ["", "abc", "xx12345678-abcd-ef01-2345", "xx12345678_abcd_ef01_2345_6789abcdef01"] {
            assert_eq!(ApiKey::new(bad), Err(ConfigError::MalformedCredential), "{bad}");
        }
    }

    #[test]
    fn debug_hides_secret() {
        let key = ApiKey::new(KEY).unwrap();
        let shown = format!("{key:?}");
        assert!(!shown.contains(KEY));
        assert!(shown.starts_with("ApiKey(xx12"));
    }

    #[test]
    fn serde_validates() {
        let key: ApiKey = serde_json::from_str(&format!("\"{KEY}\"")).unwrap();
        assert_eq!(key.expose(), KEY);
        assert!(serde_json::from_str::<ApiKey>("\"nope\"").is_err());
    }

    #[test]
    fn auth_methods() {
        assert!(!AuthMethod::Anonymous.is_authenticated());
        assert_eq!(AuthMethod::default().display_name(), "anonymous");
        let bearer = AuthMethod::Bearer(ApiKey::new(KEY).unwrap());
        assert!(bearer.is_authenticated());
        assert_eq!(bearer.header_value(), Some(format!("Bearer {KEY}")));
    }
}

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use pushline_types::{ConfigError, MAX_REQUEST_SIZE};
use serde::{Deserialize, Serialize};

/// How batches reach the service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PushMode {
    /// Each flush uploads to a fresh location and registers it as a
    /// document batch.
    #[default]
    PlainBatch,
    /// A long-lived stream: each flush uploads to the stream's current
    /// chunk and rotates to the next one. The stream must be closed.
    OpenStream,
    /// Each flush uploads to a fresh location and registers it as an
    /// update of an existing stream.
    UpdateStream,
}

impl fmt::Display for PushMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PlainBatch => "plain-batch",
            Self::OpenStream => "open-stream",
            Self::UpdateStream => "update-stream",
        })
    }
}

impl FromStr for PushMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain-batch" | "push" => Ok(Self::PlainBatch),
            "open-stream" | "stream" => Ok(Self::OpenStream),
            "update-stream" | "updatestream" => Ok(Self::UpdateStream),
            other => Err(ConfigError::Invalid(format!("unknown push mode `{other}`"))),
        }
    }
}

/// Write batches to local files instead of the network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpoolConfig {
    pub dir: PathBuf,
    /// Number of the first file written.
    #[serde(default = "default_offset")]
    pub offset: u64,
}

fn default_offset() -> u64 {
    1
}

impl SpoolConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            offset: default_offset(),
        }
    }
}

/// Configuration of a batch accumulator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum serialized size of one batch.
    pub ceiling: usize,
    pub mode: PushMode,
    pub spool: Option<SpoolConfig>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            ceiling: MAX_REQUEST_SIZE,
            mode: PushMode::PlainBatch,
            spool: None,
        }
    }
}

impl BatchConfig {
    pub fn new(mode: PushMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Lower the ceiling. Raising it above the hard maximum is an error.
    pub fn with_ceiling(mut self, ceiling: usize) -> Result<Self, ConfigError> {
        self.ceiling = ceiling;
        self.validate()?;
        Ok(self)
    }

    pub fn with_spool(mut self, spool: SpoolConfig) -> Self {
        self.spool = Some(spool);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ceiling == 0 {
            return Err(ConfigError::ZeroCeiling);
        }
        if self.ceiling > MAX_REQUEST_SIZE {
            return Err(ConfigError::CeilingTooLarge {
                requested: self.ceiling,
                max: MAX_REQUEST_SIZE,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BatchConfig::default();
        assert_eq!(config.ceiling, 250 * 1024 * 1024 - 32);
        assert_eq!(config.mode, PushMode::PlainBatch);
        assert!(config.spool.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn ceiling_bounds() {
        assert_eq!(
            BatchConfig::default().with_ceiling(MAX_REQUEST_SIZE + 1),
            Err(ConfigError::CeilingTooLarge {
                requested: MAX_REQUEST_SIZE + 1,
                max: MAX_REQUEST_SIZE
            })
        );
        assert_eq!(
            BatchConfig::default().with_ceiling(0),
            Err(ConfigError::ZeroCeiling)
        );
        assert_eq!(BatchConfig::default().with_ceiling(150).unwrap().ceiling, 150);
    }

    #[test]
    fn mode_names() {
        for mode in [PushMode::PlainBatch, PushMode::OpenStream, PushMode::UpdateStream] {
            assert_eq!(mode.to_string().parse::<PushMode>().unwrap(), mode);
        }
        assert_eq!("stream".parse::<PushMode>().unwrap(), PushMode::OpenStream);
        assert!("bulk".parse::<PushMode>().is_err());
    }

    #[test]
    fn spool_offset_defaults_to_one() {
        let spool: SpoolConfig = serde_json::from_str(r#"{"dir": "out"}"#).unwrap();
        assert_eq!(spool.offset, 1);
    }
}

//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `DATALAYER_*` environment variables.

pub mod error;
pub mod remote;


pub use error::{ConfigError, ConfigResult};
pub use remote::{Credentials, RemoteConfig, RemoteConfigHandle, RemoteConfigOverrides};

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::DEFAULT_MEMORY_CAPACITY;

/// What to do when a disk-tier file exists but cannot be deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorruptEntryPolicy {
    /// Surface [`crate::CacheError::CorruptEntry`] to the caller.
    #[default]
    Fail,
    /// Delete the file and fetch the value from the remote source again.
    Refetch,
}

impl FromStr for CorruptEntryPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail" | "error" => Ok(Self::Fail),
            "refetch" | "remote" => Ok(Self::Refetch),
            _ => Err(ConfigError::InvalidPolicy {
                value: s.to_string(),
            }),
        }
    }
}

/// Cache configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `DATALAYER_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Storage root; the disk tier lives under `<root>/data_layer/cache`.
    /// Default: `None` (resolved to `~/.datalayer/mainnet` at use).
    pub storage_root: Option<PathBuf>,

    /// Max entries in the memory tier. Default: `10_000`.
    pub memory_capacity: u64,

    /// Memory tier time-to-live. Default: `None` (entries live until evicted or invalidated).
    pub memory_ttl: Option<Duration>,

    /// De-duplicate concurrent cold misses for the same key. Default: `true`.
    pub single_flight: bool,

    /// Behaviour on undecodable disk entries. Default: [`CorruptEntryPolicy::Fail`].
    pub on_corrupt: CorruptEntryPolicy,

    /// Remote source settings.
    pub remote: RemoteConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_root: None,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            memory_ttl: None,
            single_flight: true,
            on_corrupt: CorruptEntryPolicy::default(),
            remote: RemoteConfig::default(),
        }
    }
}

impl Config {
    const ENV_ROOT: &'static str = "DATALAYER_ROOT";
    const ENV_RPC_URL: &'static str = "DATALAYER_RPC_URL";
    const ENV_RPC_TOKEN: &'static str = "DATALAYER_RPC_TOKEN";
    const ENV_RPC_TIMEOUT_MS: &'static str = "DATALAYER_RPC_TIMEOUT_MS";
    const ENV_MEMORY_CAPACITY: &'static str = "DATALAYER_MEMORY_CAPACITY";
    const ENV_MEMORY_TTL_SECS: &'static str = "DATALAYER_MEMORY_TTL_SECS";
    const ENV_SINGLE_FLIGHT: &'static str = "DATALAYER_SINGLE_FLIGHT";
    const ENV_ON_CORRUPT: &'static str = "DATALAYER_ON_CORRUPT";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> ConfigResult<Self> {
        let defaults = Self::default();

        let storage_root = Self::parse_optional_path_from_env(Self::ENV_ROOT);
        let memory_capacity =
            Self::parse_u64_from_env(Self::ENV_MEMORY_CAPACITY)?.unwrap_or(defaults.memory_capacity);
        let memory_ttl = match Self::parse_u64_from_env(Self::ENV_MEMORY_TTL_SECS)? {
            Some(0) | None => defaults.memory_ttl,
            Some(secs) => Some(Duration::from_secs(secs)),
        };
        let single_flight =
            Self::parse_bool_from_env(Self::ENV_SINGLE_FLIGHT)?.unwrap_or(defaults.single_flight);
        let on_corrupt = match Self::parse_optional_string_from_env(Self::ENV_ON_CORRUPT) {
            Some(value) => value.parse()?,
            None => defaults.on_corrupt,
        };

        let endpoint = Self::parse_optional_string_from_env(Self::ENV_RPC_URL)
            .unwrap_or(defaults.remote.endpoint);
        let credentials =
            Self::parse_optional_string_from_env(Self::ENV_RPC_TOKEN).map(Credentials::bearer);
        let timeout = Self::parse_u64_from_env(Self::ENV_RPC_TIMEOUT_MS)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.remote.timeout);

        Ok(Self {
            storage_root,
            memory_capacity,
            memory_ttl,
            single_flight,
            on_corrupt,
            remote: RemoteConfig {
                endpoint,
                credentials,
                timeout,
            },
        })
    }

    /// Validates paths and basic invariants (does not create directories).
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(ref root) = self.storage_root
            && root.exists()
            && !root.is_dir()
        {
            return Err(ConfigError::NotADirectory { path: root.clone() });
        }

        let endpoint = self.remote.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::InvalidEndpoint {
                value: self.remote.endpoint.clone(),
            });
        }

        Ok(())
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        Self::parse_optional_string_from_env(var_name).map(PathBuf::from)
    }

    fn parse_u64_from_env(var_name: &'static str) -> ConfigResult<Option<u64>> {
        match Self::parse_optional_string_from_env(var_name) {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::InvalidNumber {
                    name: var_name,
                    value,
                    source: e,
                }),
            None => Ok(None),
        }
    }

    fn parse_bool_from_env(var_name: &'static str) -> ConfigResult<Option<bool>> {
        match Self::parse_optional_string_from_env(var_name) {
            Some(value) => match value.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                _ => Err(ConfigError::InvalidBool {
                    name: var_name,
                    value,
                }),
            },
            None => Ok(None),
        }
    }
}

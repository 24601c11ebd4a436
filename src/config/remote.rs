//! Remote source settings and the swappable snapshot handle.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::constants::{DEFAULT_RPC_TIMEOUT_MS, DEFAULT_RPC_URL};

/// Credentials presented to the remote RPC service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    /// Creates bearer-token credentials.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Returns the bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Settings read by every remote fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Base URL of the RPC service. Default: `https://localhost:8562`.
    pub endpoint: String,

    /// Optional credentials.
    pub credentials: Option<Credentials>,

    /// Per-request timeout. Default: 30s.
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_RPC_URL.to_string(),
            credentials: None,
            timeout: Duration::from_millis(DEFAULT_RPC_TIMEOUT_MS),
        }
    }
}

impl RemoteConfig {
    /// Returns a copy with every `Some` field of `overrides` applied (shallow merge).
    pub fn merged(&self, overrides: &RemoteConfigOverrides) -> Self {
        Self {
            endpoint: overrides
                .endpoint
                .clone()
                .unwrap_or_else(|| self.endpoint.clone()),
            credentials: overrides
                .credentials
                .clone()
                .or_else(|| self.credentials.clone()),
            timeout: overrides.timeout.unwrap_or(self.timeout),
        }
    }
}

/// Partial remote settings accepted by `configure`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteConfigOverrides {
    pub endpoint: Option<String>,
    pub credentials: Option<Credentials>,
    pub timeout: Option<Duration>,
}

impl RemoteConfigOverrides {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self.endpoint.is_none() && self.credentials.is_none() && self.timeout.is_none()
    }
}

/// Shared handle to the current [`RemoteConfig`] snapshot.
///
/// Readers take an `Arc` snapshot and keep using it for the whole request, so a concurrent
/// [`RemoteConfigHandle::apply`] never changes settings under an in-flight call.
#[derive(Clone)]
pub struct RemoteConfigHandle {
    current: Arc<RwLock<Arc<RemoteConfig>>>,
}

impl RemoteConfigHandle {
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<RemoteConfig> {
        Arc::clone(&*self.current.read())
    }

    /// Merges `overrides` into a new snapshot, publishes it and returns it.
    pub fn apply(&self, overrides: &RemoteConfigOverrides) -> Arc<RemoteConfig> {
        let mut current = self.current.write();
        let next = Arc::new(current.merged(overrides));
        *current = Arc::clone(&next);
        next
    }
}

impl Default for RemoteConfigHandle {
    fn default() -> Self {
        Self::new(RemoteConfig::default())
    }
}

impl std::fmt::Debug for RemoteConfigHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfigHandle")
            .field("current", &*self.snapshot())
            .finish()
    }
}

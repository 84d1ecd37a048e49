//! Environment-backed secret store.

use async_trait::async_trait;
use conveyor_core::ports::SecretStore;
use conveyor_core::secrets::SecretValue;
use conveyor_core::{Error, Result};

/// Resolves secret names from the orchestrating process environment,
/// optionally under a prefix (e.g. `CONVEYOR_SECRET_`).
pub struct EnvSecretStore {
    prefix: String,
}

impl EnvSecretStore {
    pub fn new() -> Self {
        Self {
            prefix: String::new(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get(&self, name: &str) -> Result<SecretValue> {
        let key = format!("{}{}", self.prefix, name);
        std::env::var(&key)
            .map(SecretValue::new)
            .map_err(|_| Error::SecretNotFound(name.to_string()))
    }
}

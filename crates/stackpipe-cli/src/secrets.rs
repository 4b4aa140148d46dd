//! Environment-backed secret source.

use async_trait::async_trait;
use stackpipe_core::secret::SecretSource;
use stackpipe_core::{Error, Result, Sensitive};

/// Prefix checked after the bare variable name.
const PREFIX: &str = "STACKPIPE_SECRET_";

/// Reads secret `NAME` from the `NAME` or `STACKPIPE_SECRET_NAME` environment variable.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretSource;

impl EnvSecretSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SecretSource for EnvSecretSource {
    fn name(&self) -> &'static str {
        "env"
    }

    async fn get(&self, name: &str) -> Result<Sensitive> {
        std::env::var(name)
            .or_else(|_| std::env::var(format!("{}{}", PREFIX, name)))
            .map(Sensitive::new)
            .map_err(|_| Error::NotFound(format!("secret '{}'", name)))
    }
}

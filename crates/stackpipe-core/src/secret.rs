//! Secret source abstraction.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::resource::Sensitive;
use crate::{Error, Result};

/// Supplies opaque credential values substituted into declarations.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Name of this source, for diagnostics.
    fn name(&self) -> &'static str;

    /// Get a secret by name. Returns `Error::NotFound` when it is not set.
    async fn get(&self, name: &str) -> Result<Sensitive>;
}

/// In-memory secrets, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretSource {
    secrets: HashMap<String, Sensitive>,
}

impl StaticSecretSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), Sensitive::new(value));
        self
    }
}

#[async_trait]
impl SecretSource for StaticSecretSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn get(&self, name: &str) -> Result<Sensitive> {
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("secret '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_source_lookup() {
        let source = StaticSecretSource::new().with_secret("GITHUB_TOKEN", "ghp_abc");
        assert_eq!(source.get("GITHUB_TOKEN").await.unwrap().expose(), "ghp_abc");
        assert!(matches!(
            source.get("MISSING").await,
            Err(Error::NotFound(_))
        ));
    }
}

//! Bearer token sources.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{FetchError, FetchResult};

/// Supplies the bearer token attached to each request.
///
/// Called once per attempt, so implementations can refresh short-lived
/// credentials between retries.
#[async_trait]
pub trait TokenProvider: Send + Sync + std::fmt::Debug {
    /// `None` sends the request without an `Authorization` header.
    async fn token(&self) -> FetchResult<Option<String>>;
}

/// A fixed token.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> FetchResult<Option<String>> {
        Ok(Some(self.0.clone()))
    }
}

/// Token read from a file on every call.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TokenProvider for TokenFile {
    async fn token(&self) -> FetchResult<Option<String>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            FetchError::Auth(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        let token = content.trim();
        if token.is_empty() {
            return Err(FetchError::Auth(format!(
                "token file {} is empty",
                self.path.display()
            )));
        }
        Ok(Some(token.to_string()))
    }
}

/// Token taken from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl TokenProvider for EnvToken {
    async fn token(&self) -> FetchResult<Option<String>> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
            _ => Err(FetchError::Auth(format!("{} is not set", self.var))),
        }
    }
}

/// No credentials; for local emulators and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

#[async_trait]
impl TokenProvider for NoAuth {
    async fn token(&self) -> FetchResult<Option<String>> {
        Ok(None)
    }
}

/// file: src/auth.rs
/// description: bearer token source consulted once per connection attempt
use crate::error::RealtimeError;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

pub const TOKEN_ENV_VAR: &str = "REALTIME_TOKEN";

/// Supplies a short-lived bearer token for the feed endpoint.
///
/// Called before every connection attempt, including reconnects, so an
/// implementation backed by a refreshing token store hands out a fresh token
/// after an expiry-triggered drop.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> anyhow::Result<SecretString>;
}

/// A fixed token, e.g. from the command line or the environment.
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }

    pub fn from_env() -> Result<Self, RealtimeError> {
        std::env::var(TOKEN_ENV_VAR)
            .map(Self::new)
            .map_err(|_| RealtimeError::Config(format!("{TOKEN_ENV_VAR} is not set")))
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> anyhow::Result<SecretString> {
        Ok(SecretString::from(self.token.expose_secret().to_owned()))
    }
}

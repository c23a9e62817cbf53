use async_trait::async_trait;

use crate::config::Settings;
use crate::error::{Error, Result};

/// Caller identity returned by a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
}

/// External authentication collaborator, specified only at its interface
/// boundary: the engine checks credentials before creating a job but does
/// not implement token issuance or cryptography itself.
#[async_trait]
pub trait AuthGate: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Principal>;
}

/// Accepts exactly one configured token. Stands in for the real gate in
/// demo deployments and tests.
pub struct StaticTokenAuth {
    token: String,
}

impl StaticTokenAuth {
    pub fn new(token: impl Into<String>) -> Self {
        StaticTokenAuth { token: token.into() }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        StaticTokenAuth::new(settings.api_token.clone())
    }
}

#[async_trait]
impl AuthGate for StaticTokenAuth {
    async fn verify(&self, token: &str) -> Result<Principal> {
        if token == self.token {
            Ok(Principal { name: "demo".to_string() })
        } else {
            Err(Error::Authentication("invalid token".to_string()))
        }
    }
}

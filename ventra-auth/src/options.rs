// Authentication options and configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main authentication configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthOptions {
    /// JWT-specific configuration.
    pub jwt: JwtOptions,
    /// Identity cache time-to-live. Role or tenant changes made to a user
    /// can take up to this long to propagate to already-issued sessions.
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            jwt: JwtOptions::default(),
            cache_ttl: Duration::from_secs(5 * 60),
        }
    }
}

impl AuthOptions {
    /// Validate the entire authentication configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.jwt
            .validate()
            .map_err(|e| format!("JWT validation failed: {}", e))
    }
}

/// JWT-specific configuration options. HMAC only; credentials are issued and
/// verified by this process.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtOptions {
    /// Token issuer (iss claim).
    pub issuer: String,
    /// Token audience (aud claim).
    pub audience: Vec<String>,
    /// Access token expiration duration.
    #[serde(with = "humantime_serde")]
    pub access_token_expires_in: Duration,
    /// JWT signing secret.
    pub secret: Option<String>,
}

impl Default for JwtOptions {
    fn default() -> Self {
        Self {
            issuer: "ventra-auth".to_string(),
            audience: vec!["ventra-api".to_string()],
            access_token_expires_in: Duration::from_secs(3600), // 1 hour
            secret: None,
        }
    }
}

impl JwtOptions {
    /// Validate JWT configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.issuer.is_empty() {
            return Err("JWT issuer cannot be empty".to_string());
        }

        if self.audience.is_empty() {
            return Err("JWT audience cannot be empty".to_string());
        }

        if self.secret.is_none() {
            return Err("A JWT secret must be provided".to_string());
        }

        if self.access_token_expires_in.as_secs() == 0 {
            return Err("Access token expiration must be greater than 0".to_string());
        }

        Ok(())
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_need_a_secret() {
        let options = AuthOptions::default();
        assert!(options.validate().is_err());

        let options = AuthOptions {
            jwt: JwtOptions::default().with_secret("a-test-secret"),
            ..AuthOptions::default()
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn cache_ttl_defaults_to_five_minutes() {
        assert_eq!(AuthOptions::default().cache_ttl, Duration::from_secs(300));
    }
}

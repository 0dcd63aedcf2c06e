// JWT sign/verify.

use anyhow::Result;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{json, Map, Value};
use uuid::Uuid;
use ventra_core::errors::PipelineError;
use ventra_core::identity::Role;

use crate::options::JwtOptions;

/// Signs and verifies HMAC access tokens.
///
/// Verification identifies the subject only; everything else about the
/// caller (role, tenant, active status) comes from the user directory, so
/// stale or tampered claims never drive authorization decisions.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokenCodec;

impl TokenCodec {
    /// Issue an access token for a subject. The role claim is informational
    /// (it lets the tenant middleware pre-check platform admins cheaply via
    /// a full authenticate round); authorization never trusts it directly.
    pub fn issue(&self, jwt: &JwtOptions, subject_id: &str, role: Role) -> Result<String> {
        let secret = jwt.secret.as_ref().ok_or_else(|| {
            PipelineError::store("JWT secret is not configured").into_anyhow()
        })?;

        let now = Utc::now().timestamp();
        let exp = now + jwt.access_token_expires_in.as_secs() as i64;

        let mut claims = Map::new();
        claims.insert("sub".to_string(), Value::String(subject_id.to_string()));
        claims.insert("role".to_string(), Value::String(role.as_str().to_string()));
        claims.insert("iss".to_string(), Value::String(jwt.issuer.clone()));
        claims.insert("aud".to_string(), json!(jwt.audience));
        claims.insert("iat".to_string(), Value::Number(now.into()));
        claims.insert("exp".to_string(), Value::Number(exp.into()));
        claims.insert(
            "jti".to_string(),
            Value::String(Uuid::new_v4().to_string()),
        );

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| PipelineError::store(e.to_string()).into_anyhow())
    }

    /// Issue a token that expired `seconds_ago` seconds ago. Test fixtures
    /// need structurally valid but stale credentials.
    pub fn issue_expired(
        &self,
        jwt: &JwtOptions,
        subject_id: &str,
        role: Role,
        seconds_ago: i64,
    ) -> Result<String> {
        let secret = jwt.secret.as_ref().ok_or_else(|| {
            PipelineError::store("JWT secret is not configured").into_anyhow()
        })?;

        let now = Utc::now().timestamp();
        let mut claims = Map::new();
        claims.insert("sub".to_string(), Value::String(subject_id.to_string()));
        claims.insert("role".to_string(), Value::String(role.as_str().to_string()));
        claims.insert("iss".to_string(), Value::String(jwt.issuer.clone()));
        claims.insert("aud".to_string(), json!(jwt.audience));
        claims.insert("iat".to_string(), Value::Number((now - seconds_ago - 60).into()));
        claims.insert("exp".to_string(), Value::Number((now - seconds_ago).into()));

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| PipelineError::store(e.to_string()).into_anyhow())
    }

    /// Verify a token and return its claims.
    ///
    /// Expiry is reported distinctly from every other failure so the caller
    /// can tell a stale session from a forged one.
    pub fn verify(&self, jwt: &JwtOptions, token: &str) -> Result<Map<String, Value>, PipelineError> {
        let secret = jwt
            .secret
            .as_ref()
            .ok_or_else(|| PipelineError::store("JWT secret is not configured"))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[jwt.issuer.as_str()]);
        validation.set_audience(&jwt.audience.iter().map(|s| s.as_str()).collect::<Vec<_>>());

        let decoded = decode::<Value>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => PipelineError::ExpiredCredential,
            _ => PipelineError::InvalidCredential,
        })?;

        match decoded.claims {
            Value::Object(map) => Ok(map),
            _ => Err(PipelineError::InvalidCredential),
        }
    }

    /// The subject id a verified claim set identifies.
    pub fn subject(claims: &Map<String, Value>) -> Option<&str> {
        claims.get("sub").and_then(|v| v.as_str())
    }

    /// The informational role claim, if present and well-formed.
    pub fn role_claim(claims: &Map<String, Value>) -> Option<Role> {
        claims.get("role").and_then(|v| v.as_str()).and_then(Role::parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt() -> JwtOptions {
        JwtOptions::default().with_secret("unit-test-secret")
    }

    #[test]
    fn round_trip_identifies_subject() {
        let codec = TokenCodec;
        let token = codec.issue(&jwt(), "user-1", Role::TenantUser).unwrap();
        let claims = codec.verify(&jwt(), &token).unwrap();
        assert_eq!(TokenCodec::subject(&claims), Some("user-1"));
        assert_eq!(TokenCodec::role_claim(&claims), Some(Role::TenantUser));
    }

    #[test]
    fn expired_is_distinct_from_invalid() {
        let codec = TokenCodec;
        let token = codec
            .issue_expired(&jwt(), "user-1", Role::TenantUser, 3600)
            .unwrap();
        assert!(matches!(
            codec.verify(&jwt(), &token),
            Err(PipelineError::ExpiredCredential)
        ));

        assert!(matches!(
            codec.verify(&jwt(), "not-a-jwt"),
            Err(PipelineError::InvalidCredential)
        ));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let codec = TokenCodec;
        let token = codec.issue(&jwt(), "user-1", Role::TenantUser).unwrap();
        let other = JwtOptions::default().with_secret("a-different-secret");
        assert!(matches!(
            codec.verify(&other, &token),
            Err(PipelineError::InvalidCredential)
        ));
    }

    #[test]
    fn legacy_role_claims_still_parse() {
        let codec = TokenCodec;
        let token = codec.issue(&jwt(), "admin-1", Role::PlatformAdmin).unwrap();
        let claims = codec.verify(&jwt(), &token).unwrap();
        assert_eq!(TokenCodec::role_claim(&claims), Some(Role::PlatformAdmin));
    }
}

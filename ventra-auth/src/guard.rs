// Session guard: bearer credential → Identity.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use ventra_core::engine::check_tenant_access;
use ventra_core::errors::PipelineError;
use ventra_core::identity::Identity;
use ventra_core::tenant::TenantContext;

use crate::cache::IdentityCache;
use crate::directory::UserDirectory;
use crate::options::AuthOptions;
use crate::token::TokenCodec;

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn extract_bearer(headers: &HashMap<String, String>) -> Option<String> {
    let v = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))?;
    let v = v.trim();
    let prefix = "Bearer ";
    if v.len() <= prefix.len() || !v.starts_with(prefix) {
        return None;
    }
    Some(v[prefix.len()..].trim().to_string())
}

/// Validates bearer credentials and resolves the caller's identity, with
/// the identity cache in front of the directory.
pub struct AuthSessionGuard {
    options: AuthOptions,
    codec: TokenCodec,
    cache: Arc<dyn IdentityCache>,
    directory: Arc<dyn UserDirectory>,
}

impl AuthSessionGuard {
    pub fn new(
        options: AuthOptions,
        cache: Arc<dyn IdentityCache>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            options,
            codec: TokenCodec,
            cache,
            directory,
        }
    }

    pub fn options(&self) -> &AuthOptions {
        &self.options
    }

    /// Authenticate a bearer credential.
    ///
    /// The credential is decoded and verified first; its claims only ever
    /// identify the subject. The identity itself comes from the cache when
    /// fresh, otherwise from the directory (which then repopulates the
    /// cache). A subject that no longer resolves to an active account is
    /// indistinguishable from an invalid credential.
    pub async fn authenticate(&self, credential: Option<&str>) -> Result<Identity> {
        let Some(token) = credential else {
            return Err(PipelineError::Unauthenticated.into_anyhow());
        };

        let claims = self.codec.verify(&self.options.jwt, token)?;
        let subject_id = TokenCodec::subject(&claims)
            .ok_or(PipelineError::InvalidCredential)?
            .to_string();

        if let Some(identity) = self.cache.get(&subject_id) {
            tracing::trace!(subject = %subject_id, "identity cache hit");
            return Ok(identity);
        }

        let identity = self
            .directory
            .find_identity(&subject_id)
            .await
            .map_err(|e| PipelineError::store(e.to_string()))?
            .ok_or(PipelineError::InvalidCredential)?;

        self.cache.put(&subject_id, identity.clone());
        Ok(identity)
    }

    /// Authenticate and enforce tenant isolation against the resolved
    /// context. This is the variant every tenant-scoped request goes
    /// through; the mismatch check is mandatory, not per-route.
    pub async fn authenticate_for(
        &self,
        credential: Option<&str>,
        tenant: Option<&TenantContext>,
    ) -> Result<Identity> {
        let identity = self.authenticate(credential).await?;

        if let Err(e) = check_tenant_access(&identity, tenant) {
            tracing::warn!(
                subject = %identity.id,
                role = %identity.role,
                tenant = tenant.map(|t| t.id.as_str()).unwrap_or("-"),
                error = %e,
                "tenant access rejected"
            );
            return Err(e.into_anyhow());
        }

        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use ventra_core::identity::Role;
    use ventra_core::tenant::{TenantId, TenantStatus};

    use crate::cache::{MemoryIdentityCache, NoopIdentityCache};
    use crate::directory::{MemoryUserDirectory, UserAccount};
    use crate::options::JwtOptions;

    fn options() -> AuthOptions {
        AuthOptions {
            jwt: JwtOptions::default().with_secret("guard-test-secret"),
            cache_ttl: Duration::from_secs(300),
        }
    }

    fn guard_with(
        cache: Arc<dyn IdentityCache>,
    ) -> (AuthSessionGuard, Arc<MemoryUserDirectory>, TokenCodec) {
        let directory = Arc::new(MemoryUserDirectory::new(cache.clone()));
        directory.insert(UserAccount::new(
            "user-1",
            "alice",
            Role::TenantUser,
            Some(TenantId::new("acme")),
        ));
        directory.insert(UserAccount::new("root-1", "root", Role::PlatformAdmin, None));
        (
            AuthSessionGuard::new(options(), cache, directory.clone()),
            directory,
            TokenCodec,
        )
    }

    fn acme(status: TenantStatus) -> TenantContext {
        TenantContext::new("acme", "Acme", "acme", status)
    }

    #[tokio::test]
    async fn missing_credential_is_unauthenticated() {
        let (guard, _, _) = guard_with(Arc::new(NoopIdentityCache));
        let err = guard.authenticate(None).await.unwrap_err();
        assert!(matches!(
            PipelineError::from_anyhow(&err),
            Some(PipelineError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn garbage_and_expired_credentials_are_distinct() {
        let (guard, _, codec) = guard_with(Arc::new(NoopIdentityCache));

        let err = guard.authenticate(Some("garbage")).await.unwrap_err();
        assert!(matches!(
            PipelineError::from_anyhow(&err),
            Some(PipelineError::InvalidCredential)
        ));

        let stale = codec
            .issue_expired(&options().jwt, "user-1", Role::TenantUser, 3600)
            .unwrap();
        let err = guard.authenticate(Some(&stale)).await.unwrap_err();
        assert!(matches!(
            PipelineError::from_anyhow(&err),
            Some(PipelineError::ExpiredCredential)
        ));
    }

    #[tokio::test]
    async fn unknown_subject_is_invalid_credential() {
        let (guard, _, codec) = guard_with(Arc::new(NoopIdentityCache));
        let token = codec
            .issue(&options().jwt, "deleted-user", Role::TenantUser)
            .unwrap();
        let err = guard.authenticate(Some(&token)).await.unwrap_err();
        assert!(matches!(
            PipelineError::from_anyhow(&err),
            Some(PipelineError::InvalidCredential)
        ));
    }

    #[tokio::test]
    async fn cache_hit_skips_the_directory() {
        let cache = Arc::new(MemoryIdentityCache::new(Duration::from_secs(300)));
        let (guard, directory, codec) = guard_with(cache.clone());
        let token = codec.issue(&options().jwt, "user-1", Role::TenantUser).unwrap();

        let first = guard.authenticate(Some(&token)).await.unwrap();
        assert_eq!(first.id, "user-1");

        // Deactivate directly in the directory's map: within the TTL the
        // cached identity is still served. This is the documented
        // correctness/performance trade-off.
        directory.insert(UserAccount {
            is_active: false,
            ..UserAccount::new("user-1", "alice", Role::TenantUser, Some(TenantId::new("acme")))
        });
        let second = guard.authenticate(Some(&token)).await.unwrap();
        assert_eq!(second.id, "user-1");

        // After invalidation the directory is authoritative again.
        cache.invalidate("user-1");
        assert!(guard.authenticate(Some(&token)).await.is_err());
    }

    #[tokio::test]
    async fn tenant_mismatch_is_enforced() {
        let (guard, _, codec) = guard_with(Arc::new(NoopIdentityCache));
        let token = codec.issue(&options().jwt, "user-1", Role::TenantUser).unwrap();

        let globex = TenantContext::new("globex", "Globex", "globex", TenantStatus::Active);
        let err = guard
            .authenticate_for(Some(&token), Some(&globex))
            .await
            .unwrap_err();
        assert!(matches!(
            PipelineError::from_anyhow(&err),
            Some(PipelineError::TenantMismatch)
        ));

        assert!(guard
            .authenticate_for(Some(&token), Some(&acme(TenantStatus::Active)))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn suspended_tenant_blocks_members_not_platform_admins() {
        let (guard, _, codec) = guard_with(Arc::new(NoopIdentityCache));
        let suspended = acme(TenantStatus::Suspended);

        let token = codec.issue(&options().jwt, "user-1", Role::TenantUser).unwrap();
        let err = guard
            .authenticate_for(Some(&token), Some(&suspended))
            .await
            .unwrap_err();
        assert!(matches!(
            PipelineError::from_anyhow(&err),
            Some(PipelineError::TenantSuspended)
        ));

        let root = codec.issue(&options().jwt, "root-1", Role::PlatformAdmin).unwrap();
        assert!(guard
            .authenticate_for(Some(&root), Some(&suspended))
            .await
            .is_ok());
    }

    #[test]
    fn bearer_extraction_matches_the_header_shape() {
        let mut headers = HashMap::new();
        headers.insert("authorization".to_string(), "Bearer abc.def.ghi".to_string());
        assert_eq!(extract_bearer(&headers), Some("abc.def.ghi".to_string()));

        headers.insert("authorization".to_string(), "Basic xyz".to_string());
        assert_eq!(extract_bearer(&headers), None);

        headers.insert("authorization".to_string(), "Bearer ".to_string());
        assert_eq!(extract_bearer(&headers), None);
    }
}

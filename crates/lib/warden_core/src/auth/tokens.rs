//! Token lifecycle manager.
//!
//! Issues access/refresh pairs, enforces token-kind discipline, rotates
//! refresh tokens and maintains the revocation list. A token moves
//! `Issued → Valid → {Expired | Revoked}` and never back.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AuthError;
use super::blacklist::{RevocationStore, token_key};
use super::client_tag;
use super::jwt::JwtCodec;
use crate::models::auth::{TokenClaims, TokenKind, TokenPair};

/// Base access token lifetime: 1 hour.
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 60 * 60;

/// Access token lifetime when "remember me" was requested: 7 days.
pub const DEFAULT_REMEMBER_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Refresh lifetime = access lifetime × this, for normal sessions.
pub const DEFAULT_REFRESH_MULTIPLIER: i64 = 7;

/// Refresh lifetime = access lifetime × this, for remember-me sessions.
pub const DEFAULT_REMEMBER_REFRESH_MULTIPLIER: i64 = 2;

/// Upper bound on any single revocation store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(3);

/// Lifetimes and issuer used by [`TokenManager`].
#[derive(Debug, Clone)]
pub struct TokenSettings {
    /// `iss` claim written and required.
    pub issuer: String,
    pub access_ttl_secs: i64,
    pub remember_ttl_secs: i64,
    pub refresh_multiplier: i64,
    pub remember_refresh_multiplier: i64,
    pub store_timeout: Duration,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            issuer: "warden".to_string(),
            access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            remember_ttl_secs: DEFAULT_REMEMBER_TTL_SECS,
            refresh_multiplier: DEFAULT_REFRESH_MULTIPLIER,
            remember_refresh_multiplier: DEFAULT_REMEMBER_REFRESH_MULTIPLIER,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

impl TokenSettings {
    fn validate(&self) -> Result<(), AuthError> {
        if self.issuer.is_empty() {
            return Err(AuthError::Config("issuer must not be empty".into()));
        }
        if self.access_ttl_secs <= 0 || self.remember_ttl_secs <= 0 {
            return Err(AuthError::Config("token lifetimes must be positive".into()));
        }
        // Refresh tokens must strictly outlive their paired access token.
        if self.refresh_multiplier < 2 || self.remember_refresh_multiplier < 2 {
            return Err(AuthError::Config("refresh multipliers must be at least 2".into()));
        }
        if self.store_timeout.is_zero() {
            return Err(AuthError::Config("store timeout must be non-zero".into()));
        }
        // Every expiry issued from now on must be a representable timestamp.
        let now = Utc::now().timestamp();
        for remember in [false, true] {
            let expiry = self
                .checked_lifetimes(remember)
                .and_then(|(_, refresh)| now.checked_add(refresh))
                .and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0));
            if expiry.is_none() {
                return Err(AuthError::Config("token lifetimes are too large".into()));
            }
        }
        Ok(())
    }

    fn checked_lifetimes(&self, remember: bool) -> Option<(i64, i64)> {
        let (ttl, multiplier) = if remember {
            (self.remember_ttl_secs, self.remember_refresh_multiplier)
        } else {
            (self.access_ttl_secs, self.refresh_multiplier)
        };
        Some((ttl, ttl.checked_mul(multiplier)?))
    }

    /// `(access, refresh)` lifetimes in seconds for a session.
    ///
    /// Saturates on settings that [`TokenManager::new`] would reject.
    pub fn lifetimes(&self, remember: bool) -> (i64, i64) {
        self.checked_lifetimes(remember).unwrap_or_else(|| {
            let ttl = if remember {
                self.remember_ttl_secs
            } else {
                self.access_ttl_secs
            };
            (ttl, i64::MAX)
        })
    }
}

/// Who a pair is issued to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub uid: String,
    pub username: String,
    pub role_id: String,
    /// Per-issuance client key; bound to the pair by the secondary tag.
    pub client_key: String,
}

impl From<&TokenClaims> for TokenSubject {
    fn from(claims: &TokenClaims) -> Self {
        Self {
            uid: claims.uid.clone(),
            username: claims.username.clone(),
            role_id: claims.role_id.clone(),
            client_key: claims.client_key.clone(),
        }
    }
}

/// Process-wide token lifecycle manager.
pub struct TokenManager {
    codec: JwtCodec,
    store: Arc<dyn RevocationStore>,
    settings: TokenSettings,
}

impl TokenManager {
    /// Build a manager signing with `secret` and revoking into `store`.
    pub fn new(
        secret: &[u8],
        settings: TokenSettings,
        store: Arc<dyn RevocationStore>,
    ) -> Result<Self, AuthError> {
        settings.validate()?;
        let codec = JwtCodec::new(secret, &settings.issuer)?;
        Ok(Self {
            codec,
            store,
            settings,
        })
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Issue a fresh access/refresh pair.
    pub fn issue_pair(
        &self,
        subject: &TokenSubject,
        client_secret: &str,
        remember: bool,
    ) -> Result<TokenPair, AuthError> {
        let (access_ttl, refresh_ttl) = self.settings.lifetimes(remember);
        let tag = client_tag::derive(&subject.client_key, client_secret);
        let now = Utc::now().timestamp();

        let access = self.claims_for(subject, &tag, remember, TokenKind::Access, now, access_ttl);
        let refresh =
            self.claims_for(subject, &tag, remember, TokenKind::Refresh, now, refresh_ttl);

        let pair = TokenPair {
            access_token: self.codec.sign(&access)?,
            refresh_token: self.codec.sign(&refresh)?,
            access_expires_in: access_ttl,
            refresh_expires_in: refresh_ttl,
        };
        debug!(uid = %subject.uid, remember, access_ttl, refresh_ttl, "issued token pair");
        Ok(pair)
    }

    fn claims_for(
        &self,
        subject: &TokenSubject,
        tag: &str,
        remember: bool,
        kind: TokenKind,
        now: i64,
        ttl: i64,
    ) -> TokenClaims {
        TokenClaims {
            uid: subject.uid.clone(),
            username: subject.username.clone(),
            role_id: subject.role_id.clone(),
            client_key: subject.client_key.clone(),
            tag: tag.to_string(),
            remember,
            kind,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            nbf: now,
            exp: now.saturating_add(ttl),
            iss: self.settings.issuer.clone(),
            sub: subject.uid.clone(),
        }
    }

    /// Verify a token and check its kind, without consulting the blacklist.
    pub fn decode(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, AuthError> {
        let claims = self.codec.verify(token)?;
        if claims.kind != expected {
            return Err(AuthError::WrongKind {
                expected,
                actual: claims.kind,
            });
        }
        Ok(claims)
    }

    /// Full validation: signature and expiry, then kind, then the blacklist.
    ///
    /// A token that is both expired and revoked reports [`AuthError::Expired`].
    /// An unreadable blacklist fails with [`AuthError::BackingStore`].
    pub async fn validate(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, AuthError> {
        let claims = self.decode(token, expected)?;
        if self.is_revoked(token).await? {
            return Err(AuthError::Revoked);
        }
        Ok(claims)
    }

    /// Exchange a refresh token for a brand-new pair for the same identity.
    ///
    /// The presented refresh token is revoked first, so it is single-use.
    pub async fn refresh(&self, refresh_token: &str, client_secret: &str) -> Result<TokenPair, AuthError> {
        let claims = self.validate(refresh_token, TokenKind::Refresh).await?;

        if !client_tag::verify(&claims.tag, &claims.client_key, client_secret) {
            warn!(uid = %claims.uid, "refresh rejected: client tag mismatch");
            return Err(AuthError::Tamper);
        }

        // Losing a concurrent race here means another refresh already spent it.
        if !self.insert_revoked(refresh_token, claims.exp).await? {
            return Err(AuthError::Revoked);
        }

        let pair = self.issue_pair(&TokenSubject::from(&claims), client_secret, claims.remember)?;
        info!(uid = %claims.uid, "refreshed token pair");
        Ok(pair)
    }

    /// Add a token to the blacklist until its own expiry.
    ///
    /// Already-expired tokens are a no-op. Revoking twice fails with
    /// [`AuthError::AlreadyRevoked`] and leaves the entry in place.
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        let claims = match self.codec.verify(token) {
            Ok(claims) => claims,
            Err(AuthError::Expired) => {
                debug!("revoke skipped: token already expired");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        if !self.insert_revoked(token, claims.exp).await? {
            return Err(AuthError::AlreadyRevoked);
        }
        info!(uid = %claims.uid, kind = %claims.kind, "revoked token");
        Ok(())
    }

    /// Whether the token is on the blacklist.
    pub async fn is_revoked(&self, token: &str) -> Result<bool, AuthError> {
        let key = token_key(token);
        self.bounded(self.store.contains(&key)).await
    }

    /// Purge blacklist entries whose tokens have expired.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        self.bounded(self.store.purge_expired(Utc::now())).await
    }

    /// Spawn a periodic blacklist purge that stops when `cancel` fires.
    pub fn spawn_purge_task(
        self: &Arc<Self>,
        every: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => match manager.purge_expired().await {
                        Ok(0) => {}
                        Ok(purged) => debug!(purged, "purged expired blacklist entries"),
                        Err(e) => warn!(error = %e, "blacklist purge failed"),
                    },
                }
            }
            debug!("blacklist purge task stopped");
        })
    }

    async fn insert_revoked(&self, token: &str, exp: i64) -> Result<bool, AuthError> {
        let expires_at = DateTime::<Utc>::from_timestamp(exp, 0)
            .ok_or_else(|| AuthError::Malformed(format!("exp out of range: {exp}")))?;
        let key = token_key(token);
        self.bounded(self.store.insert(&key, expires_at)).await
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, AuthError>>,
    ) -> Result<T, AuthError> {
        tokio::time::timeout(self.settings.store_timeout, call)
            .await
            .map_err(|_| AuthError::BackingStore("revocation store timed out".into()))?
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

//! API server configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{info, warn};
use warden_core::auth::tokens::TokenSettings;
use warden_core::ratelimit::RateLimitSettings;

/// Blacklist purge cadence.
const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3200").
    pub bind_addr: String,
    /// PostgreSQL connection URL. `None` keeps every store in memory.
    pub database_url: Option<String>,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Secret the client-scoped refresh tag is keyed with.
    pub client_secret: String,
    pub token: TokenSettings,
    pub rate_limit: RateLimitSettings,
    /// How often expired blacklist entries are purged.
    pub purge_interval: Duration,
    /// When false, authenticated requests skip policy evaluation.
    pub authz_enabled: bool,
    /// Role ids whose holders bypass policy evaluation.
    pub super_admin_roles: Vec<String>,
    /// Key admission control on the first `X-Forwarded-For` hop.
    pub trust_forwarded_for: bool,
}

impl Default for ApiConfig {
    /// Development defaults. `jwt_secret` is left empty and must be set.
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3200".into(),
            database_url: None,
            jwt_secret: String::new(),
            client_secret: "warden-default-client-secret-change-in-production".into(),
            token: TokenSettings::default(),
            rate_limit: RateLimitSettings::default(),
            purge_interval: DEFAULT_PURGE_INTERVAL,
            authz_enabled: true,
            super_admin_roles: vec!["admin".into()],
            trust_forwarded_for: false,
        }
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                  | Default                                  |
    /// |---------------------------|------------------------------------------|
    /// | `BIND_ADDR`               | `127.0.0.1:3200`                         |
    /// | `DATABASE_URL`            | unset (in-memory stores)                 |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file         |
    /// | `JWT_ISSUER`              | `warden`                                 |
    /// | `ACCESS_TOKEN_TTL_SECS`   | `3600`                                   |
    /// | `REMEMBER_ME_TTL_SECS`    | `604800`                                 |
    /// | `CLIENT_SECRET`           | development placeholder                  |
    /// | `RATE_LIMIT_PER_SEC`      | `100`                                    |
    /// | `RATE_LIMIT_BURST`        | `200`                                    |
    /// | `RATE_LIMIT_IDLE_SECS`    | `180`                                    |
    /// | `RATE_LIMIT_SWEEP_SECS`   | `60`                                     |
    /// | `BLACKLIST_PURGE_SECS`    | `600`                                    |
    /// | `AUTHZ_ENABLED`           | `true`                                   |
    /// | `SUPER_ADMIN_ROLES`       | `admin` (comma separated)                |
    /// | `TRUST_FORWARDED_FOR`     | `false`                                  |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let token = TokenSettings {
            issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.token.issuer.clone()),
            access_ttl_secs: env_parse("ACCESS_TOKEN_TTL_SECS", defaults.token.access_ttl_secs),
            remember_ttl_secs: env_parse("REMEMBER_ME_TTL_SECS", defaults.token.remember_ttl_secs),
            ..defaults.token.clone()
        };
        let rate_limit = RateLimitSettings {
            rate_per_sec: env_parse("RATE_LIMIT_PER_SEC", defaults.rate_limit.rate_per_sec),
            burst: env_parse("RATE_LIMIT_BURST", defaults.rate_limit.burst),
            idle_timeout: env_secs("RATE_LIMIT_IDLE_SECS", defaults.rate_limit.idle_timeout),
            sweep_interval: env_secs("RATE_LIMIT_SWEEP_SECS", defaults.rate_limit.sweep_interval),
        };
        let super_admin_roles = std::env::var("SUPER_ADMIN_ROLES")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or(defaults.super_admin_roles);

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            jwt_secret: resolve_jwt_secret(),
            client_secret: std::env::var("CLIENT_SECRET").unwrap_or(defaults.client_secret),
            token,
            rate_limit,
            purge_interval: env_secs("BLACKLIST_PURGE_SECS", defaults.purge_interval),
            authz_enabled: env_parse("AUTHZ_ENABLED", defaults.authz_enabled),
            super_admin_roles,
            trust_forwarded_for: env_parse("TRUST_FORWARDED_FOR", defaults.trust_forwarded_for),
        }
    }
}

/// Parse `key`, falling back to `default` when unset or unparsable.
fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring unparsable environment value");
            default
        }),
        Err(_) => default,
    }
}

fn env_secs(key: &str, default: Duration) -> Duration {
    Duration::from_secs(env_parse(key, default.as_secs()))
}

/// Resolve the JWT secret: env var `JWT_SECRET` → `AUTH_SECRET` → persisted file.
pub fn resolve_jwt_secret() -> String {
    if let Ok(secret) = std::env::var("JWT_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    if let Ok(secret) = std::env::var("AUTH_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    // Generate and persist
    let secret_path = jwt_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = std::fs::write(&secret_path, &secret) {
        warn!(path = %secret_path.display(), error = %e, "could not persist JWT secret");
    } else {
        info!(path = %secret_path.display(), "generated new JWT secret");
    }
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("warden")
        .join("jwt-secret")
}

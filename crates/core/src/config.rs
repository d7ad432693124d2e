use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DuewatchError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

/// Normalize a 5-field cron expression to 6-field by prepending "0 " for seconds.
///
/// The `cron` crate requires 6 fields: `sec min hour day-of-month month day-of-week`.
pub fn normalize_cron(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub sweep: SweepConfig,
    pub push: PushConfig,
    pub store: StoreConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `DUEWATCH_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("DUEWATCH_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            sweep: SweepConfig::from_env_profiled(p),
            push: PushConfig::from_env_profiled(p),
            store: StoreConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Check that the values which are only parsed lazily elsewhere are usable.
    ///
    /// The log provider records every "delivered" notification in the ledger,
    /// so against Postgres it must be chosen with an explicit `PUSH_PROVIDER`.
    pub fn validate(&self) -> Result<(), DuewatchError> {
        self.sweep.tz()?;
        self.sweep.schedule()?;
        self.push.provider()?;
        let backend = self.store.backend()?;
        if backend == StoreBackend::Postgres && self.push.provider.is_none() {
            return Err(DuewatchError::Config(
                "PUSH_PROVIDER must be set when STORE_BACKEND=postgres \
                 (use PUSH_PROVIDER=log to record without delivering)"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  sweep:   cron={}, timezone={}, concurrency={}, dispatch_timeout={}s",
            self.sweep.cron,
            self.sweep.timezone,
            self.sweep.concurrency,
            self.sweep.dispatch_timeout_secs
        );
        tracing::info!(
            "  push:    provider={}, fcm_project={}, fcm_auth={}",
            self.push.provider.as_deref().unwrap_or("log (default)"),
            self.push.fcm_project_id.as_deref().unwrap_or("(none)"),
            if self.push.fcm_access_token.is_some() { "static token" } else { "adc" }
        );
        tracing::info!(
            "  store:   backend={}, pg_host={}, db={}",
            self.store.backend,
            self.store.postgres.host,
            self.store.postgres.database
        );
    }
}

// ── Sweep ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// 5- or 6-field cron expression.
    pub cron: String,
    /// IANA zone name the order dates and deadlines are expressed in.
    pub timezone: String,
    /// Number of users processed concurrently.
    pub concurrency: usize,
    pub dispatch_timeout_secs: u64,
}

impl SweepConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            cron: profiled_env_or(p, "SWEEP_CRON", "0 * * * *"),
            timezone: profiled_env_or(p, "SWEEP_TIMEZONE", "Asia/Seoul"),
            concurrency: profiled_env_u32(p, "SWEEP_CONCURRENCY", 8).max(1) as usize,
            dispatch_timeout_secs: profiled_env_u64(p, "DISPATCH_TIMEOUT_SECS", 10),
        }
    }

    pub fn tz(&self) -> Result<chrono_tz::Tz, DuewatchError> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| {
                DuewatchError::Config(format!("invalid timezone '{}': {e}", self.timezone))
            })
    }

    /// Parse the cron expression, accepting the 5-field form.
    pub fn schedule(&self) -> Result<cron::Schedule, DuewatchError> {
        cron::Schedule::from_str(&normalize_cron(&self.cron))
            .map_err(|e| DuewatchError::Config(format!("invalid cron '{}': {e}", self.cron)))
    }

    pub fn dispatch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.dispatch_timeout_secs)
    }
}

// ── Push transport ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushProvider {
    Fcm,
    Webhook,
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// "fcm", "webhook", "log". Unset means log.
    pub provider: Option<String>,
    pub fcm_project_id: Option<String>,
    /// Static bearer token overriding application default credentials.
    pub fcm_access_token: Option<String>,
    pub fcm_endpoint: String,
    pub webhook_url: Option<String>,
    /// Raw `Key=Value;Key2=Value2` header list.
    pub webhook_headers: Option<String>,
    pub icon_url: Option<String>,
    pub badge_url: Option<String>,
    pub link_url: Option<String>,
    pub require_interaction: bool,
    pub templates_path: Option<PathBuf>,
}

impl PushConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_opt(p, "PUSH_PROVIDER"),
            fcm_project_id: profiled_env_opt(p, "FCM_PROJECT_ID"),
            fcm_access_token: profiled_env_opt(p, "FCM_ACCESS_TOKEN"),
            fcm_endpoint: profiled_env_or(p, "FCM_ENDPOINT", "https://fcm.googleapis.com"),
            webhook_url: profiled_env_opt(p, "PUSH_WEBHOOK_URL"),
            webhook_headers: profiled_env_opt(p, "PUSH_WEBHOOK_HEADERS"),
            icon_url: profiled_env_opt(p, "PUSH_ICON_URL"),
            badge_url: profiled_env_opt(p, "PUSH_BADGE_URL"),
            link_url: profiled_env_opt(p, "PUSH_LINK_URL"),
            require_interaction: profiled_env_bool(p, "PUSH_REQUIRE_INTERACTION", true),
            templates_path: profiled_env_opt(p, "PUSH_TEMPLATES_PATH").map(PathBuf::from),
        }
    }

    pub fn provider(&self) -> Result<PushProvider, DuewatchError> {
        let name = self.provider.as_deref().unwrap_or("log").to_lowercase();
        let provider = match name.as_str() {
            "fcm" => PushProvider::Fcm,
            "webhook" => PushProvider::Webhook,
            "log" => PushProvider::Log,
            other => {
                return Err(DuewatchError::Config(format!(
                    "unknown push provider '{other}': expected fcm, webhook or log"
                )))
            }
        };
        match provider {
            PushProvider::Fcm if self.fcm_project_id.is_none() => Err(DuewatchError::Config(
                "fcm provider requires FCM_PROJECT_ID".to_string(),
            )),
            PushProvider::Webhook if self.webhook_url.is_none() => Err(DuewatchError::Config(
                "webhook provider requires PUSH_WEBHOOK_URL".to_string(),
            )),
            _ => Ok(provider),
        }
    }

    /// Parse `webhook_headers` into a map. Malformed pairs are skipped.
    pub fn webhook_header_map(&self) -> BTreeMap<String, String> {
        self.webhook_headers
            .as_deref()
            .unwrap_or_default()
            .split(';')
            .filter_map(|pair| {
                let (k, v) = pair.split_once('=')?;
                let k = k.trim();
                (!k.is_empty()).then(|| (k.to_string(), v.trim().to_string()))
            })
            .collect()
    }
}

// ── Store ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "postgres" or "memory"
    pub backend: String,
    /// JSON seed file for the memory backend.
    pub fixture_path: Option<PathBuf>,
    pub postgres: PostgresConfig,
}

impl StoreConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            backend: profiled_env_or(p, "STORE_BACKEND", "postgres"),
            fixture_path: profiled_env_opt(p, "STORE_FIXTURE").map(PathBuf::from),
            postgres: PostgresConfig::from_env_profiled(p),
        }
    }

    pub fn backend(&self) -> Result<StoreBackend, DuewatchError> {
        match self.backend.to_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(DuewatchError::Config(format!(
                "unknown store backend '{other}': expected postgres or memory"
            ))),
        }
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl PostgresConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "PG_HOST", "localhost"),
            port: profiled_env_u16(p, "PG_PORT", 5432),
            database: profiled_env_or(p, "PG_DATABASE", "duewatch"),
            username: profiled_env_opt(p, "PG_USERNAME"),
            password: profiled_env_opt(p, "PG_PASSWORD"),
            ssl_mode: profiled_env_or(p, "PG_SSL_MODE", "prefer"),
            max_connections: profiled_env_u32(p, "PG_MAX_CONNECTIONS", 10),
        }
    }

    pub fn connection_string(&self) -> String {
        let user = self.username.as_deref().unwrap_or("postgres");
        let pass = self.password.as_deref().unwrap_or("");
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, pass, self.host, self.port, self.database, self.ssl_mode
        )
    }

    pub fn is_configured(&self) -> bool {
        self.username.is_some()
    }
}

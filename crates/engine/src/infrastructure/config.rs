//! Engine configuration read from the process environment.

use std::path::PathBuf;
use std::time::Duration;

/// Which storage adapter backs the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

/// What catalog sync does when the store already holds a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSyncMode {
    /// Leave the stored catalog untouched.
    SkipIfPresent,
    /// Rewrite every catalog table. Offline/initialization use only.
    Replace,
}

/// Built-in island clearance criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearancePolicyKind {
    AllNonRepeatable,
    AllQuests,
    Never,
}

/// Origins allowed by the CORS layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    /// No CORS layer is installed.
    Disabled,
    Any,
    List(Vec<String>),
}

impl CorsOrigins {
    /// `*` allows any origin; otherwise a comma-separated list.
    fn parse(raw: &str) -> Self {
        if raw == "*" {
            return Self::Any;
        }
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        if origins.is_empty() {
            Self::Disabled
        } else {
            Self::List(origins)
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub server_host: String,
    pub server_port: u16,
    pub store_backend: StoreBackend,
    pub database_path: String,
    pub catalog_path: Option<PathBuf>,
    pub catalog_sync_mode: CatalogSyncMode,
    pub clearance_policy: ClearancePolicyKind,
    pub reconcile_on_startup: bool,
    /// `None` disables the periodic sweep.
    pub reconcile_interval: Option<Duration>,
    pub cors_origins: CorsOrigins,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".into(),
            server_port: 3000,
            store_backend: StoreBackend::Sqlite,
            database_path: "archipelago.db".into(),
            catalog_path: None,
            catalog_sync_mode: CatalogSyncMode::SkipIfPresent,
            clearance_policy: ClearancePolicyKind::AllNonRepeatable,
            reconcile_on_startup: true,
            reconcile_interval: None,
            cors_origins: CorsOrigins::Disabled,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to
    /// their defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let server_port = get("SERVER_PORT")
            .or_else(|| get("PORT"))
            .map(|raw| parse_or("SERVER_PORT", &raw, defaults.server_port, |s| s.parse().ok()))
            .unwrap_or(defaults.server_port);

        let store_backend = get("STORE_BACKEND")
            .map(|raw| {
                parse_or("STORE_BACKEND", &raw, defaults.store_backend, |s| {
                    match s.to_ascii_lowercase().as_str() {
                        "sqlite" => Some(StoreBackend::Sqlite),
                        "memory" => Some(StoreBackend::Memory),
                        _ => None,
                    }
                })
            })
            .unwrap_or(defaults.store_backend);

        let catalog_sync_mode = get("CATALOG_SYNC_MODE")
            .map(|raw| {
                parse_or("CATALOG_SYNC_MODE", &raw, defaults.catalog_sync_mode, |s| {
                    match s.to_ascii_lowercase().as_str() {
                        "skip_if_present" => Some(CatalogSyncMode::SkipIfPresent),
                        "replace" => Some(CatalogSyncMode::Replace),
                        _ => None,
                    }
                })
            })
            .unwrap_or(defaults.catalog_sync_mode);

        let clearance_policy = get("ISLAND_CLEARANCE_POLICY")
            .map(|raw| {
                parse_or(
                    "ISLAND_CLEARANCE_POLICY",
                    &raw,
                    defaults.clearance_policy,
                    |s| match s.to_ascii_lowercase().as_str() {
                        "all_non_repeatable" => Some(ClearancePolicyKind::AllNonRepeatable),
                        "all_quests" => Some(ClearancePolicyKind::AllQuests),
                        "never" => Some(ClearancePolicyKind::Never),
                        _ => None,
                    },
                )
            })
            .unwrap_or(defaults.clearance_policy);

        let reconcile_on_startup = get("RECONCILE_ON_STARTUP")
            .map(|raw| parse_or("RECONCILE_ON_STARTUP", &raw, true, parse_bool))
            .unwrap_or(defaults.reconcile_on_startup);

        let reconcile_interval = get("RECONCILE_INTERVAL_SECS")
            .map(|raw| parse_or("RECONCILE_INTERVAL_SECS", &raw, 0u64, |s| s.parse().ok()))
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Self {
            server_host: get("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port,
            store_backend,
            database_path: get("DATABASE_PATH").unwrap_or(defaults.database_path),
            catalog_path: get("CATALOG_PATH").map(PathBuf::from),
            catalog_sync_mode,
            clearance_policy,
            reconcile_on_startup,
            reconcile_interval,
            cors_origins: get("CORS_ALLOWED_ORIGINS")
                .map(|raw| CorsOrigins::parse(&raw))
                .unwrap_or(defaults.cors_origins),
        }
    }
}

fn parse_or<T: Copy + std::fmt::Debug>(
    key: &str,
    raw: &str,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
) -> T {
    match parse(raw) {
        Some(value) => value,
        None => {
            tracing::warn!(key, value = raw, default = ?default, "Invalid config value, using default");
            default
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

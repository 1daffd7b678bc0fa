//! Process settings read from the environment (after `.env` is loaded by the binary).

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub database_url: String,
    /// Active environment; selects `<stem>_<env>` fragments.
    pub app_env: String,
    pub modules_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub database_max_connections: u32,
    /// Schema for entity mappings that do not name one.
    pub database_schema: String,
    pub require_base_fragment: bool,
    pub schema_sync: bool,
    pub max_body_bytes: usize,
}

impl Settings {
    /// Load `.env` from the working directory (if present), then read the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), ".env loaded");
        }
        Self::from_env()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; missing keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Ok(Settings {
            database_url: get("DATABASE_URL").unwrap_or_else(|| "postgres://localhost/api_skeleton".into()),
            app_env: get("APP_ENV").unwrap_or_else(|| "dev".into()),
            modules_dir: get("MODULES_DIR").unwrap_or_else(|| "modules".into()).into(),
            bind_addr: parse(&get, "BIND_ADDR", "0.0.0.0:3000")?,
            database_max_connections: parse(&get, "DATABASE_MAX_CONNECTIONS", "5")?,
            database_schema: get("DATABASE_SCHEMA").unwrap_or_else(|| "public".into()),
            require_base_fragment: flag(&get, "REQUIRE_BASE_FRAGMENT", false)?,
            schema_sync: flag(&get, "SCHEMA_SYNC", true)?,
            max_body_bytes: parse(&get, "MAX_BODY_BYTES", "1048576")?,
        })
    }
}

fn parse<T, G>(get: &G, key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    let raw = get(key).unwrap_or_else(|| default.to_string());
    raw.parse()
        .map_err(|e| ConfigError::Settings(format!("{}={:?}: {}", key, raw, e)))
}

fn flag<G>(get: &G, key: &str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.to_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Settings(format!("{}={:?}: expected a boolean", key, v))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.app_env, "dev");
        assert_eq!(s.modules_dir, PathBuf::from("modules"));
        assert_eq!(s.bind_addr.port(), 3000);
        assert_eq!(s.database_max_connections, 5);
        assert_eq!(s.database_schema, "public");
        assert!(!s.require_base_fragment);
        assert!(s.schema_sync);
        assert_eq!(s.max_body_bytes, 1024 * 1024);
    }

    #[test]
    fn overrides_and_flags() {
        let s = settings(&[
            ("APP_ENV", "prod"),
            ("REQUIRE_BASE_FRAGMENT", "yes"),
            ("SCHEMA_SYNC", "0"),
            ("BIND_ADDR", "127.0.0.1:8080"),
        ])
        .unwrap();
        assert_eq!(s.app_env, "prod");
        assert!(s.require_base_fragment);
        assert!(!s.schema_sync);
        assert_eq!(s.bind_addr.to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = settings(&[("DATABASE_MAX_CONNECTIONS", "many")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_MAX_CONNECTIONS"));
        assert!(settings(&[("SCHEMA_SYNC", "maybe")]).is_err());
    }
}

use anyhow::{anyhow, Context, Result};
use relay_blob::{S3Config, DEFAULT_KEY_PREFIX};
use std::env;

/// Where uploads land
#[derive(Debug, Clone)]
pub enum StoreBackend {
    S3(S3Config),
    /// Process-local store for development without a bucket
    Memory,
}

/// Everything the server reads from its environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub key_prefix: String,
    pub store: StoreBackend,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any variable source; `from_env` passes the process env
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = var_or(&lookup, "HTTP_HOST", "127.0.0.1".to_string())?;
        let port = var_or(&lookup, "HTTP_PORT", 3000u16)?;
        let key_prefix = var_or(&lookup, "UPLOAD_KEY_PREFIX", DEFAULT_KEY_PREFIX.to_string())?;

        let backend = var_or(&lookup, "RELAY_STORE", "s3".to_string())?;
        let store = match backend.to_lowercase().as_str() {
            "s3" => StoreBackend::S3(
                S3Config::from_lookup(&lookup).context("S3 store configuration")?,
            ),
            "memory" => StoreBackend::Memory,
            other => return Err(anyhow!("RELAY_STORE must be 's3' or 'memory', got '{}'", other)),
        };

        Ok(Self {
            host,
            port,
            key_prefix,
            store,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn var_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key).filter(|value| !value.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|err| anyhow!("invalid {}='{}': {}", key, raw, err)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn memory_backend_needs_no_credentials() {
        let config = ServerConfig::from_lookup(lookup(&[("RELAY_STORE", "memory")])).unwrap();
        assert!(matches!(config.store, StoreBackend::Memory));
        assert_eq!(config.addr(), "127.0.0.1:3000");
        assert_eq!(config.key_prefix, "test");
    }

    #[test]
    fn s3_is_the_default_backend() {
        let err = ServerConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(format!("{err:#}").contains("AWS_BUCKET"));

        let config = ServerConfig::from_lookup(lookup(&[
            ("AWS_REGION", "us-east-1"),
            ("AWS_KEY", "k"),
            ("AWS_SECRET", "s"),
            ("AWS_BUCKET", "uploads"),
            ("UPLOAD_KEY_PREFIX", "media"),
            ("HTTP_PORT", "8080"),
        ]))
        .unwrap();
        assert!(matches!(config.store, StoreBackend::S3(ref s3) if s3.bucket == "uploads"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.key_prefix, "media");
    }

    #[test]
    fn bad_values_are_reported() {
        assert!(ServerConfig::from_lookup(lookup(&[
            ("RELAY_STORE", "memory"),
            ("HTTP_PORT", "http")
        ]))
        .is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("RELAY_STORE", "disk")])).is_err());
    }
}

use std::{env, str::FromStr};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_DATABASE: &str = "watch_shop";
const CLUSTER_HOST: &str = "cluster0.mas8d.mongodb.net";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid {key} value {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(Self::Mongo),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub backend: StoreBackend,
    pub mongo_url: Option<String>,
    pub database_name: String,
}

impl Config {
    /// Reads the process environment. `main` loads `.env` before calling this.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let backend = parse_or(&lookup, "STORE_BACKEND", StoreBackend::Mongo)?;
        let database_name = lookup("DATABASE_NAME")
            .filter(|it| !it.is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let mongo_url = match backend {
            StoreBackend::Memory => None,
            StoreBackend::Mongo => Some(mongo_url(&lookup)?),
        };

        Ok(Self {
            port,
            backend,
            mongo_url,
            database_name,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key).filter(|it| !it.is_empty()) {
        None => {
            tracing::debug!("{key} not set, using default");
            Ok(default)
        }
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn mongo_url(lookup: &impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
    if let Some(url) = lookup("MONGODB_URI").filter(|it| !it.is_empty()) {
        return Ok(url);
    }

    let user = lookup("DB_USER").ok_or(ConfigError::Missing("DB_USER"))?;
    let password = lookup("DB_PASS")
        .or_else(|| lookup("DP_PASS"))
        .ok_or(ConfigError::Missing("DB_PASS"))?;

    Ok(format!(
        "mongodb+srv://{user}:{password}@{CLUSTER_HOST}/myFirstDatabase?retryWrites=true&w=majority"
    ))
}

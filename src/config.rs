use std::{env, net::SocketAddr, str::FromStr};

use dotenvy::dotenv;
use thiserror::Error;
use url::Url;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_PHOTO_BASE_URL: &str = "http://localhost:9000/photos/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Live,
    Mock,
}

impl FromStr for DataSource {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "live" | "postgres" => Ok(DataSource::Live),
            "mock" | "memory" => Ok(DataSource::Mock),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub data_source: DataSource,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub photo_base_url: Url,
    pub seed_demo_data: bool,
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn invalid(key: &'static str, value: String) -> ConfigError {
    ConfigError::Invalid { key, value }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_source = match lookup("DATA_SOURCE") {
            Some(raw) => raw.parse().map_err(|_| invalid("DATA_SOURCE", raw))?,
            None => DataSource::Live,
        };

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if data_source == DataSource::Live && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let bind_raw = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| invalid("BIND_ADDR", bind_raw))?;

        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| (1..=100).contains(n))
                .ok_or_else(|| invalid("DB_MAX_CONNECTIONS", raw))?,
            None => 5,
        };

        let mut photo_raw =
            lookup("PHOTO_BASE_URL").unwrap_or_else(|| DEFAULT_PHOTO_BASE_URL.to_string());
        // Url::join only appends to paths ending in a slash.
        if !photo_raw.ends_with('/') {
            photo_raw.push('/');
        }
        let photo_base_url = Url::parse(&photo_raw).map_err(|_| invalid("PHOTO_BASE_URL", photo_raw))?;

        let seed_demo_data = match lookup("SEED_DEMO_DATA") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| invalid("SEED_DEMO_DATA", raw))?,
            None => true,
        };

        Ok(Config {
            bind_addr,
            data_source,
            database_url,
            max_connections,
            photo_base_url,
            seed_demo_data,
        })
    }
}

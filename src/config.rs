//! Runtime configuration read from the environment.

use std::net::SocketAddr;

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8083;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_NATS_SUBJECT: &str = "storefront.orders.created";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    NotANumber { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Without a database URL the service keeps its data in memory.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub port: u16,
    pub nats_url: Option<String>,
    pub nats_subject: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        Ok(Self {
            database_url: get("DATABASE_URL"),
            max_connections: parse(get("DATABASE_MAX_CONNECTIONS"), "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            port: parse(get("PORT"), "PORT", DEFAULT_PORT)?,
            nats_url: get("NATS_URL"),
            nats_subject: get("NATS_SUBJECT").unwrap_or_else(|| DEFAULT_NATS_SUBJECT.to_string()),
        })
    }

    pub fn bind_address(&self) -> SocketAddr { SocketAddr::from(([0, 0, 0, 0], self.port)) }
}

fn parse<T: std::str::FromStr>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::NotANumber { name, value }),
    }
}

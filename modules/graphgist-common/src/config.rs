use std::env;

use crate::error::ConfigError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Neo4j
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub neo4j_max_connections: usize,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables, falling back to local defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        // PORT wins over the legacy GRAPHQL_LISTEN_PORT.
        let (port_key, port) = match var("PORT") {
            Some(p) => ("PORT", p),
            None => (
                "GRAPHQL_LISTEN_PORT",
                or("GRAPHQL_LISTEN_PORT", "4001"),
            ),
        };

        Ok(Self {
            neo4j_uri: or("NEO4J_URI", "bolt://localhost:7687"),
            neo4j_user: or("NEO4J_USER", "neo4j"),
            neo4j_password: or("NEO4J_PASSWORD", "neo4j"),
            neo4j_max_connections: parse_number(
                "NEO4J_MAX_CONNECTIONS",
                or("NEO4J_MAX_CONNECTIONS", "500"),
            )?,
            web_host: or("WEB_HOST", "0.0.0.0"),
            web_port: parse_number(port_key, port)?,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { key, value })
}

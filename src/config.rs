use crate::domain::services::DEFAULT_MAX_CONCURRENT_CHATS;
use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub otel_exporter_endpoint: Option<String>,
    pub service_name: String,
    pub metrics_port: u16,
    pub event_bus_capacity: usize,
    pub routing: RoutingConfig,
}

/// Knobs for the keyword assignment pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutingConfig {
    /// Ceiling on active conversations per agent.
    pub max_concurrent_chats: i64,
    /// Restrict candidates to agents holding a membership for the selected team.
    pub filter_by_team: bool,
    /// Commit with a conditional update that re-checks the agent's load.
    pub strict_capacity: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_concurrent_chats: DEFAULT_MAX_CONCURRENT_CHATS,
            filter_by_team: false,
            strict_capacity: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://livetalk.db?mode=rwc".to_string());

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let otel_exporter_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();

        let service_name = env::var("SERVICE_NAME").unwrap_or_else(|_| "livetalk".to_string());

        let metrics_port = parse_metrics_port(env::var("METRICS_PORT").ok().as_deref())?;

        let event_bus_capacity = env::var("EVENT_BUS_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|capacity| *capacity > 0)
            .unwrap_or(100);

        let routing = RoutingConfig {
            max_concurrent_chats: parse_max_concurrent_chats(
                env::var("MAX_CONCURRENT_CHATS").ok().as_deref(),
            )?,
            filter_by_team: parse_flag(
                "ROUTING_FILTER_BY_TEAM",
                env::var("ROUTING_FILTER_BY_TEAM").ok().as_deref(),
            )?,
            strict_capacity: parse_flag(
                "ROUTING_STRICT_CAPACITY",
                env::var("ROUTING_STRICT_CAPACITY").ok().as_deref(),
            )?,
        };

        Ok(Config {
            database_url,
            server_host,
            server_port,
            otel_exporter_endpoint,
            service_name,
            metrics_port,
            event_bus_capacity,
            routing,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_max_concurrent_chats(raw: Option<&str>) -> Result<i64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_MAX_CONCURRENT_CHATS);
    };

    match raw.trim().parse::<i64>() {
        Ok(value) if value >= 1 => Ok(value),
        _ => Err(ConfigError::InvalidValue {
            name: "MAX_CONCURRENT_CHATS",
            value: raw.to_string(),
        }),
    }
}

fn parse_metrics_port(raw: Option<&str>) -> Result<u16, ConfigError> {
    let Some(raw) = raw else {
        return Ok(9000);
    };

    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name: "METRICS_PORT",
        value: raw.to_string(),
    })
}

fn parse_flag(name: &'static str, raw: Option<&str>) -> Result<bool, ConfigError> {
    let Some(raw) = raw else {
        return Ok(false);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: raw.to_string(),
        }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

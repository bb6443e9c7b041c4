use axum::http::{HeaderValue, request::Parts};
use std::{env, fmt, net::SocketAddr, time::Duration};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::forwarder::{DEFAULT_SIMULATION_DELAY, DEFAULT_TIMEOUT};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DEVICE_URL: &str = "http://192.168.1.100";

// Local dev server plus the Azure static and app hosting domains.
const DEFAULT_ORIGINS: [&str; 3] = [
    "http://localhost:3000",
    "https://*.azurestaticapps.net",
    "https://*.azurewebsites.net",
];

#[derive(Debug)]
pub enum ConfigError {
    InvalidNumber { var: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidNumber { var, value } => {
                write!(f, "{} must be a non-negative integer, got {:?}", var, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub port: u16,
    pub device_url: String,
    pub allowed_origins: Vec<String>,
    pub device_timeout: Duration,
    pub simulation_delay: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            device_url: DEFAULT_DEVICE_URL.to_string(),
            allowed_origins: DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect(),
            device_timeout: DEFAULT_TIMEOUT,
            simulation_delay: DEFAULT_SIMULATION_DELAY,
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT") {
            config.port = parse_number("PORT", &port)?;
        }
        if let Some(url) = lookup("DEVICE_URL") {
            config.device_url = url.trim_end_matches('/').to_string();
        }
        if let Some(origin) = lookup("FRONTEND_URL").filter(|o| !o.is_empty()) {
            config.allowed_origins.push(origin);
        }
        if let Some(secs) = lookup("DEVICE_TIMEOUT_SECS") {
            config.device_timeout =
                Duration::from_secs(parse_number("DEVICE_TIMEOUT_SECS", &secs)?);
        }
        if let Some(ms) = lookup("SIMULATION_DELAY_MS") {
            config.simulation_delay =
                Duration::from_millis(parse_number("SIMULATION_DELAY_MS", &ms)?);
        }

        Ok(config)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// CORS policy: listed origins only, with credentials, mirroring the
    /// requested methods and headers.
    pub fn cors_layer(&self) -> CorsLayer {
        let origins = self.allowed_origins.clone();
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(
                move |origin: &HeaderValue, _parts: &Parts| {
                    origin
                        .to_str()
                        .map(|origin| origins.iter().any(|allowed| origin_matches(allowed, origin)))
                        .unwrap_or(false)
                },
            ))
            .allow_credentials(true)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: value.to_string(),
    })
}

/// Matches an origin against an allowed pattern. A `*` stands for one or more
/// leading host labels, e.g. `https://*.example.net` matches
/// `https://app.example.net` but not `https://example.net`.
pub fn origin_matches(pattern: &str, origin: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == origin,
        Some((prefix, suffix)) => {
            origin.len() > prefix.len() + suffix.len()
                && origin.starts_with(prefix)
                && origin.ends_with(suffix)
                && !origin[prefix.len()..origin.len() - suffix.len()].contains('/')
        }
    }
}

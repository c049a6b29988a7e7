use std::{
    env,
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
pub const DEFAULT_BIND_PORT: u16 = 9000;
pub const DEFAULT_RULES_PATH: &str = "auto_responses.json";
pub const DEFAULT_SERVER_DESCRIPTION: &str =
    "Model Context Protocol server over HTTP with Server-Sent Events";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_name: String,
    pub server_description: String,
    pub bind_addr: String,
    pub bind_port: u16,
    pub api_token: Option<String>,
    pub rules_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load .env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
    #[error("PORT must be an integer between 1 and 65535")]
    InvalidPort,
    #[error("HOST must be an IP address or a hostname")]
    InvalidHost,
}

impl Config {
    /// Loads an optional `.env` file from the working directory, then reads
    /// the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(err) if err.not_found() => {}
            Err(err) => return Err(ConfigError::EnvFile(err)),
        }

        Self::from_env()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let server_name =
            read("MCP_SERVER_NAME").unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
        let server_description = read("MCP_SERVER_DESCRIPTION")
            .unwrap_or_else(|| DEFAULT_SERVER_DESCRIPTION.to_string());
        let bind_addr = read("HOST").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        if !is_valid_host(&bind_addr) {
            return Err(ConfigError::InvalidHost);
        }
        let bind_port = read("PORT")
            .map(|value| {
                value
                    .parse::<u16>()
                    .ok()
                    .filter(|port| *port > 0)
                    .ok_or(ConfigError::InvalidPort)
            })
            .transpose()?
            .unwrap_or(DEFAULT_BIND_PORT);
        let api_token = read("MCP_API_TOKEN");
        let rules_path = read("AUTO_RESPONSE_RULES_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RULES_PATH));

        Ok(Self {
            server_name,
            server_description,
            bind_addr,
            bind_port,
            api_token,
            rules_path,
        })
    }

    /// `host:port` as accepted by `TcpListener::bind`. IPv6 literals are
    /// bracketed; hostnames are resolved when the listener binds.
    pub fn bind_address(&self) -> String {
        match self.bind_addr.parse::<IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, self.bind_port).to_string(),
            Err(_) => format!("{}:{}", self.bind_addr, self.bind_port),
        }
    }
}

fn is_valid_host(host: &str) -> bool {
    if host.parse::<IpAddr>().is_ok() {
        return true;
    }

    host.len() <= 253
        && host.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn parse_defaults() {
        let config = config_from(&[]).expect("config should parse");
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.bind_port, 9000);
        assert_eq!(config.server_name, env!("CARGO_PKG_NAME"));
        assert_eq!(config.api_token, None);
        assert_eq!(config.rules_path, PathBuf::from("auto_responses.json"));
    }

    #[test]
    fn port_override_is_used() {
        let config = config_from(&[("PORT", "9100")]).expect("config should parse");
        assert_eq!(config.bind_port, 9100);
        assert_eq!(config.bind_address(), "127.0.0.1:9100");
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config_from(&[("HOST", "   "), ("PORT", ""), ("MCP_API_TOKEN", " ")])
            .expect("config should parse");
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.bind_port, 9000);
        assert_eq!(config.api_token, None);
    }

    #[test]
    fn invalid_port_fails() {
        for value in ["abc", "0", "70000", "-1"] {
            let err = config_from(&[("PORT", value)]).expect_err("expected invalid port");
            assert!(matches!(err, ConfigError::InvalidPort), "{value}");
        }
    }

    #[test]
    fn invalid_host_fails() {
        for host in ["not a host", "bad_host", "-edge.example", "a..b", "[::1]"] {
            let err = config_from(&[("HOST", host)]).expect_err("expected invalid host");
            assert!(matches!(err, ConfigError::InvalidHost), "{host}");
        }
    }

    #[test]
    fn ipv6_and_hostnames_are_accepted() {
        let ipv6 = config_from(&[("HOST", "::1")]).expect("ipv6 host");
        assert_eq!(ipv6.bind_address(), "[::1]:9000");

        let named = config_from(&[("HOST", "localhost"), ("PORT", "9100")]).expect("hostname");
        assert_eq!(named.bind_addr, "localhost");
        assert_eq!(named.bind_address(), "localhost:9100");

        let fqdn = config_from(&[("HOST", "mcp-1.internal.example")]).expect("fqdn");
        assert_eq!(fqdn.bind_address(), "mcp-1.internal.example:9000");
    }

    #[test]
    fn accepted_configs_have_usable_host_and_port() {
        for (host, port) in [("0.0.0.0", "1"), ("127.0.0.1", "65535"), ("10.1.2.3", "8080")] {
            let config =
                config_from(&[("HOST", host), ("PORT", port)]).expect("config should parse");
            assert!(!config.bind_addr.is_empty());
            assert!(config.bind_port > 0);
        }
    }

    #[test]
    fn optional_values_are_read() {
        let config = config_from(&[
            ("MCP_SERVER_NAME", "demo"),
            ("MCP_API_TOKEN", "secret-token"),
            ("AUTO_RESPONSE_RULES_PATH", "/tmp/rules.json"),
        ])
        .expect("config should parse");
        assert_eq!(config.server_name, "demo");
        assert_eq!(config.api_token.as_deref(), Some("secret-token"));
        assert_eq!(config.rules_path, PathBuf::from("/tmp/rules.json"));
    }
}

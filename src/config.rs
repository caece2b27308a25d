//! Engine configuration, loaded once at boot from an INI file.
//!
//! Grounded in `original_source/include/ConfigReader.h`: `[server]` and
//! `[auth]` sections, `;` comments, optionally quoted values. The `ini`
//! crate does the parsing; this module just maps the known keys by hand the
//! way the original's `get`/`getInt` accessors do, since `ini` has no serde
//! integration.

use crate::orderbook::OrderBookError;
use std::path::Path;

/// The `[server]`/`[auth]` surface described in spec.md §6.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub http_url: String,
    pub tcp_host: String,
    pub order_port: u16,
    pub trade_port: u16,
    pub username: String,
    pub password: String,
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, OrderBookError> {
        let ini = ini::Ini::load_from_file(path.as_ref())
            .map_err(|err| OrderBookError::Config(err.to_string()))?;

        let server = ini.section(Some("server"));
        let auth = ini.section(Some("auth"));

        let get = |section: Option<&ini::Properties>, key: &str| -> Option<String> {
            section.and_then(|s| s.get(key)).map(|v| v.to_string())
        };

        let http_url = get(server, "http_url").unwrap_or_default();
        let tcp_host = get(server, "tcp_host").unwrap_or_default();
        let order_port = get(server, "order_port")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let trade_port = get(server, "trade_port")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let username = get(auth, "username").unwrap_or_default();
        let password = get(auth, "password").unwrap_or_default();

        Ok(Self {
            http_url,
            tcp_host,
            order_port,
            trade_port,
            username,
            password,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn loads_server_and_auth_sections() {
        let file = write_config(
            "; comment line\n\
             [server]\n\
             http_url = \"http://localhost:8080\"\n\
             tcp_host = 127.0.0.1\n\
             order_port = 9001\n\
             trade_port = 9002\n\
             [auth]\n\
             username = trader\n\
             password = 'hunter2'\n",
        );
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.http_url, "http://localhost:8080");
        assert_eq!(config.tcp_host, "127.0.0.1");
        assert_eq!(config.order_port, 9001);
        assert_eq!(config.trade_port, 9002);
        assert_eq!(config.username, "trader");
        assert_eq!(config.password, "hunter2");
    }

    #[test]
    fn missing_keys_default_empty_or_zero() {
        let file = write_config("[server]\nhttp_url = x\n");
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.order_port, 0);
        assert_eq!(config.username, "");
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        let result = EngineConfig::load("/nonexistent/path/to/config.ini");
        assert!(matches!(result, Err(OrderBookError::Config(_))));
    }
}

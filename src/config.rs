//! Server configuration.
//!
//! ```toml
//! addr = "0.0.0.0:3030"
//! drain_timeout_secs = 30
//! ```
//!
//! Every key is optional; missing keys take the [`Default`] values.

use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Error;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind. Default `127.0.0.1:3030`.
    pub addr: SocketAddr,
    /// How long shutdown waits for in-flight connections before aborting
    /// them. `None` waits indefinitely.
    pub drain_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3030)),
            drain_timeout_secs: Some(30),
        }
    }
}

impl ServerConfig {
    pub fn from_toml(source: &str) -> Result<Self, Error> {
        Ok(toml::from_str(source)?)
    }

    pub fn drain_timeout(&self) -> Option<Duration> {
        self.drain_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_is_the_default() {
        assert_eq!(ServerConfig::from_toml("").unwrap(), ServerConfig::default());
    }

    #[test]
    fn reads_every_key() {
        let config = ServerConfig::from_toml(
            r#"
            addr = "0.0.0.0:8080"
            drain_timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.drain_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(ServerConfig::from_toml("port = 1"), Err(Error::Config(_))));
    }
}

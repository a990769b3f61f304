//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! `main.rs` fills it from CLI arguments and environment variables; tests
//! build it directly or start from [`BridgeConfig::default`].

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Port Ekos connects to in offline mode.
pub const DEFAULT_LISTEN_PORT: u16 = 3000;

/// Standard unencrypted MQTT port.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Broker used when none is configured.
pub const DEFAULT_BROKER_URL: &str = "mqtt://127.0.0.1";

/// Bound on the HTTP listener drain during shutdown.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_millis(1000);

/// Errors produced while interpreting configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The broker URL uses a scheme the bridge cannot speak.
    #[error("unsupported broker URL scheme {0:?} (expected mqtt:// or tcp://)")]
    UnsupportedScheme(String),

    /// The broker URL has no host.
    #[error("broker URL {0:?} has no host")]
    MissingHost(String),

    /// The broker port is not a valid `u16`.
    #[error("broker URL {0:?} has an invalid port")]
    InvalidPort(String),
}

/// Host and port of the MQTT broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

impl BrokerAddress {
    /// Parses `mqtt://host[:port]`, `tcp://host[:port]` or `host[:port]`.
    ///
    /// The port defaults to 1883.  A trailing `/` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for TLS or other schemes, an empty host, or a
    /// port that is not a number in `0..=65535`.
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let rest = match url.split_once("://") {
            Some(("mqtt" | "tcp", rest)) => rest,
            Some((scheme, _)) => return Err(ConfigError::UnsupportedScheme(scheme.to_string())),
            None => url,
        };
        let authority = rest.trim_end_matches('/');

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidPort(url.to_string()))?;
                (host, port)
            }
            None => (authority, DEFAULT_MQTT_PORT),
        };

        if host.is_empty() {
            return Err(ConfigError::MissingHost(url.to_string()));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mqtt://{}:{}", self.host, self.port)
    }
}

/// All runtime configuration for the bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address the HTTP/WebSocket listener binds to.
    pub listen_addr: SocketAddr,

    /// MQTT broker to connect to.
    pub broker: BrokerAddress,

    /// MQTT client identifier presented to the broker.
    pub client_id: String,

    /// Mirror every publish (and every broker message) to the log.
    pub debug: bool,

    /// Maximum time to wait for open connections during shutdown.
    pub drain_timeout: Duration,
}

impl Default for BridgeConfig {
    /// | Field           | Default              |
    /// |-----------------|----------------------|
    /// | listen_addr     | `0.0.0.0:3000`       |
    /// | broker          | `mqtt://127.0.0.1:1883` |
    /// | client_id       | `ekos-bridge`        |
    /// | debug           | `false`              |
    /// | drain_timeout   | 1000 ms              |
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_LISTEN_PORT)),
            broker: BrokerAddress {
                host: "127.0.0.1".to_string(),
                port: DEFAULT_MQTT_PORT,
            },
            client_id: "ekos-bridge".to_string(),
            debug: false,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_listen_port_is_3000() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.listen_addr.port(), 3000);
    }

    #[test]
    fn test_default_broker_matches_default_url() {
        // Arrange / Act
        let cfg = BridgeConfig::default();
        let parsed = BrokerAddress::parse(DEFAULT_BROKER_URL).unwrap();

        // Assert
        assert_eq!(cfg.broker, parsed);
    }

    #[test]
    fn test_default_drain_timeout_is_one_second() {
        assert_eq!(BridgeConfig::default().drain_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_default_debug_is_off() {
        assert!(!BridgeConfig::default().debug);
    }

    #[test]
    fn test_parse_mqtt_url_without_port() {
        let addr = BrokerAddress::parse("mqtt://127.0.0.1").unwrap();
        assert_eq!(addr.host, "127.0.0.1");
        assert_eq!(addr.port, 1883);
    }

    #[test]
    fn test_parse_mqtt_url_with_port() {
        let addr = BrokerAddress::parse("mqtt://broker.local:11883").unwrap();
        assert_eq!(addr.host, "broker.local");
        assert_eq!(addr.port, 11883);
    }

    #[test]
    fn test_parse_tcp_scheme_and_trailing_slash() {
        let addr = BrokerAddress::parse("tcp://10.0.0.5:1884/").unwrap();
        assert_eq!(addr.host, "10.0.0.5");
        assert_eq!(addr.port, 1884);
    }

    #[test]
    fn test_parse_bare_host() {
        let addr = BrokerAddress::parse("mosquitto").unwrap();
        assert_eq!(addr.host, "mosquitto");
        assert_eq!(addr.port, 1883);
    }

    #[test]
    fn test_parse_rejects_tls_scheme() {
        assert_eq!(
            BrokerAddress::parse("mqtts://broker:8883"),
            Err(ConfigError::UnsupportedScheme("mqtts".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_missing_host() {
        assert!(matches!(
            BrokerAddress::parse("mqtt://:1883"),
            Err(ConfigError::MissingHost(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_port() {
        assert!(matches!(
            BrokerAddress::parse("mqtt://broker:99999"),
            Err(ConfigError::InvalidPort(_))
        ));
    }

    #[test]
    fn test_broker_display() {
        let addr = BrokerAddress::parse("broker:1884").unwrap();
        assert_eq!(addr.to_string(), "mqtt://broker:1884");
    }
}

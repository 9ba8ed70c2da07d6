//! Configuration for the mocap-io client
//!
//! Loads client identity, ports and socket timing from a TOML file. Every
//! section is optional; missing values fall back to the NatNet defaults.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level client configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    pub client: IdentityConfig,
    pub network: NetworkConfig,
    pub timing: TimingConfig,
    pub logging: LoggingConfig,
}

/// Client identity announced in the ping handshake
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Application name (truncated to 128 characters on the wire)
    pub name: String,
    /// Application version (major, minor, revision, build)
    pub version: [u8; 4],
}

/// UDP port configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Server command port (request/response)
    pub command_port: u16,
    /// Data stream port (frames pushed by the server)
    pub data_port: u16,
}

/// Socket timing
///
/// The socket read timeouts are the only timeout mechanism used by the
/// client; nothing else blocks.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Read timeout on the command socket
    pub command_timeout_ms: u64,
    /// Data socket timeout while waiting for the stream to start
    pub stream_initial_timeout_ms: u64,
    /// Data socket timeout while the stream is running
    pub stream_running_timeout_ms: u64,
    /// Consecutive running timeouts tolerated before the stream counts as stopped
    pub stream_timeout_threshold: u32,
    /// Consecutive command channel errors tolerated before disconnecting
    pub max_consecutive_errors: u32,
    /// Upper bound for joining the receiver thread on disconnect
    pub receiver_join_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log filter (trace, debug, info, warn, error); `RUST_LOG` overrides it
    pub level: String,
}

impl ClientConfig {
    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use mocap_io::config::ClientConfig;
    ///
    /// let config = ClientConfig::from_file("mocap.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

impl TimingConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms.max(1))
    }

    pub fn stream_initial_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_initial_timeout_ms.max(1))
    }

    pub fn stream_running_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_running_timeout_ms.max(1))
    }

    pub fn receiver_join_timeout(&self) -> Duration {
        Duration::from_millis(self.receiver_join_timeout_ms)
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            name: "Rust MoCap Client".to_string(),
            version: [1, 0, 1, 0],
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            command_port: 1508,
            data_port: 1509,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: 100,
            stream_initial_timeout_ms: 1000,
            stream_running_timeout_ms: 100,
            stream_timeout_threshold: 10,
            max_consecutive_errors: 30,
            receiver_join_timeout_ms: 1500,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.client.name, "Rust MoCap Client");
        assert_eq!(config.client.version, [1, 0, 1, 0]);
        assert_eq!(config.network.command_port, 1508);
        assert_eq!(config.network.data_port, 1509);
        assert_eq!(config.timing.command_timeout(), Duration::from_millis(100));
        assert_eq!(config.timing.stream_timeout_threshold, 10);
        assert_eq!(config.timing.max_consecutive_errors, 30);
    }

    #[test]
    fn test_toml_serialization() {
        let config = ClientConfig::default();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[client]"));
        assert!(toml_string.contains("[network]"));
        assert!(toml_string.contains("[timing]"));
        assert!(toml_string.contains("[logging]"));
        assert!(toml_string.contains("command_port = 1508"));
    }

    #[test]
    fn test_toml_deserialization_partial() {
        let toml_content = r#"
[network]
command_port = 2508

[logging]
level = "debug"
"#;

        let config: ClientConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.network.command_port, 2508);
        // Unset keys keep their defaults
        assert_eq!(config.network.data_port, 1509);
        assert_eq!(config.timing.stream_initial_timeout_ms, 1000);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mocap.toml");

        let mut config = ClientConfig::default();
        config.client.name = "Test Rig".to_string();
        config.timing.command_timeout_ms = 250;
        config.to_file(&path).unwrap();

        let loaded = ClientConfig::from_file(&path).unwrap();
        assert_eq!(loaded.client.name, "Test Rig");
        assert_eq!(loaded.timing.command_timeout_ms, 250);
    }

    #[test]
    fn test_zero_timeout_is_clamped() {
        let timing = TimingConfig {
            command_timeout_ms: 0,
            ..TimingConfig::default()
        };
        // A zero read timeout is rejected by std sockets
        assert_eq!(timing.command_timeout(), Duration::from_millis(1));
    }
}

//! Configuration for the sender binary.

use std::path::Path;

use serde::{Deserialize, Serialize};

use framecast_core::{CastConfig, ConnectionInfo, DEFAULT_PORT};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Target peer settings.
    pub network: NetworkConfig,
    /// Stream settings.
    pub stream: StreamConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Viewer host or IP address.
    pub host: String,
    /// Viewer TCP port.
    pub port: u16,
}

/// Stream configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Target frames per second (1..=60).
    pub fps: u8,
    /// JPEG quality (1..=100); lower favours latency.
    pub quality: u8,
    /// Synthetic capture width in pixels.
    pub width: u32,
    /// Synthetic capture height in pixels.
    pub height: u32,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_PORT,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            quality: 50,
            width: 1280,
            height: 720,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl SenderConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                eprintln!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Peer to connect to.
    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo::new(self.network.host.clone(), self.network.port)
    }

    /// Convert stream settings into a `CastConfig`.
    pub fn to_cast_config(&self) -> CastConfig {
        CastConfig {
            target_fps: self.stream.fps.clamp(1, 60),
            jpeg_quality: self.stream.quality.clamp(1, 100),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = SenderConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("host"));
        assert!(text.contains("fps"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = SenderConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: SenderConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network.port, DEFAULT_PORT);
        assert_eq!(parsed.stream.fps, 30);
    }

    #[test]
    fn to_cast_config_clamps() {
        let mut cfg = SenderConfig::default();
        cfg.stream.fps = 120; // beyond max
        cfg.stream.quality = 0;
        let cast = cfg.to_cast_config();
        assert_eq!(cast.target_fps, 60);
        assert_eq!(cast.jpeg_quality, 1);
    }
}

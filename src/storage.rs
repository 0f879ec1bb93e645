//! Storage management for configuration and the persisted device lists.
//!
//! All application data lives under `~/.config/rhome/`:
//!
//! ```text
//! ~/.config/rhome/
//!   config.ini          — User configuration
//!   devices.json        — Lights, blinds and learned remote buttons
//! ```
//!
//! The config file is human-edited; the device document is written by the
//! application whenever a device or button is added or removed.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use configparser::ini::Ini;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::devices::{Blind, Light};
use crate::protocols::ProtocolKind;
use crate::remote::ButtonRegistry;

// ─── Config ──────────────────────────────────────────────────────────────────

/// Application configuration loaded from `~/.config/rhome/config.ini`
#[derive(Debug, Clone)]
pub struct Config {
    // [receiver]
    /// Identical consecutive telegrams required before a code is accepted.
    pub min_repeats: u8,

    // [transmit]
    /// Per-protocol pulse period overrides in µs (0..512). Zero keeps the
    /// protocol default.
    pub kaku_period_us: u16,
    pub action_period_us: u16,
    pub blokker_period_us: u16,
    pub elro_period_us: u16,

    // [blinds]
    /// Seconds a blind output stays energized after a move.
    pub blind_settle_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_repeats: 2,
            kaku_period_us: 0,
            action_period_us: 0,
            blokker_period_us: 0,
            elro_period_us: 0,
            blind_settle_seconds: 7,
        }
    }
}

impl Config {
    /// Effective pulse period for a protocol: the configured override, or
    /// the protocol default when unset.
    pub fn period_for(&self, protocol: ProtocolKind) -> u16 {
        let configured = match protocol {
            ProtocolKind::KaKu => self.kaku_period_us,
            ProtocolKind::Action => self.action_period_us,
            ProtocolKind::Blokker => self.blokker_period_us,
            ProtocolKind::Elro => self.elro_period_us,
        };
        if configured != 0 {
            configured
        } else {
            protocol.default_period_us()
        }
    }

    /// Load config from an INI file, falling back to defaults for missing keys.
    fn load_from_ini(path: &Path) -> Result<Self> {
        let mut ini = Ini::new();
        ini.load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        let defaults = Config::default();

        let getu = |section: &str, key: &str, fallback: u64| {
            ini.getuint(section, key).ok().flatten().unwrap_or(fallback)
        };

        Ok(Self {
            min_repeats: getu("receiver", "min_repeats", defaults.min_repeats as u64) as u8,
            kaku_period_us: getu("transmit", "kaku_period_us", 0) as u16,
            action_period_us: getu("transmit", "action_period_us", 0) as u16,
            blokker_period_us: getu("transmit", "blokker_period_us", 0) as u16,
            elro_period_us: getu("transmit", "elro_period_us", 0) as u16,
            blind_settle_seconds: getu(
                "blinds",
                "settle_seconds",
                defaults.blind_settle_seconds,
            ),
        })
    }

    /// Save config to an INI-style file with comments explaining each field.
    fn save_to_ini(&self, path: &Path) -> Result<()> {
        let content = format!(
            r#"; rhome — RF home controller configuration
; Location: {path}
;
; Edit this file to change default settings.
; Lines starting with ; or # are comments.

[receiver]
; Number of identical consecutive telegrams a remote must send before
; the code is accepted. Higher values reject more noise but make cheap
; remotes feel less responsive.
min_repeats = {min_repeats}

[transmit]
; Pulse period overrides in microseconds (1..511) per protocol.
; 0 keeps the built-in default (KaKu 375, Action 190, Blokker 230, Elro 320).
kaku_period_us = {kaku}
action_period_us = {action}
blokker_period_us = {blokker}
elro_period_us = {elro}

[blinds]
; Seconds a blind motor output stays energized after a position change.
settle_seconds = {settle}
"#,
            path = path.display(),
            min_repeats = self.min_repeats,
            kaku = self.kaku_period_us,
            action = self.action_period_us,
            blokker = self.blokker_period_us,
            elro = self.elro_period_us,
            settle = self.blind_settle_seconds,
        );

        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        Ok(())
    }
}

/// Resolve the config directory to `~/.config/rhome/` regardless of OS.
pub fn resolve_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("rhome"))
}

// ─── Device document ─────────────────────────────────────────────────────────

/// Errors reading or writing `devices.json`.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed device document {path:?}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything the controller persists: device lists and learned buttons,
/// stamped with the save time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDocument {
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub lights: Vec<Light>,
    #[serde(default)]
    pub blinds: Vec<Blind>,
    #[serde(default)]
    pub buttons: ButtonRegistry,
}

impl DeviceDocument {
    pub fn empty() -> Self {
        Self {
            saved_at: Utc::now(),
            lights: Vec::new(),
            blinds: Vec::new(),
            buttons: ButtonRegistry::new(),
        }
    }
}

/// Read a device document, or an empty one when the file does not exist.
pub fn load_devices(path: &Path) -> Result<DeviceDocument, DocumentError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(DeviceDocument::empty());
        }
        Err(source) => {
            return Err(DocumentError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&text).map_err(|source| DocumentError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a device document, refreshing its save stamp.
pub fn save_devices(path: &Path, document: &mut DeviceDocument) -> Result<(), DocumentError> {
    document.saved_at = Utc::now();

    let text = serde_json::to_string_pretty(document).map_err(|source| {
        DocumentError::Malformed {
            path: path.to_path_buf(),
            source,
        }
    })?;

    fs::write(path, text).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ─── Storage ─────────────────────────────────────────────────────────────────

/// Storage manager for configuration and the device document.
///
/// On construction it ensures `~/.config/rhome/` exists and loads (or
/// creates) `config.ini`. The device document is loaded lazily by the caller
/// through [Storage::load_devices].
pub struct Storage {
    /// Base config directory (~/.config/rhome)
    config_dir: PathBuf,
    /// Configuration
    pub config: Config,
}

impl Storage {
    /// Create a new storage manager.
    ///
    /// 1. Resolves the config directory (`~/.config/rhome`).
    /// 2. Creates it if missing.
    /// 3. Loads `config.ini` if it exists, otherwise writes a default one.
    pub fn new() -> Result<Self> {
        let config_dir = resolve_config_dir()
            .context("Could not determine home directory (is $HOME set?)")?;

        let config_path = config_dir.join("config.ini");

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config dir: {:?}", config_dir))?;
            tracing::info!("Created config directory: {:?}", config_dir);
        }

        let config = if config_path.exists() {
            tracing::info!("Loading config from {:?}", config_path);
            match Config::load_from_ini(&config_path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!("Failed to parse config.ini, using defaults: {}", e);
                    Config::default()
                }
            }
        } else {
            tracing::info!("No config.ini found — creating default at {:?}", config_path);
            let config = Config::default();
            if let Err(e) = config.save_to_ini(&config_path) {
                tracing::warn!("Could not write default config.ini: {}", e);
            }
            config
        };

        Ok(Self { config_dir, config })
    }

    /// Save the current configuration back to `config.ini`.
    #[allow(dead_code)]
    pub fn save_config(&self) -> Result<()> {
        let config_path = self.config_dir.join("config.ini");
        self.config.save_to_ini(&config_path)?;
        tracing::info!("Saved config to {:?}", config_path);
        Ok(())
    }

    /// Get the config directory path (`~/.config/rhome`)
    #[allow(dead_code)]
    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    pub fn devices_path(&self) -> PathBuf {
        self.config_dir.join("devices.json")
    }

    pub fn load_devices(&self) -> Result<DeviceDocument> {
        Ok(load_devices(&self.devices_path())?)
    }

    pub fn save_devices(&self, document: &mut DeviceDocument) -> Result<()> {
        save_devices(&self.devices_path(), document)?;
        tracing::info!("Saved devices to {:?}", self.devices_path());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::LightKind;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rhome-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn config_round_trips_through_ini() {
        let path = temp_path("config.ini");
        let config = Config {
            min_repeats: 3,
            kaku_period_us: 380,
            action_period_us: 0,
            blokker_period_us: 0,
            elro_period_us: 321,
            blind_settle_seconds: 5,
        };
        config.save_to_ini(&path).unwrap();

        let loaded = Config::load_from_ini(&path).unwrap();
        assert_eq!(loaded.min_repeats, 3);
        assert_eq!(loaded.kaku_period_us, 380);
        assert_eq!(loaded.elro_period_us, 321);
        assert_eq!(loaded.blind_settle_seconds, 5);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let path = temp_path("sparse.ini");
        fs::write(&path, "[receiver]\nmin_repeats = 4\n").unwrap();

        let loaded = Config::load_from_ini(&path).unwrap();
        assert_eq!(loaded.min_repeats, 4);
        assert_eq!(loaded.blind_settle_seconds, 7);
        assert_eq!(loaded.kaku_period_us, 0);
    }

    #[test]
    fn period_override_beats_the_protocol_default() {
        let config = Config {
            kaku_period_us: 400,
            ..Config::default()
        };
        assert_eq!(config.period_for(ProtocolKind::KaKu), 400);
        assert_eq!(config.period_for(ProtocolKind::Action), 190);
        assert_eq!(config.period_for(ProtocolKind::Blokker), 230);
        assert_eq!(config.period_for(ProtocolKind::Elro), 320);
    }

    #[test]
    fn device_document_round_trips() {
        let path = temp_path("devices.json");
        let mut doc = DeviceDocument::empty();
        doc.lights.push(Light::new(
            "hall",
            LightKind::KaKu {
                address: 'A',
                device: 1,
            },
        ));
        let mut blind = Blind::new("study", 2);
        blind.set_bounds(0, 1500, 3000);
        doc.blinds.push(blind);

        save_devices(&path, &mut doc).unwrap();
        let loaded = load_devices(&path).unwrap();

        assert_eq!(loaded.lights.len(), 1);
        assert_eq!(loaded.lights[0].name, "hall");
        assert_eq!(loaded.blinds[0].max_position, 3000);
        assert_eq!(loaded.saved_at, doc.saved_at);
    }

    #[test]
    fn missing_document_is_an_empty_document() {
        let loaded = load_devices(Path::new("/nonexistent/devices.json")).unwrap();
        assert!(loaded.lights.is_empty());
        assert!(loaded.blinds.is_empty());
        assert!(loaded.buttons.buttons().is_empty());
    }

    #[test]
    fn malformed_document_reports_the_path() {
        let path = temp_path("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_devices(&path).unwrap_err();
        assert!(matches!(err, DocumentError::Malformed { .. }));
        assert!(err.to_string().contains("broken.json"));
    }
}

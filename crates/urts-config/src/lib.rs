// SPDX-License-Identifier: MIT
//! INI-based configuration loading shared by every URTS service binary.
//!
//! Every service reads a plain INI file with a named section. Four keys
//! are recognized by every service — `address`, `sendHighWaterMark`,
//! `receiveHighWaterMark`, `pollingTimeOut` — and each service also
//! reads its own handful of service-specific keys (`modelWeightsFile`,
//! `device`, `maxPackets`, `increment`, `initialValue`, ...) through the
//! same loaded section, via [`ServiceConfig::get`] and its typed
//! siblings.

use ini::Ini;
use std::path::Path;
use std::time::Duration;

/// Errors raised while loading or reading a service configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read or was not valid INI.
    #[error("failed to load configuration file {path}: {source}")]
    Load {
        /// Path that failed to load.
        path: String,
        /// Underlying parse error.
        source: ini::Error,
    },
    /// The named section was not present in the file.
    #[error("section [{0}] not found in configuration file")]
    MissingSection(String),
    /// A key required by the caller was not present in the section.
    #[error("key '{key}' not found in section [{section}]")]
    MissingKey {
        /// Section the key was expected in.
        section: String,
        /// Key that was missing.
        key: String,
    },
    /// A key's value could not be parsed as the requested type.
    #[error("key '{key}' has value '{value}' which is not a valid {expected_type}")]
    InvalidValue {
        /// Key whose value failed to parse.
        key: String,
        /// The raw string value.
        value: String,
        /// The type the caller requested.
        expected_type: &'static str,
    },
}

/// A compute device selection, recognized by the `device` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    /// Run on the CPU.
    Cpu,
    /// Run on a GPU.
    Gpu,
}

/// A loaded `[section]` of an INI configuration file, with typed
/// accessors for the keys every service recognizes plus raw access to
/// any service-specific key.
pub struct ServiceConfig {
    section_name: String,
    properties: ini::Properties,
}

impl ServiceConfig {
    /// Load `section` out of the INI file at `path`.
    pub fn load(path: impl AsRef<Path>, section: &str) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let ini = Ini::load_from_file(path_ref).map_err(|source| ConfigError::Load {
            path: path_ref.display().to_string(),
            source,
        })?;
        let properties = ini
            .section(Some(section))
            .cloned()
            .ok_or_else(|| ConfigError::MissingSection(section.to_string()))?;
        Ok(Self {
            section_name: section.to_string(),
            properties,
        })
    }

    /// Raw string value of `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key)
    }

    /// Raw string value of `key`, or [`ConfigError::MissingKey`] if
    /// absent.
    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingKey {
            section: self.section_name.clone(),
            key: key.to_string(),
        })
    }

    /// Parse `key` as `u32`, if present.
    pub fn get_u32(&self, key: &str) -> Result<Option<u32>, ConfigError> {
        self.parse_optional(key, "u32")
    }

    /// Parse `key` as `i64`, if present.
    pub fn get_i64(&self, key: &str) -> Result<Option<i64>, ConfigError> {
        self.parse_optional(key, "i64")
    }

    /// Parse `key` as `f64`, if present.
    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        self.parse_optional(key, "f64")
    }

    fn parse_optional<T: std::str::FromStr>(
        &self,
        key: &str,
        expected_type: &'static str,
    ) -> Result<Option<T>, ConfigError> {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        raw.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            expected_type,
        })
    }

    /// The required connection address (`address`).
    pub fn address(&self) -> Result<&str, ConfigError> {
        self.require("address")
    }

    /// The send high-water mark (`sendHighWaterMark`), if configured.
    pub fn send_high_water_mark(&self) -> Result<Option<u32>, ConfigError> {
        self.get_u32("sendHighWaterMark")
    }

    /// The receive high-water mark (`receiveHighWaterMark`), if
    /// configured.
    pub fn receive_high_water_mark(&self) -> Result<Option<u32>, ConfigError> {
        self.get_u32("receiveHighWaterMark")
    }

    /// The socket polling timeout (`pollingTimeOut`, milliseconds), if
    /// configured.
    pub fn polling_timeout(&self) -> Result<Option<Duration>, ConfigError> {
        Ok(self.get_u32("pollingTimeOut")?.map(|ms| Duration::from_millis(u64::from(ms))))
    }

    /// The compute device selection (`device`), if configured.
    pub fn device(&self) -> Result<Option<Device>, ConfigError> {
        match self.get("device") {
            None => Ok(None),
            Some(value) if value.eq_ignore_ascii_case("cpu") => Ok(Some(Device::Cpu)),
            Some(value) if value.eq_ignore_ascii_case("gpu") => Ok(Some(Device::Gpu)),
            Some(value) => Err(ConfigError::InvalidValue {
                key: "device".to_string(),
                value: value.to_string(),
                expected_type: "Device (CPU or GPU)",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_ini(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "urts-config-test-{name}-{}.ini",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    // ── 1. required keys load and parse correctly ────────────────────────

    #[test]
    fn loads_required_keys() {
        let path = write_temp_ini(
            "required",
            "[PacketCache]\naddress = tcp://127.0.0.1:8080\nsendHighWaterMark = 8192\nmaxPackets = 300\n",
        );
        let config = ServiceConfig::load(&path, "PacketCache").unwrap();
        assert_eq!(config.address().unwrap(), "tcp://127.0.0.1:8080");
        assert_eq!(config.send_high_water_mark().unwrap(), Some(8192));
        assert_eq!(config.get_u32("maxPackets").unwrap(), Some(300));
        let _ = std::fs::remove_file(&path);
    }

    // ── 2. a missing section is reported ──────────────────────────────────

    #[test]
    fn missing_section_is_reported() {
        let path = write_temp_ini("missing-section", "[Other]\naddress = tcp://127.0.0.1:8080\n");
        let err = ServiceConfig::load(&path, "PacketCache").unwrap_err();
        assert!(matches!(err, ConfigError::MissingSection(_)));
        let _ = std::fs::remove_file(&path);
    }

    // ── 3. a missing required key is reported ─────────────────────────────

    #[test]
    fn missing_required_key_is_reported() {
        let path = write_temp_ini("missing-key", "[PacketCache]\nmaxPackets = 300\n");
        let config = ServiceConfig::load(&path, "PacketCache").unwrap();
        let err = config.address().unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { .. }));
        let _ = std::fs::remove_file(&path);
    }

    // ── 4. device parses case-insensitively, rejects unknown values ──────

    #[test]
    fn device_parses_case_insensitively() {
        let path = write_temp_ini(
            "device",
            "[Detector]\naddress = tcp://127.0.0.1:9000\ndevice = gpu\n",
        );
        let config = ServiceConfig::load(&path, "Detector").unwrap();
        assert_eq!(config.device().unwrap(), Some(Device::Gpu));
        let _ = std::fs::remove_file(&path);
    }

    // ── 5. polling timeout is read in milliseconds ────────────────────────

    #[test]
    fn polling_timeout_is_milliseconds() {
        let path = write_temp_ini(
            "polling",
            "[Detector]\naddress = tcp://127.0.0.1:9000\npollingTimeOut = 50\n",
        );
        let config = ServiceConfig::load(&path, "Detector").unwrap();
        assert_eq!(config.polling_timeout().unwrap(), Some(Duration::from_millis(50)));
        let _ = std::fs::remove_file(&path);
    }
}

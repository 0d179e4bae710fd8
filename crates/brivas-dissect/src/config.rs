//! Dissector configuration
//!
//! The preference surface of the dissection core: protocol versions,
//! the MTP3 variant used for point codes, and the decode budgets.

use crate::errors::ConfigError;
use crate::sigtran::m3ua::M3uaVersion;
use crate::sigtran::sua::SuaVersion;
use crate::types::{Mtp3Standard, PointCodeFormat};
use serde::{Deserialize, Serialize};

/// Environment prefix for layered loading (`DISSECT__M3UA__VERSION=rfc`)
pub const ENV_PREFIX: &str = "DISSECT";

/// Complete dissector configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DissectConfig {
    /// BER engine options
    pub ber: BerOptions,
    /// Signalling parameter loop options
    pub tlv: TlvOptions,
    /// MTP3 variant and point code display
    pub mtp3: Mtp3Config,
    /// M3UA protocol version
    pub m3ua: M3uaConfig,
    /// SUA protocol version
    pub sua: SuaConfig,
}

/// BER decoding options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BerOptions {
    /// Maximum nesting of constructed elements
    pub max_depth: usize,
    /// Annotate BOOLEAN values other than 0x00/0xFF
    pub strict_boolean: bool,
}

/// Signalling TLV options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlvOptions {
    /// Maximum nesting of composite parameters
    pub max_depth: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mtp3Config {
    pub standard: Mtp3Standard,
    pub pc_format: PointCodeFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct M3uaConfig {
    pub version: M3uaVersion,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuaConfig {
    pub version: SuaVersion,
}

impl Default for BerOptions {
    fn default() -> Self {
        Self {
            max_depth: 64,
            strict_boolean: false,
        }
    }
}

impl Default for TlvOptions {
    fn default() -> Self {
        Self { max_depth: 4 }
    }
}

impl DissectConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Layer an optional config file (any format the `config` crate
    /// detects from the extension) under `DISSECT__*` environment variables
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DissectConfig::default();
        assert_eq!(config.ber.max_depth, 64);
        assert!(!config.ber.strict_boolean);
        assert_eq!(config.tlv.max_depth, 4);
        assert_eq!(config.m3ua.version, M3uaVersion::Rfc);
        assert_eq!(config.sua.version, SuaVersion::Rfc3868);
        assert_eq!(config.mtp3.standard, Mtp3Standard::Itu);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: DissectConfig = serde_json::from_str(
            r#"{"m3ua": {"version": "draft-6"}, "mtp3": {"standard": "ansi", "pc_format": "structured"}}"#,
        )
        .unwrap();
        assert_eq!(config.m3ua.version, M3uaVersion::Draft6);
        assert_eq!(config.mtp3.standard, Mtp3Standard::Ansi);
        assert_eq!(config.mtp3.pc_format, PointCodeFormat::Structured);
        assert_eq!(config.ber.max_depth, 64);
    }

    #[test]
    fn test_from_file_and_layered_load() {
        let path = std::env::temp_dir().join(format!("brivas-dissect-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"sua": {"version": "draft-08"}, "tlv": {"max_depth": 2}}"#).unwrap();
        let path = path.to_string_lossy().into_owned();

        let config = DissectConfig::from_file(&path).unwrap();
        assert_eq!(config.sua.version, SuaVersion::Draft08);
        assert_eq!(config.tlv.max_depth, 2);

        let layered = DissectConfig::load(Some(&path)).unwrap();
        assert_eq!(layered.sua.version, SuaVersion::Draft08);
        assert_eq!(layered.ber.max_depth, 64);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = DissectConfig::from_file("/nonexistent/brivas-dissect.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}

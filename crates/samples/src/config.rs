//! TOML configuration for the sample harness.
//!
//! Precedence, highest first: CLI flags, `BITONIC_*` environment variables,
//! the TOML file, defaults.
//!
//! ```toml
//! [sample]
//! kind = "bitonic"
//!
//! [input]
//! count = 1000
//! seed = 42
//! distribution = "shuffled"
//!
//! [device]
//! thread_group_size = 256
//! validate_hazards = true
//! profile = true
//!
//! [output]
//! print = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::input::KeyDistribution;
use crate::sample::SampleKind;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sample: SampleSection,
    pub input: InputSection,
    pub device: DeviceSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleSection {
    pub kind: SampleKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSection {
    /// Number of real keys; the sort buffer is padded to the next power of two.
    pub count: usize,
    pub seed: u64,
    pub distribution: KeyDistribution,
}

impl Default for InputSection {
    fn default() -> Self {
        Self {
            count: 1000,
            seed: 0x5EED_2026,
            distribution: KeyDistribution::Shuffled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSection {
    pub thread_group_size: u32,
    pub validate_hazards: bool,
    pub profile: bool,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            thread_group_size: bitonic::kernel::THREAD_GROUP_SIZE,
            validate_hazards: true,
            profile: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Print the sorted keys.
    pub print: bool,
}

/// Searched in order when no `--config` is given.
pub const DEFAULT_CONFIG_PATHS: &[&str] =
    &["bitonic-samples.toml", "config/bitonic-samples.toml"];

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(config_path: Option<impl AsRef<Path>>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path {
            let p = path.as_ref();
            if !p.exists() {
                return Err(ConfigError::NotFound(p.display().to_string()));
            }
            config = Self::from_file(p)?;
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|p| Path::new(**p).exists())
        {
            tracing::debug!(path = *path, "using default config file");
            config = Self::from_file(path)?;
        }

        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Applies `BITONIC_*` overrides read through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup("BITONIC_SAMPLE") {
            self.sample.kind = parse_enum("BITONIC_SAMPLE", value)?;
        }
        if let Some(value) = lookup("BITONIC_COUNT") {
            self.input.count = parse_value("BITONIC_COUNT", value)?;
        }
        if let Some(value) = lookup("BITONIC_SEED") {
            self.input.seed = parse_value("BITONIC_SEED", value)?;
        }
        if let Some(value) = lookup("BITONIC_DISTRIBUTION") {
            self.input.distribution = parse_enum("BITONIC_DISTRIBUTION", value)?;
        }
        if let Some(value) = lookup("BITONIC_THREAD_GROUP_SIZE") {
            self.device.thread_group_size = parse_value("BITONIC_THREAD_GROUP_SIZE", value)?;
        }
        if let Some(value) = lookup("BITONIC_VALIDATE_HAZARDS") {
            self.device.validate_hazards = parse_flag("BITONIC_VALIDATE_HAZARDS", value)?;
        }
        if let Some(value) = lookup("BITONIC_PROFILE") {
            self.device.profile = parse_flag("BITONIC_PROFILE", value)?;
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}

/// `true`/`false` plus the `1`/`0` and `yes`/`no` spellings, any case.
fn parse_flag(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "yes" => Ok(true),
        "0" | "no" => Ok(false),
        other => other
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
    }
}

fn parse_enum<T: clap::ValueEnum>(var: &'static str, value: String) -> Result<T, ConfigError> {
    T::from_str(&value, true).map_err(|_| ConfigError::InvalidEnv { var, value })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.sample.kind, SampleKind::Bitonic);
        assert_eq!(config.input.count, 1000);
        assert!(config.device.validate_hazards);
        assert!(!config.output.print);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [sample]
            kind = "host"

            [input]
            count = 3
            distribution = "uniform"
            "#,
        )
        .unwrap();
        assert_eq!(config.sample.kind, SampleKind::Host);
        assert_eq!(config.input.count, 3);
        assert_eq!(config.input.distribution, KeyDistribution::Uniform);
        assert_eq!(config.input.seed, InputSection::default().seed);
        assert_eq!(config.device.thread_group_size, 256);
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(matches!(
            Config::from_toml("[sample]\nkind = \"workgraph\"\n"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("BITONIC_SAMPLE", "Host"),
            ("BITONIC_COUNT", "17"),
            ("BITONIC_DISTRIBUTION", "uniform"),
            ("BITONIC_PROFILE", "no"),
            ("BITONIC_VALIDATE_HAZARDS", "0"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|var| vars.get(var).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.sample.kind, SampleKind::Host);
        assert_eq!(config.input.count, 17);
        assert_eq!(config.input.distribution, KeyDistribution::Uniform);
        assert!(!config.device.profile);
        assert!(!config.device.validate_hazards);
    }

    #[test]
    fn flags_accept_common_spellings() {
        for (value, expected) in [("TRUE", true), ("Yes", true), ("1", true), ("false", false)] {
            let mut config = Config::default();
            config.device.profile = !expected;
            config
                .apply_env(|var| (var == "BITONIC_PROFILE").then(|| value.to_string()))
                .unwrap();
            assert_eq!(config.device.profile, expected, "value={value}");
        }
    }

    #[test]
    fn misspelled_flag_is_an_error() {
        let mut config = Config::default();
        let err = config
            .apply_env(|var| (var == "BITONIC_PROFILE").then(|| "tru".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv { var: "BITONIC_PROFILE", ref value } if value == "tru"
        ));
        assert!(config.device.profile);
    }

    #[test]
    fn bad_env_value_is_an_error() {
        let mut config = Config::default();
        let err = config
            .apply_env(|var| (var == "BITONIC_COUNT").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "BITONIC_COUNT", .. }));
    }

    #[test]
    fn missing_explicit_file() {
        assert!(matches!(
            Config::load(Some("definitely/not/here.toml")),
            Err(ConfigError::NotFound(_))
        ));
    }
}

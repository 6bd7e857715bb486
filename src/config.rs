//! Configuration types for dnstemple.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, TempleError};
use crate::serial::SerialMode;
use crate::variables::Variables;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "DNSTEMPLE";

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Values for `{name}` placeholders.
    #[serde(default)]
    pub variables: Variables,

    /// Address groups for `$ADDRESS`: name -> IP literals and/or group names.
    #[serde(default)]
    pub addresses: HashMap<String, String>,

    /// File suffixes.
    #[serde(default)]
    pub extensions: Extensions,

    /// Processing options.
    #[serde(default)]
    pub config: Options,

    /// Catalog zone maintenance. Disabled when absent.
    #[serde(default)]
    pub catalog: Option<CatalogConfig>,

    /// Logging configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// File suffixes for templates, generated zones and the catalog zone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Extensions {
    /// Template suffix (e.g. `.in`).
    #[serde(rename = "in")]
    pub input: Option<String>,

    /// Generated zone file suffix (e.g. `.zone`).
    #[serde(rename = "out")]
    pub output: Option<String>,

    /// Catalog zone file suffix.
    pub catalog: Option<String>,
}

/// The `config:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Options {
    /// `unixtime`, `dateserial`, `online` or a fixed integer.
    #[serde(default)]
    pub serial: Option<String>,

    /// Line kinds to drop from the output.
    #[serde(default)]
    pub skip: Skip,
}

/// Which kinds of template lines are left out of generated files.
///
/// Accepts a list (`[comment, empty]`) or a single string
/// (`"comment empty"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "SkipSetting")]
pub struct Skip {
    /// Drop lines starting with `;`.
    pub comment: bool,
    /// Drop blank lines.
    pub empty: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SkipSetting {
    List(Vec<String>),
    Words(String),
}

impl TryFrom<SkipSetting> for Skip {
    type Error = String;

    fn try_from(setting: SkipSetting) -> Result<Self, Self::Error> {
        let words: Vec<String> = match setting {
            SkipSetting::List(list) => list,
            SkipSetting::Words(words) => words
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|w| !w.is_empty())
                .map(String::from)
                .collect(),
        };

        let mut skip = Skip::default();
        for word in words {
            match word.as_str() {
                "comment" => skip.comment = true,
                "empty" => skip.empty = true,
                other => return Err(format!("unknown config.skip value: {other}")),
            }
        }
        Ok(skip)
    }
}

/// Catalog zone configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    /// Name of the catalog zone.
    pub domain: Option<String>,

    /// `always` maintains the catalog even when only one zone was processed.
    pub maintain: Option<String>,
}

impl CatalogConfig {
    /// Whether the catalog should be reconciled after processing
    /// `processed` domains.
    pub fn should_maintain(&self, processed: usize) -> bool {
        processed > 1 || self.maintain.as_deref() == Some("always")
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter used when `RUST_LOG` is unset (e.g. "warn", "dnstemple=debug").
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Load a YAML configuration file, with `DNSTEMPLE__*` environment
    /// overrides layered on top.
    ///
    /// Sets the `_config` variable to `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: Config = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Yaml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config
            .variables
            .insert("_config".to_string(), path.display().to_string());
        Ok(config)
    }

    /// Parse a YAML document held in memory.
    pub fn from_yaml(document: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(document, config::FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Check the invariants that processing relies on.
    pub fn validate(&self) -> Result<()> {
        let (Some(input), Some(output)) = (&self.extensions.input, &self.extensions.output) else {
            return Err(TempleError::InvalidConfig(
                "extensions.in and extensions.out required in config file".to_string(),
            ));
        };
        if input == output {
            return Err(TempleError::InvalidConfig(
                "extensions.in and extensions.out need to differ".to_string(),
            ));
        }
        self.serial_mode()?;
        Ok(())
    }

    /// Template and output suffixes. Call [`Config::validate`] first.
    pub fn io_extensions(&self) -> Result<(&str, &str)> {
        match (&self.extensions.input, &self.extensions.output) {
            (Some(input), Some(output)) => Ok((input, output)),
            _ => Err(TempleError::InvalidConfig(
                "extensions.in and extensions.out required in config file".to_string(),
            )),
        }
    }

    /// Parsed `config.serial`.
    pub fn serial_mode(&self) -> Result<SerialMode> {
        match &self.config.serial {
            Some(mode) => mode.parse(),
            None => Ok(SerialMode::default()),
        }
    }

    /// Catalog zone name and file suffix, required once the catalog is
    /// going to be maintained.
    pub fn catalog_target(&self) -> Result<(&str, &str)> {
        let domain = self
            .catalog
            .as_ref()
            .and_then(|c| c.domain.as_deref())
            .ok_or_else(|| TempleError::InvalidConfig("catalog requires catalog.domain".into()))?;
        let extension = self.extensions.catalog.as_deref().ok_or_else(|| {
            TempleError::InvalidConfig("catalog requires extensions.catalog".into())
        })?;
        Ok((domain, extension))
    }
}

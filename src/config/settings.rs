use crate::config::error::ConfigError;
use crate::config::parameter::{ParameterSpec, SelectionRule};
use log::debug;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 120;
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 900;

/// Top level of the YAML configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub download: DownloadConfig,
}

/// The `download` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadConfig {
    /// Root of the STAC catalog, e.g. `https://host/v1/forecastdata/collections`.
    pub stac_url: String,
    /// Whether downloaded files are cut down to `parameters` and merged.
    pub filter_parameters: bool,
    /// Re-encode the merged artifact with CCSDS packing.
    #[serde(default)]
    pub convert_to_ccsds: bool,
    #[serde(default)]
    pub parameters: Option<BTreeMap<String, ParameterSpec>>,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default)]
    pub read_timeout_secs: Option<u64>,
    #[serde(default)]
    pub tool_timeout_secs: Option<u64>,
}

impl Config {
    /// Reads and validates the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::parse(&contents, path)
    }

    /// Parses and validates YAML `contents`; `origin` only labels errors.
    pub fn parse(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)
            .map_err(|e| ConfigError::Parse(origin.to_path_buf(), e))?;
        config.validate()?;
        debug!("Config check passed");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let download = &self.download;

        let url = download.stac_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "stac_url must be an http(s) URL, got {:?}",
                download.stac_url
            )));
        }

        for (key, value) in [
            ("connect_timeout_secs", download.connect_timeout_secs),
            ("read_timeout_secs", download.read_timeout_secs),
            ("tool_timeout_secs", download.tool_timeout_secs),
        ] {
            if value == Some(0) {
                return Err(ConfigError::Invalid(format!("{key} must be positive")));
            }
        }

        if download.filter_parameters {
            debug!("Filter parameters enabled - checking for filter parameters");
            download.selection_rules()?;
        }
        Ok(())
    }
}

impl DownloadConfig {
    /// Every selection rule of every configured parameter, parameters in name order.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] when no parameters are configured or any of
    /// them is malformed.
    pub fn selection_rules(&self) -> Result<Vec<SelectionRule>, ConfigError> {
        selection_rules(self.parameters.as_ref())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs.unwrap_or(DEFAULT_READ_TIMEOUT_SECS))
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs.unwrap_or(DEFAULT_TOOL_TIMEOUT_SECS))
    }
}

pub(crate) fn selection_rules(
    parameters: Option<&BTreeMap<String, ParameterSpec>>,
) -> Result<Vec<SelectionRule>, ConfigError> {
    let parameters = match parameters {
        Some(parameters) if !parameters.is_empty() => parameters,
        _ => {
            return Err(ConfigError::Invalid(
                "Filter parameters enabled but no parameters section in configuration"
                    .to_string(),
            ))
        }
    };

    let mut rules = Vec::new();
    for (name, spec) in parameters {
        rules.extend(spec.rules(name)?);
    }
    Ok(rules)
}

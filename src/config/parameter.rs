//! Parameter selections read from the `download.parameters` section.

use crate::config::error::ConfigError;
use serde::{Deserialize, Deserializer};

/// One named meteorological parameter as written in the configuration.
///
/// Every facet is a list; entry `i` of each list together describes one
/// [`SelectionRule`]. A parameter measured on two levels therefore has two
/// entries in every list.
///
/// ```yaml
/// t2m:
///   shortName: ["2t"]
///   level: ["2"]
///   levelType: ["sfc"]
///   typeOfLevel: ["heightAboveGround"]
///   typeOfStatisticalProcessing: ["0"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ParameterSpec {
    #[serde(deserialize_with = "facet")]
    pub short_name: Vec<String>,
    #[serde(deserialize_with = "facet")]
    pub level: Vec<String>,
    #[serde(deserialize_with = "facet")]
    pub level_type: Vec<String>,
    #[serde(deserialize_with = "facet")]
    pub type_of_statistical_processing: Vec<String>,
    #[serde(default, deserialize_with = "optional_facet")]
    pub type_of_level: Option<Vec<String>>,
}

/// A single message selection, validated and ready to be rendered as a
/// `grib_filter` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRule {
    pub short_name: String,
    pub level: i64,
    pub level_type: String,
    pub type_of_level: String,
    /// `0` matches any statistical processing.
    pub statistical_processing: u32,
}

// YAML authors write `level: [2]` as often as `level: ["2"]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum FacetValue {
    Text(String),
    Integer(i64),
}

impl From<FacetValue> for String {
    fn from(value: FacetValue) -> Self {
        match value {
            FacetValue::Text(text) => text,
            FacetValue::Integer(number) => number.to_string(),
        }
    }
}

fn facet<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let values = Vec::<FacetValue>::deserialize(deserializer)?;
    Ok(values.into_iter().map(String::from).collect())
}

fn optional_facet<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error> {
    let values = Option::<Vec<FacetValue>>::deserialize(deserializer)?;
    Ok(values.map(|values| values.into_iter().map(String::from).collect()))
}

impl ParameterSpec {
    /// Validates the facet lists and expands them into one rule per index.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] when `typeOfLevel` is missing, a list is empty,
    /// the lists differ in length, `level` or `typeOfStatisticalProcessing` is
    /// not a non-negative integer, or a text facet cannot be quoted safely.
    pub fn rules(&self, name: &str) -> Result<Vec<SelectionRule>, ConfigError> {
        let type_of_level = self.type_of_level.as_ref().ok_or_else(|| {
            ConfigError::Invalid(format!(
                "Filter parameters enabled but no typeOfLevel for {name}"
            ))
        })?;

        let lengths = [
            ("shortName", self.short_name.len()),
            ("level", self.level.len()),
            ("levelType", self.level_type.len()),
            ("typeOfLevel", type_of_level.len()),
            (
                "typeOfStatisticalProcessing",
                self.type_of_statistical_processing.len(),
            ),
        ];
        let expected = self.short_name.len();
        if expected == 0 {
            return Err(ConfigError::Invalid(format!(
                "Parameter {name} has an empty shortName list"
            )));
        }
        if let Some((facet, found)) = lengths.iter().find(|(_, len)| *len != expected) {
            return Err(ConfigError::Invalid(format!(
                "Parameter {name}: {facet} has {found} entries but shortName has {expected}"
            )));
        }

        (0..expected)
            .map(|i| {
                Ok::<_, ConfigError>(SelectionRule {
                    short_name: quotable(name, "shortName", &self.short_name[i])?,
                    level: integer(name, "level", &self.level[i])?,
                    level_type: quotable(name, "levelType", &self.level_type[i])?,
                    type_of_level: quotable(name, "typeOfLevel", &type_of_level[i])?,
                    statistical_processing: integer(
                        name,
                        "typeOfStatisticalProcessing",
                        &self.type_of_statistical_processing[i],
                    )?,
                })
            })
            .collect()
    }
}

fn quotable(name: &str, facet: &str, value: &str) -> Result<String, ConfigError> {
    let value = value.trim();
    if value.is_empty() || value.contains(['"', '\\', '\n', '\r']) {
        return Err(ConfigError::Invalid(format!(
            "Parameter {name}: {facet} value {value:?} is empty or contains quotes, backslashes or newlines"
        )));
    }
    Ok(value.to_string())
}

fn integer<T: std::str::FromStr>(name: &str, facet: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| {
        ConfigError::Invalid(format!(
            "Parameter {name}: {facet} value {value:?} is not a valid integer"
        ))
    })
}

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Model must be harmonie_dini_sf, got '{0}'")]
pub struct UnknownModel(String);

/// Forecast models the catalog publishes and this crate knows how to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    /// HARMONIE-AROME, DINI domain, surface fields.
    HarmonieDiniSf,
}

impl Model {
    /// Name of the catalog collection holding this model's files.
    pub fn collection(&self) -> &'static str {
        match self {
            Model::HarmonieDiniSf => "harmonie_dini_sf",
        }
    }
}

impl FromStr for Model {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "harmonie_dini_sf" => Ok(Model::HarmonieDiniSf),
            other => Err(UnknownModel(other.to_string())),
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.collection())
    }
}

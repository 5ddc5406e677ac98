use crate::catalog::error::CatalogError;
use std::fmt;
use std::str::FromStr;

/// Environment variable the binary reads the forecast API key from.
pub const API_KEY_ENV: &str = "DMI_FORECAST_API_KEY";

/// Credential for the forecast catalog. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Result<Self, CatalogError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(CatalogError::MissingCredential(API_KEY_ENV.to_string()));
        }
        Ok(Self(key))
    }

    /// Reads the key from `var`. Unset and empty both count as missing.
    pub fn from_env(var: &str) -> Result<Self, CatalogError> {
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(Self(key)),
            _ => Err(CatalogError::MissingCredential(var.to_string())),
        }
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl FromStr for ApiKey {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_missing() {
        assert!(matches!(
            ApiKey::new("  "),
            Err(CatalogError::MissingCredential(var)) if var == API_KEY_ENV
        ));
    }

    #[test]
    fn unset_variable_is_missing() {
        let err = ApiKey::from_env("NWP_DOWNLOAD_TEST_SURELY_UNSET_VARIABLE").unwrap_err();
        assert!(matches!(
            err,
            CatalogError::MissingCredential(var) if var == "NWP_DOWNLOAD_TEST_SURELY_UNSET_VARIABLE"
        ));
    }

    #[test]
    fn debug_output_is_redacted() {
        let key = ApiKey::new("super-secret").unwrap();
        assert_eq!(format!("{:?}", key), "ApiKey(***)");
        assert_eq!(key.expose(), "super-secret");
    }
}

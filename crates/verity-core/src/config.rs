//! Runtime configuration
//!
//! Layered the usual way: defaults, then a TOML or JSON file, then `VERITY_*`
//! environment variables, then individual `key=value` overrides from the CLI.

use crate::errors::{Result, VerityError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "VERITY_";

/// Configuration layering shared by Verity components
pub trait ConfigLayers: Clone + Default + Send + Sync + 'static {
    /// Load configuration from a `.toml` or `.json` file
    fn load_from_file(path: &Path) -> Result<Self>;

    /// Apply `VERITY_*` environment variables
    fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply variables from an explicit source
    fn merge_with_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>;

    /// Validate the configuration
    fn validate(&self) -> Result<()>;

    /// Set a single value by key (CLI `--set key=value`)
    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Verity runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerityConfig {
    /// Base of the public verification URL; the key is appended as a path segment
    pub verification_base_url: String,
    /// Shared secret required on verification lookups; `None` leaves them open
    pub verify_access_key: Option<String>,
    /// Print limit given to a fresh issuance
    pub default_max_prints: u32,
    /// Attempts the version ledger makes before surfacing a conflict
    pub max_commit_attempts: u32,
    /// Default tracing filter
    pub log_level: String,
}

impl Default for VerityConfig {
    fn default() -> Self {
        Self {
            verification_base_url: "http://localhost:3000/verify".to_string(),
            verify_access_key: None,
            default_max_prints: 1,
            max_commit_attempts: 5,
            log_level: "info".to_string(),
        }
    }
}

impl VerityConfig {
    /// Public URL a verifier opens for `key`
    pub fn verification_url(&self, key: &str) -> String {
        format!("{}/{}", self.verification_base_url.trim_end_matches('/'), key)
    }

    /// Defaults, then optional file, then environment, validated
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `key=value` overrides on top of the resolved layers, then re-validate
    pub fn apply_overrides<'a, I>(&mut self, overrides: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (key, value) in overrides {
            self.set_from_string(key, value)?;
        }
        self.validate()
    }
}

fn parse_u32(key: &str, value: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| VerityError::invalid(format!("Invalid number for {key}: {value:?}")))
}

impl ConfigLayers for VerityConfig {
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VerityError::internal(format!("Failed to read config file: {e}")))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| VerityError::invalid(format!("Invalid TOML: {e}"))),
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| VerityError::invalid(format!("Invalid JSON: {e}"))),
            _ => Err(VerityError::invalid("Unsupported file format")),
        }
    }

    fn merge_with_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match key {
                "VERIFICATION_BASE_URL" => self.verification_base_url = value,
                "VERIFY_ACCESS_KEY" => {
                    self.verify_access_key = (!value.is_empty()).then_some(value)
                }
                "DEFAULT_MAX_PRINTS" => self.default_max_prints = parse_u32(&name, &value)?,
                "MAX_COMMIT_ATTEMPTS" => self.max_commit_attempts = parse_u32(&name, &value)?,
                "LOG_LEVEL" => self.log_level = value,
                _ => {}
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.verification_base_url.trim().is_empty() {
            return Err(VerityError::invalid("Verification base URL cannot be empty"));
        }
        if self.default_max_prints == 0 {
            return Err(VerityError::invalid("Default print limit cannot be 0"));
        }
        if self.max_commit_attempts == 0 {
            return Err(VerityError::invalid("Commit attempts cannot be 0"));
        }
        if matches!(&self.verify_access_key, Some(key) if key.trim().is_empty()) {
            return Err(VerityError::invalid("Access key cannot be blank"));
        }
        Ok(())
    }

    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "verification-base-url" | "verification_base_url" => {
                self.verification_base_url = value.to_string()
            }
            "verify-access-key" | "verify_access_key" => {
                self.verify_access_key = (!value.is_empty()).then(|| value.to_string())
            }
            "default-max-prints" | "default_max_prints" => {
                self.default_max_prints = parse_u32(key, value)?
            }
            "max-commit-attempts" | "max_commit_attempts" => {
                self.max_commit_attempts = parse_u32(key, value)?
            }
            "log-level" | "log_level" => self.log_level = value.to_string(),
            _ => {
                return Err(VerityError::invalid(format!(
                    "Unknown configuration key: {key}"
                )))
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_validate() {
        let config = VerityConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_max_prints, 1);
        assert!(config.verify_access_key.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = VerityConfig::default();
        config
            .merge_with_vars(vars(&[
                ("VERITY_VERIFY_ACCESS_KEY", "s3cret"),
                ("VERITY_DEFAULT_MAX_PRINTS", "3"),
                ("VERITY_UNRELATED", "ignored"),
                ("PATH", "/usr/bin"),
            ]))
            .unwrap();
        assert_eq!(config.verify_access_key.as_deref(), Some("s3cret"));
        assert_eq!(config.default_max_prints, 3);
    }

    #[test]
    fn test_env_rejects_bad_number() {
        let mut config = VerityConfig::default();
        let err = config
            .merge_with_vars(vars(&[("VERITY_MAX_COMMIT_ATTEMPTS", "many")]))
            .unwrap_err();
        assert_matches!(err, VerityError::Invalid { .. });
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "verification_base_url = \"https://letters.example/verify/\"\ndefault_max_prints = 2"
        )
        .unwrap();

        let config = VerityConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.default_max_prints, 2);
        assert_eq!(config.max_commit_attempts, 5);
        assert_eq!(
            config.verification_url("abc"),
            "https://letters.example/verify/abc"
        );
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(VerityConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_set_from_string_and_validate() {
        let mut config = VerityConfig::default();
        config.set_from_string("max-commit-attempts", "0").unwrap();
        assert!(config.validate().is_err());
        assert!(config.set_from_string("colour", "blue").is_err());
    }

    #[test]
    fn test_overrides_apply_after_environment() {
        let mut config = VerityConfig::default();
        config
            .merge_with_vars(vars(&[("VERITY_DEFAULT_MAX_PRINTS", "3")]))
            .unwrap();
        config
            .apply_overrides([("default-max-prints", "4"), ("log_level", "debug")])
            .unwrap();
        assert_eq!(config.default_max_prints, 4);
        assert_eq!(config.log_level, "debug");
        assert_matches!(
            config.apply_overrides([("verify-access-key", "  ")]),
            Err(VerityError::Invalid { .. })
        );
    }
}

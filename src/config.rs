use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Content service origin used when none is configured
pub const DEFAULT_CONTENT_BASE_URL: &str = "https://gold-stats.com/api";

/// Public file storage origin used when none is configured
pub const DEFAULT_STORAGE_BASE_URL: &str = "https://gold-stats.com";

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Main configuration structure
///
/// Every field is optional so layered files can override each other; the
/// accessors apply defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Config {
    /// API origin, e.g. `https://gold-stats.com/api`
    #[serde(default)]
    pub base_url: Option<String>,
    /// Origin of the app-content service
    #[serde(default)]
    pub content_base_url: Option<String>,
    /// Origin that serves uploaded files under `/storage/`
    #[serde(default)]
    pub storage_base_url: Option<String>,
    /// Keep cookies across requests
    #[serde(default)]
    pub with_credentials: Option<bool>,
    /// Role ids allowed into the console
    #[serde(default)]
    pub allowed_roles: Option<Vec<u64>>,
    /// Where the session record is kept
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.gold-admin/config.local.toml) > project (.gold-admin/config.toml)
    /// > user (~/.gold-admin/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".gold-admin").join("config.toml");
            if user_config.exists() {
                config.merge(Self::load_from(&user_config)?);
            }
        }

        let project_config = Path::new(".gold-admin").join("config.toml");
        if project_config.exists() {
            config.merge(Self::load_from(&project_config)?);
        }

        // Should be gitignored
        let local_config = Path::new(".gold-admin").join("config.local.toml");
        if local_config.exists() {
            config.merge(Self::load_from(&local_config)?);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority for every
    /// field it sets)
    pub fn merge(&mut self, other: Config) {
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.content_base_url.is_some() {
            self.content_base_url = other.content_base_url;
        }
        if other.storage_base_url.is_some() {
            self.storage_base_url = other.storage_base_url;
        }
        if other.with_credentials.is_some() {
            self.with_credentials = other.with_credentials;
        }
        if other.allowed_roles.is_some() {
            self.allowed_roles = other.allowed_roles;
        }
        if other.storage_dir.is_some() {
            self.storage_dir = other.storage_dir;
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or_default()
    }

    pub fn content_base_url(&self) -> &str {
        self.content_base_url
            .as_deref()
            .unwrap_or(DEFAULT_CONTENT_BASE_URL)
    }

    pub fn storage_base_url(&self) -> &str {
        self.storage_base_url
            .as_deref()
            .unwrap_or(DEFAULT_STORAGE_BASE_URL)
    }

    pub fn with_credentials(&self) -> bool {
        self.with_credentials.unwrap_or(true)
    }

    pub fn allowed_roles(&self) -> Vec<u64> {
        self.allowed_roles.clone().unwrap_or_else(|| vec![1, 2])
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        match &self.base_url {
            None => errors.push(ValidationError {
                field: "base_url".to_string(),
                message: "API base URL is not set (use --base-url or GOLD_ADMIN_BASE_URL)"
                    .to_string(),
            }),
            Some(url) => check_url("base_url", url, &mut errors),
        }
        if let Some(url) = &self.content_base_url {
            check_url("content_base_url", url, &mut errors);
        }
        if let Some(url) = &self.storage_base_url {
            check_url("storage_base_url", url, &mut errors);
        }

        if self.allowed_roles.as_ref().is_some_and(|r| r.is_empty()) {
            errors.push(ValidationError {
                field: "allowed_roles".to_string(),
                message: "Must list at least one role id".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn check_url(field: &str, url: &str, errors: &mut Vec<ValidationError>) {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(ValidationError {
            field: field.to_string(),
            message: format!("Expected an http(s) URL, got '{}'", url),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            base_url: Some("https://gold-stats.com/api".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = valid();
        assert_eq!(config.content_base_url(), DEFAULT_CONTENT_BASE_URL);
        assert_eq!(config.storage_base_url(), DEFAULT_STORAGE_BASE_URL);
        assert!(config.with_credentials());
        assert_eq!(config.allowed_roles(), vec![1, 2]);
    }

    #[test]
    fn test_merge_overrides_set_fields_only() {
        let mut base = valid();
        base.allowed_roles = Some(vec![1]);
        base.merge(Config {
            with_credentials: Some(false),
            ..Default::default()
        });
        assert_eq!(base.base_url(), "https://gold-stats.com/api");
        assert_eq!(base.allowed_roles(), vec![1]);
        assert!(!base.with_credentials());
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "base_url = \"http://localhost:8000/api\"\nallowed_roles = [1, 2, 4]\nwith_credentials = false\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.base_url(), "http://localhost:8000/api");
        assert_eq!(config.allowed_roles(), vec![1, 2, 4]);
        assert!(!config.with_credentials());
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_missing_base_url() {
        let errors = Config::default().validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].field.contains("base_url"));
    }

    #[test]
    fn test_validate_bad_urls_and_roles() {
        let mut config = valid();
        config.content_base_url = Some("gold-stats.com".to_string());
        config.allowed_roles = Some(vec![]);
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains("http(s)"));
        assert!(errors[1].field.contains("allowed_roles"));
    }
}

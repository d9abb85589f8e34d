//! Configuration management
//!
//! Config directory: ~/.upform/ (cross-platform)
//!
//! Config file format (~/.upform/config.toml):
//! ```toml
//! [account]
//! bucket = "my-bucket"
//! key = "form-api-secret"
//!
//! [upload]
//! block_size = 1048576
//! concurrency = 1
//! slice_route = "multi"
//! wire = "policy"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use upform_client::{ClientConfig, Route, WireFormat};

/// Structure of ~/.upform/config.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpformConfig {
    /// Bucket and form API secret
    #[serde(default)]
    pub account: AccountConfig,

    /// Upload behaviour
    #[serde(default)]
    pub upload: ClientConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Default bucket for uploads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    /// Form API secret. Prefer the UPFORM_KEY environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Keys accepted by `upform config set`
pub const SETTABLE_KEYS: &[&str] = &[
    "account.bucket",
    "account.key",
    "upload.block_size",
    "upload.expiration_secs",
    "upload.timeout_secs",
    "upload.concurrency",
    "upload.form_route",
    "upload.slice_route",
    "upload.scheme",
    "upload.endpoint",
    "upload.wire",
];

impl UpformConfig {
    /// Set one dotted key from its string form
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut next = self.clone();
        let upload = &mut next.upload;
        match key {
            "account.bucket" => next.account.bucket = Some(value.to_string()),
            "account.key" => next.account.key = Some(value.to_string()),
            "upload.block_size" => upload.block_size = parse_number(key, value)?,
            "upload.expiration_secs" => upload.expiration_secs = parse_number(key, value)?,
            "upload.timeout_secs" => upload.timeout_secs = parse_number(key, value)?,
            "upload.concurrency" => upload.concurrency = parse_number(key, value)?,
            "upload.form_route" => upload.form_route = parse_route(value)?,
            "upload.slice_route" => upload.slice_route = parse_route(value)?,
            "upload.scheme" => upload.scheme = value.to_string(),
            "upload.endpoint" => {
                upload.endpoint = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            }
            "upload.wire" => upload.wire = parse_wire(value)?,
            _ => {
                anyhow::bail!(
                    "Unknown config key: {}. Valid keys: {}",
                    key,
                    SETTABLE_KEYS.join(", ")
                );
            }
        }
        next.upload
            .validate()
            .with_context(|| format!("Invalid value for {}", key))?;
        *self = next;
        Ok(())
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("{} expects a number, got '{}'", key, value))
}

pub fn parse_route(value: &str) -> Result<Route> {
    value.parse::<Route>().map_err(anyhow::Error::msg)
}

pub fn parse_wire(value: &str) -> Result<WireFormat> {
    match value.to_ascii_lowercase().as_str() {
        "policy" => Ok(WireFormat::PolicyBlob),
        "fields" => Ok(WireFormat::Fields),
        _ => anyhow::bail!("unknown wire format '{}', expected policy or fields", value),
    }
}

/// Get the config directory path (~/.upform/)
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let config_dir = home.join(".upform");

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir).context("Failed to create config directory ~/.upform/")?;
    }

    Ok(config_dir)
}

/// Get the config file path
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load configuration, falling back to defaults if the file is missing or
/// unreadable
pub fn load_config() -> UpformConfig {
    match config_file_path() {
        Ok(path) => load_config_from(&path),
        Err(_) => UpformConfig::default(),
    }
}

pub fn load_config_from(path: &Path) -> UpformConfig {
    if !path.exists() {
        return UpformConfig::default();
    }
    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: Failed to parse config file: {}", e);
                UpformConfig::default()
            }
        },
        Err(e) => {
            eprintln!("Warning: Failed to read config file: {}", e);
            UpformConfig::default()
        }
    }
}

/// Save configuration to ~/.upform/config.toml
pub fn save_config(config: &UpformConfig) -> Result<()> {
    save_config_to(&config_file_path()?, config)
}

pub fn save_config_to(path: &Path, config: &UpformConfig) -> Result<()> {
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

    // The file may hold the account secret
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::write(path, &content).context("Failed to write config file")?;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    #[cfg(not(unix))]
    {
        fs::write(path, content).context("Failed to write config file")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UpformConfig::default();
        assert!(config.account.bucket.is_none());
        assert_eq!(config.upload, ClientConfig::default());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = UpformConfig::default();
        config.account.bucket = Some("photos".to_string());
        let toml_str = toml::to_string_pretty(&config).unwrap();

        assert!(toml_str.contains("[account]"));
        assert!(toml_str.contains("[upload]"));
        assert!(toml_str.contains("bucket = \"photos\""));
        assert!(!toml_str.contains("key ="));
    }

    #[test]
    fn test_partial_file_parses() {
        let config: UpformConfig = toml::from_str(
            r#"
            [account]
            bucket = "b"

            [upload]
            block_size = 65536
            slice_route = "cnc"
            "#,
        )
        .unwrap();
        assert_eq!(config.account.bucket.as_deref(), Some("b"));
        assert_eq!(config.upload.block_size, 65536);
        assert_eq!(config.upload.slice_route, Route::Cnc);
        assert_eq!(config.upload.concurrency, 1);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = UpformConfig::default();
        config.set("account.bucket", "demo").unwrap();
        config.set("upload.concurrency", "4").unwrap();
        config.set("upload.wire", "fields").unwrap();
        save_config_to(&path, &config).unwrap();

        assert_eq!(load_config_from(&path), config);
    }

    #[test]
    fn test_missing_or_broken_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert_eq!(load_config_from(&missing), UpformConfig::default());

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "[upload\nblock_size = ").unwrap();
        assert_eq!(load_config_from(&broken), UpformConfig::default());
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = UpformConfig::default();
        assert!(config.set("upload.block_size", "lots").is_err());
        assert!(config.set("upload.concurrency", "0").is_err());
        assert!(config.set("upload.slice_route", "moon").is_err());
        assert!(config.set("upload.wire", "xml").is_err());
        assert!(config.set("gateway.url", "x").is_err());
        assert!(config.set("upload.expiration_secs", "9223372036854775807").is_err());
        assert!(config.set("upload.timeout_secs", "0").is_err());
        assert!(config.set("upload.endpoint", "gateway").is_err());
        assert_eq!(config, UpformConfig::default());
    }

    #[test]
    fn test_set_endpoint_and_clear() {
        let mut config = UpformConfig::default();
        config.set("upload.endpoint", "http://127.0.0.1:9000").unwrap();
        assert_eq!(config.upload.endpoint.as_deref(), Some("http://127.0.0.1:9000"));
        config.set("upload.endpoint", "").unwrap();
        assert!(config.upload.endpoint.is_none());
    }
}

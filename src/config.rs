//! Configuration file handling for meterbill.
//!
//! The configuration file is stored at `$METERBILL_HOME/config.json` and contains the listening
//! port and address, the per-unit rate and, optionally, the location of the web client files.

use crate::error::{ErrorType, IntoResult, Res};
use crate::model::DEFAULT_PER_UNIT_RATE;
use crate::store::{FileStore, StorePaths};
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "meterbill";
const CONFIG_VERSION: u8 = 1;
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
const CONFIG_JSON: &str = "config.json";
const LOG: &str = "log";
const STATIC: &str = "static";

/// Settings that can be chosen when the home directory is created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitOptions {
    pub per_unit_rate: f64,
    pub port: u16,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            per_unit_rate: DEFAULT_PER_UNIT_RATE,
            port: DEFAULT_PORT,
        }
    }
}

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$METERBILL_HOME` and from there it loads `$METERBILL_HOME/config.json`. It
/// provides paths to the store files and the web client, which live in fixed locations within
/// the home directory unless configured otherwise.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    store_paths: StorePaths,
}

impl Config {
    /// Creates the home directory, its subdirectories and:
    /// - an initial `config.json` using `options`
    /// - the store files, with `initial_reading` as the last meter reading and no bills
    ///
    /// # Errors
    /// - Returns an error if the home directory already holds a config file or store files, or
    ///   if any file operation fails.
    pub async fn create(
        dir: impl Into<PathBuf>,
        initial_reading: f64,
        options: InitOptions,
    ) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the meterbill home directory")
            .pub_result(ErrorType::Config)?;
        let root = utils::canonicalize(&maybe_relative)
            .await
            .pub_result(ErrorType::Config)?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            return Err(anyhow::anyhow!(
                "A config file already exists at '{}'",
                config_path.display()
            ))
            .pub_result(ErrorType::Config);
        }

        utils::make_dir(root.join(STATIC))
            .await
            .pub_result(ErrorType::Config)?;

        let config_file = ConfigFile {
            per_unit_rate: options.per_unit_rate,
            port: options.port,
            ..ConfigFile::default()
        };
        config_file.validate().pub_result(ErrorType::Config)?;

        let store_paths = StorePaths::new(root.join(LOG));
        FileStore::init(store_paths.clone(), initial_reading).await?;

        config_file
            .save(&config_path)
            .await
            .pub_result(ErrorType::Config)?;

        Ok(Self {
            root,
            config_path,
            config_file,
            store_paths,
        })
    }

    /// This will
    /// - validate that the home directory exists and that the config file exists
    /// - load and validate the config file
    /// - return the loaded configuration object
    ///
    /// The store files are not checked here; see [`FileStore::open`].
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        Self::load_inner(home.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn load_inner(maybe_relative: PathBuf) -> Res<Self> {
        if !maybe_relative.is_dir() {
            bail!(
                "The meterbill home directory '{}' is missing, run 'meterbill init' first",
                maybe_relative.display()
            )
        }
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        Ok(Self {
            store_paths: StorePaths::new(root.join(LOG)),
            root,
            config_path,
            config_file,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn store_paths(&self) -> &StorePaths {
        &self.store_paths
    }

    pub fn port(&self) -> u16 {
        self.config_file.port
    }

    pub fn bind_address(&self) -> &str {
        &self.config_file.bind_address
    }

    pub fn per_unit_rate(&self) -> f64 {
        self.config_file.per_unit_rate
    }

    /// Returns the stored `static_dir` if it is absolute, otherwise resolves it against the home
    /// directory. Defaults to `$METERBILL_HOME/static`.
    pub fn static_dir(&self) -> PathBuf {
        let p = self.config_file.static_dir();
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "meterbill",
///   "config_version": 1,
///   "port": 8000,
///   "bind_address": "0.0.0.0",
///   "per_unit_rate": 8.0,
///   "static_dir": "static"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "meterbill"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// The TCP port the server listens on
    #[serde(default = "default_port")]
    port: u16,

    /// The address the server binds to
    #[serde(default = "default_bind_address")]
    bind_address: String,

    /// The amount charged per unit of electricity consumed
    #[serde(default = "default_per_unit_rate")]
    per_unit_rate: f64,

    /// Directory holding `index.html` and other web client files (optional, relative to the home
    /// directory or absolute). Defaults to $METERBILL_HOME/static if not specified
    #[serde(skip_serializing_if = "Option::is_none")]
    static_dir: Option<PathBuf>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_per_unit_rate() -> f64 {
    DEFAULT_PER_UNIT_RATE
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            port: DEFAULT_PORT,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            per_unit_rate: DEFAULT_PER_UNIT_RATE,
            static_dir: None,
        }
    }
}

impl ConfigFile {
    /// Loads and validates a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or holds invalid settings
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path)
            .await
            .with_context(|| format!("Failed to load config file at {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    fn validate(&self) -> Res<()> {
        anyhow::ensure!(
            self.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            self.app_name
        );
        anyhow::ensure!(
            self.config_version == CONFIG_VERSION,
            "Unsupported config_version {}. Is a newer version of meterbill available?",
            self.config_version
        );
        anyhow::ensure!(
            self.per_unit_rate.is_finite(),
            "per_unit_rate must be a finite number, got {}",
            self.per_unit_rate
        );
        Ok(())
    }

    fn static_dir(&self) -> PathBuf {
        self.static_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(STATIC))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_create() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("meterbill_home");

        let options = InitOptions {
            per_unit_rate: 6.5,
            port: 9000,
        };
        let config = Config::create(&home_dir, 120.0, options).await.unwrap();

        assert_eq!(config.per_unit_rate(), 6.5);
        assert_eq!(config.port(), 9000);
        assert_eq!(config.bind_address(), "0.0.0.0");
        assert!(config.config_path().is_file());
        assert!(config.static_dir().is_dir());
        assert!(config.store_paths().last_reading().is_file());
        assert!(config.store_paths().database().is_file());

        let store = FileStore::open(config.store_paths().clone()).await.unwrap();
        assert_eq!(store.last_reading().await.unwrap(), 120.0);
    }

    #[tokio::test]
    async fn test_config_create_twice_fails() {
        let dir = TempDir::new().unwrap();
        Config::create(dir.path(), 1.0, InitOptions::default())
            .await
            .unwrap();
        let err = Config::create(dir.path(), 2.0, InitOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_config_load() {
        let dir = TempDir::new().unwrap();
        let created = Config::create(dir.path(), 1.0, InitOptions::default())
            .await
            .unwrap();
        let loaded = Config::load(dir.path()).await.unwrap();
        assert_eq!(created.root(), loaded.root());
        assert_eq!(loaded.port(), 8000);
        assert_eq!(loaded.per_unit_rate(), 8.0);
        assert_eq!(created.store_paths(), loaded.store_paths());
    }

    #[tokio::test]
    async fn test_config_load_missing_home() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path().join("nope")).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        assert!(err.to_string().contains("meterbill init"));
    }

    #[tokio::test]
    async fn test_config_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("config file is missing"));
    }

    #[test]
    fn test_config_file_default() {
        let config = ConfigFile::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.per_unit_rate, 8.0);
        assert_eq!(config.static_dir(), PathBuf::from(STATIC));
    }

    #[tokio::test]
    async fn test_config_file_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let original = ConfigFile {
            port: 8080,
            per_unit_rate: 9.25,
            static_dir: Some(PathBuf::from("/srv/meterbill")),
            ..ConfigFile::default()
        };
        original.save(&config_path).await.unwrap();
        let loaded = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(original, loaded);
    }

    #[tokio::test]
    async fn test_config_file_load_with_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "meterbill",
            "config_version": 1
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let config = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[tokio::test]
    async fn test_config_file_load_invalid_app_name() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "wrong_app",
            "config_version": 1
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let result = ConfigFile::load(&config_path).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid app_name"));
    }

    #[test]
    fn test_config_file_serialization_omits_none_fields() {
        let json = serde_json::to_string(&ConfigFile::default()).unwrap();
        assert!(!json.contains("static_dir"));
    }

    #[test]
    fn test_static_dir_resolution() {
        let config = Config {
            root: PathBuf::from("/home/me/meterbill"),
            config_path: PathBuf::from("/home/me/meterbill/config.json"),
            config_file: ConfigFile {
                static_dir: Some(PathBuf::from("web")),
                ..ConfigFile::default()
            },
            store_paths: StorePaths::new("/home/me/meterbill/log"),
        };
        assert_eq!(config.static_dir(), PathBuf::from("/home/me/meterbill/web"));
    }
}

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for objstore
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one file per stored object.
    #[serde(default = "default_storage_directory")]
    pub storage_directory: PathBuf,

    /// SQLite database holding the path index.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest request body accepted on create and update.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_directory: default_storage_directory(),
            database_path: default_database_path(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn data_dir() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("com", "objstore", "objstore") {
        dirs.data_dir().to_path_buf()
    } else {
        PathBuf::from(".objstore")
    }
}

fn default_storage_directory() -> PathBuf {
    data_dir().join("objects")
}

fn default_database_path() -> PathBuf {
    data_dir().join("metadata.db")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_body_bytes() -> usize {
    64 * 1024 * 1024
}

impl Config {
    /// Load config from default location or create default if not found
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path();

        if path.exists() {
            Self::load_from(&path)
        } else {
            // Create default config file
            let config = Config::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(&config)?;
            std::fs::write(&path, content)?;
            Ok(config)
        }
    }

    /// Load config from an explicit file, which must exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Get config file path
    pub fn config_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("com", "objstore", "objstore") {
            dirs.config_dir().join("config.toml")
        } else {
            PathBuf::from("~/.objstore/config.toml")
        }
    }

    /// Reject layouts the store cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.storage_directory.as_os_str().is_empty() {
            bail!("storage_directory must not be empty");
        }
        // Blob listing treats every regular file in the storage directory as
        // a candidate object, so the database has to live elsewhere.
        if self.database_path.starts_with(&self.storage_directory) {
            bail!(
                "database_path {} must not be inside storage_directory {}",
                self.database_path.display(),
                self.storage_directory.display()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.storage_directory.ends_with("objects"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.storage_directory, config.storage_directory);
        assert_eq!(parsed.server.max_body_bytes, config.server.max_body_bytes);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Config = toml::from_str(r#"storage_directory = "/srv/objects""#).unwrap();
        assert_eq!(parsed.storage_directory, PathBuf::from("/srv/objects"));
        assert_eq!(parsed.server.port, 8080);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "storage_directory = \"/srv/objects\"\ndatabase_path = \"/srv/metadata.db\"\n\n[server]\nport = 9000\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/srv/metadata.db"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_database_inside_storage_rejected() {
        let config = Config {
            storage_directory: PathBuf::from("/srv/objects"),
            database_path: PathBuf::from("/srv/objects/metadata.db"),
            server: ServerConfig::default(),
        };
        assert!(config.validate().is_err());
    }
}

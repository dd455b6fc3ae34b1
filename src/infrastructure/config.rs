use crate::domain::{config::XbeeConfig, error::{XbeeError, XbeeResult}};
use std::path::{Path, PathBuf};
use std::fs;
use tracing::debug;

const CONFIG_DIR: &str = ".xbee";
const CONFIG_FILE: &str = "config.toml";

/// Configuration manager
pub struct ConfigManager {
    global_config_path: PathBuf,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> XbeeResult<Self> {
        let global_config_path = Self::get_global_config_path()?;
        let project_config_path = Self::find_project_config_path();

        Ok(Self {
            global_config_path,
            project_config_path,
        })
    }

    /// Manager over explicit locations instead of the user's home and the
    /// current directory
    pub fn with_paths(global_config_path: PathBuf, project_config_path: Option<PathBuf>) -> Self {
        Self {
            global_config_path,
            project_config_path,
        }
    }

    /// Load configuration from files.
    ///
    /// Project settings override global ones key by key; anything neither
    /// file sets keeps its default.
    pub fn load_config(&self) -> XbeeResult<XbeeConfig> {
        let mut merged = toml::Table::new();

        if self.global_config_path.exists() {
            debug!("Loading global config {}", self.global_config_path.display());
            merge_tables(&mut merged, read_table(&self.global_config_path)?);
        }

        if let Some(project_path) = &self.project_config_path {
            if project_path.exists() {
                debug!("Loading project config {}", project_path.display());
                merge_tables(&mut merged, read_table(project_path)?);
            }
        }

        toml::Value::Table(merged)
            .try_into()
            .map_err(|e| XbeeError::Config {
                message: format!("Invalid configuration: {}", e),
            })
    }

    /// Get global configuration path
    fn get_global_config_path() -> XbeeResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| XbeeError::Config {
            message: "Could not determine home directory".to_string(),
        })?;

        Ok(home.join(".config").join("xbee").join(CONFIG_FILE))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> XbeeResult<XbeeConfig> {
        let content = fs::read_to_string(path).map_err(|e| XbeeError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| XbeeError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Save configuration to specific path
    pub fn save_config_to_path(&self, path: &Path, config: &XbeeConfig) -> XbeeResult<()> {
        let content = toml::to_string_pretty(config).map_err(|e| XbeeError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| XbeeError::Config {
                message: format!("Failed to create config directory: {}", e),
            })?;
        }

        fs::write(path, content).map_err(|e| XbeeError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Write a default configuration to `<dir>/.xbee/config.toml`
    pub fn init_project_config(&self, dir: &Path) -> XbeeResult<PathBuf> {
        let config_file = dir.join(CONFIG_DIR).join(CONFIG_FILE);
        self.init_at(&config_file)?;
        Ok(config_file)
    }

    /// Write a default configuration to the global location
    pub fn init_global_config(&self) -> XbeeResult<PathBuf> {
        self.init_at(&self.global_config_path)?;
        Ok(self.global_config_path.clone())
    }

    fn init_at(&self, config_file: &Path) -> XbeeResult<()> {
        if config_file.exists() {
            return Err(XbeeError::Config {
                message: format!("Configuration already exists at {}", config_file.display()),
            });
        }
        self.save_config_to_path(config_file, &XbeeConfig::default())
    }

    /// Get the current project config path (if any)
    pub fn get_project_config_path(&self) -> Option<&PathBuf> {
        self.project_config_path.as_ref()
    }

    /// Get the global config path
    pub fn get_global_config_path_ref(&self) -> &PathBuf {
        &self.global_config_path
    }
}

fn read_table(path: &Path) -> XbeeResult<toml::Table> {
    let content = fs::read_to_string(path).map_err(|e| XbeeError::Config {
        message: format!("Failed to read config file {}: {}", path.display(), e),
    })?;

    content.parse::<toml::Table>().map_err(|e| XbeeError::Config {
        message: format!("Failed to parse config file {}: {}", path.display(), e),
    })
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(table)) => {
                merge_tables(existing, table)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

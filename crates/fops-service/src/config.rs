use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub project: ProjectConfig,
    pub storage: StorageConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the database; `~` is expanded.
    pub data_root: String,
}

impl Config {
    pub fn default_for(project_id: &str) -> Self {
        Self {
            project: ProjectConfig { id: project_id.to_string() },
            storage: StorageConfig { data_root: ".fops".to_string() },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| "parse fops.toml")?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn config_path(root: &Path) -> PathBuf {
        root.join(".fops").join("fops.toml")
    }

    pub fn db_path(&self, root: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(&self.storage.data_root).to_string();
        let data_root = PathBuf::from(expanded);
        let base = if data_root.is_absolute() { data_root } else { root.join(data_root) };
        base.join("fops.db")
    }
}

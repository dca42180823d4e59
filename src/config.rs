use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::results::TestMode;
use crate::session::SessionSettings;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Duration of a time-limited test.
    pub seconds: u32,
    /// Typed-character threshold; when set, tests are word-limited.
    pub words: Option<u32>,
    /// Base url of the remote results service; None keeps results local.
    pub backend_url: Option<String>,
    pub user_id: Option<i64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seconds: 30,
            words: None,
            backend_url: None,
            user_id: None,
        }
    }
}

impl Config {
    pub fn session_settings(&self) -> SessionSettings {
        match self.words {
            Some(chars) => SessionSettings {
                mode: TestMode::Words,
                target: chars,
                user_id: self.user_id,
            },
            None => SessionSettings {
                mode: TestMode::Time,
                target: self.seconds,
                user_id: self.user_id,
            },
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("typerate_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}

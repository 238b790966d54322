//! Persisted editor settings: where the game lives, which `select.def` was
//! last edited and whether saves make a backup.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core_api::{CoreError, CoreErrorCode};

pub const CONFIG_FILE_NAME: &str = "selectdef.toml";
const CONFIG_DIR_NAME: &str = "selectdef";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub options: OptionsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select_def: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    pub backup: bool,
    /// Store the config next to the working directory instead of the
    /// per-user config directory.
    pub use_local: bool,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            backup: true,
            use_local: true,
        }
    }
}

impl AppConfig {
    /// Configured root, if it still exists.
    pub fn existing_root(&self) -> Option<&Path> {
        self.paths.root.as_deref().filter(|p| p.exists())
    }

    /// Configured `select.def`, if it still exists.
    pub fn existing_select_def(&self) -> Option<&Path> {
        self.paths.select_def.as_deref().filter(|p| p.exists())
    }
}

/// Local file first, then the global one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    local_path: PathBuf,
    global_path: Option<PathBuf>,
}

impl ConfigStore {
    pub fn new(local_path: impl Into<PathBuf>, global_path: Option<PathBuf>) -> Self {
        Self {
            local_path: local_path.into(),
            global_path,
        }
    }

    /// `./selectdef.toml` and `<config dir>/selectdef/selectdef.toml`.
    pub fn discover() -> Self {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let global = dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
        Self::new(cwd.join(CONFIG_FILE_NAME), global)
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn global_path(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    pub fn load(&self) -> Result<AppConfig, CoreError> {
        let candidates = std::iter::once(self.local_path.as_path()).chain(self.global_path());
        for path in candidates {
            if path.is_file() {
                tracing::debug!(path = %path.display(), "loading config");
                return read_config(path);
            }
        }
        Ok(AppConfig::default())
    }

    /// Writes to the local or global file per `options.use_local`; switching
    /// to global removes a stale local file.
    pub fn save(&self, config: &AppConfig) -> Result<PathBuf, CoreError> {
        let target = if config.options.use_local {
            self.local_path.clone()
        } else {
            let global = self.global_path.clone().ok_or_else(|| {
                CoreError::new(
                    CoreErrorCode::Config,
                    "no per-user config directory on this platform",
                )
            })?;
            if self.local_path.is_file()
                && let Err(e) = fs::remove_file(&self.local_path)
            {
                tracing::warn!(path = %self.local_path.display(), error = %e, "could not remove local config");
            }
            global
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CoreError::new(
                    CoreErrorCode::Io,
                    format!("failed to create {}: {e}", parent.display()),
                )
            })?;
        }
        let text = toml::to_string_pretty(config).map_err(|e| {
            CoreError::new(CoreErrorCode::Config, format!("failed to encode config: {e}"))
        })?;
        fs::write(&target, text).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to write {}: {e}", target.display()),
            )
        })?;
        Ok(target)
    }
}

fn read_config(path: &Path) -> Result<AppConfig, CoreError> {
    let text = fs::read_to_string(path).map_err(|e| {
        CoreError::new(
            CoreErrorCode::Io,
            format!("failed to read {}: {e}", path.display()),
        )
    })?;
    toml::from_str(&text).map_err(|e| {
        CoreError::new(
            CoreErrorCode::Config,
            format!("failed to parse {}: {e}", path.display()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_give_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::new(dir.path().join("local.toml"), Some(dir.path().join("g/global.toml")));
        let config = store.load().expect("load");
        assert!(config.options.backup);
        assert!(config.options.use_local);
        assert_eq!(config.paths.root, None);
    }

    #[test]
    fn local_file_wins_over_global() {
        let dir = tempfile::tempdir().expect("tempdir");
        let local = dir.path().join("local.toml");
        let global = dir.path().join("global.toml");
        fs::write(&local, "[options]\nbackup = false\n").expect("write local");
        fs::write(&global, "[options]\nbackup = true\nuse_local = false\n").expect("write global");

        let config = ConfigStore::new(&local, Some(global)).load().expect("load");
        assert!(!config.options.backup);
        assert!(config.options.use_local);
    }

    #[test]
    fn save_round_trips_and_moves_to_global() {
        let dir = tempfile::tempdir().expect("tempdir");
        let local = dir.path().join("local.toml");
        let global = dir.path().join("nested").join("global.toml");
        let store = ConfigStore::new(&local, Some(global.clone()));

        let mut config = AppConfig::default();
        config.paths.root = Some(PathBuf::from("/games/mugen"));
        assert_eq!(store.save(&config).expect("save local"), local);
        assert_eq!(store.load().expect("reload"), config);

        config.options.use_local = false;
        assert_eq!(store.save(&config).expect("save global"), global);
        assert!(!local.exists());
        assert_eq!(store.load().expect("reload global"), config);
    }

    #[test]
    fn malformed_config_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let local = dir.path().join("local.toml");
        fs::write(&local, "[options\nbackup = ").expect("write");
        let err = ConfigStore::new(&local, None).load().expect_err("should fail");
        assert_eq!(err.code, CoreErrorCode::Config);
    }
}

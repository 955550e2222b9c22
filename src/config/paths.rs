//! Where text-pilot keeps its settings.
//!
//! The per-user root comes from [`dirs::config_dir`] (`%APPDATA%`,
//! `~/Library/Application Support`, or `$XDG_CONFIG_HOME` / `~/.config`).
//! Everything lives in a `text-pilot` folder below it.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "text-pilot";
const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
}

impl AppPaths {
    /// Paths below the platform config root, or below `.` when the platform
    /// has none.
    pub fn new() -> Self {
        Self::under(dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Paths below an explicit root (portable installs, tests).
    pub fn under(root: impl AsRef<Path>) -> Self {
        let config_dir = root.as_ref().join(APP_DIR);
        let settings_file = config_dir.join(SETTINGS_FILE);
        Self {
            config_dir,
            settings_file,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

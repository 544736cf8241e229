use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db;
use crate::error::AppError;
use crate::model::Theme;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PrefsFile {
    #[serde(default)]
    theme: Theme,
}

pub struct Prefs {
    path: PathBuf,
}

impl Prefs {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn theme(&self) -> Theme {
        match self.read() {
            Ok(prefs) => prefs.theme,
            Err(err) => {
                warn!(path = %self.path.display(), "ignoring unreadable preferences: {err}");
                Theme::default()
            }
        }
    }

    pub fn set_theme(&self, theme: Theme) -> Result<Theme, AppError> {
        let mut prefs = self.read().unwrap_or_default();
        prefs.theme = theme;
        db::ensure_parent_dir(&self.path)?;
        fs::write(&self.path, serde_json::to_string_pretty(&prefs)?)?;
        Ok(theme)
    }

    pub fn toggle_theme(&self) -> Result<Theme, AppError> {
        self.set_theme(self.theme().toggled())
    }

    fn read(&self) -> Result<PrefsFile, AppError> {
        if !self.path.exists() {
            return Ok(PrefsFile::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

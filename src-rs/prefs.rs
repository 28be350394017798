use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ViewerResult;

pub const APP_DIR: &str = "sprite-sheet-viewer";
pub const PREFERENCES_FILE: &str = "preferences.toml";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub theme: Theme,
}

/// Preferences file on disk. Reads are forgiving, writes are not.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(PREFERENCES_FILE),
        }
    }

    /// `<config dir>/sprite-sheet-viewer/preferences.toml`, or the working
    /// directory when the platform has no config dir.
    pub fn default_location() -> Self {
        let dir = dirs::config_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::in_dir(&dir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable preferences fall back to defaults.
    pub fn load(&self) -> Preferences {
        match self.try_load() {
            Ok(Some(prefs)) => prefs,
            Ok(None) => Preferences::default(),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), "ignoring preferences: {err}");
                Preferences::default()
            }
        }
    }

    fn try_load(&self) -> ViewerResult<Option<Preferences>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(Some(toml::from_str(&content)?))
    }

    pub fn save(&self, prefs: &Preferences) -> ViewerResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(prefs)?;
        fs::write(&self.path, content)?;
        tracing::info!(path = %self.path.display(), theme = prefs.theme.as_str(), "preferences saved");
        Ok(())
    }

    pub fn set_theme(&self, theme: Theme) -> ViewerResult<Theme> {
        let mut prefs = self.load();
        prefs.theme = theme;
        self.save(&prefs)?;
        Ok(theme)
    }

    pub fn toggle_theme(&self) -> ViewerResult<Theme> {
        let current = self.load().theme;
        self.set_theme(current.toggled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_to_light_without_a_file() {
        let dir = tempdir().unwrap();
        let store = PreferenceStore::in_dir(dir.path());
        assert_eq!(store.load().theme, Theme::Light);
    }

    #[test]
    fn toggle_persists_each_change() {
        let dir = tempdir().unwrap();
        let store = PreferenceStore::in_dir(&dir.path().join("nested"));
        assert_eq!(store.toggle_theme().unwrap(), Theme::Dark);
        assert_eq!(store.load().theme, Theme::Dark);
        assert_eq!(store.toggle_theme().unwrap(), Theme::Light);

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("theme = \"light\""));
    }

    #[test]
    fn corrupt_file_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let store = PreferenceStore::in_dir(dir.path());
        fs::write(store.path(), "theme = 12").unwrap();
        assert_eq!(store.load(), Preferences::default());
        store.set_theme(Theme::Dark).unwrap();
        assert_eq!(store.load().theme, Theme::Dark);
    }
}

//! Tool settings (`settings.toml`).
//!
//! ```toml
//! [parser]
//! max_line_length = 1024
//!
//! [patch]
//! sync = true
//!
//! [log]
//! filter = "warn"
//! ```

use crate::format::{ParseOptions, DEFAULT_MAX_LINE_LENGTH};
use crate::patch::PatchOptions;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_ENV: &str = "CONFPATCH_SETTINGS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub parser: ParserSettings,
    pub patch: PatchSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserSettings {
    pub max_line_length: usize,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatchSettings {
    pub sync: bool,
}

impl Default for PatchSettings {
    fn default() -> Self {
        Self { sync: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl Settings {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            max_line_length: self.parser.max_line_length,
        }
    }

    pub fn patch_options(&self) -> PatchOptions {
        PatchOptions {
            sync: self.patch.sync,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.parser.max_line_length < 2 {
            return Err(format!(
                "parser.max_line_length must be at least 2 (got {})",
                self.parser.max_line_length
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum SettingsError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Invalid {
        path: Option<PathBuf>,
        message: String,
    },
}

impl SettingsError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            SettingsError::Toml { path: None, source } => SettingsError::Toml {
                path: Some(path),
                source,
            },
            SettingsError::Invalid {
                path: None,
                message,
            } => SettingsError::Invalid {
                path: Some(path),
                message,
            },
            other => other,
        }
    }
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Io { path, source } => {
                write!(f, "failed to read settings from {}: {}", path.display(), source)
            }
            SettingsError::Toml { path, source } => match path {
                Some(path) => write!(f, "failed to parse settings ({}): {}", path.display(), source),
                None => write!(f, "failed to parse settings: {}", source),
            },
            SettingsError::Invalid { path, message } => match path {
                Some(path) => write!(f, "invalid settings ({}): {}", path.display(), message),
                None => write!(f, "invalid settings: {}", message),
            },
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Io { source, .. } => Some(source),
            SettingsError::Toml { source, .. } => Some(source),
            SettingsError::Invalid { .. } => None,
        }
    }
}

pub fn load_from_str(input: &str) -> Result<Settings, SettingsError> {
    let settings: Settings = toml_edit::de::from_str(input)
        .map_err(|source| SettingsError::Toml { path: None, source })?;
    settings
        .validate()
        .map_err(|message| SettingsError::Invalid {
            path: None,
            message,
        })?;
    Ok(settings)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Settings, SettingsError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// `~/.config/confpatch/settings.toml`, if a home directory is known.
pub fn default_path() -> Option<PathBuf> {
    home::home_dir().map(|home| home.join(".config").join("confpatch").join("settings.toml"))
}

/// Find and load settings.
///
/// Lookup order:
/// 1. An explicit path (must exist)
/// 2. `CONFPATCH_SETTINGS` (must exist)
/// 3. `~/.config/confpatch/settings.toml` (optional)
/// 4. Built-in defaults
pub fn discover(explicit: Option<&Path>) -> Result<Settings, SettingsError> {
    if let Some(path) = explicit {
        return load_from_path(path);
    }
    if let Ok(path) = env::var(SETTINGS_ENV) {
        return load_from_path(path);
    }
    match default_path() {
        Some(path) if path.is_file() => load_from_path(path),
        _ => Ok(Settings::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = load_from_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.parse_options(), ParseOptions::default());
        assert!(settings.patch_options().sync);
        assert_eq!(settings.log.filter, "warn");
    }

    #[test]
    fn test_partial_override() {
        let settings = load_from_str("[patch]\nsync = false\n[log]\nfilter = \"debug\"\n").unwrap();
        assert!(!settings.patch.sync);
        assert_eq!(settings.log.filter, "debug");
        assert_eq!(settings.parser.max_line_length, DEFAULT_MAX_LINE_LENGTH);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = load_from_str("[parser]\nmax_line = 3\n").unwrap_err();
        assert!(matches!(err, SettingsError::Toml { .. }));
    }

    #[test]
    fn test_invalid_line_length() {
        let err = load_from_str("[parser]\nmax_line_length = 1\n").unwrap_err();
        assert!(err.to_string().contains("at least 2"));
    }

    #[test]
    fn test_load_from_path_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[parser]\nmax_line_length = 0\n").unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("settings.toml"));

        let err = load_from_path(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
    }

    #[test]
    fn test_discover_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[parser]\nmax_line_length = 4096\n").unwrap();
        let settings = discover(Some(&path)).unwrap();
        assert_eq!(settings.parser.max_line_length, 4096);
    }
}

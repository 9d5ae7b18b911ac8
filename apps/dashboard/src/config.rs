use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const SETTINGS_FILE: &str = "marketpulse.toml";
pub const SERVER_URL_ENV: &str = "MARKETPULSE_SERVER_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
}

pub fn load_settings(
    config_path: Option<&Path>,
    server_url_flag: Option<&str>,
) -> Result<Settings> {
    load_settings_with(config_path, server_url_flag, |key| std::env::var(key).ok())
}

/// Defaults, then the settings file, then the environment, then the flag.
///
/// An explicitly requested file must exist; the default file is optional.
pub fn load_settings_with(
    config_path: Option<&Path>,
    server_url_flag: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings> {
    let mut settings = Settings::default();

    let file_settings = match config_path {
        Some(path) => read_file_settings(path)?,
        None => {
            let default_path = PathBuf::from(SETTINGS_FILE);
            if default_path.exists() {
                read_file_settings(&default_path)?
            } else {
                FileSettings::default()
            }
        }
    };

    let overrides = [
        file_settings.server_url,
        env(SERVER_URL_ENV),
        server_url_flag.map(str::to_string),
    ];
    for server_url in overrides.into_iter().flatten() {
        let server_url = server_url.trim();
        if !server_url.is_empty() {
            settings.server_url = server_url.to_string();
        }
    }

    Ok(settings)
}

fn read_file_settings(path: &Path) -> Result<FileSettings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
    toml::from_str(&raw)
        .with_context(|| format!("failed to parse settings file '{}'", path.display()))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;

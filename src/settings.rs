use crate::errors::{AppError, AppResult};
use crate::models::AppSettings;
use anyhow::Context;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "settings.yaml";

/// Loads `settings.yaml` from the app data directory. A missing file yields
/// defaults; an unreadable or malformed one is a configuration error.
pub fn load_settings(app_data_dir: &Path) -> AppResult<AppSettings> {
    let path = app_data_dir.join(SETTINGS_FILE);
    if !path.exists() {
        tracing::info!(path = %path.display(), "no settings file, using defaults");
        return Ok(AppSettings::default());
    }
    read_settings_file(&path).map_err(|error| AppError::Config(format!("{:#}", error)))
}

fn read_settings_file(path: &Path) -> anyhow::Result<AppSettings> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(AppSettings::default());
    }
    let settings = serde_yaml::from_str::<AppSettings>(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(settings)
}

/// Configured override, then the platform downloads folder, then a
/// `downloads` folder inside the app data directory.
pub fn resolve_downloads_dir(
    settings: &AppSettings,
    app_data_dir: &Path,
    platform_downloads: Option<PathBuf>,
) -> PathBuf {
    settings
        .downloads_dir
        .as_deref()
        .filter(|dir| !dir.trim().is_empty())
        .map(PathBuf::from)
        .or(platform_downloads)
        .unwrap_or_else(|| app_data_dir.join("downloads"))
}

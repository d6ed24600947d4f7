use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::{BaseDirs, UserDirs};
use serde::{Deserialize, Serialize};

use crate::error::VidgrabError;

pub const DEFAULT_CONFIG_FILE: &str = "vidgrab.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub save_dir: Option<String>,
    #[serde(default)]
    pub yt_dlp: Option<String>,
    #[serde(default)]
    pub auto_best: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub save_dir: Utf8PathBuf,
    pub yt_dlp: Option<PathBuf>,
    pub auto_best: bool,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `vidgrab.json` (or `path`); a missing default file yields defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, VidgrabError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| VidgrabError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| VidgrabError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, VidgrabError> {
        let save_dir = match config.save_dir {
            Some(dir) if !dir.trim().is_empty() => Utf8PathBuf::from(dir.trim()),
            _ => default_save_dir()?,
        };

        Ok(ResolvedConfig {
            save_dir,
            yt_dlp: config
                .yt_dlp
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
            auto_best: config.auto_best.unwrap_or(false),
        })
    }
}

/// The user's music directory, else `~/Music`.
pub fn default_save_dir() -> Result<Utf8PathBuf, VidgrabError> {
    let audio = UserDirs::new().and_then(|dirs| dirs.audio_dir().map(|dir| dir.to_path_buf()));
    let dir = audio
        .or_else(|| BaseDirs::new().map(|dirs| dirs.home_dir().join("Music")))
        .ok_or_else(|| VidgrabError::Filesystem("unable to resolve home directory".to_string()))?;
    Utf8PathBuf::from_path_buf(dir)
        .map_err(|_| VidgrabError::Filesystem("invalid save directory path".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_values_win() {
        let config = Config {
            save_dir: Some(" /data/videos ".to_string()),
            yt_dlp: Some("/opt/yt-dlp".to_string()),
            auto_best: Some(true),
        };

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.save_dir, Utf8PathBuf::from("/data/videos"));
        assert_eq!(resolved.yt_dlp, Some(PathBuf::from("/opt/yt-dlp")));
        assert!(resolved.auto_best);
    }
}

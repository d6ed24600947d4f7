use std::path::PathBuf;

use assert_matches::assert_matches;

use vidgrab::config::{Config, ConfigLoader};
use vidgrab::error::VidgrabError;

#[test]
fn empty_config_uses_defaults() {
    let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
    assert!(!resolved.auto_best);
    assert_eq!(resolved.yt_dlp, None);
    assert!(!resolved.save_dir.as_str().is_empty());
}

#[test]
fn blank_values_fall_back() {
    let config = Config {
        save_dir: Some("   ".to_string()),
        yt_dlp: Some("".to_string()),
        auto_best: None,
    };
    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(resolved.yt_dlp, None);
    assert!(!resolved.save_dir.as_str().trim().is_empty());
}

#[test]
fn reads_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("vidgrab.json");
    std::fs::write(
        &path,
        r#"{ "save_dir": "/srv/videos", "yt_dlp": "/usr/local/bin/yt-dlp", "auto_best": true }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.save_dir.as_str(), "/srv/videos");
    assert_eq!(
        resolved.yt_dlp,
        Some(PathBuf::from("/usr/local/bin/yt-dlp"))
    );
    assert!(resolved.auto_best);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("missing.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, VidgrabError::ConfigRead(p) if p == path);
}

#[test]
fn malformed_file_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("vidgrab.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, VidgrabError::ConfigParse(_));
}

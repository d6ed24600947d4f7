use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum VidgrabError {
    #[error("video URL is empty")]
    #[diagnostic(help("paste a full video URL, e.g. https://www.youtube.com/watch?v=..."))]
    InvalidInput,

    #[error("save location is not an existing directory: {}", .0.display())]
    InvalidTarget(PathBuf),

    #[error("{0}")]
    ExtractionFailed(String),

    #[error("{0}")]
    DownloadFailed(String),

    #[error("formats were fetched for {fetched_for}, not {requested}")]
    #[diagnostic(help("fetch the formats for the new URL before picking one"))]
    StaleSelection {
        fetched_for: String,
        requested: String,
    },

    #[error("no format labelled `{0}`")]
    #[diagnostic(help("run `vidgrab formats <url>` to list the available labels"))]
    UnknownFormat(String),

    #[error("required tool not found: {0}")]
    #[diagnostic(help("install yt-dlp or point VIDGRAB_YT_DLP at the executable"))]
    MissingTool(String),

    #[error("failed to read config file at {}", .0.display())]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::domain::{DownloadRequest, RawMetadata, VideoUrl};
use crate::error::VidgrabError;

pub const YT_DLP_ENV: &str = "VIDGRAB_YT_DLP";
const YT_DLP: &str = "yt-dlp";

/// Metadata extraction and download capability backing the app.
pub trait MediaExtractor: Send + Sync {
    fn extract_metadata(&self, url: &VideoUrl) -> Result<RawMetadata, VidgrabError>;
    /// Returns the final path of the downloaded file.
    fn download(&self, request: &DownloadRequest) -> Result<PathBuf, VidgrabError>;
}

#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    program: Option<PathBuf>,
}

impl YtDlpExtractor {
    /// Looks up the executable from `VIDGRAB_YT_DLP`, then `PATH`.
    pub fn new() -> Self {
        let program = std::env::var_os(YT_DLP_ENV)
            .map(PathBuf::from)
            .filter(|path| path.exists())
            .or_else(|| find_in_path(YT_DLP));
        Self { program }
    }

    pub fn with_program(program: PathBuf) -> Self {
        Self {
            program: Some(program),
        }
    }

    pub fn program(&self) -> Option<&Path> {
        self.program.as_deref()
    }

    fn require_program(&self) -> Result<&Path, VidgrabError> {
        self.program
            .as_deref()
            .ok_or_else(|| VidgrabError::MissingTool(YT_DLP.to_string()))
    }

    fn run(&self, args: &[String]) -> Result<Output, String> {
        let program = self.require_program().map_err(|err| err.to_string())?;
        tracing::debug!(program = %program.display(), ?args, "running extractor");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|err| err.to_string())?;
        if output.status.success() {
            return Ok(output);
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.is_empty() {
            Err(format!("command failed: {}", program.display()))
        } else {
            Err(stderr)
        }
    }
}

impl Default for YtDlpExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaExtractor for YtDlpExtractor {
    fn extract_metadata(&self, url: &VideoUrl) -> Result<RawMetadata, VidgrabError> {
        self.require_program()?;
        let output = self
            .run(&metadata_args(url))
            .map_err(VidgrabError::ExtractionFailed)?;
        serde_json::from_slice(&output.stdout)
            .map_err(|err| VidgrabError::ExtractionFailed(format!("invalid metadata JSON: {err}")))
    }

    fn download(&self, request: &DownloadRequest) -> Result<PathBuf, VidgrabError> {
        self.require_program()?;
        let output = self
            .run(&download_args(request))
            .map_err(VidgrabError::DownloadFailed)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        printed_path(&stdout).ok_or_else(|| {
            VidgrabError::DownloadFailed("yt-dlp did not report an output file".to_string())
        })
    }
}

pub fn metadata_args(url: &VideoUrl) -> Vec<String> {
    vec![
        "--dump-single-json".to_string(),
        "--no-warnings".to_string(),
        "--".to_string(),
        url.as_str().to_string(),
    ]
}

pub fn download_args(request: &DownloadRequest) -> Vec<String> {
    vec![
        "-f".to_string(),
        request.format_id.clone(),
        "-o".to_string(),
        request.output_template().to_string_lossy().to_string(),
        "--no-warnings".to_string(),
        "--print".to_string(),
        "after_move:filepath".to_string(),
        "--".to_string(),
        request.url.as_str().to_string(),
    ]
}

fn printed_path(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(PathBuf::from)
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}

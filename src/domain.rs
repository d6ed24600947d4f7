use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VidgrabError;

pub const AUTO_FORMAT_ID: &str = "best";
pub const AUTO_FORMAT_LABEL: &str = "Best Available (Auto)";
const NO_CODEC: &str = "none";

/// Trimmed, non-empty video URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoUrl(String);

impl VideoUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VideoUrl {
    type Err = VidgrabError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(VidgrabError::InvalidInput);
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Metadata document as reported by the extraction tool.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub formats: Vec<RawFormat>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawFormat {
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoMetadata {
    pub title: String,
    pub uploader: String,
    pub duration_secs: u64,
}

impl From<&RawMetadata> for VideoMetadata {
    fn from(raw: &RawMetadata) -> Self {
        let duration_secs = raw
            .duration
            .filter(|value| value.is_finite() && *value > 0.0)
            .map(|value| value.trunc() as u64)
            .unwrap_or(0);
        Self {
            title: raw.title.clone().unwrap_or_else(|| "Unknown".to_string()),
            uploader: raw.uploader.clone().unwrap_or_else(|| "Unknown".to_string()),
            duration_secs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamKind {
    VideoAndAudio,
    VideoOnly,
    AudioOnly,
}

impl StreamKind {
    /// Returns `None` when neither codec is usable; such formats are dropped.
    pub fn classify(vcodec: Option<&str>, acodec: Option<&str>) -> Option<Self> {
        match (has_codec(vcodec), has_codec(acodec)) {
            (true, true) => Some(StreamKind::VideoAndAudio),
            (true, false) => Some(StreamKind::VideoOnly),
            (false, true) => Some(StreamKind::AudioOnly),
            (false, false) => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StreamKind::VideoAndAudio => "Video+Audio",
            StreamKind::VideoOnly => "Video Only",
            StreamKind::AudioOnly => "Audio Only",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

fn has_codec(codec: Option<&str>) -> bool {
    matches!(codec, Some(value) if value != NO_CODEC)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatDescriptor {
    pub label: String,
    pub format_id: String,
}

impl FormatDescriptor {
    pub fn auto() -> Self {
        Self {
            label: AUTO_FORMAT_LABEL.to_string(),
            format_id: AUTO_FORMAT_ID.to_string(),
        }
    }

    pub fn describe(raw: &RawFormat) -> Option<Self> {
        let kind = StreamKind::classify(raw.vcodec.as_deref(), raw.acodec.as_deref())?;
        let resolution = raw.resolution.as_deref().unwrap_or("audio only");
        let ext = raw.ext.as_deref().unwrap_or("unknown");
        Some(Self {
            label: format!(
                "{kind} - {resolution} - {ext} - {}",
                size_label(raw.filesize)
            ),
            format_id: raw
                .format_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .unwrap_or(AUTO_FORMAT_ID)
                .to_string(),
        })
    }
}

/// Descriptors for one fetched URL; index 0 is always the auto/best entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatTable {
    source_url: String,
    descriptors: Vec<FormatDescriptor>,
    skipped: usize,
}

impl FormatTable {
    pub fn build(url: &VideoUrl, formats: &[RawFormat]) -> Self {
        let mut descriptors = Vec::with_capacity(formats.len() + 1);
        descriptors.push(FormatDescriptor::auto());
        let mut skipped = 0;
        for raw in formats {
            match FormatDescriptor::describe(raw) {
                Some(descriptor) => descriptors.push(descriptor),
                None => {
                    skipped += 1;
                    tracing::debug!(
                        format_id = raw.format_id.as_deref().unwrap_or("-"),
                        "skipping format without codecs"
                    );
                }
            }
        }
        Self {
            source_url: url.as_str().to_string(),
            descriptors,
            skipped,
        }
    }

    /// Table holding only the auto/best entry.
    pub fn auto_only(url: &VideoUrl) -> Self {
        Self::build(url, &[])
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn descriptors(&self) -> &[FormatDescriptor] {
        &self.descriptors
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn is_for(&self, url: &VideoUrl) -> bool {
        self.source_url == url.as_str()
    }

    /// First position whose label matches; duplicates resolve in tool order.
    pub fn position_of(&self, label: &str) -> Option<usize> {
        self.descriptors.iter().position(|d| d.label == label)
    }

    pub fn resolve(&self, selection: Selection) -> &str {
        match selection {
            Selection::Auto | Selection::Index(0) => AUTO_FORMAT_ID,
            Selection::Index(index) => match self.descriptors.get(index) {
                Some(descriptor) => descriptor.format_id.as_str(),
                None => {
                    tracing::warn!(
                        index,
                        available = self.descriptors.len(),
                        "selection out of range, falling back to best"
                    );
                    AUTO_FORMAT_ID
                }
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Auto,
    Index(usize),
}

impl Selection {
    /// Combines a list position with the host's auto-download toggle.
    pub fn from_host(index: Option<usize>, auto: bool) -> Self {
        match (auto, index) {
            (true, _) | (false, None) => Selection::Auto,
            (false, Some(index)) => Selection::Index(index),
        }
    }

    pub fn is_auto(self) -> bool {
        matches!(self, Selection::Auto | Selection::Index(0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: VideoUrl,
    pub format_id: String,
    pub target_dir: PathBuf,
}

impl DownloadRequest {
    pub fn new(url: VideoUrl, format_id: impl Into<String>, target_dir: &Path) -> Self {
        Self {
            url,
            format_id: format_id.into(),
            target_dir: target_dir.to_path_buf(),
        }
    }

    pub fn output_template(&self) -> PathBuf {
        self.target_dir.join("%(title)s.%(ext)s")
    }
}

pub fn render_duration(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

pub fn size_label(bytes: Option<u64>) -> String {
    match bytes {
        Some(bytes) if bytes > 0 => format!("{:.1} MB", bytes as f64 / 1024.0 / 1024.0),
        _ => "Unknown size".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn raw(id: &str, vcodec: Option<&str>, acodec: Option<&str>) -> RawFormat {
        RawFormat {
            format_id: Some(id.to_string()),
            ext: Some("mp4".to_string()),
            resolution: Some("1280x720".to_string()),
            vcodec: vcodec.map(str::to_string),
            acodec: acodec.map(str::to_string),
            filesize: None,
        }
    }

    #[test]
    fn parse_video_url_trims() {
        let url: VideoUrl = "  https://youtu.be/abc  ".parse().unwrap();
        assert_eq!(url.as_str(), "https://youtu.be/abc");
    }

    #[test]
    fn parse_video_url_blank() {
        assert_matches!("   ".parse::<VideoUrl>(), Err(VidgrabError::InvalidInput));
        assert_matches!("".parse::<VideoUrl>(), Err(VidgrabError::InvalidInput));
    }

    #[test]
    fn classify_codecs() {
        assert_eq!(
            StreamKind::classify(Some("avc1"), Some("mp4a")),
            Some(StreamKind::VideoAndAudio)
        );
        assert_eq!(
            StreamKind::classify(Some("vp9"), Some("none")),
            Some(StreamKind::VideoOnly)
        );
        assert_eq!(
            StreamKind::classify(None, Some("opus")),
            Some(StreamKind::AudioOnly)
        );
        assert_eq!(StreamKind::classify(Some("none"), None), None);
    }

    #[test]
    fn describe_uses_fallback_labels() {
        let format = RawFormat {
            format_id: Some("251".to_string()),
            ext: None,
            resolution: None,
            vcodec: Some("none".to_string()),
            acodec: Some("opus".to_string()),
            filesize: Some(3 * 1024 * 1024 + 512 * 1024),
        };
        let descriptor = FormatDescriptor::describe(&format).unwrap();
        assert_eq!(descriptor.label, "Audio Only - audio only - unknown - 3.5 MB");
        assert_eq!(descriptor.format_id, "251");
    }

    #[test]
    fn missing_format_id_falls_back_to_best() {
        let raw: RawFormat =
            serde_json::from_str(r#"{"format_id": null, "vcodec": "avc1", "acodec": "mp4a"}"#)
                .unwrap();
        assert_eq!(raw.format_id, None);
        let descriptor = FormatDescriptor::describe(&raw).unwrap();
        assert_eq!(descriptor.format_id, AUTO_FORMAT_ID);

        let blank = RawFormat {
            format_id: Some("  ".to_string()),
            ..raw
        };
        assert_eq!(
            FormatDescriptor::describe(&blank).unwrap().format_id,
            AUTO_FORMAT_ID
        );
    }

    #[test]
    fn table_keeps_auto_first_and_counts_skips() {
        let url: VideoUrl = "https://example.com/v".parse().unwrap();
        let formats = vec![
            raw("sb0", Some("none"), Some("none")),
            raw("22", Some("avc1"), Some("mp4a")),
        ];
        let table = FormatTable::build(&url, &formats);
        assert_eq!(table.len(), 2);
        assert_eq!(table.skipped(), 1);
        assert_eq!(table.descriptors()[0], FormatDescriptor::auto());
        assert_eq!(table.descriptors()[1].format_id, "22");
    }

    #[test]
    fn duplicate_labels_resolve_to_first() {
        let url: VideoUrl = "https://example.com/v".parse().unwrap();
        let formats = vec![
            raw("a", Some("avc1"), Some("mp4a")),
            raw("b", Some("avc1"), Some("mp4a")),
        ];
        let table = FormatTable::build(&url, &formats);
        let label = table.descriptors()[2].label.clone();
        assert_eq!(table.position_of(&label), Some(1));
    }

    #[test]
    fn selection_from_host() {
        assert_eq!(Selection::from_host(Some(3), true), Selection::Auto);
        assert_eq!(Selection::from_host(None, false), Selection::Auto);
        assert_eq!(Selection::from_host(Some(3), false), Selection::Index(3));
        assert!(Selection::Index(0).is_auto());
    }

    #[test]
    fn output_template_joins_target() {
        let url: VideoUrl = "https://example.com/v".parse().unwrap();
        let request = DownloadRequest::new(url, "22", Path::new("/tmp/videos"));
        assert_eq!(
            request.output_template(),
            PathBuf::from("/tmp/videos/%(title)s.%(ext)s")
        );
    }
}

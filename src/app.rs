use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::domain::{
    DownloadRequest, FormatTable, Selection, VideoMetadata, VideoUrl, render_duration,
};
use crate::error::VidgrabError;
use crate::extractor::MediaExtractor;

#[derive(Debug, Clone, Serialize)]
pub struct FetchSuccess {
    pub metadata: VideoMetadata,
    pub formats: FormatTable,
    pub duration: String,
    pub fetched_at: String,
}

impl FetchSuccess {
    /// Multi-line summary shown next to the format list.
    pub fn summary(&self) -> String {
        format!(
            "Title: {}\nUploader: {}\nDuration: {}\nAvailable Formats: {}",
            self.metadata.title,
            self.metadata.uploader,
            self.duration,
            self.formats.len()
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadOutcome {
    pub url: String,
    pub format_id: String,
    pub path: PathBuf,
    pub completed_at: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// How a fetched format is chosen when the caller has not fetched yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatChoice {
    Index(usize),
    Label(String),
}

#[derive(Clone)]
pub struct App<E: MediaExtractor> {
    extractor: E,
}

impl<E: MediaExtractor> App<E> {
    pub fn new(extractor: E) -> Self {
        Self { extractor }
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn fetch(&self, url: &str, sink: &dyn ProgressSink) -> Result<FetchSuccess, VidgrabError> {
        let url: VideoUrl = url.parse()?;
        tracing::info!(%url, "fetching formats");
        resolved(sink, &url);
        sink.event(ProgressEvent {
            message: format!("phase=Fetch; extracting metadata for {url}"),
            elapsed: None,
        });

        let start = Instant::now();
        let raw = self.extractor.extract_metadata(&url)?;
        let elapsed = start.elapsed();

        let metadata = VideoMetadata::from(&raw);
        let formats = FormatTable::build(&url, &raw.formats);
        tracing::info!(
            formats = formats.len(),
            skipped = formats.skipped(),
            latency_ms = elapsed.as_millis() as u64,
            "metadata extracted"
        );
        sink.event(ProgressEvent {
            message: format!(
                "phase=Store; {} formats ({} skipped) latency_ms={}",
                formats.len(),
                formats.skipped(),
                elapsed.as_millis()
            ),
            elapsed: Some(elapsed),
        });

        Ok(FetchSuccess {
            duration: render_duration(metadata.duration_secs),
            metadata,
            formats,
            fetched_at: now_rfc3339(),
        })
    }

    pub fn download(
        &self,
        url: &str,
        selection: Selection,
        target_dir: &Path,
        formats: &FormatTable,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadOutcome, VidgrabError> {
        let url: VideoUrl = url.parse()?;
        ensure_target_dir(target_dir)?;
        resolved(sink, &url);
        if !selection.is_auto() && !formats.is_for(&url) {
            return Err(VidgrabError::StaleSelection {
                fetched_for: formats.source_url().to_string(),
                requested: url.to_string(),
            });
        }

        let format_id = formats.resolve(selection).to_string();
        let request = DownloadRequest::new(url, format_id, target_dir);
        tracing::info!(
            url = %request.url,
            format_id = %request.format_id,
            target = %target_dir.display(),
            "dispatching download"
        );
        sink.event(ProgressEvent {
            message: format!(
                "phase=Fetch; downloading format {} into {}",
                request.format_id,
                target_dir.display()
            ),
            elapsed: None,
        });

        let start = Instant::now();
        let path = self.extractor.download(&request)?;
        let elapsed = start.elapsed();
        sink.event(ProgressEvent {
            message: format!("phase=Store; saved {}", path.display()),
            elapsed: Some(elapsed),
        });

        Ok(DownloadOutcome {
            url: request.url.to_string(),
            format_id: request.format_id,
            path,
            completed_at: now_rfc3339(),
        })
    }

    /// Fetches the table for `url` and downloads the chosen entry from it.
    /// The URL and target are checked before the extractor is consulted.
    pub fn fetch_and_download(
        &self,
        url: &str,
        choice: &FormatChoice,
        target_dir: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadOutcome, VidgrabError> {
        let url: VideoUrl = url.parse()?;
        ensure_target_dir(target_dir)?;

        let fetched = self.fetch(url.as_str(), sink)?;
        let index = match choice {
            FormatChoice::Index(index) => *index,
            FormatChoice::Label(label) => fetched
                .formats
                .position_of(label)
                .ok_or_else(|| VidgrabError::UnknownFormat(label.clone()))?,
        };
        self.download(
            url.as_str(),
            Selection::from_host(Some(index), false),
            target_dir,
            &fetched.formats,
            sink,
        )
    }
}

fn ensure_target_dir(target_dir: &Path) -> Result<(), VidgrabError> {
    if target_dir.is_dir() {
        Ok(())
    } else {
        Err(VidgrabError::InvalidTarget(target_dir.to_path_buf()))
    }
}

fn resolved(sink: &dyn ProgressSink, url: &VideoUrl) {
    sink.event(ProgressEvent {
        message: format!("phase=Resolve; {url}"),
        elapsed: None,
    });
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::domain::{RawFormat, RawMetadata};

    struct Silent;

    impl ProgressSink for Silent {
        fn event(&self, _event: ProgressEvent) {}
    }

    #[derive(Default)]
    struct Recording {
        events: Mutex<Vec<String>>,
    }

    impl ProgressSink for Recording {
        fn event(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event.message);
        }
    }

    struct FixedExtractor;

    impl MediaExtractor for FixedExtractor {
        fn extract_metadata(&self, _url: &VideoUrl) -> Result<RawMetadata, VidgrabError> {
            Ok(RawMetadata {
                title: Some("Clip".to_string()),
                uploader: None,
                duration: Some(125.9),
                formats: vec![RawFormat {
                    format_id: Some("18".to_string()),
                    ext: Some("mp4".to_string()),
                    resolution: Some("640x360".to_string()),
                    vcodec: Some("avc1".to_string()),
                    acodec: Some("mp4a".to_string()),
                    filesize: Some(1_048_576),
                }],
            })
        }

        fn download(&self, request: &DownloadRequest) -> Result<PathBuf, VidgrabError> {
            Ok(request.target_dir.join("Clip.mp4"))
        }
    }

    #[test]
    fn fetch_renders_summary() {
        let app = App::new(FixedExtractor);
        let result = app.fetch("https://example.com/v", &Silent).unwrap();
        assert_eq!(result.duration, "2:05");
        assert_eq!(result.metadata.uploader, "Unknown");
        assert_eq!(
            result.summary(),
            "Title: Clip\nUploader: Unknown\nDuration: 2:05\nAvailable Formats: 2"
        );
        assert_eq!(
            result.formats.descriptors()[1].label,
            "Video+Audio - 640x360 - mp4 - 1.0 MB"
        );
    }

    #[test]
    fn download_resolves_before_fetch_phase() {
        let temp = tempfile::tempdir().unwrap();
        let app = App::new(FixedExtractor);
        let url: VideoUrl = "https://example.com/v".parse().unwrap();
        let sink = Recording::default();
        app.download(
            url.as_str(),
            Selection::Auto,
            temp.path(),
            &FormatTable::auto_only(&url),
            &sink,
        )
        .unwrap();
        let events = sink.events.lock().unwrap();
        let phases: Vec<&str> = events
            .iter()
            .filter_map(|e| e.split(';').next())
            .collect();
        assert_eq!(phases, ["phase=Resolve", "phase=Fetch", "phase=Store"]);
    }

    #[test]
    fn fetch_emits_phase_events() {
        let app = App::new(FixedExtractor);
        let sink = Recording::default();
        app.fetch("https://example.com/v", &sink).unwrap();
        let events = sink.events.lock().unwrap();
        assert_eq!(events[0], "phase=Resolve; https://example.com/v");
        assert!(events[1].starts_with("phase=Fetch;"));
        assert!(events[2].starts_with("phase=Store;"));
        assert!(events[2].contains("latency_ms="));
    }
}

use std::io::{self, Write};

use serde::Serialize;

use crate::app::{DownloadOutcome, FetchSuccess};
use crate::error::VidgrabError;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub const FETCH_OK: &str = "✅ Video details fetched successfully!";

pub fn fetch_status(result: &Result<FetchSuccess, VidgrabError>) -> String {
    match result {
        Ok(_) => FETCH_OK.to_string(),
        Err(err) => failure_status(err, "Error"),
    }
}

pub fn download_status(result: &Result<DownloadOutcome, VidgrabError>) -> String {
    match result {
        Ok(outcome) => format!(
            "✅ Download completed successfully!\n📁 Saved to: {}",
            outcome.path.display()
        ),
        Err(err) => failure_status(err, "Download failed"),
    }
}

fn failure_status(err: &VidgrabError, context: &str) -> String {
    match err {
        VidgrabError::InvalidInput => "❌ Please enter a valid video URL".to_string(),
        VidgrabError::InvalidTarget(_) => "❌ Please select a valid save location".to_string(),
        other => format!("❌ {context}: {other}"),
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_fetch(result: &FetchSuccess) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_download(result: &DownloadOutcome) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl crate::app::ProgressSink for JsonOutput {
    fn event(&self, _event: crate::app::ProgressEvent) {}
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_fetch(result: &FetchSuccess) {
        println!("{FETCH_OK}");
        println!();
        println!("{}", result.summary());
        println!();
        for (index, label) in result.formats.labels().enumerate() {
            println!("{index:>3}  {label}");
        }
    }
}

impl crate::app::ProgressSink for TextOutput {
    fn event(&self, event: crate::app::ProgressEvent) {
        tracing::debug!("{}", event.message);
    }
}

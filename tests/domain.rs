use assert_matches::assert_matches;

use vidgrab::domain::{
    FormatDescriptor, FormatTable, RawFormat, RawMetadata, Selection, StreamKind, VideoMetadata,
    VideoUrl, render_duration, size_label,
};
use vidgrab::error::VidgrabError;

fn url() -> VideoUrl {
    "https://example.com/watch?v=1".parse().unwrap()
}

#[test]
fn duration_matches_minutes_and_padded_seconds() {
    assert_eq!(render_duration(125), "2:05");
    assert_eq!(render_duration(59), "0:59");
    assert_eq!(render_duration(3600), "60:00");
    assert_eq!(render_duration(0), "0:00");
    for d in 0..5000u64 {
        assert_eq!(render_duration(d), format!("{}:{:02}", d / 60, d % 60));
    }
}

#[test]
fn size_labels() {
    assert_eq!(size_label(Some(1_048_576)), "1.0 MB");
    assert_eq!(size_label(Some(0)), "Unknown size");
    assert_eq!(size_label(None), "Unknown size");
    assert_eq!(size_label(Some(1_572_864)), "1.5 MB");
}

#[test]
fn codecless_formats_are_dropped() {
    let formats = vec![
        RawFormat {
            format_id: Some("sb2".to_string()),
            vcodec: Some("none".to_string()),
            acodec: Some("none".to_string()),
            ..RawFormat::default()
        },
        RawFormat {
            format_id: Some("x".to_string()),
            ..RawFormat::default()
        },
        RawFormat {
            format_id: Some("251".to_string()),
            acodec: Some("opus".to_string()),
            ..RawFormat::default()
        },
    ];

    let table = FormatTable::build(&url(), &formats);

    assert_eq!(table.len(), formats.len() + 1 - 2);
    assert_eq!(table.skipped(), 2);
    assert_eq!(
        table.descriptors()[1],
        FormatDescriptor {
            label: "Audio Only - audio only - unknown - Unknown size".to_string(),
            format_id: "251".to_string(),
        }
    );
}

#[test]
fn auto_entry_present_for_empty_table() {
    let table = FormatTable::build(&url(), &[]);
    assert_eq!(table.len(), 1);
    assert_eq!(table.descriptors()[0], FormatDescriptor::auto());
    assert_eq!(table.resolve(Selection::Index(0)), "best");
    assert_eq!(table.resolve(Selection::Index(1)), "best");
}

#[test]
fn stream_kind_labels() {
    assert_eq!(StreamKind::VideoAndAudio.to_string(), "Video+Audio");
    assert_eq!(StreamKind::VideoOnly.to_string(), "Video Only");
    assert_eq!(StreamKind::AudioOnly.to_string(), "Audio Only");
}

#[test]
fn metadata_defaults_for_missing_fields() {
    let metadata = VideoMetadata::from(&RawMetadata::default());
    assert_eq!(metadata.title, "Unknown");
    assert_eq!(metadata.uploader, "Unknown");
    assert_eq!(metadata.duration_secs, 0);

    let metadata = VideoMetadata::from(&RawMetadata {
        duration: Some(61.7),
        ..RawMetadata::default()
    });
    assert_eq!(metadata.duration_secs, 61);
}

#[test]
fn table_tracks_source_url() {
    let table = FormatTable::auto_only(&url());
    assert!(table.is_for(&url()));
    let other: VideoUrl = "https://example.com/watch?v=2".parse().unwrap();
    assert!(!table.is_for(&other));
}

#[test]
fn blank_url_is_invalid_input() {
    assert_matches!("\t\n".parse::<VideoUrl>(), Err(VidgrabError::InvalidInput));
}

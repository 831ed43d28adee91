use std::path::Path;

use log::{debug, info};
use thiserror::Error;

use crate::source::{ByteSource, CaptureFileSource, SourceError};
use crate::stream::FrameReader;
use crate::{Report, make_stub_report};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

pub fn analyze_capture_file(path: &Path) -> Result<Report, AnalysisError> {
    let source = CaptureFileSource::open(path)?;
    analyze_source(path, source)
}

/// Decodes every frame the source yields into a report.
///
/// The input size recorded in the report is the number of bytes consumed from
/// the source, so non-file sources report correctly as well.
pub fn analyze_source<S: ByteSource>(path: &Path, source: S) -> Result<Report, AnalysisError> {
    let mut reader = FrameReader::new(source);
    let mut frames = Vec::new();
    while let Some(frame) = reader.next_frame()? {
        debug!(
            "frame {} complete at offset {} ({} fields)",
            frames.len(),
            frame.end_offset,
            frame.fields.len()
        );
        frames.push(frame);
    }

    let stats = reader.decoder().stats().clone();
    info!(
        "decoded {} frames from {} bytes ({} checksum failures, {} hex segments)",
        stats.frames, stats.bytes, stats.checksum_failures, stats.hex_segments
    );

    let mut report = make_stub_report(&path.display().to_string(), reader.offset());
    report.summary = stats;
    report.frames = frames;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::Path;

    use super::analyze_source;
    use crate::source::ReaderSource;

    #[test]
    fn empty_source_yields_empty_report() {
        let report = analyze_source(
            Path::new("empty.ved"),
            ReaderSource::new(Cursor::new(Vec::new())),
        )
        .expect("analyze");
        assert_eq!(report.input.bytes, 0);
        assert!(report.frames.is_empty());
        assert_eq!(report.summary.frames, 0);
    }

    #[test]
    fn hex_only_traffic_counts_segments() {
        let report = analyze_source(
            Path::new("hex.ved"),
            ReaderSource::new(Cursor::new(b":154\n:7F0ED0071\n".to_vec())),
        )
        .expect("analyze");
        assert!(report.frames.is_empty());
        assert_eq!(report.summary.hex_segments, 2);
        assert_eq!(report.input.bytes, 16);
    }
}

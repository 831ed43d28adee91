//! VE.Direct core library for decoding charge-controller and battery-monitor
//! serial traffic.
//!
//! Byte sources feed a [`FrameDecoder`], a small state machine that rebuilds
//! checksum-validated text frames from the raw link while skipping the binary
//! HEX sub-protocol. [`FrameReader`] drives the decoder from a source, and the
//! analysis layer turns a whole capture into a deterministic report. Decoding
//! is byte-oriented and side-effect free; all I/O is isolated in `source`.
//!
//! Invariants:
//! - A frame is surfaced only after a checksum validates and the first field
//!   name of the cycle has recurred.
//! - Corrupted input never fails the decode; it only drops frames.
//! - Report outputs are deterministic and stable across runs.
//!
//! Field values stay raw strings. Units and field semantics belong to the
//! consumer.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use vedirect_core::analyze_capture_file;
//!
//! let report = analyze_capture_file(Path::new("mppt.ved"))?;
//! println!("frames: {}", report.frames.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

mod analysis;
mod protocols;
mod source;
mod stream;

pub use analysis::{AnalysisError, analyze_capture_file, analyze_source};
pub use protocols::vedirect::{
    DecoderState, DecoderStats, Frame, FrameDecoder, FrameError, layout,
};
pub use source::{ByteSource, CaptureFileSource, ReaderSource, SourceError};
pub use stream::{DecodedFrame, FrameReader};

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;

/// Decode report for one input, with frames in stream order.
///
/// # Examples
/// ```
/// use vedirect_core::make_stub_report;
///
/// let report = make_stub_report("mppt.ved", 123);
/// assert_eq!(report.report_version, vedirect_core::REPORT_VERSION);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    /// Tool identification metadata.
    pub tool: ToolInfo,
    /// Input metadata.
    pub input: InputInfo,
    /// Decoder counters accumulated over the whole input.
    pub summary: DecoderStats,
    /// Decoded frames in stream order.
    pub frames: Vec<DecodedFrame>,
}

/// Tool metadata embedded in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name (e.g., "vedirect").
    pub name: String,
    /// Tool version (semver).
    pub version: String,
}

/// Input metadata embedded in reports.
///
/// # Examples
/// ```
/// use vedirect_core::InputInfo;
///
/// let input = InputInfo {
///     path: "mppt.ved".to_string(),
///     bytes: 1024,
/// };
/// assert_eq!(input.bytes, 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path as provided to the decoder.
    pub path: String,
    /// Bytes consumed from the input.
    pub bytes: u64,
}

/// Build a stub report with base fields filled and no frames.
///
/// # Examples
/// ```
/// use vedirect_core::make_stub_report;
///
/// let report = make_stub_report("mppt.ved", 123);
/// assert!(report.frames.is_empty());
/// assert_eq!(report.summary.checksum_failures, 0);
/// ```
pub fn make_stub_report(input_path: &str, input_bytes: u64) -> Report {
    Report {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "vedirect".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        input: InputInfo {
            path: input_path.to_string(),
            bytes: input_bytes,
        },
        summary: DecoderStats::default(),
        frames: vec![],
    }
}

//! Structural metadata extraction for video payloads.

mod aspect_ratio;
mod probe;

pub use aspect_ratio::{classify_dimensions, parse_ffprobe_output};
pub use probe::{FfprobeProbe, MediaProbe};

/// Errors from probing a staged media file.
///
/// A probe failure never aborts ingestion; the pipeline records it and commits the
/// upload without derived metadata.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Failed to run media probe: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Media probe exited with status {status:?}: {stderr}")]
    NonZeroExit { status: Option<i32>, stderr: String },

    #[error("Failed to parse media probe output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No streams found in media file")]
    NoStreams,

    #[error("Stream has no usable dimensions")]
    MissingDimensions,
}

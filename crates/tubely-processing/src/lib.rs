//! Tubely Processing Library
//!
//! Upload validation, media probing and the ingestion pipeline that turns an
//! inbound byte stream into a committed, addressable object.

pub mod upload;
pub mod validator;
pub mod video;

pub use upload::{
    IngestError, IngestOutcome, IngestPolicy, IngestionPipeline, SizeLimitedReader,
    UploadRequest,
};
pub use validator::{MediaValidator, ValidationError};
pub use video::{FfprobeProbe, MediaProbe, ProbeError};

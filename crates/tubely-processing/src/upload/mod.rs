//! Upload ingestion: validate → stage → probe → commit → address.

mod limit;
mod pipeline;
mod types;

pub use limit::{LimitExceeded, SizeLimitedReader};
pub use pipeline::IngestionPipeline;
pub use types::{IngestError, IngestOutcome, IngestPolicy, UploadRequest};

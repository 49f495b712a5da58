//! Database repositories for the data access layer
//
// Video metadata (Postgres) and its in-memory counterpart
pub mod memory;
pub mod video;

pub use memory::InMemoryVideoStore;
pub use video::{VideoRepository, VideoStore, VideoUpdate};

//! Tubely Database Library
//!
//! Persistence for video metadata records. Uploads never touch the database
//! directly; handlers read a record, check ownership, and write back the URL the
//! ingestion pipeline returns.

pub mod db;

pub use db::{InMemoryVideoStore, VideoRepository, VideoStore, VideoUpdate};

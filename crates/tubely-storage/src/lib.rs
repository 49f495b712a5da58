//! Tubely Storage Library
//!
//! This crate provides the storage abstraction used by the ingestion pipeline, the
//! key generator, and implementations for S3 and the local filesystem.
//!
//! # Storage key format
//!
//! Keys are flat: `<32 url-safe base64 chars>.<ext>`. Keys never contain `/`,
//! `..` or a leading `.`. Key generation lives in the `keys` module so every
//! backend addresses objects the same way.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::StorageKey;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult, StoredObject};
pub use tubely_core::StorageBackend;

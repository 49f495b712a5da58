//! Storage key generation.
//!
//! A key is `<id>.<ext>`: `id` is 24 random bytes encoded as unpadded URL-safe base64
//! (always 32 characters of `[A-Za-z0-9_-]`), `ext` is derived from the media type.
//! Keys never contain a user-supplied filename, so they are always a single,
//! traversal-free path segment.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::RngCore;

use crate::traits::StorageError;

/// Random bytes per key (192 bits).
const KEY_ENTROPY_BYTES: usize = 24;

/// Encoded length of the random part of a key.
pub const KEY_ID_LEN: usize = 32;

/// Extension used when the media type cannot be trusted to produce one.
pub const FALLBACK_EXTENSION: &str = "bin";

const MAX_KEY_LEN: usize = 255;

/// Unique, unguessable name of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Generate a fresh key for an object of the given media type.
    ///
    /// # Panics
    ///
    /// Panics if the operating system's entropy source fails. A key is never
    /// produced from a weaker source.
    pub fn generate(media_type: &str) -> Self {
        let mut bytes = [0u8; KEY_ENTROPY_BYTES];
        rand::rng().fill_bytes(&mut bytes);

        let id = URL_SAFE_NO_PAD.encode(bytes);
        StorageKey(format!("{}.{}", id, extension_for(media_type)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extension without the leading dot.
    pub fn extension(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(_, ext)| ext)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for StorageKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StorageKey {
    type Error = StorageError;

    /// Re-parse a key read back from elsewhere (a URL, a database row).
    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_key(&value)?;
        Ok(StorageKey(value))
    }
}

impl FromStr for StorageKey {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StorageKey::try_from(s.to_string())
    }
}

/// Derive a file extension from a MIME type.
///
/// Parameters (`; charset=...`) are ignored. Anything that is not exactly
/// `type/subtype` with a plain subtype maps to [`FALLBACK_EXTENSION`].
pub fn extension_for(media_type: &str) -> String {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let parts: Vec<&str> = essence.split('/').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return FALLBACK_EXTENSION.to_string();
    }

    let subtype = parts[1];
    let plain = subtype
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '.' | '-'));
    if !plain || subtype.starts_with('.') || subtype.contains("..") {
        return FALLBACK_EXTENSION.to_string();
    }

    subtype.to_string()
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(StorageError::InvalidKey(format!(
            "Storage key length must be between 1 and {}",
            MAX_KEY_LEN
        )));
    }

    if key.starts_with('.') || key.contains("..") {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }

    let single_segment = key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+'));
    if !single_segment {
        return Err(StorageError::InvalidKey(
            "Storage key must be a single path segment".to_string(),
        ));
    }

    Ok(())
}

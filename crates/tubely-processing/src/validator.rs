/// Common validation errors for uploaded media
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Empty file")]
    EmptyFile,

    #[error("File content does not match any known media signature (declared: {declared})")]
    UnrecognizedContent { declared: String },

    #[error("Declared content type {declared} does not match detected type {detected}")]
    ContentTypeMismatch { declared: String, detected: String },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },
}

/// Leading bytes needed to recognise every format in the allowlists.
pub const SNIFF_LEN: usize = 8192;

/// Media validator
///
/// Reconciles the client's declared content type with the type detected from the
/// payload's magic bytes. The detected type is authoritative: it decides acceptance
/// and the stored object's extension.
#[derive(Debug, Clone)]
pub struct MediaValidator {
    allowed_content_types: Vec<String>,
}

impl MediaValidator {
    pub fn new(allowed_content_types: Vec<String>) -> Self {
        Self {
            allowed_content_types: allowed_content_types
                .iter()
                .map(|ct| normalize_content_type(ct))
                .collect(),
        }
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.allowed_content_types
    }

    /// Validate the leading bytes of an upload and return the detected content type.
    ///
    /// A missing declaration is accepted; the detected type is used as-is.
    pub fn validate(&self, declared: Option<&str>, head: &[u8]) -> Result<String, ValidationError> {
        if head.is_empty() {
            return Err(ValidationError::EmptyFile);
        }

        let declared = declared.map(normalize_content_type);

        let detected = match infer::get(head) {
            Some(kind) => normalize_content_type(kind.mime_type()),
            None => {
                tracing::warn!(
                    claimed_mime = ?declared,
                    size = head.len(),
                    "Upload content does not match any known magic byte signature"
                );
                return Err(ValidationError::UnrecognizedContent {
                    declared: declared.unwrap_or_else(|| "none".to_string()),
                });
            }
        };

        if let Some(declared) = declared {
            if declared != detected {
                tracing::warn!(
                    claimed_mime = %declared,
                    detected_mime = %detected,
                    "Declared content type does not match file content"
                );
                return Err(ValidationError::ContentTypeMismatch { declared, detected });
            }
        }

        self.validate_content_type(&detected)?;

        Ok(detected)
    }

    /// Validate content type against the allowlist
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = normalize_content_type(content_type);

        if !self.allowed_content_types.iter().any(|ct| ct == &normalized) {
            return Err(ValidationError::InvalidContentType {
                content_type: normalized,
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }
}

/// Strip parameters, trim and lowercase a MIME type; fold the `image/jpg` alias.
///
/// `video/x-m4v` is what sniffing reports for an MP4 file carrying the `M4V ` brand,
/// so it is folded into `video/mp4`.
pub fn normalize_content_type(content_type: &str) -> String {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        "video/x-m4v" => "video/mp4".to_string(),
        _ => essence,
    }
}

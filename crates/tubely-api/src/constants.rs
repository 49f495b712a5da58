/// Multipart field carrying a thumbnail image.
pub const THUMBNAIL_FIELD: &str = "thumbnail";

/// Multipart field carrying a video file.
pub const VIDEO_FIELD: &str = "video";

/// Room for multipart boundaries, part headers and small form fields on top of
/// the file's own ceiling.
pub const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Mount point for locally stored assets.
pub const ASSETS_PATH: &str = "/assets";

/// `iss` claim of access tokens.
pub const TOKEN_ISSUER: &str = "tubely-access";

/// Maximum accepted image size in bytes (5MB)
/// Typical phone photos land between 1MB and 4MB
pub const MAX_IMAGE_SIZE_BYTES: usize = 5_242_880;

/// Request body ceiling for the HTTP layer (8MB)
/// Kept above MAX_IMAGE_SIZE_BYTES plus multipart overhead so oversized
/// uploads reach the gateway's own size check and get a proper 400
pub const MAX_REQUEST_BODY_BYTES: usize = 8_388_608;

/// File extensions accepted for analysis (lowercase, without the dot)
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// MIME types accepted for analysis
pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Analyses included in the free tier
pub const FREE_TIER_ANALYSES: u32 = 1;

/// Prompt sent to the vision model alongside each image
pub const ANALYSIS_PROMPT: &str =
    "Describe this image in detail, including objects, colors, mood, and any notable features.";

// =============================================================================
// Error Messages
// =============================================================================

/// Error message when the upload carries no usable file
pub const ERR_NO_FILE: &str = "No file provided";

/// Error message for uploads outside the accepted image formats
pub const ERR_INVALID_FILE_TYPE: &str = "Invalid file type. Allowed: jpg, jpeg, png, webp";

/// Error message for uploads over the size cap
pub const ERR_FILE_TOO_LARGE: &str = "File too large. Max size is 5MB";

/// Error message when a free user has spent their allowance
pub const ERR_FREE_LIMIT_REACHED: &str =
    "Free tier limit reached. Upgrade to Premium for unlimited analyses.";

/// Error message when the vision model call fails
pub const ERR_ANALYSIS_FAILED: &str = "AI analysis failed. Please try again.";

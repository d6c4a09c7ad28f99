use thiserror::Error;

/// Unified error type for paper-archive-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Naming and identity (owner validation)
/// - Archive store operations (list, read, write, delete)
/// - OCR extraction (provider calls, page-range splitting)
/// - Translation (API requests, responses, rate limiting)
/// - Pipeline coordination (concurrent re-entry)
/// - Cache, configuration and general I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Naming Errors
    // ==========================================================================
    /// Owner id failed validation (empty, contains a path separator, ...)
    #[error("invalid owner id '{0}': must be non-empty and contain no '/' or whitespace")]
    InvalidOwnerId(String),

    // ==========================================================================
    // Archive Store Errors
    // ==========================================================================
    /// Object does not exist in the store
    #[error("object not found: {0}")]
    NotFound(String),

    /// Listing a prefix on the remote store failed
    #[error("remote list failed for prefix '{prefix}': {reason}")]
    RemoteListFailed { prefix: String, reason: String },

    /// Reading an object from the remote store failed
    #[error("remote read failed for '{key}': {reason}")]
    RemoteReadFailed { key: String, reason: String },

    /// Writing an object to the remote store failed
    #[error("remote write failed for '{key}': {reason}")]
    RemoteWriteFailed { key: String, reason: String },

    /// Deleting an object from the remote store failed
    #[error("remote delete failed for '{key}': {reason}")]
    RemoteDeleteFailed { key: String, reason: String },

    // ==========================================================================
    // Extraction Errors
    // ==========================================================================
    /// OCR provider could not extract text from the document
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    /// Splitting the PDF into page ranges failed
    #[error("failed to split PDF into page ranges: {0}")]
    PdfSplit(String),

    // ==========================================================================
    // Translation Errors
    // ==========================================================================
    /// Translation API request failed
    #[error("translation request failed: {0}")]
    TranslationRequest(String),

    /// Invalid response from translation API
    #[error("invalid translation response: {0}")]
    TranslationInvalidResponse(String),

    /// Rate limited by translation API
    #[error("translation rate limited{}", retry_after.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    TranslationRateLimited { retry_after: Option<u64> },

    /// Translation request timed out
    #[error("translation request timed out")]
    TranslationTimeout,

    /// Maximum retry attempts exceeded for translation
    #[error("translation failed after maximum retries")]
    TranslationMaxRetriesExceeded,

    // ==========================================================================
    // Pipeline Errors
    // ==========================================================================
    /// A pipeline run for the same document identity is already executing
    #[error("a run is already in progress for '{0}'")]
    RunInProgress(String),

    // ==========================================================================
    // Cache Errors
    // ==========================================================================
    /// Failed to initialize the cache
    #[error("failed to initialize cache: {0}")]
    CacheInit(String),

    /// Failed to write to cache
    #[error("failed to write to cache: {0}")]
    CacheWrite(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    /// Missing required configuration field
    #[error("missing required config field: {0}")]
    ConfigMissing(String),

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

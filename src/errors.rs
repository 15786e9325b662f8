//! Error types for the RustMaps CLI
//!
//! This module defines the error types for every component of the application.
//! Domain rejections reported by the service (unauthorized, bad request, ...) are
//! mostly carried on a request's status rather than as errors; the types here
//! cover the cases where an operation cannot continue.

use std::path::PathBuf;

use thiserror::Error;

use crate::app::models::Status;

/// Authentication and credential errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// No API key has been configured
    #[error("API key not set. Run 'rustmaps auth <api-key>' first")]
    MissingApiKey,

    /// No subscription tier has been recorded
    #[error("Tier not set. Run 'rustmaps auth <api-key>' to verify your key")]
    MissingTier,

    /// The monthly allowance does not match any known subscription tier
    #[error("Unrecognized monthly allowance {allowed}; cannot determine subscription tier")]
    UnrecognizedTier { allowed: u32 },

    /// The quota lookup used to determine the tier failed
    #[error("Failed to look up account limits")]
    QuotaLookup(#[from] ApiError),

    /// Unknown tier name in the stored configuration
    #[error("Unknown tier name: {name}")]
    UnknownTierName { name: String },

    /// Reading the key interactively failed or produced nothing
    #[error("Invalid API key input: {reason}")]
    InvalidInput { reason: String },

    /// File I/O error during credential storage
    #[error("Failed to access credential file {path}")]
    CredentialStorage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stored credential file could not be parsed or written
    #[error("Credential file {path} is not valid JSON")]
    CredentialFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Remote service client errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport-level failure (connect, timeout, body read)
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// The service rejected the API key (HTTP 401)
    #[error("Unauthorized: the API key was rejected")]
    Unauthorized,

    /// The service refused the operation (HTTP 403)
    #[error("Forbidden: the account may not perform this request")]
    Forbidden,

    /// The service rejected the request parameters (HTTP 400)
    #[error("Request rejected by the service: {status}")]
    Rejected { status: Status },

    /// Any status code the client has no mapping for
    #[error("Unexpected status code: {status}")]
    UnexpectedStatus { status: u16 },

    /// The response body did not match the expected envelope
    #[error("Invalid response body")]
    InvalidResponse(#[from] serde_json::Error),

    /// An endpoint URL could not be built
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },
}

/// Input validation errors, reported before any network call
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Input table not found
    #[error("Input file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Header row lacks a required column
    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    /// A data row could not be interpreted
    #[error("Invalid row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    /// CSV syntax error
    #[error("Malformed input table")]
    Csv(#[from] csv::Error),

    /// Nothing to process
    #[error("No maps loaded")]
    NoRequests,

    /// Custom maps requested on a tier that cannot generate them
    #[error("Cannot generate custom maps with the {tier} tier")]
    CustomMapsNotAllowed { tier: String },

    /// Mutually exclusive or incomplete command-line parameters
    #[error("{0}")]
    InvalidArguments(String),
}

/// Import/dedup store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// The request has no derived filename to store it under
    #[error("Request has no filename set: {request}")]
    MissingFilename { request: String },

    /// File system failure on a record
    #[error("Failed to access request record {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored record could not be decoded
    #[error("Failed to decode request record {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be encoded
    #[error("Failed to encode request record")]
    Encode(#[source] serde_json::Error),
}

/// Asset download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// I/O error during file operations
    #[error("File I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Server returned a non-200 status
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// Maximum retries exceeded
    #[error("Download of {url} failed after {attempts} attempts, last error: {last_error}")]
    MaxRetriesExceeded {
        url: String,
        attempts: u32,
        last_error: String,
    },

    /// Status refresh before the download failed
    #[error("Failed to refresh map status before download")]
    Status(#[from] ApiError),

    /// The URL sidecar could not be encoded
    #[error("Failed to encode download links")]
    Links(#[from] serde_json::Error),

    /// Nothing to download
    #[error("No maps loaded")]
    NoRequests,
}

/// Settings and directory layout errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Home directory could not be determined
    #[error("Could not determine the user home directory")]
    NoHomeDirectory,

    /// Failed to create or read a configuration path
    #[error("Failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid settings file format
    #[error("Invalid settings format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Logging could not be initialised
    #[error("Failed to initialise logging: {reason}")]
    Logging { reason: String },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Remote service error
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Validation error
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is transient and the operation may be attempted again
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Api(ApiError::Http(_))
            | AppError::Api(ApiError::UnexpectedStatus { .. })
            | AppError::Download(DownloadError::Http(_))
            | AppError::Download(DownloadError::ServerError { .. })
            | AppError::Download(DownloadError::Status(ApiError::Http(_)))
            | AppError::Auth(AuthError::QuotaLookup(ApiError::Http(_))) => true,

            AppError::Auth(_)
            | AppError::Validation(_)
            | AppError::Download(DownloadError::MaxRetriesExceeded { .. })
            | AppError::Store(_)
            | AppError::Config(_) => false,

            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "authentication",
            AppError::Api(_) => "service",
            AppError::Validation(_) => "validation",
            AppError::Store(_) => "store",
            AppError::Download(_) => "download",
            AppError::Config(_) => "config",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Authentication result type alias
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Remote client result type alias
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Validation result type alias
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Store result type alias
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

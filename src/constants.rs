//! Application constants for the RustMaps CLI
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names
pub mod env {
    /// Overrides the stored API key for the current process
    pub const API_KEY: &str = "RUSTMAPS_API_KEY";
}

/// Remote API endpoints and protocol details
pub mod api {
    /// Production API base URL
    pub const BASE_URL: &str = "https://api.rustmaps.com/v4";

    /// Header carrying the account API key
    pub const API_KEY_HEADER: &str = "X-API-Key";

    /// Path segment shared by every map endpoint
    pub const MAPS: &str = "maps";

    /// Path segments of the custom (saved config) submission endpoint
    pub const CUSTOM_SAVED_CONFIG: [&str; 3] = ["maps", "custom", "saved-config"];

    /// Path segments of the account limits endpoint
    pub const LIMITS: [&str; 2] = ["maps", "limits"];

    /// First error message returned on 400 when staging is disabled for the account
    pub const STAGING_NOT_ENABLED: &str = "Staging is not enabled";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("rustmaps-cli/", env!("CARGO_PKG_VERSION"));

    /// Fixed per-request timeout, independent of rate limiter pacing
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
}

/// Rate limiting and retry configuration
pub mod limits {
    use super::Duration;

    /// Global ceiling on outbound API calls
    pub const CALLS_PER_MINUTE: u32 = 60;

    /// Additional attempts made for a failed asset download
    pub const DOWNLOAD_MAX_RETRIES: u32 = 3;

    /// First retry delay for asset downloads; doubles on each attempt
    pub const DOWNLOAD_BASE_DELAY: Duration = Duration::from_secs(5);
}

/// Orchestration loop timings
pub mod generation {
    use super::Duration;

    /// Sleep applied on an idle tick (nothing pending or quota reached)
    pub const IDLE_BACKOFF: Duration = Duration::from_secs(30);

    /// Sleep applied after a tick that submitted work
    pub const SUBMIT_PACING: Duration = Duration::from_secs(2);

    /// Age after which a complete request is re-verified against the service
    pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(5 * 60);

    /// New submissions allowed per tick
    pub const SUBMISSIONS_PER_TICK: usize = 1;
}

/// File and directory layout
pub mod files {
    /// Application directory created under the user's home
    pub const APP_DIR: &str = ".rustmaps";

    /// Credentials file (API key and tier)
    pub const CONFIG_FILE: &str = "config.json";

    /// Optional tunables file
    pub const SETTINGS_FILE: &str = "settings.toml";

    /// Directory holding one JSON record per request
    pub const IMPORTS_DIR: &str = "imports";

    /// Directory receiving downloaded artifacts
    pub const DOWNLOADS_DIR: &str = "downloads";

    /// Debug log written on every invocation
    pub const LOG_FILE: &str = "generator.log";

    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Owner read/write only (Unix)
    #[cfg(unix)]
    pub const CONFIG_FILE_PERMISSIONS: u32 = 0o600;

    /// chrono format of a download batch directory name
    pub const VERSION_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
}

/// Map seed constraints
pub mod seeds {
    /// Largest seed accepted by the game
    pub const MAX_SEED: u32 = 2_147_483_647;
}

pub use api::BASE_URL;
pub use env::API_KEY as ENV_API_KEY;
pub use http::{REQUEST_TIMEOUT, USER_AGENT};
pub use limits::CALLS_PER_MINUTE;

//! Prelude module for the RustMaps library
//!
//! Re-exports the items most integrations need, so a single
//! `use rustmaps::prelude::*;` is enough to drive a generation run.
//!
//! # Usage
//!
//! ```rust,no_run
//! use rustmaps::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let paths = AppPaths::resolve(None)?;
//!     let credentials = CredentialStore::new(&paths.config_file).load()?;
//!     let client = RustMapsClient::new(&ClientConfig::default(), credentials.api_key.clone())?;
//!
//!     let mut generator = Generator::new(
//!         GeneratorConfig::default(),
//!         credentials,
//!         Box::new(client),
//!         ImportStore::new(&paths.imports_dir),
//!     );
//!     generator.set_requests(load_batch(Path::new("maps.csv"))?);
//!     generator.import(false)?;
//!     generator.run().await;
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

pub use crate::app::{
    load_batch, random_seed, validate_capability, version_stamp, ClientConfig, DownloadConfig,
    DownloadManager, DownloadReport, Generator, GeneratorConfig, ImportStore, MapRequest,
    MapsApi, RustMapsClient, Status, StatusCounts, TickOutcome,
};

pub use crate::auth::{determine_tier, setup_credentials, CredentialStore, Credentials, Tier};

pub use crate::config::{AppConfig, AppPaths};

// Commonly used constants
pub use crate::constants::{BASE_URL, CALLS_PER_MINUTE, ENV_API_KEY, USER_AGENT};

pub use std::path::{Path, PathBuf};

pub use tokio;

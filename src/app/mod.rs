//! Core application logic for the RustMaps CLI
//!
//! This module holds the request model, the RustMaps API client, the import
//! store that makes runs resumable, the generation loop and the asset
//! download manager.
//!
//! # Examples
//!
//! ```rust,no_run
//! use rustmaps::app::{
//!     ClientConfig, Generator, GeneratorConfig, ImportStore, MapRequest, RustMapsClient,
//! };
//! use rustmaps::auth::{Credentials, Tier};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RustMapsClient::new(&ClientConfig::default(), "my-api-key")?;
//! let mut generator = Generator::new(
//!     GeneratorConfig::default(),
//!     Credentials::new("my-api-key", Tier::Premium),
//!     Box::new(client),
//!     ImportStore::new("/home/me/.rustmaps/imports"),
//! );
//!
//! generator.add_request(MapRequest::new("1234", 4000, "", false));
//! generator.import(false)?;
//!
//! let counts = generator.run().await;
//! println!("Finished: {}", counts);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod client;
pub mod download;
pub mod generator;
pub mod models;
pub mod store;

// Re-export main public API
pub use batch::{check_filename_part, load_batch, random_seed, validate_capability};
pub use client::{
    ClientConfig, FakeMapsApi, MapsApi, QuotaSnapshot, RateLimiter, RustMapsClient, StatusData,
    StatusReport,
};
pub use download::{version_stamp, DownloadConfig, DownloadManager, DownloadReport};
pub use generator::{Generator, GeneratorConfig, TickOutcome};
pub use models::{derive_filename, MapRequest, RequestKind, Status, StatusCounts};
pub use store::{ImportStore, ImportSummary};

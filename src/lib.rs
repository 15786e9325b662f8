//! RustMaps Library
//!
//! A Rust library for driving the RustMaps map generation API: batch
//! submission under the account's rate and quota limits, resumable imports
//! and downloads of the generated assets.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod logging;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};

//! Authentication management for the RustMaps API
//!
//! This module stores the API key together with the subscription tier looked
//! up from the account limits, and gates custom map generation on that tier.
//!
//! # Examples
//!
//! ```rust,no_run
//! use rustmaps::app::client::{ClientConfig, RustMapsClient};
//! use rustmaps::auth::{setup_credentials, CredentialStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = CredentialStore::new("/home/me/.rustmaps/config.json");
//! let mut client = RustMapsClient::new(&ClientConfig::default(), "")?;
//! let credentials = setup_credentials(&store, &mut client, "my-api-key").await?;
//! println!("Tier: {:?}", credentials.tier);
//! # Ok(())
//! # }
//! ```

pub mod credentials;

// Re-export main public API
pub use credentials::{
    determine_tier, mask_key, prompt_api_key, setup_credentials, AuthStatus, CredentialStore,
    Credentials, Tier,
};

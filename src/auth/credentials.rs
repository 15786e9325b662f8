//! Credential management for the RustMaps API
//!
//! The API key and the subscription tier derived from it are stored together
//! in a JSON file under the application directory, with owner-only
//! permissions on Unix. The tier is looked up once, when the key is set.

use std::env;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::app::client::MapsApi;
use crate::constants::{env as env_constants, files};
use crate::errors::{AuthError, AuthResult};

/// Subscription tier of a RustMaps account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Free,
    Supporter,
    Premium,
    #[serde(rename = "Organization 1")]
    Organization1,
    #[serde(rename = "Organization 2")]
    Organization2,
}

impl Tier {
    /// Every tier, cheapest first
    pub const ALL: [Tier; 5] = [
        Tier::Free,
        Tier::Supporter,
        Tier::Premium,
        Tier::Organization1,
        Tier::Organization2,
    ];

    /// Display name, also used in the credentials file
    pub fn name(&self) -> &'static str {
        match self {
            Tier::Free => "Free",
            Tier::Supporter => "Supporter",
            Tier::Premium => "Premium",
            Tier::Organization1 => "Organization 1",
            Tier::Organization2 => "Organization 2",
        }
    }

    /// Monthly generation allowance of the tier
    pub fn monthly_allowed(&self) -> u32 {
        match self {
            Tier::Free => 250,
            Tier::Supporter => 500,
            Tier::Premium => 800,
            Tier::Organization1 => 1000,
            Tier::Organization2 => 1750,
        }
    }

    /// Tier whose monthly allowance is exactly `allowed`
    pub fn from_monthly_allowed(allowed: u32) -> Option<Tier> {
        Tier::ALL
            .into_iter()
            .find(|tier| tier.monthly_allowed() == allowed)
    }

    /// Whether maps from saved configurations may be generated
    pub fn allows_custom_maps(&self) -> bool {
        !matches!(self, Tier::Free | Tier::Supporter)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tier {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Tier::ALL
            .into_iter()
            .find(|tier| tier.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AuthError::UnknownTierName {
                name: wanted.to_string(),
            })
    }
}

/// Stored tier field: the tier name, or an empty string when unknown
mod tier_field {
    use super::Tier;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(tier: &Option<Tier>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(tier.as_ref().map(Tier::name).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Tier>, D::Error> {
        let name = String::deserialize(deserializer)?;
        if name.trim().is_empty() {
            return Ok(None);
        }
        name.parse::<Tier>()
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}

/// API key and tier of the account in use
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub api_key: String,
    #[serde(default, with = "tier_field")]
    pub tier: Option<Tier>,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, tier: Tier) -> Self {
        Self {
            api_key: api_key.into(),
            tier: Some(tier),
        }
    }

    /// Whether an API key is present
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Both the key and the tier must be set before any generation
    ///
    /// # Errors
    ///
    /// Returns `MissingApiKey` or `MissingTier`
    pub fn validate(&self) -> AuthResult<()> {
        if !self.has_api_key() {
            error!("API key not set");
            return Err(AuthError::MissingApiKey);
        }
        if self.tier.is_none() {
            error!("Tier not set");
            return Err(AuthError::MissingTier);
        }
        Ok(())
    }

    /// The recorded tier
    ///
    /// # Errors
    ///
    /// Returns `MissingTier` if no tier has been determined yet
    pub fn tier(&self) -> AuthResult<Tier> {
        self.tier.ok_or(AuthError::MissingTier)
    }

    /// Replace the key with the environment override, when one is set
    ///
    /// Returns whether the override was applied.
    pub fn apply_env_override(&mut self) -> bool {
        match env::var(env_constants::API_KEY) {
            Ok(key) if !key.trim().is_empty() => {
                debug!("Using API key from {}", env_constants::API_KEY);
                self.api_key = key.trim().to_string();
                true
            }
            _ => false,
        }
    }
}

/// Location of the credentials file
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the stored credentials, creating an empty file on first use
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the file cannot be read, created or parsed
    pub fn load(&self) -> AuthResult<Credentials> {
        if !self.exists() {
            info!("Creating default config at {}", self.path.display());
            let credentials = Credentials::default();
            self.save(&credentials)?;
            return Ok(credentials);
        }

        let content = fs::read_to_string(&self.path).map_err(|source| self.storage_error(source))?;
        serde_json::from_str(&content).map_err(|source| AuthError::CredentialFormat {
            path: self.path.clone(),
            source,
        })
    }

    /// Write `credentials` with owner-only permissions
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the file cannot be written
    pub fn save(&self, credentials: &Credentials) -> AuthResult<()> {
        let mut content = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut content, formatter);
        credentials
            .serialize(&mut serializer)
            .map_err(|source| AuthError::CredentialFormat {
                path: self.path.clone(),
                source,
            })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.storage_error(source))?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|source| self.storage_error(source))?;
        file.write_all(&content)
            .map_err(|source| self.storage_error(source))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = file
                .metadata()
                .map_err(|source| self.storage_error(source))?
                .permissions();
            perms.set_mode(files::CONFIG_FILE_PERMISSIONS);
            file.set_permissions(perms)
                .map_err(|source| self.storage_error(source))?;
        }

        debug!("Saved credentials to {}", self.path.display());
        Ok(())
    }

    fn storage_error(&self, source: io::Error) -> AuthError {
        AuthError::CredentialStorage {
            path: self.path.clone(),
            source,
        }
    }
}

/// Look up the tier of the account behind the client's API key
///
/// # Errors
///
/// Returns `QuotaLookup` if the limits cannot be fetched, or
/// `UnrecognizedTier` if the monthly allowance matches no tier
pub async fn determine_tier(api: &dyn MapsApi) -> AuthResult<Tier> {
    let quota = api.fetch_quota().await?;

    Tier::from_monthly_allowed(quota.monthly_allowed).ok_or_else(|| {
        error!("Invalid tier, monthly allowance {}", quota.monthly_allowed);
        AuthError::UnrecognizedTier {
            allowed: quota.monthly_allowed,
        }
    })
}

/// Set a new API key: verify it, determine the tier and persist both
///
/// Nothing is written unless the tier lookup succeeds.
///
/// # Errors
///
/// Returns `AuthError` if the key is empty, the tier cannot be determined or
/// the credentials cannot be saved
pub async fn setup_credentials(
    store: &CredentialStore,
    api: &mut dyn MapsApi,
    api_key: &str,
) -> AuthResult<Credentials> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(AuthError::InvalidInput {
            reason: "API key cannot be empty".to_string(),
        });
    }

    api.set_api_key(api_key.to_string());
    let tier = determine_tier(&*api).await?;

    let credentials = Credentials::new(api_key, tier);
    store.save(&credentials)?;
    info!("API key verified, tier {}", tier);

    Ok(credentials)
}

/// Prompt for an API key without echoing it
///
/// # Errors
///
/// Returns `InvalidInput` if the terminal cannot be read or nothing was entered
pub fn prompt_api_key() -> AuthResult<String> {
    let key = rpassword::prompt_password("RustMaps API key: ").map_err(|e| {
        AuthError::InvalidInput {
            reason: e.to_string(),
        }
    })?;

    let key = key.trim().to_string();
    if key.is_empty() {
        return Err(AuthError::InvalidInput {
            reason: "API key cannot be empty".to_string(),
        });
    }
    Ok(key)
}

/// Hide all but the last four characters of a key
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}

/// Authentication status information
#[derive(Debug, Clone)]
pub struct AuthStatus {
    /// Masked API key, if one is set
    pub masked_key: Option<String>,
    /// Recorded subscription tier
    pub tier: Option<Tier>,
    /// Whether the key comes from the environment override
    pub key_from_env: bool,
    /// Whether the credentials file exists
    pub config_file_exists: bool,
}

impl AuthStatus {
    pub fn new(credentials: &Credentials, store: &CredentialStore, key_from_env: bool) -> Self {
        Self {
            masked_key: credentials
                .has_api_key()
                .then(|| mask_key(&credentials.api_key)),
            tier: credentials.tier,
            key_from_env,
            config_file_exists: store.exists(),
        }
    }

    /// Key and tier are both present
    pub fn has_credentials(&self) -> bool {
        self.masked_key.is_some() && self.tier.is_some()
    }

    /// Get descriptive status message for display
    pub fn status_message(&self) -> String {
        match (&self.masked_key, self.tier) {
            (None, _) => "Missing API key - run 'rustmaps auth' to configure".to_string(),
            (Some(_), None) => {
                "API key set but tier unknown - run 'rustmaps auth' to verify".to_string()
            }
            (Some(_), Some(tier)) => format!("Authenticated ({} tier)", tier),
        }
    }
}

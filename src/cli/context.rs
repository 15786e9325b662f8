//! Process context shared by every command
//!
//! Built once in `main` and passed by reference to the handlers.

use std::path::Path;

use tracing::{debug, info};

use crate::auth::{AuthStatus, CredentialStore, Credentials};
use crate::config::{AppConfig, AppPaths};
use crate::errors::Result;
use crate::logging::{init_logging, LoggingGuard};

/// Paths, settings and credentials of the current run
#[derive(Debug, Clone)]
pub struct AppContext {
    pub paths: AppPaths,
    pub settings: AppConfig,
    pub credentials: Credentials,
    pub credential_store: CredentialStore,
    /// Whether the API key came from the environment
    pub key_from_env: bool,
}

impl AppContext {
    /// Resolve the application directory and load settings and credentials
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created or the settings
    /// or credentials file cannot be read
    pub async fn load(home_override: Option<&Path>) -> Result<Self> {
        Self::load_from(AppPaths::resolve(home_override)?).await
    }

    /// Start logging into the resolved log file, then load the context
    ///
    /// Logging comes first so that loading settings and credentials is
    /// recorded in the log file too.
    ///
    /// # Errors
    ///
    /// Returns an error if logging cannot be installed or the context cannot
    /// be loaded
    pub async fn bootstrap(
        home_override: Option<&Path>,
        log_level: &str,
    ) -> Result<(Self, LoggingGuard)> {
        let paths = AppPaths::resolve(home_override)?;
        let guard = init_logging(log_level, &paths.log_file)?;
        let context = Self::load_from(paths).await?;
        Ok((context, guard))
    }

    /// Load settings and credentials for already resolved `paths`
    ///
    /// # Errors
    ///
    /// Same as [`AppContext::load`]
    pub async fn load_from(paths: AppPaths) -> Result<Self> {
        paths.ensure_dirs()?;

        let settings = AppConfig::load(&paths.settings_file).await?;

        let credential_store = CredentialStore::new(&paths.config_file);
        let mut credentials = credential_store.load()?;
        let key_from_env = credentials.apply_env_override();
        if key_from_env {
            info!("Using API key from the environment");
        }

        debug!("Context ready under {}", paths.base.display());
        Ok(Self {
            paths,
            settings,
            credentials,
            credential_store,
            key_from_env,
        })
    }

    pub fn auth_status(&self) -> AuthStatus {
        AuthStatus::new(&self.credentials, &self.credential_store, self.key_from_env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_creates_layout() {
        let temp_dir = TempDir::new().unwrap();
        let context = AppContext::load(Some(temp_dir.path())).await.unwrap();

        assert!(context.paths.imports_dir.is_dir());
        assert!(context.paths.downloads_dir.is_dir());
        assert!(context.credential_store.exists());
        assert_eq!(context.settings, AppConfig::default());
        assert_eq!(context.credentials.tier, None);
    }
}

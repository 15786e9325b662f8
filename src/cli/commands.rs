//! Command handlers for the RustMaps CLI
//!
//! Each handler turns parsed arguments into calls on the application core and
//! prints the outcome. Anything that can fail is returned to `main`.

use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

use crate::app::batch::{check_filename_part, load_batch, random_seed, validate_capability};
use crate::app::client::{MapsApi, RustMapsClient, StatusData};
use crate::app::download::{version_stamp, DownloadManager};
use crate::app::generator::{Generator, TickOutcome};
use crate::app::models::{MapRequest, Status};
use crate::app::store::ImportStore;
use crate::auth::{prompt_api_key, setup_credentials};
use crate::cli::{AppContext, AuthArgs, GenerateArgs, OpenArgs};
use crate::errors::{AppError, Result, ValidationError};

/// Where the maps of a command come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestSource {
    /// A CSV batch
    Batch(PathBuf),
    /// One map; `seed` of `None` picks a random seed
    Single {
        seed: Option<String>,
        size: u32,
        saved_config: String,
        staging: bool,
    },
}

impl RequestSource {
    /// Load the requests this source describes
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the batch cannot be read
    pub fn load(&self) -> Result<Vec<MapRequest>> {
        match self {
            RequestSource::Batch(path) => Ok(load_batch(path)?),
            RequestSource::Single {
                seed,
                size,
                saved_config,
                staging,
            } => {
                let seed = seed.clone().unwrap_or_else(random_seed);
                for (column, value) in [
                    ("seed", seed.as_str()),
                    ("saved config", saved_config.as_str()),
                ] {
                    check_filename_part(column, value)
                        .map_err(ValidationError::InvalidArguments)?;
                }
                Ok(vec![MapRequest::new(seed, *size, saved_config.as_str(), *staging)])
            }
        }
    }
}

impl GenerateArgs {
    /// Request source for validated arguments
    pub fn source(&self) -> RequestSource {
        match &self.csv {
            Some(path) => RequestSource::Batch(path.clone()),
            None => RequestSource::Single {
                seed: if self.random { None } else { self.seed.clone() },
                size: self.size.unwrap_or_default(),
                saved_config: self.saved_config.clone().unwrap_or_default(),
                staging: self.staging,
            },
        }
    }
}

impl OpenArgs {
    /// Request source for validated arguments
    pub fn source(&self) -> RequestSource {
        match &self.csv {
            Some(path) => RequestSource::Batch(path.clone()),
            None => RequestSource::Single {
                seed: self.seed.clone(),
                size: self.size.unwrap_or_default(),
                saved_config: self.saved_config.clone().unwrap_or_default(),
                staging: self.staging,
            },
        }
    }
}

/// Handle the auth command
///
/// Verifies the key against the account limits and stores it with the tier.
pub async fn handle_auth(context: &AppContext, args: AuthArgs) -> Result<()> {
    let status = context.auth_status();
    info!("Auth status: {}", status.status_message());
    if let Some(masked) = &status.masked_key {
        println!("Current key: {}", masked);
    }

    let api_key = match args.api_key {
        Some(key) => key,
        None => prompt_api_key()?,
    };

    let mut client = RustMapsClient::new(&context.settings.client_config(), "")?;
    let credentials = setup_credentials(&context.credential_store, &mut client, &api_key)
        .await
        .map_err(|e| {
            error!("Provided API key is invalid: {}", e);
            e
        })?;

    let tier = credentials.tier()?;
    println!("API key verified: 🗺️  {} Subscriber", tier);
    if context.key_from_env {
        println!("Note: the API key set in the environment still takes precedence");
    }
    Ok(())
}

/// Handle the generate command
///
/// Loads and validates the requests, reconciles them with the imports
/// directory, runs the generation loop to completion and optionally
/// downloads the finished maps.
pub async fn handle_generate(context: &AppContext, args: GenerateArgs) -> Result<()> {
    args.validate().map_err(ValidationError::InvalidArguments)?;
    context.credentials.validate()?;

    let requests = args.source().load()?;
    validate_capability(&requests, context.credentials.tier()?)?;
    info!("Loaded {} maps", requests.len());

    let client = RustMapsClient::new(
        &context.settings.client_config(),
        context.credentials.api_key.clone(),
    )?;
    let http = client.http_client().clone();

    let mut generator = Generator::new(
        context.settings.generator_config(),
        context.credentials.clone(),
        Box::new(client),
        ImportStore::new(&context.paths.imports_dir),
    );
    generator.set_requests(requests);

    let summary = generator.import(args.force).map_err(|e| {
        error!("Failed to import maps: {}", e);
        e
    })?;
    println!(
        "Imported {} maps ({} new, {} resumed)",
        generator.requests().len(),
        summary.written,
        summary.resumed
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .map_err(|e| AppError::generic(e.to_string()))?
            .tick_strings(&["◐", "◓", "◑", "◒", "✓"]),
    );
    spinner.set_message(generator.counts().to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));

    let mut final_outcome = TickOutcome::Idle;
    let counts = generator
        .run_with(|outcome, counts| {
            final_outcome = outcome;
            spinner.set_message(counts.to_string());
        })
        .await;
    spinner.finish_and_clear();

    if final_outcome == TickOutcome::AuthInvalid {
        return Err(AppError::generic(
            "Credentials are incomplete - run 'rustmaps auth' first",
        ));
    }

    println!("\n📊 Generation Summary:");
    println!("  Total maps: {}", counts.total());
    println!("  Complete: {}", counts.complete);
    println!("  Rejected: {}", counts.rejected);
    for request in generator
        .requests()
        .iter()
        .filter(|r| r.status.is_rejection())
    {
        println!("  • {}", request);
    }

    if args.download {
        let downloads_dir = args
            .output_dir
            .clone()
            .unwrap_or_else(|| context.paths.downloads_dir.clone());
        let manager = DownloadManager::new(http, context.settings.download_config(), downloads_dir);

        let version = version_stamp();
        let report = manager
            .download_all(generator.api(), generator.requests(), &version)
            .await?;

        for skipped in &report.skipped {
            println!("Cannot download {}", skipped.request);
            println!("  Open it instead: {}", skipped.hint);
        }
        if report.downloaded.is_empty() {
            println!("No maps were downloaded");
        } else {
            println!(
                "Maps downloaded to {} ({} maps)",
                report.directory.display(),
                report.downloaded.len()
            );
        }
    }

    Ok(())
}

/// Page URL of a map, with the staging flag for staging procedural maps
pub fn map_page_url(request: &MapRequest, data: &StatusData) -> Option<String> {
    if data.url.is_empty() {
        return None;
    }
    if !request.is_custom() && request.staging {
        Some(format!("{}?staging=true", data.url))
    } else {
        Some(data.url.clone())
    }
}

/// Handle the open command
///
/// Prints the page URL of the requested map. For a batch, every complete
/// map is listed.
pub async fn handle_open(context: &AppContext, args: OpenArgs) -> Result<()> {
    args.validate().map_err(ValidationError::InvalidArguments)?;
    context.credentials.validate()?;

    let mut requests = args.source().load()?;
    if requests.is_empty() {
        return Err(ValidationError::NoRequests.into());
    }
    ImportStore::new(&context.paths.imports_dir).import(&mut requests, false)?;

    let candidates: Vec<&MapRequest> = if requests.len() == 1 {
        requests.iter().collect()
    } else {
        requests
            .iter()
            .filter(|r| r.status == Status::Complete)
            .collect()
    };
    if candidates.is_empty() {
        return Err(AppError::generic(format!(
            "Loaded {} maps, but none are complete",
            requests.len()
        )));
    }

    let client = RustMapsClient::new(
        &context.settings.client_config(),
        context.credentials.api_key.clone(),
    )?;

    for request in candidates {
        let report = client.fetch_status(request).await?;
        match report.data.as_ref().and_then(|data| map_page_url(request, data)) {
            Some(url) => println!("🗺️  {}\n   {}", request, url),
            None => {
                warn!(seed = %request.seed, status = %report.status, "No URL found");
                println!("No URL found for {} (status: {})", request, report.status);
            }
        }
    }

    Ok(())
}

/// Print the files and directories the tool uses
pub fn show_paths(context: &AppContext) {
    let entries = context.paths.entries();
    let width = entries
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or_default()
        .max("Resource".len());

    println!("  {:<width$}  Path", "Resource", width = width);
    println!("  {:<width$}  ----", "--------", width = width);
    for (name, path) in entries {
        println!("  {:<width$}  {}", name, path.display(), width = width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_single_source() {
        let args = GenerateArgs {
            seed: Some("77".to_string()),
            size: Some(4000),
            saved_config: Some("cfg".to_string()),
            staging: true,
            ..Default::default()
        };
        let requests = args.source().load().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].seed, "77");
        assert_eq!(requests[0].saved_config, "cfg");
        assert!(requests[0].staging);
        assert_eq!(requests[0].status, Status::Pending);
    }

    #[test]
    fn test_single_source_rejects_path_like_names() {
        let args = GenerateArgs {
            seed: Some("1".to_string()),
            size: Some(4000),
            saved_config: Some("../outside".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            args.source().load(),
            Err(AppError::Validation(ValidationError::InvalidArguments(_)))
        ));
    }

    #[test]
    fn test_random_source_ignores_seed() {
        let args = GenerateArgs {
            size: Some(3000),
            random: true,
            ..Default::default()
        };
        let source = args.source();
        assert!(matches!(source, RequestSource::Single { seed: None, .. }));

        let requests = source.load().unwrap();
        assert!(requests[0].seed.parse::<u32>().is_ok());
    }

    #[test]
    fn test_batch_source() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("maps.csv");
        std::fs::write(&path, "seed,size\n1,4000\n2,4500\n").unwrap();

        let args = OpenArgs {
            csv: Some(path.clone()),
            ..Default::default()
        };
        assert_eq!(args.source(), RequestSource::Batch(path));
        assert_eq!(args.source().load().unwrap().len(), 2);
    }

    #[test]
    fn test_map_page_url() {
        let data = StatusData {
            url: "https://rustmaps.com/map/abc".to_string(),
            ..Default::default()
        };

        let procedural = MapRequest::new("1", 4000, "", true);
        assert_eq!(
            map_page_url(&procedural, &data).unwrap(),
            "https://rustmaps.com/map/abc?staging=true"
        );

        let custom = MapRequest::new("1", 4000, "cfg", true);
        assert_eq!(
            map_page_url(&custom, &data).unwrap(),
            "https://rustmaps.com/map/abc"
        );

        assert!(map_page_url(&procedural, &StatusData::default()).is_none());
    }
}

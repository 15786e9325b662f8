//! Command-line argument parsing for the RustMaps CLI
//!
//! Flag names and short options mirror the long-standing `rustmaps` tool so
//! existing scripts keep working.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Log levels accepted by `--log-level`
pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// RustMaps CLI - generate and download maps through the RustMaps API
#[derive(Parser, Debug)]
#[command(
    name = "rustmaps",
    version,
    about = "Generate custom and procedural maps with the RustMaps API",
    long_about = "Submits map generation requests to RustMaps, waits for them while respecting \
the account's rate and quota limits, and downloads the finished maps.
Run without a subcommand to list the files and directories the tool uses."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Console log level (the log file always records debug)
    #[arg(
        short,
        long,
        global = true,
        default_value = "error",
        value_parser = LOG_LEVELS
    )]
    pub log_level: String,

    /// Application directory (defaults to ~/.rustmaps)
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authenticate with the RustMaps API
    Auth(AuthArgs),

    /// Generate custom and procedural maps
    Generate(GenerateArgs),

    /// Print the page URL of generated maps
    Open(OpenArgs),
}

/// Arguments for the auth command
#[derive(Args, Debug, Clone)]
pub struct AuthArgs {
    /// API key from rustmaps.com; prompted for when omitted
    #[arg(value_name = "API_KEY")]
    pub api_key: Option<String>,
}

/// Arguments for the generate command
#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Path to a CSV file of maps
    #[arg(short, long, value_name = "FILE")]
    pub csv: Option<PathBuf>,

    /// Saved config to use from RustMaps
    #[arg(short = 'S', long)]
    pub saved_config: Option<String>,

    /// Seed to generate
    #[arg(short, long)]
    pub seed: Option<String>,

    /// Size of the map to generate
    #[arg(short = 'z', long)]
    pub size: Option<u32>,

    /// Generate maps against the staging branch
    #[arg(short = 'b', long)]
    pub staging: bool,

    /// Generate again even if the map is already generated
    #[arg(short, long)]
    pub force: bool,

    /// Pick a random seed (size must be set)
    #[arg(short, long)]
    pub random: bool,

    /// Download the generated maps (procedural maps cannot be downloaded)
    #[arg(short, long)]
    pub download: bool,

    /// Output directory for downloaded maps
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

/// Arguments for the open command
#[derive(Args, Debug, Clone, Default)]
pub struct OpenArgs {
    /// Path to a CSV file of maps
    #[arg(short, long, value_name = "FILE")]
    pub csv: Option<PathBuf>,

    /// Saved config the map was generated with
    #[arg(short = 'S', long)]
    pub saved_config: Option<String>,

    /// Seed of the map
    #[arg(short, long)]
    pub seed: Option<String>,

    /// Size of the map
    #[arg(short = 'z', long)]
    pub size: Option<u32>,

    /// The map was generated against the staging branch
    #[arg(short = 'b', long)]
    pub staging: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Console log level
    pub fn log_level(&self) -> &str {
        &self.global.log_level
    }
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

fn has_size(size: Option<u32>) -> bool {
    size.is_some_and(|s| s != 0)
}

/// A CSV batch replaces every per-map flag
fn check_csv_exclusive(
    csv: bool,
    seed: bool,
    size: bool,
    saved_config: bool,
    staging: bool,
) -> Result<(), String> {
    if !csv {
        return Ok(());
    }
    if seed {
        return Err("cannot use --csv with --seed".to_string());
    }
    if size {
        return Err("cannot use --csv with --size".to_string());
    }
    if saved_config {
        return Err("cannot use --csv with --saved-config".to_string());
    }
    if staging {
        return Err("cannot use --csv with --staging".to_string());
    }
    Ok(())
}

impl GenerateArgs {
    /// Check flag combinations
    pub fn validate(&self) -> Result<(), String> {
        let csv = self.csv.is_some();
        let seed = is_set(&self.seed);
        let size = has_size(self.size);

        if self.random && seed {
            return Err("cannot use --random with --seed".to_string());
        }
        if self.random && csv {
            return Err("cannot use --random with --csv".to_string());
        }
        if self.random && !size {
            return Err("cannot use --random without --size".to_string());
        }

        check_csv_exclusive(csv, seed, size, is_set(&self.saved_config), self.staging)?;

        if self.output_dir.is_some() && !self.download {
            return Err("cannot use --output-dir without --download".to_string());
        }

        if !(csv || (size && (seed || self.random))) {
            return Err("must provide either --csv, or --size and --seed or --random".to_string());
        }

        Ok(())
    }
}

impl OpenArgs {
    /// Check flag combinations
    pub fn validate(&self) -> Result<(), String> {
        let csv = self.csv.is_some();
        let seed = is_set(&self.seed);
        let size = has_size(self.size);

        check_csv_exclusive(csv, seed, size, is_set(&self.saved_config), self.staging)?;

        if !(csv || (size && seed)) {
            return Err(
                "must provide either --csv, or --size and --seed with or without --staging"
                    .to_string(),
            );
        }

        Ok(())
    }
}

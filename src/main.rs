//! RustMaps CLI application
//!
//! Command-line interface for generating and downloading maps through the
//! RustMaps API.

use std::error::Error;
use std::process;

use clap::CommandFactory;
use tracing::{error, info};

use rustmaps::cli::{
    handle_auth, handle_generate, handle_open, show_paths, AppContext, Cli, Commands,
};
use rustmaps::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let mut cause = e.source();
        while let Some(inner) = cause {
            eprintln!("  Caused by: {}", inner);
            cause = inner.source();
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    let (context, _logging) =
        AppContext::bootstrap(cli.global.home.as_deref(), cli.log_level()).await?;

    info!("RustMaps CLI v{} starting", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Some(Commands::Auth(args)) => {
            info!("Executing auth command");
            handle_auth(&context, args).await
        }
        Some(Commands::Generate(args)) => {
            info!("Executing generate command");
            handle_generate(&context, args).await
        }
        Some(Commands::Open(args)) => {
            info!("Executing open command");
            handle_open(&context, args).await
        }
        None => {
            let _ = Cli::command().print_help();
            println!();
            show_paths(&context);
            Ok(())
        }
    };

    if let Err(e) = &result {
        error!(category = e.category(), "{}", e);
    }
    result
}

//! Command-line interface components
//!
//! Argument parsing, the per-process context and the command handlers of the
//! `rustmaps` binary.

pub mod args;
pub mod commands;
pub mod context;

pub use args::{AuthArgs, Cli, Commands, GenerateArgs, GlobalArgs, OpenArgs};
pub use commands::{
    handle_auth, handle_generate, handle_open, map_page_url, show_paths, RequestSource,
};
pub use context::AppContext;

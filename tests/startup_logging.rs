//! Startup writes its own events to the log file
//!
//! Kept in its own test binary because it installs the global subscriber.

use std::fs;

use tempfile::TempDir;

use rustmaps::cli::AppContext;

#[tokio::test]
async fn test_context_loading_reaches_log_file() {
    let temp_dir = TempDir::new().unwrap();

    let (context, guard) = AppContext::bootstrap(Some(temp_dir.path()), "error")
        .await
        .unwrap();
    let log_file = context.paths.log_file.clone();
    drop(guard);

    let log = fs::read_to_string(&log_file).unwrap();
    assert!(log.contains("Context ready under"), "log was: {}", log);
}

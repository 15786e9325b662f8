//! Loading and validating batches of map requests
//!
//! A batch comes from a CSV table, a single seed or a random seed. Every
//! source goes through [`validate_capability`] before anything is sent.

use std::path::Path;

use rand::Rng;
use tracing::{debug, warn};

use crate::app::models::{MapRequest, Status};
use crate::auth::Tier;
use crate::constants::seeds;
use crate::errors::{ValidationError, ValidationResult};

/// Columns that must appear in the header row
pub const REQUIRED_COLUMNS: [&str; 2] = ["seed", "size"];

/// Load requests from a CSV table
///
/// Columns are positional: `seed, size, saved_config, staging, map_id, status`.
/// Trailing columns may be omitted on any row.
///
/// # Errors
///
/// Returns `ValidationError` if the file is missing, the header lacks a
/// required column, a row cannot be interpreted or no rows are present
pub fn load_batch(path: &Path) -> ValidationResult<Vec<MapRequest>> {
    if !path.is_file() {
        return Err(ValidationError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    validate_headers(&headers)?;

    let mut requests = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let row = record
            .position()
            .map(|position| position.line() as usize)
            .unwrap_or(index + 2);
        requests.push(parse_row(&record, row)?);
    }

    if requests.is_empty() {
        warn!("No maps loaded from {}", path.display());
        return Err(ValidationError::NoRequests);
    }

    debug!("Loaded {} maps from {}", requests.len(), path.display());
    Ok(requests)
}

fn validate_headers(headers: &csv::StringRecord) -> ValidationResult<()> {
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|header| header.trim() == column) {
            return Err(ValidationError::MissingColumn {
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

fn parse_row(record: &csv::StringRecord, row: usize) -> ValidationResult<MapRequest> {
    let field = |position: usize| record.get(position).map(str::trim).unwrap_or("");

    let seed = field(0);
    if seed.is_empty() {
        return Err(ValidationError::InvalidRow {
            row,
            reason: "seed is empty".to_string(),
        });
    }

    let size = field(1)
        .parse::<u32>()
        .map_err(|_| ValidationError::InvalidRow {
            row,
            reason: format!("size '{}' is not a number", field(1)),
        })?;

    for (column, value) in [("seed", seed), ("saved_config", field(2))] {
        check_filename_part(column, value)
            .map_err(|reason| ValidationError::InvalidRow { row, reason })?;
    }

    let staging = field(3).eq_ignore_ascii_case("true");
    let mut request = MapRequest::new(seed, size, field(2), staging);
    request.map_id = field(4).to_string();

    let status = field(5);
    if !status.is_empty() {
        request.status = status
            .parse::<Status>()
            .map_err(|reason| ValidationError::InvalidRow { row, reason })?;
    }

    Ok(request)
}

/// Reject values that would escape the imports directory once they become
/// part of a record filename
///
/// # Errors
///
/// Returns a description of the problem when `value` holds a path separator
/// or a `..` sequence
pub fn check_filename_part(column: &str, value: &str) -> Result<(), String> {
    if value.contains(['/', '\\']) || value.contains("..") {
        return Err(format!(
            "{} '{}' must not contain path separators or '..'",
            column, value
        ));
    }
    Ok(())
}

/// Check that `tier` may generate every request in the batch
///
/// # Errors
///
/// Returns `CustomMapsNotAllowed` when the tier cannot generate custom maps and
/// any request names a saved configuration
pub fn validate_capability(requests: &[MapRequest], tier: Tier) -> ValidationResult<()> {
    if requests.is_empty() {
        return Err(ValidationError::NoRequests);
    }

    if !tier.allows_custom_maps() && requests.iter().any(MapRequest::is_custom) {
        warn!("Cannot generate custom maps with the {} tier", tier);
        return Err(ValidationError::CustomMapsNotAllowed {
            tier: tier.to_string(),
        });
    }

    Ok(())
}

/// A uniformly random seed in `0..=2147483647`
pub fn random_seed() -> String {
    rand::thread_rng()
        .gen_range(0..=seeds::MAX_SEED)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("maps.csv");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_positional_columns() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "seed,size,saved_config,staging,map_id,status\n\
             123,4000\n\
             456,3500,myconfig,TRUE\n\
             789,3000,,false,abc,Complete\n",
        );

        let requests = load_batch(&path).unwrap();
        assert_eq!(requests.len(), 3);

        assert_eq!(requests[0].seed, "123");
        assert_eq!(requests[0].size, 4000);
        assert!(!requests[0].is_custom());
        assert_eq!(requests[0].status, Status::Pending);
        assert_eq!(requests[0].filename, "123_4000.json");

        assert_eq!(requests[1].saved_config, "myconfig");
        assert!(requests[1].staging);
        assert_eq!(requests[1].filename, "456_3500_myconfig_staging.json");

        assert_eq!(requests[2].map_id, "abc");
        assert_eq!(requests[2].status, Status::Complete);
    }

    #[test]
    fn test_path_like_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        for content in [
            "seed,size,saved_config\n../escape,4000,\n",
            "seed,size,saved_config\n1,4000,../../x\n",
            "seed,size,saved_config\n1,4000,a/b\n",
            "seed,size,saved_config\n1,4000,a\\b\n",
        ] {
            let path = write_csv(&dir, content);
            let result = load_batch(&path);
            assert!(
                matches!(result, Err(ValidationError::InvalidRow { row: 2, .. })),
                "accepted {:?}",
                content
            );
        }
    }

    #[test]
    fn test_check_filename_part() {
        assert!(check_filename_part("seed", "12345").is_ok());
        assert!(check_filename_part("saved_config", "my.config").is_ok());
        assert!(check_filename_part("saved_config", "..").is_err());
        assert!(check_filename_part("seed", "/tmp").is_err());
    }

    #[test]
    fn test_header_with_padding_is_accepted() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, " seed , size \n1,2000\n");
        assert_eq!(load_batch(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_required_column() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "seed,saved_config\n1,cfg\n");
        match load_batch(&path) {
            Err(ValidationError::MissingColumn { column }) => assert_eq!(column, "size"),
            other => panic!("Expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_size_names_row() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "seed,size\n1,4000\n2,large\n");
        match load_batch(&path) {
            Err(ValidationError::InvalidRow { row, .. }) => assert_eq!(row, 3),
            other => panic!("Expected InvalidRow, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_status_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "seed,size,saved_config,staging,map_id,status\n1,4000,,,,Lost\n");
        assert!(matches!(
            load_batch(&path),
            Err(ValidationError::InvalidRow { .. })
        ));
    }

    #[test]
    fn test_empty_table_and_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "seed,size\n");
        assert!(matches!(load_batch(&path), Err(ValidationError::NoRequests)));

        let missing = dir.path().join("absent.csv");
        assert!(matches!(
            load_batch(&missing),
            Err(ValidationError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_capability_by_tier() {
        let procedural = vec![MapRequest::new("1", 4000, "", false)];
        let custom = vec![MapRequest::new("1", 4000, "myconfig", false)];

        assert!(validate_capability(&procedural, Tier::Free).is_ok());
        assert!(matches!(
            validate_capability(&custom, Tier::Free),
            Err(ValidationError::CustomMapsNotAllowed { .. })
        ));
        assert!(validate_capability(&custom, Tier::Supporter).is_err());
        assert!(validate_capability(&custom, Tier::Premium).is_ok());
        assert!(validate_capability(&custom, Tier::Organization2).is_ok());
        assert!(validate_capability(&[], Tier::Premium).is_err());
    }

    #[test]
    fn test_random_seed_in_range() {
        for _ in 0..100 {
            let seed: u64 = random_seed().parse().unwrap();
            assert!(seed <= u64::from(seeds::MAX_SEED));
        }
    }
}

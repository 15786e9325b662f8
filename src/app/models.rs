//! Data models for map generation requests
//!
//! This module defines the request record tracked through the generation
//! lifecycle, its status enumeration, and the pure naming functions used for
//! the on-disk import records and downloaded artifacts.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{files, generation};
use crate::errors::{StoreError, StoreResult};

/// Lifecycle status of a generation request
///
/// Serialized with the human-readable strings used by existing import records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Not yet accepted by the service
    Pending,
    /// Accepted and being generated
    Generating,
    /// Generated and available
    Complete,
    /// The API key was rejected (HTTP 401)
    Unauthorized,
    /// The account may not perform this request (HTTP 403)
    Forbidden,
    /// The service rejected the parameters (HTTP 400)
    #[serde(rename = "Bad Request")]
    BadRequest,
    /// Staging was requested but is not enabled for the account
    #[serde(rename = "Staging Not Enabled")]
    StagingNotEnabled,
    /// The service has no record of the map (HTTP 404)
    #[serde(rename = "Not Found")]
    NotFound,
}

impl Status {
    /// All statuses, in declaration order
    pub const ALL: [Status; 8] = [
        Status::Pending,
        Status::Generating,
        Status::Complete,
        Status::Unauthorized,
        Status::Forbidden,
        Status::BadRequest,
        Status::StagingNotEnabled,
        Status::NotFound,
    ];

    /// The string stored in import records
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Generating => "Generating",
            Status::Complete => "Complete",
            Status::Unauthorized => "Unauthorized",
            Status::Forbidden => "Forbidden",
            Status::BadRequest => "Bad Request",
            Status::StagingNotEnabled => "Staging Not Enabled",
            Status::NotFound => "Not Found",
        }
    }

    /// Whether the orchestration loop still has work to do for this status
    pub fn is_active(&self) -> bool {
        matches!(self, Status::Pending | Status::Generating)
    }

    /// Whether polling stops at this status
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Whether this status is a rejection by the service
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Status::Unauthorized
                | Status::Forbidden
                | Status::BadRequest
                | Status::StagingNotEnabled
                | Status::NotFound
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    /// Accepts both the record spelling ("Bad Request") and the identifier
    /// spelling ("BadRequest"), ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        Status::ALL
            .into_iter()
            .find(|status| status.as_str().replace(' ', "").to_lowercase() == wanted)
            .ok_or_else(|| format!("unknown status '{}'", s.trim()))
    }
}

/// Whether a request references a saved configuration on the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Generated by the default algorithm from seed and size
    Procedural,
    /// Generated from a named saved configuration
    Custom,
}

/// One map generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRequest {
    /// Map seed; numeric text in practice
    pub seed: String,
    /// Map dimension
    pub size: u32,
    /// Saved configuration name; empty for procedural maps
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub saved_config: String,
    /// Target the service's staging branch
    #[serde(default)]
    pub staging: bool,
    /// Identifier assigned by the service once accepted
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub map_id: String,
    /// Current lifecycle status
    pub status: Status,
    /// RFC3339 time of the last status report, or empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_sync: String,
    /// Import record filename, see [`derive_filename`]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub filename: String,
}

/// Derive the import record filename of a request
///
/// `{seed}_{size}[_{saved_config}][_staging].json`
pub fn derive_filename(seed: &str, size: u32, saved_config: &str, staging: bool) -> String {
    let mut filename = format!("{}_{}", seed, size);

    if !saved_config.is_empty() {
        filename.push('_');
        filename.push_str(saved_config);
    }

    if staging {
        filename.push_str("_staging");
    }

    filename.push_str(".json");
    filename
}

impl MapRequest {
    /// Create a pending request with its filename derived
    pub fn new(
        seed: impl Into<String>,
        size: u32,
        saved_config: impl Into<String>,
        staging: bool,
    ) -> Self {
        let mut request = Self {
            seed: seed.into(),
            size,
            saved_config: saved_config.into(),
            staging,
            map_id: String::new(),
            status: Status::Pending,
            last_sync: String::new(),
            filename: String::new(),
        };
        request.ensure_filename();
        request
    }

    /// The filename these parameters derive to
    pub fn derived_filename(&self) -> String {
        derive_filename(&self.seed, self.size, &self.saved_config, self.staging)
    }

    /// Fill the filename if it has not been set
    pub fn ensure_filename(&mut self) {
        if self.filename.is_empty() {
            self.filename = self.derived_filename();
        }
    }

    /// Procedural or custom
    pub fn kind(&self) -> RequestKind {
        if self.saved_config.is_empty() {
            RequestKind::Procedural
        } else {
            RequestKind::Custom
        }
    }

    /// Whether this request references a saved configuration
    pub fn is_custom(&self) -> bool {
        self.kind() == RequestKind::Custom
    }

    /// Record a status reported by the service
    pub fn report_status(&mut self, status: Status) {
        self.status = status;
        self.mark_synced();
        tracing::info!("{}", self);
    }

    /// Stamp the last sync time with the current time
    pub fn mark_synced(&mut self) {
        self.last_sync = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    }

    /// Parsed last sync time, if any
    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.last_sync)
            .ok()
            .map(|time| time.with_timezone(&Utc))
    }

    /// Whether the status should be re-verified at `now`
    ///
    /// A missing or unparseable sync time always needs a sync.
    pub fn should_sync_at(&self, now: DateTime<Utc>, freshness_window: Duration) -> bool {
        let Some(last) = self.last_synced_at() else {
            return true;
        };

        match chrono::Duration::from_std(freshness_window) {
            Ok(window) => now > last + window,
            Err(_) => false,
        }
    }

    /// [`Self::should_sync_at`] with the current time and default window
    pub fn should_sync(&self) -> bool {
        self.should_sync_at(Utc::now(), generation::FRESHNESS_WINDOW)
    }

    /// Copy the persisted fields of `other` onto this request
    ///
    /// The filename is left untouched.
    pub fn merge_from(&mut self, other: &MapRequest) {
        self.seed = other.seed.clone();
        self.size = other.size;
        self.saved_config = other.saved_config.clone();
        self.staging = other.staging;
        self.map_id = other.map_id.clone();
        self.status = other.status;
        self.last_sync = other.last_sync.clone();
    }

    /// Write this request as indented JSON into `dir` under its filename
    ///
    /// The record is written to a temporary sibling and renamed into place, so
    /// an interrupted write never leaves a truncated record behind.
    pub fn save_json(&self, dir: &Path) -> StoreResult<()> {
        if self.filename.is_empty() {
            return Err(StoreError::MissingFilename {
                request: self.to_string(),
            });
        }

        let path = dir.join(&self.filename);
        let temp_path = dir.join(format!("{}{}", self.filename, files::TEMP_FILE_SUFFIX));

        let mut content = serde_json::to_string_pretty(self).map_err(StoreError::Encode)?;
        content.push('\n');

        std::fs::write(&temp_path, content).map_err(|source| StoreError::Io {
            path: temp_path.clone(),
            source,
        })?;
        std::fs::rename(&temp_path, &path).map_err(|source| StoreError::Io { path, source })
    }

    /// Deterministic prefix of downloaded artifact names
    ///
    /// `{seed}_{size}_{saved_config|procedural}_{staging}_{map_id}`
    pub fn download_prefix(&self) -> String {
        let config = if self.saved_config.is_empty() {
            "procedural"
        } else {
            self.saved_config.as_str()
        };

        format!(
            "{}_{}_{}_{}_{}",
            self.seed, self.size, config, self.staging, self.map_id
        )
    }
}

impl fmt::Display for MapRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Seed: {} | Size: {} | Config: '{}' | Status: '{}'",
            self.seed, self.size, self.saved_config, self.status
        )
    }
}

/// Number of requests in each status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub generating: usize,
    pub complete: usize,
    pub rejected: usize,
}

impl StatusCounts {
    /// Count the statuses of `requests`
    pub fn from_requests(requests: &[MapRequest]) -> Self {
        requests
            .iter()
            .fold(Self::default(), |mut counts, request| {
                match request.status {
                    Status::Pending => counts.pending += 1,
                    Status::Generating => counts.generating += 1,
                    Status::Complete => counts.complete += 1,
                    _ => counts.rejected += 1,
                }
                counts
            })
    }

    /// Total requests counted
    pub fn total(&self) -> usize {
        self.pending + self.generating + self.complete + self.rejected
    }
}

impl fmt::Display for StatusCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pending, {} generating, {} complete, {} rejected",
            self.pending, self.generating, self.complete, self.rejected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_filename_derivation() {
        assert_eq!(derive_filename("123", 4000, "", false), "123_4000.json");
        assert_eq!(
            derive_filename("123", 4000, "myconfig", false),
            "123_4000_myconfig.json"
        );
        assert_eq!(
            derive_filename("123", 4000, "", true),
            "123_4000_staging.json"
        );
        assert_eq!(
            derive_filename("123", 4000, "myconfig", true),
            "123_4000_myconfig_staging.json"
        );
    }

    #[test]
    fn test_filename_is_deterministic() {
        let request = MapRequest::new("987654", 3500, "cfg", true);
        assert_eq!(request.derived_filename(), request.derived_filename());
        assert_eq!(request.filename, request.derived_filename());
    }

    #[test]
    fn test_ensure_filename_keeps_existing() {
        let mut request = MapRequest::new("1", 1000, "", false);
        request.filename = "custom.json".to_string();
        request.ensure_filename();
        assert_eq!(request.filename, "custom.json");

        request.filename.clear();
        request.ensure_filename();
        assert_eq!(request.filename, "1_1000.json");
    }

    #[test]
    fn test_new_request_is_pending() {
        let request = MapRequest::new("42", 4250, "", false);
        assert_eq!(request.status, Status::Pending);
        assert_eq!(request.kind(), RequestKind::Procedural);
        assert!(request.last_sync.is_empty());

        let custom = MapRequest::new("42", 4250, "hills", false);
        assert!(custom.is_custom());
    }

    #[test]
    fn test_status_wire_strings() {
        assert_eq!(
            serde_json::to_string(&Status::BadRequest).unwrap(),
            "\"Bad Request\""
        );
        assert_eq!(
            serde_json::from_str::<Status>("\"Staging Not Enabled\"").unwrap(),
            Status::StagingNotEnabled
        );
        for status in Status::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_status_from_str_accepts_both_spellings() {
        assert_eq!("Not Found".parse::<Status>().unwrap(), Status::NotFound);
        assert_eq!("notfound".parse::<Status>().unwrap(), Status::NotFound);
        assert_eq!(" complete ".parse::<Status>().unwrap(), Status::Complete);
        assert_eq!(
            "StagingNotEnabled".parse::<Status>().unwrap(),
            Status::StagingNotEnabled
        );
        assert!("Finished".parse::<Status>().is_err());
    }

    #[test]
    fn test_status_classification() {
        assert!(Status::Pending.is_active());
        assert!(Status::Generating.is_active());
        assert!(Status::Complete.is_terminal());
        assert!(Status::NotFound.is_terminal());
        assert!(Status::Forbidden.is_rejection());
        assert!(!Status::Complete.is_rejection());
    }

    #[test]
    fn test_should_sync() {
        let window = Duration::from_secs(300);
        let now = Utc::now();
        let mut request = MapRequest::new("1", 1000, "", false);

        // never synced
        assert!(request.should_sync_at(now, window));

        request.last_sync = "garbage".to_string();
        assert!(request.should_sync_at(now, window));

        request.last_sync = (now - chrono::Duration::seconds(60))
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        assert!(!request.should_sync_at(now, window));

        request.last_sync = (now - chrono::Duration::seconds(301))
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        assert!(request.should_sync_at(now, window));
    }

    #[test]
    fn test_report_status_marks_synced() {
        let mut request = MapRequest::new("1", 1000, "", false);
        request.report_status(Status::Generating);
        assert_eq!(request.status, Status::Generating);
        assert!(request.last_synced_at().is_some());
        assert!(!request.should_sync());
    }

    #[test]
    fn test_merge_from_keeps_filename() {
        let mut fresh = MapRequest::new("1", 1000, "", false);
        let mut stored = MapRequest::new("1", 1000, "", false);
        stored.map_id = "abc".to_string();
        stored.status = Status::Complete;
        stored.last_sync = "2024-01-01T00:00:00Z".to_string();
        stored.filename = "other.json".to_string();

        fresh.merge_from(&stored);
        assert_eq!(fresh.map_id, "abc");
        assert_eq!(fresh.status, Status::Complete);
        assert_eq!(fresh.last_sync, "2024-01-01T00:00:00Z");
        assert_eq!(fresh.filename, "1_1000.json");
    }

    #[test]
    fn test_save_json_and_merge_back() {
        let temp_dir = TempDir::new().unwrap();
        let mut request = MapRequest::new("555", 4500, "islands", true);
        request.map_id = "map-1".to_string();
        request.status = Status::Generating;
        request.last_sync = "2024-05-01T12:00:00Z".to_string();
        request.save_json(temp_dir.path()).unwrap();

        let content = std::fs::read_to_string(temp_dir.path().join(&request.filename)).unwrap();
        assert!(content.contains("  \"saved_config\": \"islands\""));
        assert!(content.ends_with('\n'));

        let decoded: MapRequest = serde_json::from_str(&content).unwrap();
        let mut merged = MapRequest::new("0", 0, "", false);
        merged.merge_from(&decoded);
        assert_eq!(merged.seed, request.seed);
        assert_eq!(merged.size, request.size);
        assert_eq!(merged.saved_config, request.saved_config);
        assert_eq!(merged.staging, request.staging);
        assert_eq!(merged.map_id, request.map_id);
        assert_eq!(merged.status, request.status);
        assert_eq!(merged.last_sync, request.last_sync);
    }

    #[test]
    fn test_save_json_requires_filename() {
        let temp_dir = TempDir::new().unwrap();
        let mut request = MapRequest::new("1", 1000, "", false);
        request.filename.clear();
        assert!(matches!(
            request.save_json(temp_dir.path()),
            Err(StoreError::MissingFilename { .. })
        ));
    }

    #[test]
    fn test_optional_fields_omitted() {
        let request = MapRequest::new("1", 1000, "", false);
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("saved_config"));
        assert!(!json.contains("map_id"));
        assert!(!json.contains("last_sync"));
        assert!(json.contains("\"filename\":\"1_1000.json\""));
    }

    #[test]
    fn test_download_prefix() {
        let mut request = MapRequest::new("77", 3000, "", true);
        request.map_id = "xyz".to_string();
        assert_eq!(request.download_prefix(), "77_3000_procedural_true_xyz");

        let mut custom = MapRequest::new("77", 3000, "cfg", false);
        custom.map_id = "q".to_string();
        assert_eq!(custom.download_prefix(), "77_3000_cfg_false_q");
    }

    #[test]
    fn test_display() {
        let request = MapRequest::new("9", 2000, "c", false);
        assert_eq!(
            request.to_string(),
            "Seed: 9 | Size: 2000 | Config: 'c' | Status: 'Pending'"
        );
    }

    #[test]
    fn test_status_counts() {
        let mut requests = vec![
            MapRequest::new("1", 1000, "", false),
            MapRequest::new("2", 1000, "", false),
            MapRequest::new("3", 1000, "", false),
            MapRequest::new("4", 1000, "", false),
        ];
        requests[1].status = Status::Generating;
        requests[2].status = Status::Complete;
        requests[3].status = Status::Forbidden;

        let counts = StatusCounts::from_requests(&requests);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.generating, 1);
        assert_eq!(counts.complete, 1);
        assert_eq!(counts.rejected, 1);
        assert_eq!(counts.total(), 4);
    }
}

//! Import/dedup store
//!
//! One JSON record per request lives in the imports directory under the
//! request's derived filename. Importing a request that already has a record
//! resumes from the record instead of starting over, unless forced.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::app::models::MapRequest;
use crate::errors::{StoreError, StoreResult};

/// Outcome of an import pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Records written from the in-memory request
    pub written: usize,
    /// Requests updated from an existing record
    pub resumed: usize,
}

/// Directory of persisted request records
#[derive(Debug, Clone)]
pub struct ImportStore {
    dir: PathBuf,
}

impl ImportStore {
    /// Store rooted at `dir`; importing creates the directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the records
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `request`
    pub fn path_for(&self, request: &MapRequest) -> PathBuf {
        if request.filename.is_empty() {
            self.dir.join(request.derived_filename())
        } else {
            self.dir.join(&request.filename)
        }
    }

    /// Reconcile `requests` with the records on disk
    ///
    /// Without `force`, an existing record wins: its persisted fields are
    /// merged onto the request and the file is left as it is. Otherwise the
    /// request is written out, replacing any record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on the first record that cannot be read, decoded
    /// or written
    pub fn import(&self, requests: &mut [MapRequest], force: bool) -> StoreResult<ImportSummary> {
        let mut summary = ImportSummary::default();
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        for request in requests.iter_mut() {
            request.ensure_filename();

            if !force {
                if let Some(existing) = self.load(&request.filename)? {
                    debug!(
                        "Map file already exists, loading existing file {}",
                        self.path_for(request).display()
                    );
                    request.merge_from(&existing);
                    summary.resumed += 1;
                    continue;
                }
            }

            self.save(request)?;
            debug!("Exported map {} to {}", request, self.path_for(request).display());
            summary.written += 1;
        }

        Ok(summary)
    }

    /// Persist `request` to its record
    ///
    /// # Errors
    ///
    /// Returns `MissingFilename` if the request has no filename, or an I/O
    /// error if the record cannot be written
    pub fn save(&self, request: &MapRequest) -> StoreResult<()> {
        request.save_json(&self.dir)
    }

    /// Read the record named `filename`, if present
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the record exists but cannot be read or decoded
    pub fn load(&self, filename: &str) -> StoreResult<Option<MapRequest>> {
        let path = self.dir.join(filename);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let request = serde_json::from_str(&content)
            .map_err(|source| StoreError::Decode { path, source })?;
        Ok(Some(request))
    }
}

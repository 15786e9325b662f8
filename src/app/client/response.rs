//! Translation of HTTP responses into domain outcomes
//!
//! These functions take the status code and body text of a response and
//! decide what it means for a request. Keeping them free of any transport
//! makes the status mapping testable without a server.

use tracing::{debug, error};

use crate::app::client::types::{
    GenerateResponse, LimitsResponse, QuotaSnapshot, StatusReport, StatusResponse,
};
use crate::app::models::{MapRequest, Status};
use crate::constants::api;
use crate::errors::{ApiError, ApiResult};

/// Apply a submission response to `request`
///
/// The request status is updated for every mapped code. 409 means the map is
/// already being generated and counts as success without a payload. Rejections
/// (400/401/403) are written to the request and returned as errors; any other
/// code leaves the request untouched.
pub fn apply_submission(
    request: &mut MapRequest,
    code: u16,
    body: &str,
) -> ApiResult<Option<GenerateResponse>> {
    match code {
        401 => {
            error!(seed = %request.seed, size = request.size, "Unauthorized request");
            request.report_status(Status::Unauthorized);
            return Err(ApiError::Unauthorized);
        }
        403 => {
            error!(seed = %request.seed, size = request.size, "Forbidden request");
            request.report_status(Status::Forbidden);
            return Err(ApiError::Forbidden);
        }
        409 => {
            debug!(seed = %request.seed, size = request.size, "Map already generating");
            request.report_status(Status::Generating);
            return Ok(None);
        }
        400 => {
            let status = rejection_status(body);
            error!(seed = %request.seed, size = request.size, %status, "Bad request");
            request.report_status(status);
            return Err(ApiError::Rejected { status });
        }
        200 | 201 => {}
        other => return Err(ApiError::UnexpectedStatus { status: other }),
    }

    let response: GenerateResponse = serde_json::from_str(body)?;
    if !response.data.map_id.is_empty() {
        request.map_id = response.data.map_id.clone();
    }

    if code == 200 {
        debug!(seed = %request.seed, size = request.size, "Map generated");
        request.report_status(Status::Complete);
    } else {
        debug!(seed = %request.seed, size = request.size, "Map generating");
        request.report_status(Status::Generating);
    }

    Ok(Some(response))
}

/// Distinguish a disabled staging branch from any other bad request
fn rejection_status(body: &str) -> Status {
    match serde_json::from_str::<GenerateResponse>(body) {
        Ok(response)
            if response.meta.errors.first().map(String::as_str)
                == Some(api::STAGING_NOT_ENABLED) =>
        {
            Status::StagingNotEnabled
        }
        _ => Status::BadRequest,
    }
}

/// Interpret a status lookup response
///
/// Only 200 carries a payload; 401/403/404/409 map to their status without
/// one and are not errors.
pub fn interpret_status(code: u16, body: &str) -> ApiResult<StatusReport> {
    match code {
        200 => {
            let response: StatusResponse = serde_json::from_str(body)?;
            Ok(StatusReport::complete(response.data))
        }
        401 => Ok(StatusReport::bare(Status::Unauthorized)),
        403 => Ok(StatusReport::bare(Status::Forbidden)),
        404 => Ok(StatusReport::bare(Status::NotFound)),
        409 => Ok(StatusReport::bare(Status::Generating)),
        other => Err(ApiError::UnexpectedStatus { status: other }),
    }
}

/// Interpret a limits response
pub fn interpret_quota(code: u16, body: &str) -> ApiResult<QuotaSnapshot> {
    if code == 401 {
        return Err(ApiError::Unauthorized);
    }

    let response: LimitsResponse = serde_json::from_str(body)?;
    Ok(QuotaSnapshot::from(response.data))
}

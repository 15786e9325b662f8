//! In-memory [`MapsApi`] used by tests
//!
//! Responses are scripted up front and the fake counts every call. Submission
//! codes run through the same interpretation as the HTTP client, so a scripted
//! 409 or 400 has exactly the effect a real one would.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::app::client::response::apply_submission;
use crate::app::client::types::{QuotaSnapshot, StatusData, StatusReport};
use crate::app::client::{GenerateResponse, MapsApi};
use crate::app::models::{MapRequest, RequestKind, Status};
use crate::errors::{ApiError, ApiResult};

/// Scripted answer to a status lookup
#[derive(Debug, Clone)]
enum ScriptedStatus {
    Report(StatusReport),
    Failure(u16),
}

#[derive(Debug)]
struct FakeState {
    api_key: String,
    quota: Option<QuotaSnapshot>,
    submission_codes: VecDeque<u16>,
    statuses: HashMap<String, ScriptedStatus>,
    submitted: Vec<(String, RequestKind)>,
    status_lookups: Vec<String>,
    quota_calls: usize,
    next_map_id: usize,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            quota: Some(QuotaSnapshot {
                concurrent_current: 0,
                concurrent_allowed: 5,
                monthly_current: 0,
                monthly_allowed: 800,
            }),
            submission_codes: VecDeque::new(),
            statuses: HashMap::new(),
            submitted: Vec::new(),
            status_lookups: Vec::new(),
            quota_calls: 0,
            next_map_id: 0,
        }
    }
}

/// Scriptable fake of the map generation service
///
/// Clones share state, so a test can keep a handle after moving a clone into
/// the code under test. Requests are identified by their derived filename.
#[derive(Debug, Clone, Default)]
pub struct FakeMapsApi {
    state: Arc<Mutex<FakeState>>,
}

impl FakeMapsApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        // A poisoned lock only happens after a panic in another test thread
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Quota returned by `fetch_quota`
    pub fn set_quota(&self, quota: QuotaSnapshot) {
        self.state().quota = Some(quota);
    }

    /// Make `fetch_quota` answer 401
    pub fn reject_quota(&self) {
        self.state().quota = None;
    }

    /// Queue HTTP codes for the next submissions; 201 once the queue is empty
    pub fn push_submission_codes(&self, codes: impl IntoIterator<Item = u16>) {
        self.state().submission_codes.extend(codes);
    }

    /// Answer status lookups for `request` with `report`
    pub fn set_status(&self, request: &MapRequest, report: StatusReport) {
        self.state()
            .statuses
            .insert(request.derived_filename(), ScriptedStatus::Report(report));
    }

    /// Answer status lookups for `request` with a complete, downloadable payload
    pub fn set_complete(&self, request: &MapRequest, data: StatusData) {
        self.set_status(request, StatusReport::complete(data));
    }

    /// Make status lookups for `request` fail with an unmapped HTTP code
    pub fn fail_status(&self, request: &MapRequest, code: u16) {
        self.state()
            .statuses
            .insert(request.derived_filename(), ScriptedStatus::Failure(code));
    }

    /// Filenames of submitted requests in submission order
    pub fn submitted(&self) -> Vec<String> {
        self.state()
            .submitted
            .iter()
            .map(|(filename, _)| filename.clone())
            .collect()
    }

    /// Submitted filenames paired with the endpoint that received them
    pub fn submissions(&self) -> Vec<(String, RequestKind)> {
        self.state().submitted.clone()
    }

    /// Filenames of requests whose status was looked up, in call order
    pub fn status_lookups(&self) -> Vec<String> {
        self.state().status_lookups.clone()
    }

    /// Number of quota lookups
    pub fn quota_calls(&self) -> usize {
        self.state().quota_calls
    }

    /// Key most recently passed to `set_api_key`
    pub fn api_key(&self) -> String {
        self.state().api_key.clone()
    }

    fn submit(
        &self,
        request: &mut MapRequest,
        endpoint: RequestKind,
    ) -> ApiResult<Option<GenerateResponse>> {
        let (code, body) = {
            let mut state = self.state();
            state.submitted.push((request.derived_filename(), endpoint));
            state.next_map_id += 1;
            let code = state.submission_codes.pop_front().unwrap_or(201);
            (code, submission_body(code, state.next_map_id))
        };
        apply_submission(request, code, &body)
    }
}

fn submission_body(code: u16, map_id: usize) -> String {
    match code {
        200 | 201 => serde_json::json!({
            "meta": {"status": "Success", "statusCode": code, "errors": []},
            "data": {"mapId": format!("fake-{map_id}"), "queuePosition": 0, "state": "Queued"}
        })
        .to_string(),
        400 => serde_json::json!({
            "meta": {"status": "Error", "statusCode": 400, "errors": ["Invalid request"]}
        })
        .to_string(),
        _ => String::new(),
    }
}

#[async_trait]
impl MapsApi for FakeMapsApi {
    async fn submit_custom(
        &self,
        request: &mut MapRequest,
    ) -> ApiResult<Option<GenerateResponse>> {
        self.submit(request, RequestKind::Custom)
    }

    async fn submit_procedural(
        &self,
        request: &mut MapRequest,
    ) -> ApiResult<Option<GenerateResponse>> {
        self.submit(request, RequestKind::Procedural)
    }

    async fn fetch_status(&self, request: &MapRequest) -> ApiResult<StatusReport> {
        let key = request.derived_filename();
        let mut state = self.state();
        state.status_lookups.push(key.clone());

        match state.statuses.get(&key) {
            Some(ScriptedStatus::Report(report)) => Ok(report.clone()),
            Some(ScriptedStatus::Failure(code)) => {
                Err(ApiError::UnexpectedStatus { status: *code })
            }
            None => Ok(StatusReport::bare(Status::Generating)),
        }
    }

    async fn fetch_quota(&self) -> ApiResult<QuotaSnapshot> {
        let mut state = self.state();
        state.quota_calls += 1;
        state.quota.ok_or(ApiError::Unauthorized)
    }

    fn set_api_key(&mut self, api_key: String) {
        self.state().api_key = api_key;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_submission_is_created() {
        let fake = FakeMapsApi::new();
        let mut request = MapRequest::new("7", 3500, "", false);

        let response = fake.submit_procedural(&mut request).await.unwrap();
        assert!(response.is_some());
        assert_eq!(request.status, Status::Generating);
        assert_eq!(request.map_id, "fake-1");
        assert_eq!(fake.submitted(), vec![request.derived_filename()]);
        assert_eq!(
            fake.submissions(),
            vec![(request.derived_filename(), RequestKind::Procedural)]
        );
    }

    #[tokio::test]
    async fn test_scripted_codes_in_order() {
        let fake = FakeMapsApi::new();
        fake.push_submission_codes([409, 403]);

        let mut first = MapRequest::new("1", 3500, "", false);
        assert!(fake.submit_procedural(&mut first).await.unwrap().is_none());
        assert_eq!(first.status, Status::Generating);

        let mut second = MapRequest::new("2", 3500, "cfg", false);
        assert!(fake.submit_custom(&mut second).await.is_err());
        assert_eq!(second.status, Status::Forbidden);
    }

    #[tokio::test]
    async fn test_scripted_status_and_quota() {
        let fake = FakeMapsApi::new();
        let request = MapRequest::new("1", 3500, "", false);

        assert_eq!(
            fake.fetch_status(&request).await.unwrap().status,
            Status::Generating
        );

        fake.set_status(&request, StatusReport::bare(Status::NotFound));
        assert_eq!(
            fake.fetch_status(&request).await.unwrap().status,
            Status::NotFound
        );

        fake.fail_status(&request, 503);
        assert!(fake.fetch_status(&request).await.is_err());
        assert_eq!(fake.status_lookups().len(), 3);

        assert!(fake.fetch_quota().await.unwrap().can_generate());
        fake.reject_quota();
        assert!(matches!(
            fake.fetch_quota().await,
            Err(ApiError::Unauthorized)
        ));
        assert_eq!(fake.quota_calls(), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let fake = FakeMapsApi::new();
        let mut handle = fake.clone();
        handle.set_api_key("secret".to_string());
        assert_eq!(fake.api_key(), "secret");
    }
}

//! Orchestration loop driving a batch of requests to completion
//!
//! The loop is a sequence of ticks. Each tick re-syncs what the service knows
//! about in-flight and stale requests, then submits new work only when the
//! account quota allows it. A tick tells the caller whether another tick is
//! needed; sleeps happen inline, so nothing runs between ticks.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::app::client::MapsApi;
use crate::app::models::{MapRequest, Status, StatusCounts};
use crate::app::store::{ImportStore, ImportSummary};
use crate::auth::Credentials;
use crate::constants::generation;
use crate::errors::StoreResult;

/// Timing and throughput of the orchestration loop
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Sleep after an idle tick
    pub idle_backoff: Duration,
    /// Sleep after a tick that submitted work
    pub submit_pacing: Duration,
    /// Age after which complete requests are re-verified
    pub freshness_window: Duration,
    /// New submissions per tick; above 1 also capped by quota headroom
    pub submissions_per_tick: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            idle_backoff: generation::IDLE_BACKOFF,
            submit_pacing: generation::SUBMIT_PACING,
            freshness_window: generation::FRESHNESS_WINDOW,
            submissions_per_tick: generation::SUBMISSIONS_PER_TICK,
        }
    }
}

impl GeneratorConfig {
    /// Default behaviour without any sleeping
    pub fn without_delays() -> Self {
        Self {
            idle_backoff: Duration::ZERO,
            submit_pacing: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Key or tier missing; nothing was attempted
    AuthInvalid,
    /// No request is pending or generating
    AllResolved,
    /// Nothing could be submitted this tick
    Idle,
    /// This many requests were submitted
    Submitted(usize),
}

impl TickOutcome {
    /// Whether the caller should tick again
    pub fn should_continue(&self) -> bool {
        matches!(self, TickOutcome::Idle | TickOutcome::Submitted(_))
    }
}

/// One generation run over an ordered list of requests
pub struct Generator {
    config: GeneratorConfig,
    credentials: Credentials,
    requests: Vec<MapRequest>,
    api: Box<dyn MapsApi>,
    store: ImportStore,
}

impl Generator {
    pub fn new(
        config: GeneratorConfig,
        credentials: Credentials,
        api: Box<dyn MapsApi>,
        store: ImportStore,
    ) -> Self {
        Self {
            config,
            credentials,
            requests: Vec::new(),
            api,
            store,
        }
    }

    /// Replace the batch; filenames are derived where missing
    pub fn set_requests(&mut self, mut requests: Vec<MapRequest>) {
        for request in &mut requests {
            request.ensure_filename();
        }
        self.requests = requests;
    }

    /// Append one request to the batch
    pub fn add_request(&mut self, mut request: MapRequest) {
        request.ensure_filename();
        self.requests.push(request);
    }

    pub fn requests(&self) -> &[MapRequest] {
        &self.requests
    }

    pub fn into_requests(self) -> Vec<MapRequest> {
        self.requests
    }

    pub fn api(&self) -> &dyn MapsApi {
        self.api.as_ref()
    }

    pub fn store(&self) -> &ImportStore {
        &self.store
    }

    pub fn counts(&self) -> StatusCounts {
        StatusCounts::from_requests(&self.requests)
    }

    /// Reconcile the batch with the import store, see [`ImportStore::import`]
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if a record cannot be read or written
    pub fn import(&mut self, force: bool) -> StoreResult<ImportSummary> {
        let summary = self.store.import(&mut self.requests, force)?;
        info!(
            "Imported {} maps ({} written, {} resumed)",
            self.requests.len(),
            summary.written,
            summary.resumed
        );
        Ok(summary)
    }

    fn has_status(&self, status: Status) -> bool {
        self.requests.iter().any(|request| request.status == status)
    }

    fn persist(&self, index: usize) {
        if let Err(e) = self.store.save(&self.requests[index]) {
            error!("Error saving map file: {}", e);
        }
    }

    /// Fetch the service's view of one request, apply and persist it
    async fn sync_status(&mut self, index: usize) -> Option<Status> {
        match self.api.fetch_status(&self.requests[index]).await {
            Ok(report) => {
                self.requests[index].report_status(report.status);
                self.persist(index);
                Some(report.status)
            }
            Err(e) => {
                error!(seed = %self.requests[index].seed, "Error syncing status: {}", e);
                None
            }
        }
    }

    /// How many submissions this tick may make, `None` when it must idle
    async fn submission_budget(&self) -> Option<usize> {
        let quota = match self.api.fetch_quota().await {
            Ok(quota) => quota,
            Err(e) => {
                warn!("Error getting limits: {}", e);
                return None;
            }
        };

        if !quota.can_generate() {
            debug!(
                "Quota reached: concurrent {}/{}, monthly {}/{}",
                quota.concurrent_current,
                quota.concurrent_allowed,
                quota.monthly_current,
                quota.monthly_allowed
            );
            return None;
        }

        let per_tick = self.config.submissions_per_tick.max(1);
        if per_tick == 1 {
            Some(1)
        } else {
            Some(per_tick.min(quota.headroom() as usize).max(1))
        }
    }

    async fn pause(duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    /// Run one tick and report what it did
    pub async fn tick_detailed(&mut self) -> TickOutcome {
        if let Err(e) = self.credentials.validate() {
            error!("Error validating authentication: {}", e);
            return TickOutcome::AuthInvalid;
        }

        if !(self.has_status(Status::Pending) || self.has_status(Status::Generating)) {
            info!("All maps are complete");
            return TickOutcome::AllResolved;
        }

        // Decisions below use the statuses as they were when the tick began
        let initial: Vec<Status> = self.requests.iter().map(|r| r.status).collect();
        let now = Utc::now();

        for (index, status) in initial.iter().enumerate() {
            match status {
                Status::Complete
                    if self.requests[index].should_sync_at(now, self.config.freshness_window) =>
                {
                    if self.sync_status(index).await == Some(Status::NotFound) {
                        info!(seed = %self.requests[index].seed, "Map no longer exists, resubmitting");
                        self.requests[index].report_status(Status::Pending);
                        self.persist(index);
                    }
                }
                Status::Generating => {
                    self.sync_status(index).await;
                }
                _ => {}
            }
        }

        let budget = if self.has_status(Status::Pending) {
            self.submission_budget().await
        } else {
            None
        };

        let Some(budget) = budget else {
            Self::pause(self.config.idle_backoff).await;
            return TickOutcome::Idle;
        };

        let pending: Vec<usize> = self
            .requests
            .iter()
            .enumerate()
            .filter(|(_, request)| request.status == Status::Pending)
            .map(|(index, _)| index)
            .take(budget)
            .collect();

        for &index in &pending {
            let request = &mut self.requests[index];
            let result = if request.is_custom() {
                self.api.submit_custom(request).await
            } else {
                self.api.submit_procedural(request).await
            };

            if let Err(e) = result {
                warn!(seed = %self.requests[index].seed, "Submission failed: {}", e);
            }
            self.persist(index);
        }

        Self::pause(self.config.submit_pacing).await;
        TickOutcome::Submitted(pending.len())
    }

    /// Run one tick; `true` while more work remains
    pub async fn tick(&mut self) -> bool {
        self.tick_detailed().await.should_continue()
    }

    /// Tick until the loop terminates, reporting after each tick
    pub async fn run_with<F>(&mut self, mut on_tick: F) -> StatusCounts
    where
        F: FnMut(TickOutcome, &StatusCounts),
    {
        loop {
            let outcome = self.tick_detailed().await;
            let counts = self.counts();
            on_tick(outcome, &counts);

            if !outcome.should_continue() {
                return counts;
            }
        }
    }

    /// Tick until the loop terminates
    pub async fn run(&mut self) -> StatusCounts {
        self.run_with(|_, _| {}).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::{FakeMapsApi, QuotaSnapshot, StatusReport};
    use crate::app::models::RequestKind;
    use crate::auth::Tier;
    use tempfile::TempDir;

    fn generator(fake: &FakeMapsApi, dir: &TempDir, config: GeneratorConfig) -> Generator {
        Generator::new(
            config,
            Credentials::new("key", Tier::Premium),
            Box::new(fake.clone()),
            ImportStore::new(dir.path()),
        )
    }

    fn full_quota() -> QuotaSnapshot {
        QuotaSnapshot {
            concurrent_current: 2,
            concurrent_allowed: 2,
            monthly_current: 0,
            monthly_allowed: 800,
        }
    }

    #[tokio::test]
    async fn test_invalid_auth_terminates() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMapsApi::new();
        let mut generator = Generator::new(
            GeneratorConfig::without_delays(),
            Credentials::default(),
            Box::new(fake.clone()),
            ImportStore::new(dir.path()),
        );
        generator.add_request(MapRequest::new("1", 4000, "", false));

        assert_eq!(generator.tick_detailed().await, TickOutcome::AuthInvalid);
        assert!(fake.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_nothing_active_terminates() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMapsApi::new();
        let mut generator = generator(&fake, &dir, GeneratorConfig::without_delays());
        let mut done = MapRequest::new("1", 4000, "", false);
        done.status = Status::Forbidden;
        generator.add_request(done);

        assert!(!generator.tick().await);
        assert_eq!(fake.quota_calls(), 0);
    }

    #[tokio::test]
    async fn test_submits_one_per_tick_in_order() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMapsApi::new();
        let mut generator = generator(&fake, &dir, GeneratorConfig::without_delays());
        generator.set_requests(vec![
            MapRequest::new("1", 4000, "", false),
            MapRequest::new("2", 4000, "", false),
        ]);

        assert_eq!(generator.tick_detailed().await, TickOutcome::Submitted(1));
        assert_eq!(fake.submitted(), vec!["1_4000.json".to_string()]);
        assert_eq!(generator.requests()[0].status, Status::Generating);
        assert_eq!(generator.requests()[1].status, Status::Pending);

        let stored = generator.store().load("1_4000.json").unwrap().unwrap();
        assert_eq!(stored.status, Status::Generating);
        assert_eq!(stored.map_id, "fake-1");

        assert_eq!(generator.tick_detailed().await, TickOutcome::Submitted(1));
        assert_eq!(fake.submitted().len(), 2);
    }

    #[tokio::test]
    async fn test_submission_endpoint_follows_saved_config() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMapsApi::new();
        let mut generator = generator(&fake, &dir, GeneratorConfig::without_delays());
        generator.set_requests(vec![
            MapRequest::new("1", 4000, "islands", false),
            MapRequest::new("2", 4000, "", true),
        ]);

        generator.tick_detailed().await;
        generator.tick_detailed().await;

        assert_eq!(
            fake.submissions(),
            vec![
                ("1_4000_islands.json".to_string(), RequestKind::Custom),
                ("2_4000_staging.json".to_string(), RequestKind::Procedural),
            ]
        );
    }

    #[tokio::test]
    async fn test_quota_reached_idles() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMapsApi::new();
        fake.set_quota(full_quota());
        let mut generator = generator(&fake, &dir, GeneratorConfig::without_delays());
        generator.add_request(MapRequest::new("1", 4000, "", false));

        assert_eq!(generator.tick_detailed().await, TickOutcome::Idle);
        assert!(fake.submitted().is_empty());

        fake.set_quota(QuotaSnapshot {
            concurrent_current: 0,
            monthly_current: 800,
            ..full_quota()
        });
        assert!(generator.tick().await);
        assert!(fake.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_quota_failure_idles() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMapsApi::new();
        fake.reject_quota();
        let mut generator = generator(&fake, &dir, GeneratorConfig::without_delays());
        generator.add_request(MapRequest::new("1", 4000, "", false));

        assert_eq!(generator.tick_detailed().await, TickOutcome::Idle);
    }

    #[tokio::test]
    async fn test_generating_only_idles_without_quota_check() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMapsApi::new();
        let mut generator = generator(&fake, &dir, GeneratorConfig::without_delays());
        let mut request = MapRequest::new("1", 4000, "", false);
        request.status = Status::Generating;
        generator.add_request(request);

        assert_eq!(generator.tick_detailed().await, TickOutcome::Idle);
        assert_eq!(fake.status_lookups(), vec!["1_4000.json".to_string()]);
        assert_eq!(fake.quota_calls(), 0);
    }

    #[tokio::test]
    async fn test_status_failure_is_skipped() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMapsApi::new();
        let mut generator = generator(&fake, &dir, GeneratorConfig::without_delays());

        let mut stuck = MapRequest::new("1", 4000, "", false);
        stuck.status = Status::Generating;
        fake.fail_status(&stuck, 500);
        generator.set_requests(vec![stuck, MapRequest::new("2", 4000, "", false)]);

        assert_eq!(generator.tick_detailed().await, TickOutcome::Submitted(1));
        assert_eq!(generator.requests()[0].status, Status::Generating);
        assert_eq!(generator.requests()[1].status, Status::Generating);
    }

    #[tokio::test]
    async fn test_stale_complete_not_found_is_resubmitted() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMapsApi::new();
        let mut generator = generator(&fake, &dir, GeneratorConfig::without_delays());

        let mut lost = MapRequest::new("1", 4000, "", false);
        lost.status = Status::Complete;
        fake.set_status(&lost, StatusReport::bare(Status::NotFound));

        let mut active = MapRequest::new("2", 4000, "", false);
        active.status = Status::Generating;
        generator.set_requests(vec![lost, active]);

        assert_eq!(generator.tick_detailed().await, TickOutcome::Submitted(1));
        // Demoted to pending, then submitted again within the same tick
        assert_eq!(fake.submitted(), vec!["1_4000.json".to_string()]);
        assert_eq!(generator.requests()[0].status, Status::Generating);
        // The demoted request was looked up once, not again as generating
        let lookups = fake.status_lookups();
        assert_eq!(lookups.iter().filter(|key| *key == "1_4000.json").count(), 1);
    }

    #[tokio::test]
    async fn test_fresh_complete_is_not_resynced() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMapsApi::new();
        let mut generator = generator(&fake, &dir, GeneratorConfig::without_delays());

        let mut done = MapRequest::new("1", 4000, "", false);
        done.report_status(Status::Complete);
        let mut active = MapRequest::new("2", 4000, "", false);
        active.status = Status::Generating;
        generator.set_requests(vec![done, active]);

        generator.tick_detailed().await;
        assert_eq!(fake.status_lookups(), vec!["2_4000.json".to_string()]);
    }

    #[tokio::test]
    async fn test_conflict_counts_as_generating() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMapsApi::new();
        fake.push_submission_codes([409]);
        let mut generator = generator(&fake, &dir, GeneratorConfig::without_delays());
        generator.add_request(MapRequest::new("1", 4000, "", false));

        assert_eq!(generator.tick_detailed().await, TickOutcome::Submitted(1));
        assert_eq!(generator.requests()[0].status, Status::Generating);
    }

    #[tokio::test]
    async fn test_batched_submissions_capped_by_headroom() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMapsApi::new();
        fake.set_quota(QuotaSnapshot {
            concurrent_current: 1,
            concurrent_allowed: 3,
            monthly_current: 0,
            monthly_allowed: 800,
        });
        let config = GeneratorConfig {
            submissions_per_tick: 5,
            ..GeneratorConfig::without_delays()
        };
        let mut generator = generator(&fake, &dir, config);
        generator.set_requests(
            (1..=4)
                .map(|seed| MapRequest::new(seed.to_string(), 4000, "", false))
                .collect(),
        );

        assert_eq!(generator.tick_detailed().await, TickOutcome::Submitted(2));
        assert_eq!(generator.counts().pending, 2);
    }

    #[tokio::test]
    async fn test_run_until_resolved() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMapsApi::new();
        let mut generator = generator(&fake, &dir, GeneratorConfig::without_delays());
        let requests = vec![
            MapRequest::new("1", 4000, "", false),
            MapRequest::new("2", 3500, "cfg", false),
        ];
        for request in &requests {
            fake.set_complete(request, Default::default());
        }
        generator.set_requests(requests);

        let mut ticks = 0;
        let counts = generator.run_with(|_, _| ticks += 1).await;

        assert_eq!(counts.complete, 2);
        assert_eq!(counts.total(), 2);
        assert!(ticks >= 3);
    }

    #[tokio::test]
    async fn test_rejections_are_terminal() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMapsApi::new();
        fake.push_submission_codes([400, 403]);
        let mut generator = generator(&fake, &dir, GeneratorConfig::without_delays());
        generator.set_requests(vec![
            MapRequest::new("1", 4000, "", true),
            MapRequest::new("2", 4000, "", false),
        ]);

        let counts = generator.run().await;
        assert_eq!(counts.rejected, 2);
        assert_eq!(generator.requests()[0].status, Status::BadRequest);
        assert_eq!(generator.requests()[1].status, Status::Forbidden);
    }

    #[tokio::test]
    async fn test_import_resumes_progress() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMapsApi::new();

        let mut previous = MapRequest::new("1", 4000, "", false);
        previous.report_status(Status::Complete);
        ImportStore::new(dir.path()).save(&previous).unwrap();

        let mut generator = generator(&fake, &dir, GeneratorConfig::without_delays());
        generator.add_request(MapRequest::new("1", 4000, "", false));
        let summary = generator.import(false).unwrap();

        assert_eq!(summary.resumed, 1);
        assert!(!generator.tick().await);
        assert!(fake.submitted().is_empty());
    }
}

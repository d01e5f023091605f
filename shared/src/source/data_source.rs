use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::remote::QueryParams;
use super::state::{ApplyOutcome, LastGoodCache, SourceSnapshot, SourceState};
use super::strategy::AcquisitionStrategy;
use super::Strategy;
use crate::model::Route;

/// Uniform record-access surface over whichever strategy was selected.
///
/// The state lock is never held across the remote await: a generation is
/// issued first, the query runs unlocked, and the response is applied only
/// if it is still current.
pub struct DataSource {
    route: Route,
    strategy: Box<dyn AcquisitionStrategy>,
    state: RwLock<SourceState>,
    focused: AtomicBool,
}

impl DataSource {
    pub fn new(route: Route, strategy: Box<dyn AcquisitionStrategy>, last_good: LastGoodCache) -> Self {
        let state = SourceState::new(strategy.strategy(), last_good);
        Self {
            route,
            strategy,
            state: RwLock::new(state),
            focused: AtomicBool::new(true),
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy.strategy()
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn is_focused(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }

    /// Toggles the `enabled` flag handed to the remote query.
    pub fn set_focused(&self, focused: bool) {
        self.focused.store(focused, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> SourceSnapshot {
        self.state.read().await.snapshot()
    }

    /// Initial acquisition for this mount. Returns `None` when nothing was
    /// requested because the view is not focused.
    #[instrument(skip(self), fields(route = %self.route, strategy = %self.strategy()))]
    pub async fn load(&self) -> Option<ApplyOutcome> {
        self.acquire(false).await
    }

    /// Re-issues the query. Resolves immediately for synchronous strategies.
    #[instrument(skip(self), fields(route = %self.route, strategy = %self.strategy()))]
    pub async fn refetch(&self) -> Option<ApplyOutcome> {
        if self.strategy.is_synchronous() {
            debug!("refetch is a no-op for a synchronous strategy");
            return None;
        }
        self.acquire(true).await
    }

    /// Navigation re-mount: records and the last-good cache survive, the
    /// query is issued again.
    pub async fn remount(&self) -> Option<ApplyOutcome> {
        if self.strategy.is_synchronous() {
            return None;
        }
        self.acquire(true).await
    }

    /// Drops the session-owned last-good records.
    pub async fn teardown(&self) {
        self.state.write().await.clear_last_good();
    }

    async fn acquire(&self, refetch: bool) -> Option<ApplyOutcome> {
        let params = QueryParams {
            route: self.route.clone(),
            enabled: self.is_focused(),
        };
        if !params.enabled && !self.strategy.is_synchronous() {
            debug!("view not focused, query disabled");
            return None;
        }

        let generation = self.state.write().await.begin_request();
        debug!(generation = generation.get(), "acquisition started");

        let outcome = if refetch {
            self.strategy.refetch(&params).await
        } else {
            self.strategy.load(&params).await
        };

        let applied = self
            .state
            .write()
            .await
            .apply(generation, outcome, || tokio::time::Instant::now().into_std());
        debug!(generation = generation.get(), ?applied, "acquisition settled");
        Some(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawRecord;
    use crate::source::remote::{QueryError, RemoteQuery};
    use crate::source::snapshot::EmbeddedSnapshots;
    use crate::source::strategy::build_strategy;
    use crate::SourceError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn named(name: &str) -> RawRecord {
        RawRecord {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Replays scripted responses in call order, each after its own delay.
    #[derive(Default)]
    struct ScriptedRemote {
        script: Mutex<VecDeque<(Duration, Result<Vec<RawRecord>, QueryError>)>>,
        calls: Mutex<usize>,
    }

    impl ScriptedRemote {
        fn then(self, delay_ms: u64, result: Result<Vec<RawRecord>, QueryError>) -> Self {
            self.script
                .lock()
                .unwrap()
                .push_back((Duration::from_millis(delay_ms), result));
            self
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl RemoteQuery for ScriptedRemote {
        async fn query_records(&self, params: &QueryParams) -> Result<Vec<RawRecord>, QueryError> {
            assert!(params.enabled);
            *self.calls.lock().unwrap() += 1;
            let next = self.script.lock().unwrap().pop_front();
            let (delay, result) = next.unwrap_or((Duration::ZERO, Ok(Vec::new())));
            tokio::time::sleep(delay).await;
            result
        }
    }

    fn source(strategy: Strategy, remote: Arc<ScriptedRemote>, snapshots: &EmbeddedSnapshots) -> DataSource {
        let route = Route::new("brands");
        let strategy = build_strategy(strategy, &route, remote, snapshots);
        DataSource::new(
            route,
            strategy,
            LastGoodCache::new(Duration::from_secs(300), 3),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn slow_superseded_response_is_discarded() {
        let remote = Arc::new(
            ScriptedRemote::default()
                .then(500, Ok(vec![named("Stale")]))
                .then(10, Ok(vec![named("Fresh"), named("Fresher")])),
        );
        let source = source(Strategy::ApiOnly, remote.clone(), &EmbeddedSnapshots::new());

        let (first, second) = tokio::join!(source.load(), source.refetch());

        assert_eq!(second, Some(ApplyOutcome::Applied));
        assert_eq!(first, Some(ApplyOutcome::Discarded));
        let snapshot = source.snapshot().await;
        assert_eq!(snapshot.records.len(), 2);
        assert_eq!(snapshot.records[0].name.as_deref(), Some("Fresh"));
        assert!(!snapshot.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn loading_is_visible_while_query_is_pending() {
        let remote = Arc::new(ScriptedRemote::default().then(100, Ok(vec![named("Audi")])));
        let source = Arc::new(source(Strategy::ApiOnly, remote, &EmbeddedSnapshots::new()));

        let task = tokio::spawn({
            let source = Arc::clone(&source);
            async move { source.load().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(source.snapshot().await.is_loading);

        task.await.unwrap();
        assert!(!source.snapshot().await.is_loading);
    }

    #[tokio::test]
    async fn static_refetch_resolves_without_querying() {
        let remote = Arc::new(ScriptedRemote::default());
        let snapshots = EmbeddedSnapshots::new().with_route("brands", true, r#"[{"name":"Audi"}]"#);
        let source = source(Strategy::SsgOnly, remote.clone(), &snapshots);

        assert_eq!(source.load().await, Some(ApplyOutcome::Applied));
        assert_eq!(source.refetch().await, None);
        assert_eq!(remote.calls(), 0);
        assert_eq!(source.snapshot().await.records.len(), 1);
    }

    #[tokio::test]
    async fn empty_authoritative_snapshot_is_an_error_not_loading() {
        let snapshots = EmbeddedSnapshots::new().with_route("brands", true, "[]");
        let source = source(Strategy::SsgOnly, Arc::new(ScriptedRemote::default()), &snapshots);

        source.load().await;
        let snapshot = source.snapshot().await;
        assert!(!snapshot.is_loading);
        assert!(matches!(snapshot.error, Some(SourceError::SnapshotUnavailable { .. })));
    }

    #[tokio::test]
    async fn unfocused_view_never_queries() {
        let remote = Arc::new(ScriptedRemote::default().then(0, Ok(vec![named("Audi")])));
        let source = source(Strategy::MobileApi, remote.clone(), &EmbeddedSnapshots::new());

        source.set_focused(false);
        assert_eq!(source.load().await, None);
        assert_eq!(remote.calls(), 0);

        source.set_focused(true);
        assert_eq!(source.refetch().await, Some(ApplyOutcome::Applied));
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test]
    async fn remount_serves_last_good_on_empty_response() {
        let remote = Arc::new(
            ScriptedRemote::default()
                .then(0, Ok(vec![named("Audi"), named("BMW")]))
                .then(0, Ok(Vec::new())),
        );
        let source = source(Strategy::MobileApi, remote, &EmbeddedSnapshots::new());

        source.load().await;
        assert_eq!(source.remount().await, Some(ApplyOutcome::ServedLastGood));
        assert_eq!(source.snapshot().await.records.len(), 2);
    }

    #[tokio::test]
    async fn failed_refetch_surfaces_error_and_keeps_records() {
        let remote = Arc::new(
            ScriptedRemote::default()
                .then(0, Ok(vec![named("Audi")]))
                .then(0, Err(QueryError::Network { message: "offline".into() })),
        );
        let source = source(Strategy::ApiOnly, remote, &EmbeddedSnapshots::new());

        source.load().await;
        source.refetch().await;

        let snapshot = source.snapshot().await;
        assert_eq!(snapshot.records.len(), 1);
        assert!(snapshot.error.is_some_and(|e| e.is_retryable()));
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, RwLockWriteGuard};
use tracing::{debug, info, instrument};

use crate::config::CatalogConfig;
use crate::filter::FilterQuery;
use crate::group::OrderBy;
use crate::model::{Route, SessionId};
use crate::normalize::Normalizer;
use crate::paginate::PageMode;
use crate::pipeline::{PipelineState, ReadModel};
use crate::platform::PlatformFacts;
use crate::preload::{ImageFetcher, PreloadOrchestrator};
use crate::source::{
    build_strategy, select_strategy, DataSource, LastGoodCache, RemoteQuery, SnapshotProvider,
    SourceSnapshot, Strategy,
};
use crate::ConfigError;

/// External collaborators a session consumes.
#[derive(Clone)]
pub struct Collaborators {
    pub remote: Arc<dyn RemoteQuery>,
    pub snapshots: Arc<dyn SnapshotProvider>,
    pub platform: Arc<dyn PlatformFacts>,
    pub images: Arc<dyn ImageFetcher>,
}

/// One mounted catalog view.
///
/// Owns the data source, the pipeline (current page included) and the
/// preload orchestrator. Nothing here is shared with other sessions; all of
/// it is released by [`CatalogSession::teardown`].
pub struct CatalogSession {
    id: SessionId,
    config: CatalogConfig,
    source: DataSource,
    pipeline: RwLock<PipelineState>,
    preload: Mutex<PreloadOrchestrator>,
    torn_down: AtomicBool,
}

impl CatalogSession {
    pub fn new(
        config: CatalogConfig,
        collaborators: Collaborators,
        route: Route,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let normalizer = Normalizer::from_config(&config)?;

        let Collaborators {
            remote,
            snapshots,
            platform,
            images,
        } = collaborators;

        let strategy = select_strategy(platform.as_ref(), snapshots.as_ref(), &route);
        let acquisition = build_strategy(strategy, &route, remote, snapshots.as_ref());
        let mode = PageMode::for_platform(platform.is_constrained_platform(), config.page_size());

        let id = SessionId::generate();
        info!(session = %id, %route, %strategy, ?mode, "catalog session mounted");

        Ok(Self {
            id,
            source: DataSource::new(route, acquisition, LastGoodCache::from_config(&config)),
            pipeline: RwLock::new(PipelineState::new(normalizer, mode)),
            preload: Mutex::new(PreloadOrchestrator::new(images, &config)),
            torn_down: AtomicBool::new(false),
            config,
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn strategy(&self) -> Strategy {
        self.source.strategy()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Initial acquisition, then the first read model.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn start(&self) -> ReadModel {
        self.source.load().await;
        self.read_model().await
    }

    /// Current read model. Schedules image preloads for whatever became
    /// visible.
    pub async fn read_model(&self) -> ReadModel {
        let model = {
            let (mut pipeline, source) = self.synced().await;
            pipeline.read_model(&source)
        };
        if !self.is_torn_down() {
            self.preload.lock().await.schedule(model.visible_items());
        }
        model
    }

    pub async fn set_query(&self, query: FilterQuery) -> ReadModel {
        if self.pipeline.write().await.set_query(query) {
            debug!(session = %self.id, "filter query changed, paging reset");
        }
        self.read_model().await
    }

    pub async fn set_order(&self, order: OrderBy, grouped: bool) -> ReadModel {
        if self.pipeline.write().await.set_order(order, grouped) {
            debug!(session = %self.id, ?order, grouped, "ordering changed, paging reset");
        }
        self.read_model().await
    }

    /// Moves the page boundary after the pacing delay. Returns false when
    /// the request was dropped: nothing more to show, unbounded mode, an
    /// advance already in flight, or a reset while waiting.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn advance(&self) -> bool {
        let ticket = {
            let (mut pipeline, _) = self.synced().await;
            pipeline.begin_advance()
        };
        let Some(ticket) = ticket else {
            debug!("advance dropped");
            return false;
        };

        tokio::time::sleep(self.config.advance_delay()).await;
        self.pipeline.write().await.finish_advance(ticket)
    }

    pub async fn reset(&self) {
        self.pipeline.write().await.reset();
    }

    pub async fn refetch(&self) -> ReadModel {
        self.source.refetch().await;
        self.read_model().await
    }

    /// Navigation came back to this view while the session stayed alive.
    pub async fn remount(&self) -> ReadModel {
        self.source.remount().await;
        self.read_model().await
    }

    pub fn set_focused(&self, focused: bool) {
        self.source.set_focused(focused);
    }

    /// Cancels pending preloads and drops every session-owned cache.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.preload.lock().await.teardown().await;
        self.source.teardown().await;
        info!("catalog session torn down");
    }

    /// Pipeline guard brought up to date with the latest source snapshot.
    async fn synced(&self) -> (RwLockWriteGuard<'_, PipelineState>, SourceSnapshot) {
        let source = self.source.snapshot().await;
        let mut pipeline = self.pipeline.write().await;
        pipeline
            .refresh_cooperative(source.revision, &source.records)
            .await;
        (pipeline, source)
    }
}

//! Crux bridge: the same pipeline driven by shell events instead of an
//! async runtime. Remote queries go out through the `Http` capability and
//! come back as [`Event::RecordsFetched`], tagged with their mount and generation.

use std::time::Instant;

use lru::LruCache;
use tracing::{debug, info, warn};
use url::Url;

use crate::capabilities::Capabilities;
use crate::config::CatalogConfig;
use crate::event::{Event, MountContext};
use crate::model::{RawRecord, Route};
use crate::normalize::Normalizer;
use crate::paginate::PageMode;
use crate::pipeline::{PipelineState, ReadModel};
use crate::platform::PlatformFacts;
use crate::preload::{PreloadPlan, PreloadTiers};
use crate::source::{
    read_synchronously, select_strategy, Acquisition, LastGoodCache, QueryError, SourceState,
};
use crate::ConfigError;

/// Per-mount state owned by the Crux model.
pub struct BridgeSession {
    /// Tags every query so responses addressed to an earlier mount are
    /// recognizable after the per-mount generation counter restarts.
    mount: u64,
    route: Route,
    records_url: Url,
    synchronous: bool,
    focused: bool,
    advance_delay_ms: u64,
    source: SourceState,
    pipeline: PipelineState,
    tiers: PreloadTiers,
    seen_images: LruCache<String, ()>,
}

impl BridgeSession {
    fn mount(mount: u64, ctx: MountContext) -> Result<Self, ConfigError> {
        let MountContext {
            route,
            platform,
            snapshot,
            config,
        } = ctx;
        config.validate()?;

        let records_url = records_url(&config, &route)?;
        let strategy = select_strategy(&platform, &snapshot, &route);
        let mode = PageMode::for_platform(platform.is_constrained_platform(), config.page_size());

        let mut source = SourceState::new(strategy, LastGoodCache::from_config(&config));
        let ready = read_synchronously(strategy, &snapshot, &route);
        let synchronous = ready.is_some();
        if let Some(acquisition) = ready {
            let generation = source.begin_request();
            source.apply(generation, acquisition, Instant::now);
        }

        info!(mount, %route, %strategy, ?mode, "catalog view mounted");
        Ok(Self {
            mount,
            route,
            records_url,
            synchronous,
            focused: true,
            advance_delay_ms: config.advance_delay_ms,
            source,
            pipeline: PipelineState::new(Normalizer::from_config(&config)?, mode),
            tiers: PreloadTiers::from_config(&config),
            seen_images: LruCache::new(config.image_cache_capacity()),
        })
    }

    fn request_records(&mut self, caps: &Capabilities) {
        if self.synchronous {
            return;
        }
        if !self.focused {
            debug!(route = %self.route, "view not focused, query disabled");
            return;
        }
        let mount = self.mount;
        let generation = self.source.begin_request();
        debug!(route = %self.route, mount, generation = generation.get(), "requesting records");

        caps.http
            .get(self.records_url.as_str())
            .expect_json::<Vec<RawRecord>>()
            .send(move |result| Event::RecordsFetched {
                mount,
                generation,
                result: records_from(result),
            });
    }

    /// Recomputes the read model and hands newly visible images to the shell.
    fn refresh(&mut self, caps: &Capabilities) -> ReadModel {
        self.pipeline
            .refresh(self.source.revision(), self.source.records());
        let view = self.pipeline.read_model(&self.source.snapshot());

        let plan = PreloadPlan::build(view.visible_items(), self.tiers)
            .without_seen(&mut self.seen_images);
        for (priority, urls) in plan.tiers() {
            caps.image_cache.preload(urls.to_vec(), priority);
        }
        view
    }
}

fn records_url(config: &CatalogConfig, route: &Route) -> Result<Url, ConfigError> {
    config
        .api_base()?
        .join(route.as_str().trim_start_matches('/'))
        .map_err(|e| ConfigError::InvalidUrl {
            field: "api_base_url",
            reason: e.to_string(),
        })
}

fn records_from(
    result: crux_http::Result<crux_http::Response<Vec<RawRecord>>>,
) -> Result<Vec<RawRecord>, QueryError> {
    let mut response = result.map_err(|e| QueryError::Network {
        message: e.to_string(),
    })?;
    let status = response.status();
    if !status.is_success() {
        return Err(QueryError::Status {
            status: u16::from(status),
        });
    }
    response.take_body().ok_or(QueryError::EmptyBody)
}

#[derive(Default)]
pub struct Model {
    session: Option<BridgeSession>,
    view: ReadModel,
    /// Mounts so far. Outlives every `BridgeSession`.
    mounts: u64,
}

impl Model {
    pub fn is_mounted(&self) -> bool {
        self.session.is_some()
    }
}

#[derive(Default)]
pub struct App;

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ReadModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(event = event.name(), "update");

        match event {
            Event::Mounted(ctx) => {
                model.mounts += 1;
                model.session = match BridgeSession::mount(model.mounts, *ctx) {
                    Ok(mut session) => {
                        session.request_records(caps);
                        Some(session)
                    }
                    Err(e) => {
                        warn!(error = %e, "rejected mount configuration");
                        None
                    }
                };
            }
            Event::TornDown => {
                if model.session.take().is_some() {
                    caps.image_cache.clear();
                    info!("catalog view torn down");
                }
            }
            event => {
                let Some(session) = model.session.as_mut() else {
                    debug!(event = event.name(), "ignored, no mounted catalog view");
                    return;
                };
                handle(session, event, caps);
            }
        }

        model.view = model
            .session
            .as_mut()
            .map(|session| session.refresh(caps))
            .unwrap_or_default();
        caps.render.render();
    }

    fn view(&self, model: &Model) -> ReadModel {
        model.view.clone()
    }
}

fn handle(session: &mut BridgeSession, event: Event, caps: &Capabilities) {
    match event {
        Event::Remounted | Event::RefetchRequested => session.request_records(caps),
        Event::FocusChanged { focused } => {
            session.focused = focused;
            let never_loaded = session.source.revision() == 0 && !session.source.is_loading();
            if focused && never_loaded {
                session.request_records(caps);
            }
        }
        Event::RecordsFetched {
            mount,
            generation,
            result,
        } => {
            if mount != session.mount {
                warn!(
                    mount,
                    current = session.mount,
                    "discarded response addressed to an earlier mount"
                );
                return;
            }
            session
                .source
                .apply(generation, Acquisition::Remote(result), Instant::now);
        }
        Event::QueryChanged(query) => {
            session.pipeline.set_query(query);
        }
        Event::OrderChanged { order, grouped } => {
            session.pipeline.set_order(order, grouped);
        }
        Event::ResetRequested => session.pipeline.reset(),
        Event::LoadMoreRequested => {
            session
                .pipeline
                .refresh(session.source.revision(), session.source.records());
            if let Some(ticket) = session.pipeline.begin_advance() {
                caps.pacing
                    .wait_then(session.advance_delay_ms, Event::LoadMoreSettled(ticket));
            }
        }
        Event::LoadMoreSettled(ticket) => {
            if !session.pipeline.finish_advance(ticket) {
                debug!("advance superseded by a reset");
            }
        }
        Event::Mounted(_) | Event::TornDown => {}
    }
}

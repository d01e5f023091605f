use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::config::CatalogConfig;
use crate::model::CatalogItem;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreloadPriority {
    Critical,
    High,
    Lazy,
}

/// Best-effort failure. Never reaches the read model: the image widget
/// simply fetches on demand.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreloadError {
    #[error("image fetch failed: {0}")]
    Fetch(String),
}

/// The image fetch/cache collaborator.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn preload(&self, urls: &[String], priority: PreloadPriority) -> Result<(), PreloadError>;
    async fn clear_cache(&self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreloadTiers {
    pub critical: usize,
    pub high: usize,
}

impl PreloadTiers {
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            critical: config.critical_images,
            high: config.high_images,
        }
    }
}

/// Image URLs of a visible sequence, partitioned by position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreloadPlan {
    pub critical: Vec<String>,
    pub high: Vec<String>,
    pub lazy: Vec<String>,
}

impl PreloadPlan {
    /// Items without an image are skipped without consuming a tier slot;
    /// repeated URLs keep their first (highest) tier.
    pub fn build<'a>(visible: impl IntoIterator<Item = &'a CatalogItem>, tiers: PreloadTiers) -> Self {
        let mut seen = HashSet::new();
        let mut plan = Self::default();
        let urls = visible
            .into_iter()
            .filter(|item| item.has_image())
            .map(|item| item.images.primary.clone())
            .filter(|url| seen.insert(url.clone()));

        for (position, url) in urls.enumerate() {
            if position < tiers.critical {
                plan.critical.push(url);
            } else if position < tiers.critical + tiers.high {
                plan.high.push(url);
            } else {
                plan.lazy.push(url);
            }
        }
        plan
    }

    /// Drops URLs already handed to the fetcher this session.
    #[must_use]
    pub fn without_seen(mut self, seen: &mut LruCache<String, ()>) -> Self {
        for tier in [&mut self.critical, &mut self.high, &mut self.lazy] {
            tier.retain(|url| seen.put(url.clone(), ()).is_none());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.critical.len() + self.high.len() + self.lazy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn tiers(&self) -> [(PreloadPriority, &[String]); 3] {
        [
            (PreloadPriority::Critical, self.critical.as_slice()),
            (PreloadPriority::High, self.high.as_slice()),
            (PreloadPriority::Lazy, self.lazy.as_slice()),
        ]
    }
}

/// Schedules preloads for the visible set and owns every task it spawns,
/// so [`PreloadOrchestrator::teardown`] can cancel all of them.
pub struct PreloadOrchestrator {
    fetcher: Arc<dyn ImageFetcher>,
    tiers: PreloadTiers,
    seen: LruCache<String, ()>,
    tasks: Vec<JoinHandle<()>>,
    permits: Arc<Semaphore>,
    deferred_delay: Duration,
}

impl PreloadOrchestrator {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, config: &CatalogConfig) -> Self {
        Self {
            fetcher,
            tiers: PreloadTiers::from_config(config),
            seen: LruCache::new(config.image_cache_capacity()),
            tasks: Vec::new(),
            permits: Arc::new(Semaphore::new(config.max_concurrent_preloads.max(1))),
            deferred_delay: config.deferred_preload_delay(),
        }
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }

    /// Critical URLs are requested right away; high and lazy follow after
    /// the deferred delay. Returns what was actually scheduled.
    #[instrument(skip_all)]
    pub fn schedule<'a>(&mut self, visible: impl IntoIterator<Item = &'a CatalogItem>) -> PreloadPlan {
        self.tasks.retain(|t| !t.is_finished());

        let plan = PreloadPlan::build(visible, self.tiers).without_seen(&mut self.seen);
        if plan.is_empty() {
            return plan;
        }
        debug!(
            critical = plan.critical.len(),
            high = plan.high.len(),
            lazy = plan.lazy.len(),
            "scheduling image preloads"
        );

        if !plan.critical.is_empty() {
            let fetcher = Arc::clone(&self.fetcher);
            let urls = plan.critical.clone();
            self.tasks.push(tokio::spawn(async move {
                fetch(fetcher.as_ref(), &urls, PreloadPriority::Critical).await;
            }));
        }

        if !plan.high.is_empty() || !plan.lazy.is_empty() {
            let fetcher = Arc::clone(&self.fetcher);
            let permits = Arc::clone(&self.permits);
            let delay = self.deferred_delay;
            let deferred = [
                (PreloadPriority::High, plan.high.clone()),
                (PreloadPriority::Lazy, plan.lazy.clone()),
            ];
            self.tasks.push(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                for (priority, urls) in deferred {
                    if urls.is_empty() {
                        continue;
                    }
                    let Ok(_permit) = permits.acquire().await else {
                        return;
                    };
                    fetch(fetcher.as_ref(), &urls, priority).await;
                }
            }));
        }

        plan
    }

    /// Cancels everything in flight or queued and clears the memory cache.
    #[instrument(skip_all, fields(tasks = self.tasks.len()))]
    pub async fn teardown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.seen.clear();
        self.fetcher.clear_cache().await;
    }
}

impl Drop for PreloadOrchestrator {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn fetch(fetcher: &dyn ImageFetcher, urls: &[String], priority: PreloadPriority) {
    if let Err(e) = fetcher.preload(urls, priority).await {
        warn!(?priority, urls = urls.len(), error = %e, "image preload failed");
    }
}

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::preload::PreloadPriority;

/// Fire-and-forget requests to the shell's image cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageCacheOperation {
    Preload {
        urls: Vec<String>,
        priority: PreloadPriority,
    },
    Clear,
}

impl Operation for ImageCacheOperation {
    type Output = ();
}

pub struct ImageCache<Ev> {
    context: CapabilityContext<ImageCacheOperation, Ev>,
}

impl<Ev> Capability<Ev> for ImageCache<Ev> {
    type Operation = ImageCacheOperation;
    type MappedSelf<MappedEv> = ImageCache<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        ImageCache::new(self.context.map_event(f))
    }
}

impl<Ev> ImageCache<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<ImageCacheOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn preload(&self, urls: Vec<String>, priority: PreloadPriority) {
        if urls.is_empty() {
            return;
        }
        self.notify(ImageCacheOperation::Preload { urls, priority });
    }

    /// Cancels queued preloads and drops the memory cache.
    pub fn clear(&self) {
        self.notify(ImageCacheOperation::Clear);
    }

    fn notify(&self, operation: ImageCacheOperation) {
        let context = self.context.clone();
        self.context.spawn(async move {
            context.notify_shell(operation).await;
        });
    }
}

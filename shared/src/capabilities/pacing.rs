use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

/// Asks the shell to wait `millis` before answering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingOperation {
    pub millis: u64,
}

impl Operation for PacingOperation {
    type Output = ();
}

/// Shell-side delay used to pace page advances.
pub struct Pacing<Ev> {
    context: CapabilityContext<PacingOperation, Ev>,
}

impl<Ev> Capability<Ev> for Pacing<Ev> {
    type Operation = PacingOperation;
    type MappedSelf<MappedEv> = Pacing<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Pacing::new(self.context.map_event(f))
    }
}

impl<Ev> Pacing<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<PacingOperation, Ev>) -> Self {
        Self { context }
    }

    /// Sends `event` back to the app once the shell reports `millis` elapsed.
    pub fn wait_then(&self, millis: u64, event: Ev)
    where
        Ev: Send,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            context.request_from_shell(PacingOperation { millis }).await;
            context.update_app(event);
        });
    }
}

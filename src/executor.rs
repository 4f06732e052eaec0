use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use crate::client::GenerationClient;
use crate::config::LoopConfig;
use crate::events::LoopEvent;
use crate::params::GenerationParameters;
use crate::state::{LoopState, Resolution};
use crate::types::PendingRequest;

/// Everything guarded by the loop's single lock.
#[derive(Debug, Default)]
pub(crate) struct Inner {
    pub(crate) state: LoopState,
    pub(crate) parameters: Option<watch::Receiver<GenerationParameters>>,
    pub(crate) task: Option<AbortHandle>,
}

/// State shared between the [`GenerationLoop`](crate::GenerationLoop) handle
/// and its running chain task.
pub(crate) struct Shared<C> {
    pub(crate) client: C,
    pub(crate) config: LoopConfig,
    pub(crate) inner: Mutex<Inner>,
    pub(crate) events: broadcast::Sender<LoopEvent>,
}

impl<C> Shared<C> {
    pub(crate) fn emit(&self, event: LoopEvent) {
        debug!(event = event.name(), epoch = event.epoch(), "loop event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Spawn the request chain for one run, starting with `first`.
pub(crate) fn spawn_chain<C>(
    runtime: &Handle,
    shared: Arc<Shared<C>>,
    first: PendingRequest,
    parameters: watch::Receiver<GenerationParameters>,
) -> AbortHandle
where
    C: GenerationClient,
{
    runtime
        .spawn(run_chain(shared, first, parameters))
        .abort_handle()
}

/// Issue requests one at a time until the run is stopped, superseded or fails.
///
/// The next request is only produced by resolving the previous one, and the
/// epoch is re-checked right before every issue so a stop that lands while
/// the chain is between requests (or cooling down) is honored.
async fn run_chain<C>(
    shared: Arc<Shared<C>>,
    mut request: PendingRequest,
    parameters: watch::Receiver<GenerationParameters>,
) where
    C: GenerationClient,
{
    loop {
        {
            let inner = match shared.inner.lock() {
                Ok(inner) => inner,
                Err(e) => {
                    error!("Loop state mutex poisoned: {}", e);
                    return;
                }
            };
            if !inner.state.is_current(request.epoch) {
                debug!(epoch = request.epoch, "run superseded before issue");
                return;
            }
        }

        // Read fresh so parameter changes apply to the very next request.
        let params = parameters.borrow().clone();

        shared.emit(LoopEvent::RequestIssued {
            epoch: request.epoch,
            index: request.index,
            prompt: request.prompt.clone(),
        });
        debug!(
            epoch = request.epoch,
            index = request.index,
            prompt = %request.prompt,
            "issuing generation request"
        );

        let outcome = shared.client.generate(&request.prompt, &params).await;

        let resolution = match shared.inner.lock() {
            Ok(mut inner) => inner.state.resolve(&request, outcome),
            Err(e) => {
                error!("Loop state mutex poisoned: {}", e);
                return;
            }
        };

        match resolution {
            Resolution::Appended { index, image, next } => {
                info!(epoch = request.epoch, index, src = %image.src, "image generated");
                shared.emit(LoopEvent::ImageGenerated {
                    epoch: request.epoch,
                    index,
                    image,
                });
                request = next;

                if !shared.config.cooldown.is_zero() {
                    tokio::time::sleep(shared.config.cooldown).await;
                }
            }
            Resolution::Failed { index, error } => {
                warn!(epoch = request.epoch, index, %error, "generation failed, loop stopped");
                shared.emit(LoopEvent::Failed {
                    epoch: request.epoch,
                    index,
                    error,
                });
                return;
            }
            Resolution::Stale => {
                debug!(
                    epoch = request.epoch,
                    index = request.index,
                    "discarding result from stopped run"
                );
                shared.emit(LoopEvent::ResultDiscarded {
                    epoch: request.epoch,
                    index: request.index,
                });
                return;
            }
        }
    }
}

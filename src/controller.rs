use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::client::GenerationClient;
use crate::config::LoopConfig;
use crate::error::{LoopError, Result};
use crate::events::LoopEvent;
use crate::executor::{self, Inner, Shared};
use crate::params::GenerationParameters;
use crate::prompt::ExpandedPrompt;
use crate::state::Reconfigured;
use crate::types::{GeneratedImage, LoopSnapshot, LoopStatus};

/// Sequential, cancellable generation loop over an expanded prompt.
///
/// While running, the loop requests one image at a time, cycling through the
/// expansion's concrete prompts, and appends each result in issue order.
/// A response that arrives after the run was stopped (explicitly, or by
/// changing the prompt) is discarded and schedules nothing further.
///
/// The handle is cheap to clone; all clones drive the same loop. Methods that
/// start requests must be called from within a tokio runtime.
///
/// # Example
///
/// ```no_run
/// use diffusion_loop::*;
/// use tokio::sync::watch;
///
/// # async fn example() -> diffusion_loop::Result<()> {
/// let generation = GenerationLoop::new(HttpGenerationClient::new("http://127.0.0.1:8000"));
/// let mut events = generation.subscribe();
/// let (params_tx, params_rx) = watch::channel(GenerationParameters::default());
///
/// generation.start(expand(&parse("a (red | blue) hat")), params_rx)?;
///
/// // Takes effect on the next request.
/// params_tx.send_modify(|p| p.fix_faces = Some(true));
///
/// while let Ok(event) = events.recv().await {
///     if let LoopEvent::ImageGenerated { image, .. } = event {
///         println!("{}", image.src);
///         generation.stop()?;
///         break;
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct GenerationLoop<C: GenerationClient> {
    shared: Arc<Shared<C>>,
}

impl<C: GenerationClient> Clone for GenerationLoop<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: GenerationClient> std::fmt::Debug for GenerationLoop<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot().ok();
        f.debug_struct("GenerationLoop")
            .field("status", &snapshot.as_ref().map(|s| s.status))
            .field("epoch", &snapshot.as_ref().map(|s| s.epoch))
            .field("results", &snapshot.as_ref().map(|s| s.results.len()))
            .field("config", &self.shared.config)
            .finish()
    }
}

impl<C: GenerationClient> GenerationLoop<C> {
    /// Create an idle loop with the default [`LoopConfig`].
    pub fn new(client: C) -> Self {
        Self::with_config(client, LoopConfig::default())
    }

    pub fn with_config(client: C, config: LoopConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                client,
                config,
                inner: Mutex::new(Inner::default()),
                events,
            }),
        }
    }

    pub fn client(&self) -> &C {
        &self.shared.client
    }

    pub fn config(&self) -> &LoopConfig {
        &self.shared.config
    }

    /// Receive [`LoopEvent`]s emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LoopEvent> {
        self.shared.events.subscribe()
    }

    /// Start a new run over `prompt`.
    ///
    /// Clears the result sequence and resets the cursor. Any run already in
    /// progress is stopped first. `parameters` is read each time a request
    /// is issued. An empty expansion leaves the loop running with nothing to
    /// request until [`set_prompt`](Self::set_prompt) supplies prompts.
    pub fn start(
        &self,
        prompt: impl Into<Arc<ExpandedPrompt>>,
        parameters: watch::Receiver<GenerationParameters>,
    ) -> Result<()> {
        let runtime = current_runtime()?;
        let prompt = prompt.into();

        let mut inner = self.lock()?;
        self.end_run(&mut inner);

        let first = inner.state.start(prompt);
        let epoch = inner.state.epoch();
        let prompt_count = inner.state.prompt().len();
        info!(epoch, prompt_count, "generation loop started");
        self.shared.emit(LoopEvent::Started {
            epoch,
            prompt_count,
        });

        inner.parameters = Some(parameters.clone());
        inner.task = first.map(|request| {
            executor::spawn_chain(&runtime, Arc::clone(&self.shared), request, parameters)
        });
        Ok(())
    }

    /// Stop the current run. A request already in flight is left to finish
    /// (unless configured to abort) and its result is discarded.
    pub fn stop(&self) -> Result<()> {
        let mut inner = self.lock()?;
        self.end_run(&mut inner);
        Ok(())
    }

    /// Replace the expanded prompt, e.g. after the user edits the text.
    ///
    /// A run with a request chain in progress is stopped; a run that was
    /// waiting on an empty expansion begins requesting the new prompts.
    pub fn set_prompt(&self, prompt: impl Into<Arc<ExpandedPrompt>>) -> Result<()> {
        let prompt = prompt.into();
        let runtime = current_runtime();
        let mut inner = self.lock()?;

        match inner.state.reconfigure(prompt) {
            Reconfigured::Idle | Reconfigured::Waiting => {}
            Reconfigured::Stopped { epoch } => {
                info!(epoch, "prompt changed, generation loop stopped");
                self.abort_task(&mut inner);
                self.shared.emit(LoopEvent::Stopped { epoch });
            }
            Reconfigured::Resumed(request) => match (runtime, inner.parameters.clone()) {
                (Ok(runtime), Some(parameters)) => {
                    info!(epoch = request.epoch, "prompt available, generation resumed");
                    inner.task = Some(executor::spawn_chain(
                        &runtime,
                        Arc::clone(&self.shared),
                        request,
                        parameters,
                    ));
                }
                (Err(e), _) => {
                    self.end_run(&mut inner);
                    return Err(e);
                }
                (_, None) => {
                    warn!("running loop has no parameter source, stopping");
                    self.end_run(&mut inner);
                }
            },
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Result<LoopSnapshot> {
        Ok(self.lock()?.state.snapshot())
    }

    pub fn status(&self) -> Result<LoopStatus> {
        Ok(self.lock()?.state.status())
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status(), Ok(LoopStatus::Running))
    }

    /// Results of the current (or most recent) run, in issue order.
    pub fn results(&self) -> Result<Vec<GeneratedImage>> {
        Ok(self.lock()?.state.results().to_vec())
    }

    /// The failure that ended the most recent run, if any.
    pub fn last_error(&self) -> Result<Option<String>> {
        Ok(self.lock()?.state.last_error().map(String::from))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.shared
            .inner
            .lock()
            .map_err(|e| LoopError::Other(e.to_string()))
    }

    fn end_run(&self, inner: &mut Inner) {
        if let Some(epoch) = inner.state.stop() {
            info!(epoch, "generation loop stopped");
            self.abort_task(inner);
            self.shared.emit(LoopEvent::Stopped { epoch });
        }
    }

    fn abort_task(&self, inner: &mut Inner) {
        if let Some(task) = inner.task.take() {
            if self.shared.config.abort_in_flight_on_stop {
                task.abort();
            }
        }
    }
}

fn current_runtime() -> Result<Handle> {
    Handle::try_current().map_err(|e| {
        LoopError::InvalidConfig(format!("GenerationLoop must run inside a tokio runtime: {}", e))
    })
}

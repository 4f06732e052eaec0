use std::sync::Arc;

use crate::error::LoopError;
use crate::prompt::ExpandedPrompt;
use crate::types::{GeneratedImage, LoopSnapshot, LoopStatus, PendingRequest};

/// Outcome of feeding a backend response into [`LoopState::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The image was appended; issue `next` to continue the cycle.
    Appended {
        index: usize,
        image: GeneratedImage,
        next: PendingRequest,
    },
    /// The request failed; the run is over and the loop is idle.
    Failed { index: usize, error: String },
    /// The response belongs to a run that is no longer current.
    Stale,
}

/// Outcome of replacing the prompt with [`LoopState::reconfigure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconfigured {
    /// The loop was idle; only the prompt changed.
    Idle,
    /// A running chain was cancelled. `epoch` is the run that ended.
    Stopped { epoch: u64 },
    /// The loop was waiting on an empty expansion and can now begin.
    Resumed(PendingRequest),
    /// Still running, still nothing to request.
    Waiting,
}

/// Synchronous `Idle`/`Running` state machine behind the generation loop.
///
/// Each run is identified by an epoch. Starting, stopping and stopping via
/// reconfiguration all advance the epoch, so a response that arrives for an
/// older epoch is recognized as stale and dropped. At most one request per
/// run is outstanding: the next request is only produced by resolving the
/// previous one.
#[derive(Debug, Default)]
pub struct LoopState {
    status: LoopStatus,
    epoch: u64,
    cursor: usize,
    prompt: Arc<ExpandedPrompt>,
    results: Vec<GeneratedImage>,
    last_error: Option<String>,
    chain_active: bool,
}

impl LoopState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> LoopStatus {
        self.status
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn prompt(&self) -> &Arc<ExpandedPrompt> {
        &self.prompt
    }

    pub fn results(&self) -> &[GeneratedImage] {
        &self.results
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether a request for `epoch` may still be issued or applied.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.status == LoopStatus::Running && self.chain_active && self.epoch == epoch
    }

    /// Begin a new run over `prompt`, discarding previous results.
    ///
    /// Returns the first request, or `None` when the expansion is empty (the
    /// loop stays running and waits for [`reconfigure`](Self::reconfigure)).
    pub fn start(&mut self, prompt: Arc<ExpandedPrompt>) -> Option<PendingRequest> {
        self.epoch += 1;
        self.status = LoopStatus::Running;
        self.cursor = 0;
        self.results.clear();
        self.last_error = None;
        self.prompt = prompt;
        self.begin_chain()
    }

    /// Stop the current run. Returns the epoch that ended, if one was running.
    pub fn stop(&mut self) -> Option<u64> {
        if self.status != LoopStatus::Running {
            return None;
        }
        let ended = self.epoch;
        self.epoch += 1;
        self.status = LoopStatus::Idle;
        self.chain_active = false;
        Some(ended)
    }

    /// Replace the active expansion.
    ///
    /// A running chain is stopped, since its in-flight request was issued
    /// under the old prompt. A run that was waiting on an empty expansion
    /// begins with the new one.
    pub fn reconfigure(&mut self, prompt: Arc<ExpandedPrompt>) -> Reconfigured {
        self.prompt = prompt;
        match (self.status, self.chain_active) {
            (LoopStatus::Idle, _) => Reconfigured::Idle,
            (LoopStatus::Running, true) => match self.stop() {
                Some(epoch) => Reconfigured::Stopped { epoch },
                None => Reconfigured::Idle,
            },
            (LoopStatus::Running, false) => {
                self.cursor = 0;
                match self.begin_chain() {
                    Some(request) => Reconfigured::Resumed(request),
                    None => Reconfigured::Waiting,
                }
            }
        }
    }

    /// Apply the response to `request`.
    pub fn resolve(
        &mut self,
        request: &PendingRequest,
        outcome: Result<GeneratedImage, LoopError>,
    ) -> Resolution {
        if !self.is_current(request.epoch) {
            return Resolution::Stale;
        }

        match outcome {
            Ok(image) => {
                self.results.push(image.clone());
                self.cursor = (request.index + 1) % self.prompt.len();
                let next = self.request_at_cursor();
                Resolution::Appended {
                    index: request.index,
                    image,
                    next,
                }
            }
            Err(err) => {
                let error = err.to_string();
                self.status = LoopStatus::Idle;
                self.chain_active = false;
                self.last_error = Some(error.clone());
                Resolution::Failed {
                    index: request.index,
                    error,
                }
            }
        }
    }

    pub fn snapshot(&self) -> LoopSnapshot {
        LoopSnapshot {
            status: self.status,
            epoch: self.epoch,
            cursor: self.cursor,
            prompt_count: self.prompt.len(),
            results: self.results.clone(),
            last_error: self.last_error.clone(),
        }
    }

    fn begin_chain(&mut self) -> Option<PendingRequest> {
        self.chain_active = !self.prompt.is_empty();
        self.chain_active.then(|| self.request_at_cursor())
    }

    /// Only called while the prompt is non-empty.
    fn request_at_cursor(&self) -> PendingRequest {
        PendingRequest {
            epoch: self.epoch,
            index: self.cursor,
            prompt: self.prompt.concrete_prompts[self.cursor].clone(),
        }
    }
}

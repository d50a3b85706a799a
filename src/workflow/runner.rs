//! Sequential workflow runner.
//!
//! Steps run strictly in list order, one at a time. The first failing step
//! stops the run; completed steps are not rolled back. Per-step state lives
//! in the runner and is observable through [`WorkflowRunner::snapshot`] and
//! the event channel.

use super::context::WorkflowContext;
use super::error::{StepError, WorkflowError};
use super::provider::ExecutionProvider;
use super::state::{
    progress_percent, StepSnapshot, StepState, StepStatus, WorkflowEvent, WorkflowOutcome,
    WorkflowSnapshot,
};
use super::step::{steps_signature, WorkflowStep, WorkflowStepResult};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type CompletionCallback = Arc<dyn Fn() + Send + Sync>;

struct RunnerInner {
    steps: Vec<WorkflowStep>,
    signature: String,
    states: HashMap<String, StepState>,
    is_executing: bool,
    active_step_id: Option<String>,
    log: Vec<String>,
    error: Option<String>,
    /// Token of the run in flight, if any.
    run_token: Option<CancellationToken>,
    /// Bumped on every reset and step-list change. A run only writes state
    /// while the generation it started with is still current.
    generation: u64,
}

/// First step id that appears more than once in `steps`.
fn duplicate_step_id(steps: &[WorkflowStep]) -> Option<&str> {
    let mut seen = HashSet::new();
    steps
        .iter()
        .map(|step| step.id.as_str())
        .find(|id| !seen.insert(*id))
}

fn warn_on_duplicate_ids(steps: &[WorkflowStep]) {
    if let Some(id) = duplicate_step_id(steps) {
        warn!(step_id = %id, "Duplicate step id, the workflow will refuse to run");
    }
}

impl RunnerInner {
    fn initial_states(steps: &[WorkflowStep]) -> HashMap<String, StepState> {
        steps
            .iter()
            .map(|step| (step.id.clone(), StepState::default()))
            .collect()
    }

    fn clear(&mut self) {
        if let Some(token) = self.run_token.take() {
            token.cancel();
        }
        self.generation += 1;
        self.states = Self::initial_states(&self.steps);
        self.is_executing = false;
        self.active_step_id = None;
        self.log.clear();
        self.error = None;
    }

    fn finish_run(&mut self) {
        self.active_step_id = None;
        self.is_executing = false;
        self.run_token = None;
    }

    fn completed(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| {
                self.states
                    .get(&step.id)
                    .is_some_and(|s| s.status == StepStatus::Success)
            })
            .count()
    }
}

/// Drives an ordered list of steps against an [`ExecutionProvider`].
pub struct WorkflowRunner {
    inner: Mutex<RunnerInner>,
    event_tx: broadcast::Sender<WorkflowEvent>,
    on_complete: Option<CompletionCallback>,
}

impl WorkflowRunner {
    pub fn new(steps: Vec<WorkflowStep>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        warn_on_duplicate_ids(&steps);
        let signature = steps_signature(&steps);
        let states = RunnerInner::initial_states(&steps);
        Self {
            inner: Mutex::new(RunnerInner {
                steps,
                signature,
                states,
                is_executing: false,
                active_step_id: None,
                log: Vec::new(),
                error: None,
                run_token: None,
                generation: 0,
            }),
            event_tx,
            on_complete: None,
        }
    }

    /// Callback invoked after every fully successful run.
    pub fn with_on_complete(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.event_tx.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, RunnerInner> {
        self.inner.lock().unwrap()
    }

    fn emit(&self, event: WorkflowEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    /// Applies `f` only if no reset or step-list change happened since the
    /// run started. Returns false for a stale run.
    fn update_if_current(&self, generation: u64, f: impl FnOnce(&mut RunnerInner)) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        f(&mut inner);
        true
    }

    /// Replaces the step list.
    ///
    /// If any visible field differs from the current list, all per-step state
    /// is reinitialised to idle, the log and error are cleared and an in-flight
    /// run is cancelled. Returns whether the list changed.
    pub fn set_steps(&self, steps: Vec<WorkflowStep>) -> bool {
        warn_on_duplicate_ids(&steps);
        let signature = steps_signature(&steps);
        {
            let mut inner = self.lock();
            if inner.signature == signature {
                // Same visible content; executors may still differ.
                inner.steps = steps;
                return false;
            }
            inner.steps = steps;
            inner.signature = signature;
            inner.clear();
        }
        debug!("Workflow steps changed, state reinitialised");
        self.emit(WorkflowEvent::StepsChanged);
        true
    }

    pub fn steps(&self) -> Vec<WorkflowStep> {
        self.lock().steps.clone()
    }

    /// Returns every step to idle and clears the active step, log and error.
    ///
    /// A run in flight is cancelled; its pending step future is dropped and
    /// nothing it produces afterwards is recorded.
    pub fn reset(&self) {
        let was_executing = {
            let mut inner = self.lock();
            let was_executing = inner.is_executing;
            inner.clear();
            was_executing
        };
        if was_executing {
            warn!("Workflow reset while a run was in progress, cancelling it");
        }
        self.emit(WorkflowEvent::Reset);
    }

    pub fn is_executing(&self) -> bool {
        self.lock().is_executing
    }

    pub fn step_state(&self, step_id: &str) -> Option<StepState> {
        self.lock().states.get(step_id).cloned()
    }

    pub fn completed_count(&self) -> usize {
        self.lock().completed()
    }

    pub fn progress(&self) -> u8 {
        let inner = self.lock();
        progress_percent(inner.completed(), inner.steps.len())
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        let inner = self.lock();
        let completed = inner.completed();
        let total = inner.steps.len();
        WorkflowSnapshot {
            steps: inner
                .steps
                .iter()
                .map(|step| StepSnapshot {
                    id: step.id.clone(),
                    label: step.label.clone(),
                    state: inner.states.get(&step.id).cloned().unwrap_or_default(),
                })
                .collect(),
            is_executing: inner.is_executing,
            active_step_id: inner.active_step_id.clone(),
            log: inner.log.clone(),
            error: inner.error.clone(),
            completed,
            total,
            progress: progress_percent(completed, total),
        }
    }

    /// Runs every step in order.
    ///
    /// Refused with [`WorkflowError`] when the list is empty, two steps share
    /// an id, or a run is already in progress. Otherwise resolves with how the run ended; a step
    /// failure is reported as [`WorkflowOutcome::Failed`], not as an error.
    pub async fn run(
        &self,
        provider: &dyn ExecutionProvider,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let (steps, token, generation) = {
            let mut inner = self.lock();
            if inner.steps.is_empty() {
                return Err(WorkflowError::NoSteps);
            }
            if let Some(id) = duplicate_step_id(&inner.steps) {
                return Err(WorkflowError::DuplicateStepId(id.to_string()));
            }
            if inner.is_executing {
                return Err(WorkflowError::AlreadyRunning);
            }
            let token = CancellationToken::new();
            inner.is_executing = true;
            inner.error = None;
            inner.log.clear();
            inner.run_token = Some(token.clone());
            (inner.steps.clone(), token, inner.generation)
        };

        info!(
            "Starting workflow of {} steps via {}",
            steps.len(),
            provider.name()
        );
        self.emit(WorkflowEvent::RunStarted);

        let mut ctx = WorkflowContext::new();

        for step in &steps {
            let started = self.update_if_current(generation, |inner| {
                inner.active_step_id = Some(step.id.clone());
                inner.states.insert(
                    step.id.clone(),
                    StepState {
                        status: StepStatus::Running,
                        ..StepState::default()
                    },
                );
                inner.log.push(format!("▶ {}", step.label));
            });
            if !started {
                return Ok(self.cancelled());
            }
            info!(step_id = %step.id, label = %step.label, "Executing step");
            self.emit(WorkflowEvent::StepStarted {
                step_id: step.id.clone(),
            });

            let result = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(self.cancelled()),
                result = execute_step(provider, step, &mut ctx) => result,
            };

            match result {
                Ok(result) => {
                    let recorded = self.update_if_current(generation, |inner| {
                        inner.log.push(match &result.tx_hash {
                            Some(hash) => format!("✔ {} ({})", step.label, hash),
                            None => format!("✔ {}", step.label),
                        });
                        inner.states.insert(
                            step.id.clone(),
                            StepState {
                                status: StepStatus::Success,
                                tx_hash: result.tx_hash.clone(),
                                message: result.message.clone(),
                                error: None,
                            },
                        );
                    });
                    if !recorded {
                        return Ok(self.cancelled());
                    }
                    info!(
                        step_id = %step.id,
                        tx_hash = result.tx_hash.as_deref().unwrap_or("-"),
                        "Step succeeded"
                    );
                    self.emit(WorkflowEvent::StepSucceeded {
                        step_id: step.id.clone(),
                        tx_hash: result.tx_hash,
                        message: result.message,
                    });
                }
                Err(e) => {
                    let message = e.to_string();
                    let recorded = self.update_if_current(generation, |inner| {
                        inner.states.insert(
                            step.id.clone(),
                            StepState {
                                status: StepStatus::Error,
                                error: Some(message.clone()),
                                ..StepState::default()
                            },
                        );
                        inner.error = Some(format!("Stopped at {}: {}", step.label, message));
                        inner.log.push(format!("✖ {} failed: {}", step.label, message));
                        inner.finish_run();
                    });
                    if !recorded {
                        return Ok(self.cancelled());
                    }
                    warn!(step_id = %step.id, error = %message, "Step failed, stopping workflow");
                    self.emit(WorkflowEvent::StepFailed {
                        step_id: step.id.clone(),
                        error: message.clone(),
                    });
                    return Ok(WorkflowOutcome::Failed {
                        step_id: step.id.clone(),
                        message,
                    });
                }
            }
        }

        let finished = self.update_if_current(generation, |inner| {
            inner.finish_run();
            inner.log.push("Workflow completed".to_string());
        });
        if !finished {
            return Ok(self.cancelled());
        }

        info!("Workflow completed");
        self.emit(WorkflowEvent::RunCompleted);
        if let Some(callback) = &self.on_complete {
            callback();
        }
        Ok(WorkflowOutcome::Completed)
    }

    fn cancelled(&self) -> WorkflowOutcome {
        debug!("Workflow run abandoned after reset");
        self.emit(WorkflowEvent::RunCancelled);
        WorkflowOutcome::Cancelled
    }
}

async fn execute_step(
    provider: &dyn ExecutionProvider,
    step: &WorkflowStep,
    ctx: &mut WorkflowContext,
) -> Result<WorkflowStepResult, StepError> {
    match &step.executor {
        Some(executor) => executor.execute(provider, step, ctx).await,
        None => provider.execute_step(step).await,
    }
}

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::config::Settings;
use crate::domain::analyzer;
use crate::domain::applicator;
use crate::domain::id::SimulationId;
use crate::domain::simulation::{SimulationRequest, SimulationResult, SimulationStatus};
use crate::error::{Error, Result};
use crate::loader::topology::{self, TopologyProvider};
use crate::store::job_store::{JobStore, StatusUpdate, TransitionOutcome};

/// Outcome of a cancellation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    NotFound,
    AlreadyTerminal(SimulationStatus),
}

/// Public entry point of the engine.
///
/// Owns the pipeline for each submitted request: create job, load baseline,
/// apply change, analyze impact, persist the terminal state. Runs are
/// independent units of work; concurrency is bounded by a semaphore so load
/// spikes cannot spawn unbounded workers.
pub struct SimulationOrchestrator {
    provider: Arc<dyn TopologyProvider>,
    store: Arc<dyn JobStore>,
    limiter: Arc<Semaphore>,
}

impl SimulationOrchestrator {
    pub fn new(provider: Arc<dyn TopologyProvider>, store: Arc<dyn JobStore>, settings: &Settings) -> Self {
        SimulationOrchestrator { provider, store, limiter: Arc::new(Semaphore::new(settings.max_concurrent_simulations)) }
    }

    /// Validates the request, persists a `pending` job, and schedules the
    /// run. Returns immediately; callers poll via
    /// [`get_simulation_result`](Self::get_simulation_result) or
    /// [`wait_for_terminal`](Self::wait_for_terminal).
    ///
    /// Validation failures are surfaced synchronously and never create a
    /// job.
    pub async fn submit_simulation(&self, request: SimulationRequest) -> Result<SimulationResult> {
        request.validate()?;

        let result = SimulationResult::new(request.clone());
        self.store.put(&result).await?;

        log::info!("simulation_started: id={} action={}", result.simulation_id, request.action);

        let provider = self.provider.clone();
        let store = self.store.clone();
        let limiter = self.limiter.clone();
        let id = result.simulation_id.clone();

        tokio::spawn(async move {
            run_simulation(provider, store, limiter, id, request).await;
        });

        Ok(result)
    }

    pub async fn get_simulation_result(&self, id: &SimulationId) -> Result<Option<SimulationResult>> {
        self.store.get(id).await
    }

    /// Requests cancellation. Completion wins if it lands first; a job
    /// already in a terminal state is reported as such.
    pub async fn cancel_simulation(&self, id: &SimulationId) -> Result<CancelOutcome> {
        match self.store.transition(id, StatusUpdate::Cancelled).await? {
            TransitionOutcome::Applied(_) => {
                log::info!("simulation_cancelled: id={}", id);
                Ok(CancelOutcome::Cancelled)
            }
            TransitionOutcome::Rejected(status) => Ok(CancelOutcome::AlreadyTerminal(status)),
            TransitionOutcome::NotFound => Ok(CancelOutcome::NotFound),
        }
    }

    /// Polls until the job reaches a terminal state. `Ok(None)` means the
    /// wait timed out with the job still in flight.
    pub async fn wait_for_terminal(&self, id: &SimulationId, timeout: Duration) -> Result<Option<SimulationResult>> {
        let deadline = Instant::now() + timeout;

        loop {
            match self.store.get(id).await? {
                Some(result) if result.status.is_terminal() => return Ok(Some(result)),
                Some(_) => {}
                None => return Err(Error::NotFound(id.to_string())),
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Executes one simulation run to a terminal state.
///
/// Every failure path lands in the store as `failed`; nothing escapes this
/// function as a panic or an unhandled error, so a submitted job is never
/// left `running` forever.
async fn run_simulation(
    provider: Arc<dyn TopologyProvider>,
    store: Arc<dyn JobStore>,
    limiter: Arc<Semaphore>,
    id: SimulationId,
    request: SimulationRequest,
) {
    let started = Instant::now();

    let _permit = match limiter.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            let update = StatusUpdate::Failed { error: "simulation worker pool is shut down".to_string(), execution_time: started.elapsed().as_secs_f64() };
            persist_terminal(&store, &id, update).await;
            return;
        }
    };

    match store.transition(&id, StatusUpdate::Running).await {
        Ok(TransitionOutcome::Applied(_)) => {}
        Ok(TransitionOutcome::Rejected(status)) => {
            log::info!("Simulation {} not started, already {}", id, status);
            return;
        }
        Ok(TransitionOutcome::NotFound) => {
            log::warn!("Simulation {} was evicted before it could start", id);
            return;
        }
        Err(e) => {
            log::error!("Failed to mark simulation {} as running: {}", id, e);
            return;
        }
    }

    let baseline = topology::load_or_fallback(provider.as_ref()).await;

    if observed_cancellation(&store, &id).await {
        log::info!("Simulation {} cancelled during topology load", id);
        return;
    }

    let outcome = applicator::apply(&baseline, &request).and_then(|derived| analyzer::analyze(&baseline, &derived, &request));

    let execution_time = started.elapsed().as_secs_f64();
    let update = match outcome {
        Ok(impact) => {
            log::info!("simulation_completed: id={} risk_level={} execution_time={:.3}s", id, impact.risk_level, execution_time);
            StatusUpdate::Completed { impact, execution_time }
        }
        Err(e) => {
            log::error!("simulation_failed: id={} error={}", id, e);
            StatusUpdate::Failed { error: e.to_string(), execution_time }
        }
    };

    persist_terminal(&store, &id, update).await;
}

/// Checks whether a cancel landed for this job between pipeline steps.
async fn observed_cancellation(store: &Arc<dyn JobStore>, id: &SimulationId) -> bool {
    matches!(store.get(id).await, Ok(Some(result)) if result.status == SimulationStatus::Cancelled)
}

async fn persist_terminal(store: &Arc<dyn JobStore>, id: &SimulationId, update: StatusUpdate) {
    match store.transition(id, update).await {
        Ok(TransitionOutcome::Applied(_)) => {}
        Ok(TransitionOutcome::Rejected(status)) => {
            log::info!("Simulation {} already reached terminal state {}, result discarded", id, status);
        }
        Ok(TransitionOutcome::NotFound) => {
            log::warn!("Simulation {} was evicted before its result could be stored", id);
        }
        Err(e) => {
            log::error!("Failed to persist terminal state for simulation {}: {}", id, e);
        }
    }
}

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::domain::id::SimulationId;
use crate::domain::simulation::{ImpactAnalysis, SimulationResult, SimulationStatus};
use crate::error::Result;

/// Status mutation requested against a stored simulation.
#[derive(Debug, Clone)]
pub enum StatusUpdate {
    Running,
    Completed { impact: ImpactAnalysis, execution_time: f64 },
    Failed { error: String, execution_time: f64 },
    Cancelled,
}

impl StatusUpdate {
    pub fn status(&self) -> SimulationStatus {
        match self {
            StatusUpdate::Running => SimulationStatus::Running,
            StatusUpdate::Completed { .. } => SimulationStatus::Completed,
            StatusUpdate::Failed { .. } => SimulationStatus::Failed,
            StatusUpdate::Cancelled => SimulationStatus::Cancelled,
        }
    }
}

/// Result of a transition attempt. `Rejected` carries the state that won;
/// in the cancel-vs-complete race whichever terminal transition lands first
/// is final and the loser observes `Rejected`.
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    Applied(SimulationResult),
    Rejected(SimulationStatus),
    NotFound,
}

/// Keyed persistence for simulation jobs with a bounded retention TTL.
///
/// One orchestrated run is the single writer for its id; external readers
/// may race with the final write and must tolerate observing any legal
/// state. The store serializes writes per key.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Stores a freshly created result under `simulation:<id>`.
    async fn put(&self, result: &SimulationResult) -> Result<()>;

    /// Reads a result. Expired or unknown ids yield `None`, not an error.
    async fn get(&self, id: &SimulationId) -> Result<Option<SimulationResult>>;

    /// Atomically applies a status transition if it is legal.
    async fn transition(&self, id: &SimulationId, update: StatusUpdate) -> Result<TransitionOutcome>;
}

fn storage_key(id: &SimulationId) -> String {
    format!("simulation:{}", id)
}

struct Entry {
    result: SimulationResult,
    expires_at: Instant,
}

struct StoreInner {
    entries: HashMap<String, Entry>,
}

/// In-memory [`JobStore`] with lazy TTL eviction. Stands in for the external
/// key-value store; all transition legality lives here so any backing store
/// gains the same guarantees.
pub struct InMemoryJobStore {
    inner: Mutex<StoreInner>,
    ttl: Duration,
}

impl InMemoryJobStore {
    pub fn new(ttl: Duration) -> Self {
        InMemoryJobStore { inner: Mutex::new(StoreInner { entries: HashMap::new() }), ttl }
    }

    fn purge_expired(inner: &mut StoreInner, key: &str) {
        if inner.entries.get(key).is_some_and(|entry| entry.expires_at <= Instant::now()) {
            inner.entries.remove(key);
        }
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn put(&self, result: &SimulationResult) -> Result<()> {
        let mut guard = self.inner.lock().expect("Mutex poisoned");
        let key = storage_key(&result.simulation_id);
        guard.entries.insert(key, Entry { result: result.clone(), expires_at: Instant::now() + self.ttl });
        Ok(())
    }

    async fn get(&self, id: &SimulationId) -> Result<Option<SimulationResult>> {
        let mut guard = self.inner.lock().expect("Mutex poisoned");
        let key = storage_key(id);
        Self::purge_expired(&mut guard, &key);
        Ok(guard.entries.get(&key).map(|entry| entry.result.clone()))
    }

    async fn transition(&self, id: &SimulationId, update: StatusUpdate) -> Result<TransitionOutcome> {
        let mut guard = self.inner.lock().expect("Mutex poisoned");
        let key = storage_key(id);
        Self::purge_expired(&mut guard, &key);

        let Some(entry) = guard.entries.get_mut(&key) else {
            return Ok(TransitionOutcome::NotFound);
        };

        let next = update.status();
        if !entry.result.status.can_transition_to(next) {
            return Ok(TransitionOutcome::Rejected(entry.result.status));
        }

        entry.result.status = next;
        match update {
            StatusUpdate::Running => {}
            StatusUpdate::Completed { impact, execution_time } => {
                entry.result.impact_analysis = Some(impact);
                entry.result.execution_time = Some(execution_time);
                entry.result.completed_at = Some(Utc::now());
            }
            StatusUpdate::Failed { error, execution_time } => {
                entry.result.error_message = Some(error);
                entry.result.execution_time = Some(execution_time);
                entry.result.completed_at = Some(Utc::now());
            }
            StatusUpdate::Cancelled => {
                entry.result.completed_at = Some(Utc::now());
            }
        }

        // Every write refreshes the retention window.
        entry.expires_at = Instant::now() + self.ttl;

        Ok(TransitionOutcome::Applied(entry.result.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::simulation::{RedundancyImpact, RiskLevel, SimulationAction, SimulationRequest};

    fn pending_result() -> SimulationResult {
        SimulationResult::new(SimulationRequest::link_action(SimulationAction::AddLink, "R1", "R3"))
    }

    fn impact() -> ImpactAnalysis {
        ImpactAnalysis {
            affected_paths: vec![],
            congested_links: vec![],
            packet_loss: 0.0,
            latency_increase: 0.0,
            redundancy_impact: RedundancyImpact::Improved,
            risk_level: RiskLevel::Low,
            recommendations: vec!["Change appears safe to implement".to_string()],
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryJobStore::new(Duration::from_secs(60));
        let result = pending_result();

        store.put(&result).await.unwrap();
        let stored = store.get(&result.simulation_id).await.unwrap().unwrap();

        assert_eq!(stored.simulation_id, result.simulation_id);
        assert_eq!(stored.status, SimulationStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_id_reads_as_none() {
        let store = InMemoryJobStore::new(Duration::from_secs(60));
        assert!(store.get(&SimulationId::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_evicted_on_read() {
        let store = InMemoryJobStore::new(Duration::from_millis(20));
        let result = pending_result();

        store.put(&result).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(store.get(&result.simulation_id).await.unwrap().is_none());
        assert!(matches!(store.transition(&result.simulation_id, StatusUpdate::Cancelled).await.unwrap(), TransitionOutcome::NotFound));
    }

    #[tokio::test]
    async fn completion_populates_the_result() {
        let store = InMemoryJobStore::new(Duration::from_secs(60));
        let result = pending_result();
        store.put(&result).await.unwrap();

        store.transition(&result.simulation_id, StatusUpdate::Running).await.unwrap();
        let outcome = store
            .transition(&result.simulation_id, StatusUpdate::Completed { impact: impact(), execution_time: 0.42 })
            .await
            .unwrap();

        let TransitionOutcome::Applied(stored) = outcome else {
            panic!("expected transition to apply");
        };
        assert_eq!(stored.status, SimulationStatus::Completed);
        assert!(stored.impact_analysis.is_some());
        assert_eq!(stored.execution_time, Some(0.42));
        assert!(stored.completed_at.is_some());
        assert!(stored.error_message.is_none());
    }

    #[tokio::test]
    async fn terminal_states_are_sticky_in_both_race_directions() {
        let store = InMemoryJobStore::new(Duration::from_secs(60));

        // Cancel lands first, completion loses.
        let result = pending_result();
        store.put(&result).await.unwrap();
        store.transition(&result.simulation_id, StatusUpdate::Running).await.unwrap();
        store.transition(&result.simulation_id, StatusUpdate::Cancelled).await.unwrap();

        let outcome = store
            .transition(&result.simulation_id, StatusUpdate::Completed { impact: impact(), execution_time: 0.1 })
            .await
            .unwrap();
        assert!(matches!(outcome, TransitionOutcome::Rejected(SimulationStatus::Cancelled)));

        let stored = store.get(&result.simulation_id).await.unwrap().unwrap();
        assert_eq!(stored.status, SimulationStatus::Cancelled);
        assert!(stored.impact_analysis.is_none());

        // Completion lands first, cancel loses.
        let result = pending_result();
        store.put(&result).await.unwrap();
        store.transition(&result.simulation_id, StatusUpdate::Running).await.unwrap();
        store
            .transition(&result.simulation_id, StatusUpdate::Completed { impact: impact(), execution_time: 0.1 })
            .await
            .unwrap();

        let outcome = store.transition(&result.simulation_id, StatusUpdate::Cancelled).await.unwrap();
        assert!(matches!(outcome, TransitionOutcome::Rejected(SimulationStatus::Completed)));

        let stored = store.get(&result.simulation_id).await.unwrap().unwrap();
        assert_eq!(stored.status, SimulationStatus::Completed);
    }

    #[tokio::test]
    async fn failure_captures_the_error_message() {
        let store = InMemoryJobStore::new(Duration::from_secs(60));
        let result = pending_result();
        store.put(&result).await.unwrap();

        store.transition(&result.simulation_id, StatusUpdate::Running).await.unwrap();
        store
            .transition(&result.simulation_id, StatusUpdate::Failed { error: "analysis exploded".to_string(), execution_time: 0.2 })
            .await
            .unwrap();

        let stored = store.get(&result.simulation_id).await.unwrap().unwrap();
        assert_eq!(stored.status, SimulationStatus::Failed);
        assert_eq!(stored.error_message.as_deref(), Some("analysis exploded"));
        assert!(stored.impact_analysis.is_none());
    }
}

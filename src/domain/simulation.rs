use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::api::simulation_dto::SimulationRequestDto;
use crate::domain::id::{NodeId, SimulationId};
use crate::error::{Error, Result};

/// Topology mutation kinds understood by the engine.
///
/// `ChangeQos` is part of the request vocabulary but has no simulation
/// semantics yet; requests carrying it are rejected up front instead of
/// being silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationAction {
    AddLink,
    RemoveLink,
    ChangeCapacity,
    AddNode,
    RemoveNode,
    ChangeQos,
}

impl SimulationAction {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "add_link" => Ok(SimulationAction::AddLink),
            "remove_link" => Ok(SimulationAction::RemoveLink),
            "change_capacity" => Ok(SimulationAction::ChangeCapacity),
            "add_node" => Ok(SimulationAction::AddNode),
            "remove_node" => Ok(SimulationAction::RemoveNode),
            "change_qos" => Ok(SimulationAction::ChangeQos),
            other => Err(Error::UnsupportedAction(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationAction::AddLink => "add_link",
            SimulationAction::RemoveLink => "remove_link",
            SimulationAction::ChangeCapacity => "change_capacity",
            SimulationAction::AddNode => "add_node",
            SimulationAction::RemoveNode => "remove_node",
            SimulationAction::ChangeQos => "change_qos",
        }
    }

    pub fn is_link_action(&self) -> bool {
        matches!(self, SimulationAction::AddLink | SimulationAction::RemoveLink | SimulationAction::ChangeCapacity)
    }

    pub fn is_node_action(&self) -> bool {
        matches!(self, SimulationAction::AddNode | SimulationAction::RemoveNode)
    }
}

impl fmt::Display for SimulationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of a simulation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SimulationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SimulationStatus::Completed | SimulationStatus::Failed | SimulationStatus::Cancelled)
    }

    /// Legal transitions: `pending -> running -> {completed|failed|cancelled}`.
    /// A pending job may also jump straight to a terminal state (cancel
    /// before start, early failure). Terminal states are immutable.
    pub fn can_transition_to(&self, next: SimulationStatus) -> bool {
        match self {
            SimulationStatus::Pending => next != SimulationStatus::Pending,
            SimulationStatus::Running => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SimulationStatus::Pending => "pending",
            SimulationStatus::Running => "running",
            SimulationStatus::Completed => "completed",
            SimulationStatus::Failed => "failed",
            SimulationStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", label)
    }
}

/// Coarse classification of how dangerous a proposed change is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        };
        write!(f, "{}", label)
    }
}

/// Whether the change added, removed, or preserved redundancy, measured by
/// the link count delta between baseline and derived snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedundancyImpact {
    Improved,
    Reduced,
    Unchanged,
}

/// A validated simulation request in domain terms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationRequest {
    pub action: SimulationAction,
    pub src: Option<NodeId>,
    pub dst: Option<NodeId>,
    pub capacity: Option<u64>,
    pub latency: Option<f64>,
    pub cost: Option<i64>,
    pub node_id: Option<NodeId>,
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl SimulationRequest {
    /// Converts the wire shape into a validated domain request.
    ///
    /// Structural validation happens here, synchronously: an invalid request
    /// never allocates a job id or touches the job store.
    pub fn from_dto(dto: SimulationRequestDto) -> Result<Self> {
        let request = SimulationRequest {
            action: SimulationAction::parse(&dto.action)?,
            src: dto.src.map(NodeId::new),
            dst: dto.dst.map(NodeId::new),
            capacity: dto.capacity,
            latency: dto.latency,
            cost: dto.cost,
            node_id: dto.node_id.map(NodeId::new),
            parameters: dto.parameters,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn link_action(action: SimulationAction, src: impl Into<String>, dst: impl Into<String>) -> Self {
        SimulationRequest {
            action,
            src: Some(NodeId::new(src)),
            dst: Some(NodeId::new(dst)),
            capacity: None,
            latency: None,
            cost: None,
            node_id: None,
            parameters: BTreeMap::new(),
        }
    }

    /// Structural validation per action kind.
    pub fn validate(&self) -> Result<()> {
        if self.action.is_link_action() && (self.src.is_none() || self.dst.is_none()) {
            return Err(Error::Validation(format!("action '{}' requires both src and dst node identifiers", self.action)));
        }

        if self.action.is_node_action() && self.node_id.is_none() {
            return Err(Error::Validation(format!("action '{}' requires a node_id", self.action)));
        }

        if self.action == SimulationAction::ChangeQos {
            return Err(Error::UnsupportedAction("change_qos is not simulatable yet".to_string()));
        }

        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return Err(Error::Validation("capacity must be a positive integer".to_string()));
            }
        }

        if let Some(latency) = self.latency {
            if !latency.is_finite() || latency < 0.0 {
                return Err(Error::Validation("latency must be a non-negative number".to_string()));
            }
        }

        Ok(())
    }

    /// Endpoints of a link action. Only call after `validate`.
    pub fn endpoints(&self) -> Result<(&NodeId, &NodeId)> {
        match (&self.src, &self.dst) {
            (Some(src), Some(dst)) => Ok((src, dst)),
            _ => Err(Error::Validation(format!("action '{}' requires both src and dst node identifiers", self.action))),
        }
    }
}

/// Analysis payload attached to a completed simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactAnalysis {
    pub affected_paths: Vec<String>,
    pub congested_links: Vec<String>,
    pub packet_loss: f64,
    pub latency_increase: f64,
    pub redundancy_impact: RedundancyImpact,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
}

/// A simulation job as persisted in the job store.
///
/// Mutated only through the store's status transitions; callers observing a
/// result may see any legal state.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub simulation_id: SimulationId,
    pub status: SimulationStatus,
    pub request: SimulationRequest,
    pub impact_analysis: Option<ImpactAnalysis>,
    /// Wall-clock seconds from orchestration start to terminal persistence.
    pub execution_time: Option<f64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SimulationResult {
    pub fn new(request: SimulationRequest) -> Self {
        SimulationResult {
            simulation_id: SimulationId::generate(),
            status: SimulationStatus::Pending,
            request,
            impact_analysis: None,
            execution_time: None,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_action_is_rejected_at_parse() {
        let err = SimulationAction::parse("reboot_node").unwrap_err();
        assert!(matches!(err, Error::UnsupportedAction(_)));
    }

    #[test]
    fn link_action_without_endpoints_fails_validation() {
        let dto = SimulationRequestDto {
            action: "remove_link".to_string(),
            src: Some("R1".to_string()),
            dst: None,
            capacity: None,
            latency: None,
            cost: None,
            node_id: None,
            parameters: BTreeMap::new(),
        };

        let err = SimulationRequest::from_dto(dto).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn node_action_requires_node_id() {
        let mut dto = SimulationRequestDto::link_action("add_node", "R1", "R2");
        dto.src = None;
        dto.dst = None;

        let err = SimulationRequest::from_dto(dto).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn change_qos_is_unsupported() {
        let request = SimulationRequest::link_action(SimulationAction::ChangeQos, "R1", "R2");
        assert!(matches!(request.validate(), Err(Error::UnsupportedAction(_))));
    }

    #[test]
    fn status_transitions_follow_the_state_machine() {
        use SimulationStatus::*;

        assert!(Pending.can_transition_to(Running));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Running.can_transition_to(Completed));
        assert!(Running.can_transition_to(Failed));
        assert!(Running.can_transition_to(Cancelled));

        for terminal in [Completed, Failed, Cancelled] {
            for next in [Pending, Running, Completed, Failed, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }
        assert!(!Running.can_transition_to(Pending));
    }

    #[test]
    fn fresh_result_is_pending_without_payloads() {
        let result = SimulationResult::new(SimulationRequest::link_action(SimulationAction::AddLink, "R1", "R3"));

        assert_eq!(result.status, SimulationStatus::Pending);
        assert!(result.impact_analysis.is_none());
        assert!(result.error_message.is_none());
        assert!(result.completed_at.is_none());
    }
}

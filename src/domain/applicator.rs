use crate::domain::graph::{LinkAttrs, NetworkGraph, Node, NodeKind};
use crate::domain::simulation::{SimulationAction, SimulationRequest};
use crate::error::{Error, Result};

/// Capacity assumed for a new link when the request does not specify one.
pub const DEFAULT_LINK_CAPACITY: u64 = 1000;
/// Latency assumed for a new link when the request does not specify one.
pub const DEFAULT_LINK_LATENCY: f64 = 3.0;

/// Applies a requested mutation to a cloned snapshot of `baseline`.
///
/// The baseline is never touched; the returned graph is a fully independent
/// derived snapshot. Mutations against absent elements (`remove_link`,
/// `change_capacity`, `remove_node`) are idempotent no-ops so that a
/// simulation never fails just because the topology drifted since the
/// request was written.
pub fn apply(baseline: &NetworkGraph, request: &SimulationRequest) -> Result<NetworkGraph> {
    request.validate()?;

    let mut derived = baseline.clone();

    match request.action {
        SimulationAction::AddLink => {
            let (src, dst) = request.endpoints()?;
            if !derived.contains_node(src) || !derived.contains_node(dst) {
                return Err(Error::Validation(format!("add_link endpoints must exist in the topology: {} / {}", src, dst)));
            }
            derived.upsert_link(
                src,
                dst,
                LinkAttrs {
                    capacity: request.capacity.unwrap_or(DEFAULT_LINK_CAPACITY),
                    utilization: 0.0,
                    latency: request.latency.unwrap_or(DEFAULT_LINK_LATENCY),
                },
            );
        }
        SimulationAction::RemoveLink => {
            let (src, dst) = request.endpoints()?;
            derived.remove_link(src, dst);
        }
        SimulationAction::ChangeCapacity => {
            let (src, dst) = request.endpoints()?;
            // Absent link: nothing to change, mirrors the idempotent-removal policy.
            if let Some(attrs) = derived.link(src, dst).copied() {
                derived.upsert_link(src, dst, LinkAttrs { capacity: request.capacity.unwrap_or(DEFAULT_LINK_CAPACITY), ..attrs });
            }
        }
        SimulationAction::AddNode => {
            let node_id = request.node_id.clone().ok_or_else(|| Error::Validation("add_node requires a node_id".to_string()))?;
            derived.upsert_node(Node { id: node_id, kind: NodeKind::Router, vendor: None, model: None });
        }
        SimulationAction::RemoveNode => {
            let node_id = request.node_id.as_ref().ok_or_else(|| Error::Validation("remove_node requires a node_id".to_string()))?;
            derived.remove_node(node_id);
        }
        SimulationAction::ChangeQos => {
            return Err(Error::UnsupportedAction("change_qos is not simulatable yet".to_string()));
        }
    }

    Ok(derived)
}

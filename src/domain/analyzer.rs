use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, VecDeque};

use crate::domain::graph::NetworkGraph;
use crate::domain::id::NodeId;
use crate::domain::simulation::{ImpactAnalysis, RedundancyImpact, RiskLevel, SimulationAction, SimulationRequest};
use crate::error::{Error, Result};

/// A link is considered congested above this utilization.
pub const CONGESTION_THRESHOLD: f64 = 0.8;
/// Upper bound on the affected-path list to keep output and runtime bounded
/// on large topologies.
pub const MAX_AFFECTED_PATHS: usize = 10;

const PACKET_LOSS_CEILING: f64 = 0.1;
const PACKET_LOSS_SLOPE: f64 = 0.5;

/// Compares the baseline snapshot against the derived snapshot and produces
/// the full impact analysis for the requested change.
pub fn analyze(baseline: &NetworkGraph, derived: &NetworkGraph, request: &SimulationRequest) -> Result<ImpactAnalysis> {
    validate_link_attrs(baseline)?;
    validate_link_attrs(derived)?;

    let baseline_connected = is_connected(baseline);
    let derived_connected = is_connected(derived);

    let congested = congested_links(derived);
    let loss = packet_loss(derived);
    let latency_increase = latency_impact(baseline, derived);
    let affected = affected_paths(baseline, derived);

    let risk_level = assess_risk(baseline_connected, derived_connected, loss, congested.len());
    let recommendations = build_recommendations(request, risk_level, &congested);
    let redundancy_impact = redundancy_impact(baseline, derived);

    log::debug!(
        "Impact analysis done: risk={}, packet_loss={:.4}, congested={}, affected_paths={}",
        risk_level,
        loss,
        congested.len(),
        affected.len()
    );

    Ok(ImpactAnalysis {
        affected_paths: affected,
        congested_links: congested,
        packet_loss: loss,
        latency_increase,
        redundancy_impact,
        risk_level,
        recommendations,
    })
}

/// Rejects graphs carrying malformed link attributes before any of the
/// numeric steps can propagate NaN into the result payload.
fn validate_link_attrs(graph: &NetworkGraph) -> Result<()> {
    for (key, attrs) in graph.links() {
        if !attrs.utilization.is_finite() || attrs.utilization < 0.0 {
            return Err(Error::Analysis(format!("link {} carries a malformed utilization value", key.label())));
        }
        if !attrs.latency.is_finite() || attrs.latency < 0.0 {
            return Err(Error::Analysis(format!("link {} carries a malformed latency value", key.label())));
        }
    }
    Ok(())
}

/// Whether every node can reach every other node. Graphs with at most one
/// node count as connected.
pub fn is_connected(graph: &NetworkGraph) -> bool {
    let mut ids = graph.node_ids();
    let Some(start) = ids.next() else {
        return true;
    };

    let mut visited: BTreeSet<&NodeId> = BTreeSet::new();
    let mut queue = VecDeque::new();
    visited.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        for neighbor in graph.neighbors(current) {
            if visited.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }

    visited.len() == graph.node_count()
}

/// Labels of links whose utilization exceeds the congestion threshold, in
/// sorted endpoint order.
pub fn congested_links(graph: &NetworkGraph) -> Vec<String> {
    graph
        .links()
        .filter(|(_, attrs)| attrs.utilization > CONGESTION_THRESHOLD)
        .map(|(key, _)| key.label())
        .collect()
}

/// Mean per-link loss estimate in [0, 0.1].
///
/// Links above the congestion threshold contribute
/// `min(0.1, (utilization - 0.8) * 0.5)`; every link counts in the
/// denominator.
pub fn packet_loss(graph: &NetworkGraph) -> f64 {
    let mut total_loss = 0.0;
    let mut total_links = 0usize;

    for (_, attrs) in graph.links() {
        if attrs.utilization > CONGESTION_THRESHOLD {
            total_loss += (PACKET_LOSS_SLOPE * (attrs.utilization - CONGESTION_THRESHOLD)).min(PACKET_LOSS_CEILING);
        }
        total_links += 1;
    }

    total_loss / total_links.max(1) as f64
}

/// Mean change of pairwise latency-weighted shortest-path distance, over the
/// node pairs reachable in both snapshots. Negative values mean the change
/// improved latency. Pairs unreachable in either snapshot are excluded, not
/// treated as infinite.
pub fn latency_impact(baseline: &NetworkGraph, derived: &NetworkGraph) -> f64 {
    let baseline_paths = all_pairs_latency(baseline);
    let derived_paths = all_pairs_latency(derived);

    let mut total_change = 0.0;
    let mut pair_count = 0usize;

    for (pair, baseline_latency) in &baseline_paths {
        if let Some(derived_latency) = derived_paths.get(pair) {
            total_change += derived_latency - baseline_latency;
            pair_count += 1;
        }
    }

    total_change / pair_count.max(1) as f64
}

/// Latency-weighted shortest-path distance for every ordered reachable pair.
fn all_pairs_latency(graph: &NetworkGraph) -> BTreeMap<(NodeId, NodeId), f64> {
    let mut distances = BTreeMap::new();

    for source in graph.node_ids() {
        for (target, distance) in latency_distances_from(graph, source) {
            if &target != source {
                distances.insert((source.clone(), target), distance);
            }
        }
    }

    distances
}

struct HeapEntry {
    distance: f64,
    node: NodeId,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // Reversed so the std max-heap pops the smallest distance first; ties
    // break on node id to keep traversal deterministic.
    fn cmp(&self, other: &Self) -> Ordering {
        other.distance.total_cmp(&self.distance).then_with(|| other.node.cmp(&self.node))
    }
}

/// Dijkstra over latency weights from a single source.
fn latency_distances_from(graph: &NetworkGraph, source: &NodeId) -> BTreeMap<NodeId, f64> {
    let mut distances: BTreeMap<NodeId, f64> = BTreeMap::new();
    let mut heap = BinaryHeap::new();

    distances.insert(source.clone(), 0.0);
    heap.push(HeapEntry { distance: 0.0, node: source.clone() });

    while let Some(HeapEntry { distance, node }) = heap.pop() {
        if distances.get(&node).is_some_and(|best| distance > *best) {
            continue;
        }

        for neighbor in graph.neighbors(&node) {
            let Some(attrs) = graph.link(&node, neighbor) else {
                continue;
            };
            let candidate = distance + attrs.latency;

            if distances.get(neighbor).is_none_or(|best| candidate < *best) {
                distances.insert(neighbor.clone(), candidate);
                heap.push(HeapEntry { distance: candidate, node: neighbor.clone() });
            }
        }
    }

    distances
}

/// Unweighted (hop count) shortest path from `src` to `dst`, rendered as the
/// sequence of traversed node ids. Sorted neighbor iteration makes the tie
/// break deterministic.
pub fn shortest_path(graph: &NetworkGraph, src: &NodeId, dst: &NodeId) -> Option<Vec<NodeId>> {
    if !graph.contains_node(src) || !graph.contains_node(dst) {
        return None;
    }
    if src == dst {
        return Some(vec![src.clone()]);
    }

    let mut predecessor: BTreeMap<NodeId, NodeId> = BTreeMap::new();
    let mut visited: BTreeSet<&NodeId> = BTreeSet::new();
    let mut queue = VecDeque::new();
    visited.insert(src);
    queue.push_back(src);

    'search: while let Some(current) = queue.pop_front() {
        for neighbor in graph.neighbors(current) {
            if visited.insert(neighbor) {
                predecessor.insert(neighbor.clone(), current.clone());
                if neighbor == dst {
                    break 'search;
                }
                queue.push_back(neighbor);
            }
        }
    }

    if !predecessor.contains_key(dst) {
        return None;
    }

    let mut path = vec![dst.clone()];
    let mut current = dst;
    while let Some(previous) = predecessor.get(current) {
        path.push(previous.clone());
        current = previous;
    }
    path.reverse();
    Some(path)
}

/// Human-readable renderings of derived shortest paths that differ from the
/// baseline, for unordered node pairs in sorted iteration order. Collection
/// stops at [`MAX_AFFECTED_PATHS`]. Pairs without a path in either snapshot
/// are skipped, not reported as changed.
pub fn affected_paths(baseline: &NetworkGraph, derived: &NetworkGraph) -> Vec<String> {
    let nodes: Vec<&NodeId> = baseline.node_ids().collect();
    let mut affected = Vec::new();

    'pairs: for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            let (src, dst) = (nodes[i], nodes[j]);
            let (Some(before), Some(after)) = (shortest_path(baseline, src, dst), shortest_path(derived, src, dst)) else {
                continue;
            };

            if before != after {
                affected.push(render_path(&after));
                if affected.len() >= MAX_AFFECTED_PATHS {
                    break 'pairs;
                }
            }
        }
    }

    affected
}

fn render_path(path: &[NodeId]) -> String {
    path.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(" -> ")
}

/// Risk ladder with fixed priority: partitioning dominates everything, then
/// the high and medium thresholds on loss/congestion, else low.
pub fn assess_risk(baseline_connected: bool, derived_connected: bool, packet_loss: f64, congested_count: usize) -> RiskLevel {
    if baseline_connected && !derived_connected {
        return RiskLevel::Critical;
    }

    if packet_loss > 0.05 || congested_count > 3 {
        return RiskLevel::High;
    }

    if packet_loss > 0.01 || congested_count > 1 {
        return RiskLevel::Medium;
    }

    RiskLevel::Low
}

/// Rule-based, order-preserving recommendation list; never empty.
pub fn build_recommendations(request: &SimulationRequest, risk_level: RiskLevel, congested_links: &[String]) -> Vec<String> {
    let mut recommendations = Vec::new();

    if risk_level == RiskLevel::Critical {
        recommendations.push("Change causes network partitioning - not recommended".to_string());
    }

    if risk_level == RiskLevel::High {
        recommendations.push("Consider implementing QoS policies".to_string());
        recommendations.push("Monitor traffic patterns closely".to_string());
    }

    if !congested_links.is_empty() {
        let listed: Vec<&str> = congested_links.iter().take(3).map(String::as_str).collect();
        recommendations.push(format!("Consider upgrading capacity on: {}", listed.join(", ")));
    }

    if request.action == SimulationAction::AddLink {
        recommendations.push("New link improves redundancy".to_string());
        recommendations.push("Configure appropriate routing metrics".to_string());
    }

    if recommendations.is_empty() {
        recommendations.push("Change appears safe to implement".to_string());
    }

    recommendations
}

/// Tri-state redundancy classification on the link-count delta.
pub fn redundancy_impact(baseline: &NetworkGraph, derived: &NetworkGraph) -> RedundancyImpact {
    match derived.link_count().cmp(&baseline.link_count()) {
        Ordering::Greater => RedundancyImpact::Improved,
        Ordering::Less => RedundancyImpact::Reduced,
        Ordering::Equal => RedundancyImpact::Unchanged,
    }
}

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::api::topology_dto::{LinkDto, NodeDto, TopologyDto};
use crate::domain::id::NodeId;

/// Device class of a topology node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Router,
    Switch,
    Host,
    Gateway,
    Firewall,
    #[serde(other)]
    Other,
}

/// A device in the topology. Immutable for the duration of a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub vendor: Option<String>,
    pub model: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Node { id: NodeId::new(id), kind, vendor: None, model: None }
    }
}

/// Attributes carried by a link between two devices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkAttrs {
    /// Bandwidth in Mbps.
    pub capacity: u64,
    /// Current load as a fraction in [0, 1].
    pub utilization: f64,
    /// One-way latency in milliseconds.
    pub latency: f64,
}

/// Canonicalized unordered endpoint pair. The graph stores at most one link
/// per pair; a second upsert for the same pair overwrites the attributes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkKey {
    a: NodeId,
    b: NodeId,
}

impl LinkKey {
    pub fn new(x: &NodeId, y: &NodeId) -> Self {
        if x <= y {
            LinkKey { a: x.clone(), b: y.clone() }
        } else {
            LinkKey { a: y.clone(), b: x.clone() }
        }
    }

    pub fn endpoints(&self) -> (&NodeId, &NodeId) {
        (&self.a, &self.b)
    }

    /// Label used in analysis output, e.g. `"R2-R3"`.
    pub fn label(&self) -> String {
        format!("{}-{}", self.a, self.b)
    }
}

/// An undirected weighted topology snapshot.
///
/// All collections are owned; `Clone` produces a fully independent deep copy,
/// which is what the change applicator relies on for snapshot isolation.
/// Ordered maps keep iteration order deterministic so analysis output does
/// not depend on hash seeds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkGraph {
    nodes: BTreeMap<NodeId, Node>,
    links: BTreeMap<LinkKey, LinkAttrs>,
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl NetworkGraph {
    pub fn new() -> Self {
        NetworkGraph::default()
    }

    /// Inserts or replaces a node. Adjacency of an existing node is kept.
    pub fn upsert_node(&mut self, node: Node) {
        self.adjacency.entry(node.id.clone()).or_default();
        self.nodes.insert(node.id.clone(), node);
    }

    /// Inserts or replaces the link between `x` and `y`.
    ///
    /// Endpoints unknown to the graph are materialized as plain router
    /// nodes, mirroring how the topology store reports links whose devices
    /// were not discovered individually.
    pub fn upsert_link(&mut self, x: &NodeId, y: &NodeId, attrs: LinkAttrs) {
        for endpoint in [x, y] {
            if !self.nodes.contains_key(endpoint) {
                self.upsert_node(Node { id: endpoint.clone(), kind: NodeKind::Router, vendor: None, model: None });
            }
        }

        self.adjacency.entry(x.clone()).or_default().insert(y.clone());
        self.adjacency.entry(y.clone()).or_default().insert(x.clone());
        self.links.insert(LinkKey::new(x, y), attrs);
    }

    /// Removes the link between `x` and `y`. Removing an absent link is a
    /// no-op, not a failure.
    pub fn remove_link(&mut self, x: &NodeId, y: &NodeId) {
        if self.links.remove(&LinkKey::new(x, y)).is_some() {
            if let Some(neighbors) = self.adjacency.get_mut(x) {
                neighbors.remove(y);
            }
            if let Some(neighbors) = self.adjacency.get_mut(y) {
                neighbors.remove(x);
            }
        }
    }

    /// Removes a node and every link incident to it. Removing an unknown
    /// node is a no-op.
    pub fn remove_node(&mut self, id: &NodeId) {
        if self.nodes.remove(id).is_none() {
            return;
        }

        let neighbors: Vec<NodeId> = self.adjacency.remove(id).map(|set| set.into_iter().collect()).unwrap_or_default();

        for neighbor in &neighbors {
            self.links.remove(&LinkKey::new(id, neighbor));
            if let Some(set) = self.adjacency.get_mut(neighbor) {
                set.remove(id);
            }
        }
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn link(&self, x: &NodeId, y: &NodeId) -> Option<&LinkAttrs> {
        self.links.get(&LinkKey::new(x, y))
    }

    pub fn has_link(&self, x: &NodeId, y: &NodeId) -> bool {
        self.links.contains_key(&LinkKey::new(x, y))
    }

    /// Neighbors of `id` in ascending id order.
    pub fn neighbors(&self, id: &NodeId) -> impl Iterator<Item = &NodeId> {
        self.adjacency.get(id).into_iter().flatten()
    }

    /// All node ids in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub fn links(&self) -> impl Iterator<Item = (&LinkKey, &LinkAttrs)> {
        self.links.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Builds a graph from the topology store wire shape.
    pub fn from_dto(dto: TopologyDto) -> Self {
        let mut graph = NetworkGraph::new();

        for node in dto.nodes {
            graph.upsert_node(Node { id: NodeId::new(node.id), kind: node.kind, vendor: node.vendor, model: node.model });
        }

        for link in dto.edges {
            let source = NodeId::new(link.source);
            let target = NodeId::new(link.target);
            graph.upsert_link(&source, &target, LinkAttrs { capacity: link.capacity, utilization: link.utilization, latency: link.latency });
        }

        graph
    }

    /// Serializable snapshot of the graph, nodes and links in sorted order.
    pub fn to_dto(&self) -> TopologyDto {
        TopologyDto {
            nodes: self
                .nodes
                .values()
                .map(|n| NodeDto { id: n.id.to_string(), kind: n.kind, vendor: n.vendor.clone(), model: n.model.clone() })
                .collect(),
            edges: self
                .links
                .iter()
                .map(|(key, attrs)| {
                    let (a, b) = key.endpoints();
                    LinkDto {
                        source: a.to_string(),
                        target: b.to_string(),
                        capacity: attrs.capacity,
                        utilization: attrs.utilization,
                        latency: attrs.latency,
                    }
                })
                .collect(),
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::domain::graph::NodeKind;

/// Wire shape served by the topology store's read API.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TopologyDto {
    #[serde(default)]
    pub nodes: Vec<NodeDto>,
    #[serde(default)]
    pub edges: Vec<LinkDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDto {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkDto {
    pub source: String,
    pub target: String,
    #[serde(default = "default_capacity")]
    pub capacity: u64,
    #[serde(default)]
    pub utilization: f64,
    #[serde(default)]
    pub latency: f64,
}

fn default_capacity() -> u64 {
    1000
}

use async_trait::async_trait;
use std::time::Duration;

use crate::api::topology_dto::TopologyDto;
use crate::config::Settings;
use crate::domain::graph::{LinkAttrs, NetworkGraph, Node, NodeKind};
use crate::domain::id::NodeId;
use crate::error::{Error, Result};

/// Source of the baseline topology snapshot.
///
/// Implementations may fail; the engine itself only ever consumes
/// [`load_or_fallback`], which degrades to a deterministic minimal topology
/// instead of blocking a what-if run on a flaky store.
#[async_trait]
pub trait TopologyProvider: Send + Sync {
    async fn load(&self) -> Result<NetworkGraph>;
}

/// Loads the current baseline, falling back to [`fallback_topology`] when
/// the provider fails or reports an empty store.
pub async fn load_or_fallback(provider: &dyn TopologyProvider) -> NetworkGraph {
    match provider.load().await {
        Ok(graph) if graph.node_count() > 0 => graph,
        Ok(_) => {
            log::warn!("Topology store returned an empty topology, using minimal fallback");
            fallback_topology()
        }
        Err(e) => {
            log::warn!("Failed to load network topology ({}), using minimal fallback", e);
            fallback_topology()
        }
    }
}

/// Reads the topology from the external topology store over HTTP.
pub struct HttpTopologyLoader {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTopologyLoader {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::TopologyUnavailable(e.to_string()))?;

        Ok(HttpTopologyLoader { client, base_url: base_url.into() })
    }

    pub fn from_settings(settings: &Settings) -> Result<Option<Self>> {
        match &settings.topology_url {
            Some(url) => Ok(Some(HttpTopologyLoader::new(url.clone(), settings.topology_timeout)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl TopologyProvider for HttpTopologyLoader {
    async fn load(&self) -> Result<NetworkGraph> {
        let url = format!("{}/api/v1/topology", self.base_url.trim_end_matches('/'));

        let response = self.client.get(&url).send().await.map_err(|e| Error::TopologyUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::TopologyUnavailable(format!("topology store answered with status {}", response.status())));
        }

        let dto: TopologyDto = response.json().await.map_err(|e| Error::TopologyUnavailable(e.to_string()))?;

        log::debug!("Loaded topology with {} nodes and {} links from {}", dto.nodes.len(), dto.edges.len(), url);
        Ok(NetworkGraph::from_dto(dto))
    }
}

/// Serves a fixed in-memory snapshot. Used for demo mode and for injecting
/// deterministic fixtures in tests.
pub struct StaticTopologyProvider {
    graph: NetworkGraph,
}

impl StaticTopologyProvider {
    pub fn new(graph: NetworkGraph) -> Self {
        StaticTopologyProvider { graph }
    }
}

#[async_trait]
impl TopologyProvider for StaticTopologyProvider {
    async fn load(&self) -> Result<NetworkGraph> {
        Ok(self.graph.clone())
    }
}

/// Minimal connected fallback used whenever the real store is unavailable.
pub fn fallback_topology() -> NetworkGraph {
    let mut graph = NetworkGraph::new();
    graph.upsert_link(&NodeId::new("R1"), &NodeId::new("R2"), LinkAttrs { capacity: 1000, utilization: 0.5, latency: 2.0 });
    graph.upsert_link(&NodeId::new("R2"), &NodeId::new("R3"), LinkAttrs { capacity: 1000, utilization: 0.5, latency: 2.0 });
    graph
}

/// Five-router demo topology with fixed link attributes. Deterministic on
/// purpose: tests and demo runs must not depend on randomized load values.
pub fn demo_topology() -> NetworkGraph {
    let mut graph = NetworkGraph::new();

    for id in ["R1", "R2", "R3", "R4", "R5"] {
        let mut node = Node::new(id, NodeKind::Router);
        node.vendor = Some("Cisco".to_string());
        graph.upsert_node(node);
    }

    let links = [
        ("R1", "R2", 1000, 0.65, 2.0),
        ("R1", "R3", 1000, 0.45, 5.0),
        ("R2", "R3", 500, 0.80, 3.0),
        ("R2", "R4", 1000, 0.30, 4.0),
        ("R3", "R4", 1000, 0.55, 3.0),
        ("R3", "R5", 500, 0.70, 6.0),
        ("R4", "R5", 1000, 0.40, 2.0),
    ];

    for (src, dst, capacity, utilization, latency) in links {
        graph.upsert_link(&NodeId::new(src), &NodeId::new(dst), LinkAttrs { capacity, utilization, latency });
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analyzer;

    struct FailingProvider;

    #[async_trait]
    impl TopologyProvider for FailingProvider {
        async fn load(&self) -> Result<NetworkGraph> {
            Err(Error::TopologyUnavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_minimal_topology() {
        let graph = load_or_fallback(&FailingProvider).await;

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.link_count(), 2);
        assert!(analyzer::is_connected(&graph));
    }

    #[tokio::test]
    async fn empty_store_falls_back_to_minimal_topology() {
        let provider = StaticTopologyProvider::new(NetworkGraph::new());
        let graph = load_or_fallback(&provider).await;

        assert_eq!(graph.node_count(), 3);
    }

    #[tokio::test]
    async fn static_provider_serves_its_snapshot() {
        let provider = StaticTopologyProvider::new(demo_topology());
        let graph = load_or_fallback(&provider).await;

        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.link_count(), 7);
    }

    #[test]
    fn demo_topology_is_connected_and_deterministic() {
        let a = demo_topology();
        let b = demo_topology();

        assert!(analyzer::is_connected(&a));
        assert_eq!(a, b);
        assert_eq!(a.link(&NodeId::new("R2"), &NodeId::new("R3")).unwrap().capacity, 500);
    }
}

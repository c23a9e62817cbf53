use std::sync::Arc;

use crate::config::Settings;
use crate::domain::orchestrator::SimulationOrchestrator;
use crate::error::Result;
use crate::loader::topology::{HttpTopologyLoader, StaticTopologyProvider, TopologyProvider, demo_topology};
use crate::store::job_store::InMemoryJobStore;

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;
pub mod store;

/// Wires the engine together from settings: the HTTP topology loader when a
/// store URL is configured, the built-in demo topology otherwise, and an
/// in-memory TTL job store.
pub fn build_orchestrator(settings: &Settings) -> Result<SimulationOrchestrator> {
    let provider: Arc<dyn TopologyProvider> = match HttpTopologyLoader::from_settings(settings)? {
        Some(loader) => {
            log::info!("Using topology store at {:?}.", settings.topology_url);
            Arc::new(loader)
        }
        None => {
            log::info!("No topology store configured, serving the built-in demo topology.");
            Arc::new(StaticTopologyProvider::new(demo_topology()))
        }
    };

    let store = Arc::new(InMemoryJobStore::new(settings.job_ttl));

    Ok(SimulationOrchestrator::new(provider, store, settings))
}

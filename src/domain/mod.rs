pub mod analyzer;
pub mod applicator;
pub mod graph;
pub mod id;
pub mod orchestrator;
pub mod simulation;

#[cfg(test)]
mod simulation_tests;

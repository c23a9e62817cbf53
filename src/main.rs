use anyhow::Context;
use clap::Parser;
use std::collections::BTreeMap;
use std::time::Duration;

use nettwin_whatif::api::simulation_dto::SimulationRequestDto;
use nettwin_whatif::auth::{AuthGate, StaticTokenAuth};
use nettwin_whatif::config::Settings;
use nettwin_whatif::domain::simulation::SimulationRequest;
use nettwin_whatif::{build_orchestrator, loader, logger};

/// What-if simulation over a network topology: apply a proposed change to
/// the current baseline and report the impact analysis.
#[derive(Debug, Parser)]
#[command(name = "nettwin-whatif")]
struct Cli {
    /// Path to a JSON file containing the simulation request.
    #[arg(long)]
    request_file: Option<String>,

    /// Inline request: action kind (add_link, remove_link, change_capacity, ...).
    #[arg(long)]
    action: Option<String>,

    #[arg(long)]
    src: Option<String>,

    #[arg(long)]
    dst: Option<String>,

    #[arg(long)]
    capacity: Option<u64>,

    #[arg(long)]
    latency: Option<f64>,

    #[arg(long)]
    node_id: Option<String>,

    /// Credential checked by the auth gate before a job is created.
    #[arg(long, default_value = "demo-token")]
    token: String,

    /// Base URL of the topology store; omit to simulate against the demo topology.
    #[arg(long)]
    topology_url: Option<String>,

    /// How long to wait for the simulation to reach a terminal state.
    #[arg(long, default_value_t = 30)]
    wait_secs: u64,
}

impl Cli {
    fn into_request_dto(self) -> anyhow::Result<SimulationRequestDto> {
        if let Some(path) = &self.request_file {
            return Ok(loader::parse_json_file::<SimulationRequestDto>(path)?);
        }

        let action = self.action.context("either --request-file or --action is required")?;

        Ok(SimulationRequestDto {
            action,
            src: self.src,
            dst: self.dst,
            capacity: self.capacity,
            latency: self.latency,
            cost: None,
            node_id: self.node_id,
            parameters: BTreeMap::new(),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init();

    let cli = Cli::parse();

    let mut settings = Settings::from_env();
    if cli.topology_url.is_some() {
        settings.topology_url = cli.topology_url.clone();
    }

    let gate = StaticTokenAuth::from_settings(&settings);
    let principal = gate.verify(&cli.token).await?;
    log::info!("Authenticated as '{}'.", principal.name);

    let wait_secs = cli.wait_secs;
    let wait = Duration::from_secs(wait_secs);
    let request = SimulationRequest::from_dto(cli.into_request_dto()?)?;

    let orchestrator = build_orchestrator(&settings)?;
    let submitted = orchestrator.submit_simulation(request).await?;

    log::info!("Submitted simulation {}.", submitted.simulation_id);

    match orchestrator.wait_for_terminal(&submitted.simulation_id, wait).await? {
        Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
        None => log::warn!("Simulation {} did not reach a terminal state within {}s.", submitted.simulation_id, wait_secs),
    }

    Ok(())
}

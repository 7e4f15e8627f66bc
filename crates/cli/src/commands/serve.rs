//! `cardiolake serve` — Start the HTTP API server.

use std::sync::Arc;

use cardiolake_fhir::SummaryService;
use cardiolake_gateway::GatewayState;

use super::{CommandResult, agent_invoker, datastore, demo_store, load_config};

pub async fn run(port_override: Option<u16>, demo: bool) -> CommandResult {
    let mut config = load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    let summary = if demo {
        let store = demo_store().await;
        println!("   Demo mode: {} synthetic resources in memory", store.len().await);
        SummaryService::from_config(Arc::new(store), &config.healthlake)
    } else {
        SummaryService::from_config(datastore(&config)?, &config.healthlake)
    };

    // Patient routes work without agents.
    let agents = match agent_invoker(&config) {
        Ok(invoker) => Some(invoker),
        Err(e) => {
            tracing::warn!(error = %e, "Agent runtime unavailable, report and Q&A routes disabled");
            None
        }
    };

    println!("🫀 CardioLake Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Agents:    {}", if agents.is_some() { "enabled" } else { "disabled" });

    let state = Arc::new(GatewayState::new(summary, agents));
    cardiolake_gateway::start(&config, state).await?;

    Ok(())
}

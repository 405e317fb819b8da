//! HTTP host for the gate.

use std::sync::Arc;

use anyhow::Result;

use crate::api::{AppState, create_router};
use crate::config::GateConfig;
use crate::gate::Gate;

/// Build the gate from `config` and serve the router on `bind`.
pub async fn start_gate_http(config: GateConfig, bind: &str) -> Result<()> {
    let gate = Gate::new(&config)?;

    tracing::info!(
        locales = ?gate.locales().locales(),
        default_locale = %gate.locales().default_locale(),
        admins = gate.admins().len(),
        "Gate configured"
    );

    let router = create_router(AppState {
        gate: Arc::new(gate),
        development: config.is_development(),
    });
    let listener = tokio::net::TcpListener::bind(bind).await?;

    if config.is_development() {
        tracing::info!("Gate HTTP server listening on http://{} (development)", bind);
    } else {
        tracing::info!("Gate HTTP server listening on http://{}", bind);
    }

    axum::serve(listener, router).await?;
    Ok(())
}

//! Agent Poker: a multi-table No-Limit Hold'em server for autonomous
//! agents (see SPEC_FULL.md). Architecture mirrors the teacher's
//! coordinator service: one stateless axum router dispatching into
//! per-table actors held in a process-wide map.

mod actor;
mod archive;
mod card;
mod collusion;
mod config;
mod deck;
mod engine;
mod error;
mod gateway;
mod hand_eval;
mod identity;
mod ids;
mod ratelimit;
mod sanitizer;
mod telemetry;
mod view;

use config::Config;
use gateway::AppState;

#[tokio::main]
async fn main() {
    telemetry::init();

    let config = Config::from_env();
    let bind_addr = config.bind_addr.clone();
    if config.admin_key.is_none() {
        tracing::warn!("ADMIN_KEY not set — /table/{{id}}/reset is disabled");
    }

    let state = AppState::new(config);
    gateway::reconcile::spawn(state.clone());
    let app = gateway::router(state);

    tracing::info!("agent-poker listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind BIND_ADDR");
    axum::serve(listener, app).await.expect("server error");
}

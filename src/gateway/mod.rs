//! Stateless HTTP dispatcher: one `async fn` per route, wired onto table
//! actors and the process-local stores. Shape grounded on
//! `coordinator::main`'s `Router::new().route(...).layer(CorsLayer)`
//! assembly.

pub mod auth;
pub mod handlers;
pub mod reconcile;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

use crate::actor::TableActor;
use crate::archive::HandArchive;
use crate::collusion::CollusionAccumulator;
use crate::config::Config;
use crate::identity::IdentityStore;
use crate::ids::TableId;
use crate::ratelimit::{RateLimiter, RateLimits};

/// Cloned into every handler (cheap: everything inside is an `Arc`/atomic).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub identity: Arc<IdentityStore>,
    pub archive: Arc<HandArchive>,
    pub collusion: Arc<CollusionAccumulator>,
    pub rate_limiter: Arc<RateLimiter>,
    pub tables: Arc<RwLock<HashMap<TableId, TableActor>>>,
    next_table_id: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let rate_limiter = RateLimiter::with_limits(RateLimits::from(&config));
        Self {
            config: Arc::new(config),
            identity: Arc::new(IdentityStore::new()),
            archive: Arc::new(HandArchive::new()),
            collusion: Arc::new(CollusionAccumulator::new()),
            rate_limiter: Arc::new(rate_limiter),
            tables: Arc::new(RwLock::new(HashMap::new())),
            next_table_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Table ids are monotonic and never reused (DESIGN.md Open Question #2).
    pub fn next_table_id(&self) -> TableId {
        TableId(self.next_table_id.fetch_add(1, Ordering::Relaxed))
    }

    pub async fn table(&self, id: TableId) -> Option<TableActor> {
        self.tables.read().await.get(&id).cloned()
    }

    pub async fn create_table(&self) -> TableActor {
        let id = self.next_table_id();
        let actor = TableActor::spawn(id, self.identity.clone());
        self.tables.write().await.insert(id, actor.clone());
        actor
    }

    /// Returns any table with fewer than `max_table_seats` players,
    /// creating a fresh one if none has room.
    pub async fn find_or_create_open_table(&self) -> TableActor {
        {
            let tables = self.tables.read().await;
            for actor in tables.values() {
                if actor.get_summary().await.seated < self.config.max_table_seats {
                    return actor.clone();
                }
            }
        }
        self.create_table().await
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/me", get(handlers::me))
        .route("/rebuy", post(handlers::rebuy))
        .route("/table/join", post(handlers::table_join))
        .route("/table/leave", post(handlers::table_leave))
        .route("/table/sit-out", post(handlers::table_sit_out))
        .route("/table/sit-in", post(handlers::table_sit_in))
        .route("/table/state", get(handlers::table_state))
        .route("/table/act", post(handlers::table_act))
        .route("/table/chat", post(handlers::table_chat))
        .route("/table/history", get(handlers::table_history))
        .route("/table/{id}/spectate", get(handlers::table_spectate))
        .route("/table/{id}/history", get(handlers::table_public_history))
        .route("/table/{id}/reset", post(handlers::table_reset))
        .route("/leaderboard", get(handlers::leaderboard))
        .route("/stats", get(handlers::stats))
        .route("/collusion", get(handlers::collusion))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

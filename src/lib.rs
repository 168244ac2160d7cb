//! In-memory replicated ledger node: hash-linked blocks, HTTP surface and
//! longest-valid-chain consensus between peers.

pub mod config;
pub mod consensus;
pub mod error;
pub mod model;
pub mod peers;
pub mod routes;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use parking_lot::RwLock;

use crate::config::NodeConfig;
use crate::consensus::Coordinator;
use crate::error::NodeResult;
use crate::model::{Ledger, SharedLedger};
use crate::peers::PeerRegistry;

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub ledger: SharedLedger,
    pub peers: Arc<PeerRegistry>,
    pub consensus: Arc<Coordinator>,
}

impl AppState {
    /// Fresh node state: genesis ledger plus the configured peers.
    pub fn new(config: &NodeConfig) -> NodeResult<Self> {
        Self::with_ledger(Ledger::genesis(), config)
    }

    pub fn with_ledger(ledger: Ledger, config: &NodeConfig) -> NodeResult<Self> {
        let peers = PeerRegistry::new();
        peers.register(&config.peers);
        Ok(Self {
            ledger: Arc::new(RwLock::new(ledger)),
            peers: Arc::new(peers),
            consensus: Arc::new(Coordinator::new(config.peer_timeout(), config.validation)?),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/new_block", post(routes::new_block))
        .route("/get_chain", get(routes::get_chain))
        .route("/add_nodes", post(routes::add_nodes))
        .route("/consensus", get(routes::consensus))
        .route("/validate", get(routes::validate_chain))
        .route("/health", get(routes::health))
        .route("/version", get(routes::version))
        .with_state(state)
}

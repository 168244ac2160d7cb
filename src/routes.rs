//! HTTP routes for appending blocks, serving the chain, peers and consensus.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::LedgerError;
use crate::model::{Block, ChainSnapshot};
use crate::AppState;

/// Block as submitted by a client. Linkage fields are accepted but the
/// ledger recomputes them.
#[derive(Deserialize)]
pub struct NewBlock {
    pub index: u64,
    pub timestamp: f64,
    pub data: Value,
    pub previous_hash: String,
}

#[derive(Serialize, Deserialize)]
pub struct MessageResp {
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct NodesResp {
    pub message: String,
    pub total_nodes: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResp {
    pub error: String,
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResp { error: self.message })).into_response()
    }
}

fn message(text: &str) -> Json<MessageResp> {
    Json(MessageResp {
        message: text.to_string(),
    })
}

/// POST /new_block
pub async fn new_block(
    State(state): State<AppState>,
    Json(payload): Json<NewBlock>,
) -> Result<(StatusCode, Json<MessageResp>), ApiError> {
    let candidate = Block::new(
        payload.index,
        payload.timestamp,
        payload.data,
        payload.previous_hash,
    );
    let mut guard = state.ledger.write();
    let added = guard.append(candidate)?;
    debug!(index = added.index, hash = %added.hash, "block appended");
    drop(guard);

    Ok((StatusCode::CREATED, message("Block added successfully")))
}

/// GET /get_chain
pub async fn get_chain(State(state): State<AppState>) -> Json<ChainSnapshot> {
    Json(state.ledger.read().snapshot())
}

/// POST /add_nodes — body is a JSON array of addresses.
pub async fn add_nodes(
    State(state): State<AppState>,
    payload: Option<Json<Vec<String>>>,
) -> Result<(StatusCode, Json<NodesResp>), ApiError> {
    let nodes = match payload {
        Some(Json(nodes)) if !nodes.is_empty() => nodes,
        _ => return Err(ApiError::bad_request("No nodes")),
    };
    let added = state.peers.register(&nodes);
    if added == 0 && state.peers.is_empty() {
        return Err(ApiError::bad_request("No nodes"));
    }
    let total_nodes = state.peers.addresses();
    info!(added, total = total_nodes.len(), "peers registered");

    Ok((
        StatusCode::CREATED,
        Json(NodesResp {
            message: "Nodes added successfully".into(),
            total_nodes,
        }),
    ))
}

/// GET /consensus
pub async fn consensus(State(state): State<AppState>) -> Json<MessageResp> {
    let outcome = state.consensus.run(&state.ledger, &state.peers).await;
    if outcome.replaced() {
        message("Blockchain replaced")
    } else {
        message("No consensus required")
    }
}

/// GET /validate — audit the local chain; returns { ok, errors[] }
#[derive(Serialize, Deserialize)]
pub struct ValidateResp {
    pub ok: bool,
    pub errors: Vec<String>,
}
pub async fn validate_chain(State(state): State<AppState>) -> Json<ValidateResp> {
    let mode = state.consensus.mode();
    let errors: Vec<String> = state
        .ledger
        .read()
        .violations(mode)
        .iter()
        .map(ToString::to_string)
        .collect();

    Json(ValidateResp {
        ok: errors.is_empty(),
        errors,
    })
}

/// GET /health
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub length: usize,
    pub peers: usize,
}
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        length: state.ledger.read().len(),
        peers: state.peers.len(),
    })
}

/// GET /version
#[derive(Serialize)]
pub struct Version {
    pub version: &'static str,
    pub git_sha: Option<&'static str>,
}
pub async fn version() -> Json<Version> {
    Json(Version {
        version: env!("CARGO_PKG_VERSION"),
        git_sha: option_env!("GIT_SHA"),
    })
}

use crate::client::HttpPeerClient;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use peerchain_core::{unix_now, Block, LedgerError, MineOutcome, NewTransaction, Node};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub type SharedNode = Arc<Node<HttpPeerClient>>;

#[derive(Clone)]
pub struct AppState {
    pub node: SharedNode,
    /// Address we announce when registering with another node.
    pub advertise: String,
    pub reconcile_on_read: bool,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Deserialize)]
struct ChainQuery {
    reconcile: Option<bool>,
}

#[derive(Deserialize)]
struct NodeAddressIn {
    node_address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MineResult {
    pub mined: bool,
    pub index: Option<u64>,
    pub message: String,
}

/// Core errors rendered as HTTP responses.
pub struct ApiError(LedgerError);

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            LedgerError::PeerUnreachable { .. } => StatusCode::BAD_GATEWAY,
            LedgerError::MiningAborted { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/new_transaction", post(new_transaction))
        .route("/chain", get(get_chain))
        .route("/mine", get(mine))
        .route("/pending_transactions", get(pending_transactions))
        .route("/add_nodes", post(add_nodes))
        .route("/add_block", post(add_block))
        .route("/register_with", post(register_with))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn new_transaction(
    State(state): State<AppState>,
    Json(incoming): Json<NewTransaction>,
) -> Result<impl IntoResponse, ApiError> {
    let tx = incoming.into_transaction(unix_now())?;
    state.node.submit_transaction(tx).await?;
    Ok((StatusCode::CREATED, "Success"))
}

async fn get_chain(
    State(state): State<AppState>,
    Query(query): Query<ChainQuery>,
) -> impl IntoResponse {
    if query.reconcile.unwrap_or(state.reconcile_on_read) {
        state.node.reconcile().await;
    }
    Json(state.node.chain_dump().await)
}

async fn mine(State(state): State<AppState>) -> Result<Json<MineResult>, ApiError> {
    let result = match state.node.mine().await? {
        MineOutcome::Mined { index } => MineResult {
            mined: true,
            index: Some(index),
            message: format!("Block #{index} is mined."),
        },
        MineOutcome::NothingToMine => MineResult {
            mined: false,
            index: None,
            message: "No transactions to mine".into(),
        },
        MineOutcome::Cancelled => MineResult {
            mined: false,
            index: None,
            message: "Mining was cancelled".into(),
        },
    };
    Ok(Json(result))
}

async fn pending_transactions(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.node.pending_transactions().await)
}

async fn add_nodes(
    State(state): State<AppState>,
    Json(body): Json<NodeAddressIn>,
) -> Result<impl IntoResponse, ApiError> {
    let address = body
        .node_address
        .ok_or_else(|| LedgerError::malformed("missing `node_address`"))?;
    state.node.register_peer(&address).await?;
    Ok(Json(state.node.chain_dump().await))
}

async fn add_block(
    State(state): State<AppState>,
    Json(block): Json<Block>,
) -> Result<impl IntoResponse, ApiError> {
    state.node.accept_block(block).await?;
    Ok((StatusCode::CREATED, "A new block was added to the blockchain"))
}

async fn register_with(
    State(state): State<AppState>,
    Json(body): Json<NodeAddressIn>,
) -> Result<impl IntoResponse, ApiError> {
    let remote = body
        .node_address
        .ok_or_else(|| LedgerError::malformed("missing `node_address`"))?;
    match state.node.register_with(&remote, &state.advertise).await {
        Ok(adopted) => Ok(Json(serde_json::json!({
            "registered": true,
            "adopted_chain": adopted,
            "length": state.node.chain_len().await,
        }))),
        Err(e) => {
            warn!(remote = %remote, error = %e, "registration failed");
            Err(e.into())
        }
    }
}

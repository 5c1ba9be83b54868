//! Axum REST API handlers.

use std::sync::Arc;

use alloy_primitives::Address;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::agents::SyncedAgent;
use crate::client::LaunchpadClient;
use crate::dashboard::{self, DashboardData, ProbedAgents, DEFAULT_PAGE_SIZE};
use crate::db;
use crate::errors::LaunchpadError;
use crate::events::EventRecord;
use crate::networks::NetworkConfig;
use crate::txlog::{TransactionLog, TransactionRecord};
use crate::units::{decimal_string, parse_base_units, TokenAmount};
use crate::views::{
    AgentInfo, BondedTokenView, CreatedAgent, InProgressAgentView, LiquidityOutcome, Page,
    PairView, PlatformSettings, PoolReserves, SwapOutcome, TotalCounts, TxOutcome,
};
use crate::writes::CreateAgentParams;

#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
    pub client: LaunchpadClient,
    pub txlog: TransactionLog,
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/network", get(get_network))
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/probe", get(probe_agents))
        .route("/platform", get(get_platform))
        .route("/counts", get(get_counts))
        .route("/bonded", get(get_bonded))
        .route("/in-progress", get(get_in_progress))
        .route("/pairs", get(get_pairs))
        .route("/agents", post(create_agent))
        .route("/agents-by-time", get(get_agents_by_time))
        .route("/agents/:id", get(get_agent))
        .route("/agents/:id/events", get(get_agent_events))
        .route("/agents/:id/synced", get(get_synced_agent))
        .route("/agents/:id/reserves", get(get_reserves))
        .route("/agents/:id/contribute", post(contribute))
        .route("/agents/:id/liquidity", post(add_liquidity))
        .route("/agents/:id/buy", post(buy))
        .route("/agents/:id/sell", post(sell))
        .route("/creators/:address/agents", get(get_creator_agents))
        .route("/tokens/:address/agent", get(get_token_agent))
        .route("/tokens/:address/balances/:holder", get(get_token_balance))
        .route("/amm/amount-out", get(amount_out))
        .route("/amm/amount-in", get(amount_in))
        .route("/amm/quote", get(quote))
        .route("/events", get(get_all_events))
        .route(
            "/transactions/:address",
            get(get_transactions).delete(clear_transactions),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A failed request: status plus the `{ "error": … }` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

/// 400 for bad input, 409 for state conflicts (no wallet, reverts, agent not
/// bonded), 502 for node and transport failures, 500 otherwise.
pub fn status_for(err: &LaunchpadError) -> StatusCode {
    match err.root() {
        LaunchpadError::Amount { .. } | LaunchpadError::InvalidSlippage(_) => {
            StatusCode::BAD_REQUEST
        }
        LaunchpadError::WalletNotConnected
        | LaunchpadError::NotBonded(_)
        | LaunchpadError::Reverted { .. } => StatusCode::CONFLICT,
        LaunchpadError::Rpc { code, reason, .. } if reason.is_some() || *code == 3 => {
            StatusCode::CONFLICT
        }
        LaunchpadError::Rpc { .. }
        | LaunchpadError::Http(_)
        | LaunchpadError::RateLimited
        | LaunchpadError::EmptyResult(_)
        | LaunchpadError::ReceiptTimeout { .. }
        | LaunchpadError::Abi(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<LaunchpadError> for ApiError {
    fn from(err: LaunchpadError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            warn!("Request failed: {err}");
        }
        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkResponse {
    #[serde(flatten)]
    pub network: NetworkConfig,
    pub wallet: Option<Address>,
    pub wallet_connected: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    pub agent_id: String,
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct AllEventsResponse {
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentIdsResponse {
    pub agent_ids: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAgentResponse {
    pub token_address: Address,
    pub agent_id: String,
}

#[derive(Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub offset: u64,
    pub limit: Option<u64>,
}

#[derive(Deserialize)]
pub struct DashboardQuery {
    pub page_size: Option<u64>,
}

#[derive(Deserialize)]
pub struct ProbeQuery {
    /// Highest bonded agent id already known to the caller.
    pub highest: Option<u64>,
}

#[derive(Deserialize)]
pub struct TimeRangeQuery {
    pub start: u64,
    pub end: u64,
}

#[derive(Deserialize)]
pub struct EventsQuery {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

/// AMM previews take integer base-unit strings.
#[derive(Deserialize)]
pub struct AmountOutQuery {
    pub amount_in: String,
    pub reserve_in: String,
    pub reserve_out: String,
}

#[derive(Deserialize)]
pub struct AmountInQuery {
    pub amount_out: String,
    pub reserve_in: String,
    pub reserve_out: String,
}

#[derive(Deserialize)]
pub struct QuoteQuery {
    pub amount_a: String,
    pub reserve_a: String,
    pub reserve_b: String,
}

#[derive(Deserialize)]
pub struct ContributeRequest {
    #[serde(deserialize_with = "decimal_string")]
    pub amount: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityRequest {
    #[serde(deserialize_with = "decimal_string")]
    pub token_amount: String,
    #[serde(deserialize_with = "decimal_string")]
    pub eth_amount: String,
    pub slippage: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyRequest {
    #[serde(deserialize_with = "decimal_string")]
    pub eth_amount: String,
    pub slippage: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellRequest {
    #[serde(deserialize_with = "decimal_string")]
    pub token_amount: String,
    pub slippage: Option<u32>,
}

// ─────────────────────────────────────────────────────────
// Handlers: status and snapshots
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /network`
pub async fn get_network(State(state): State<Arc<ApiState>>) -> Json<NetworkResponse> {
    let wallet = state.client.wallet();
    Json(NetworkResponse {
        network: state.client.network().clone(),
        wallet,
        wallet_connected: wallet.is_some(),
    })
}

/// `GET /dashboard?page_size`
pub async fn get_dashboard(
    State(state): State<Arc<ApiState>>,
    Query(q): Query<DashboardQuery>,
) -> ApiResult<DashboardData> {
    let page_size = q.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    Ok(Json(dashboard::get_dashboard_data(&state.client, page_size).await?))
}

/// `GET /dashboard/probe?highest`
///
/// Sequential id scan; slow by nature, one RPC read per candidate id.
/// The window is capped by the on-chain agent count.
pub async fn probe_agents(
    State(state): State<Arc<ApiState>>,
    Query(q): Query<ProbeQuery>,
) -> ApiResult<ProbedAgents> {
    Ok(Json(dashboard::probe_agents(&state.client, q.highest).await?))
}

/// `GET /platform`
pub async fn get_platform(State(state): State<Arc<ApiState>>) -> ApiResult<PlatformSettings> {
    Ok(Json(state.client.get_platform_settings().await?))
}

/// `GET /counts`
pub async fn get_counts(State(state): State<Arc<ApiState>>) -> ApiResult<TotalCounts> {
    Ok(Json(state.client.get_total_counts().await?))
}

// ─────────────────────────────────────────────────────────
// Handlers: agents
// ─────────────────────────────────────────────────────────

/// `GET /bonded?offset&limit`
pub async fn get_bonded(
    State(state): State<Arc<ApiState>>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Page<BondedTokenView>> {
    let limit = q.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    Ok(Json(
        state
            .client
            .get_bonded_tokens_paginated(q.offset, limit)
            .await?,
    ))
}

/// `GET /in-progress?offset&limit`
pub async fn get_in_progress(
    State(state): State<Arc<ApiState>>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Page<InProgressAgentView>> {
    let limit = q.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    Ok(Json(
        state
            .client
            .get_in_progress_agents_paginated(q.offset, limit)
            .await?,
    ))
}

/// `GET /agents/:id`
pub async fn get_agent(
    State(state): State<Arc<ApiState>>,
    Path(agent_id): Path<u64>,
) -> ApiResult<AgentInfo> {
    let agent = state.client.get_agent_info(agent_id).await?;
    if !agent.exists() {
        return Err(ApiError::not_found(format!("Agent {agent_id} not found")));
    }
    Ok(Json(agent))
}

/// `GET /agents/:id/synced`
///
/// The agent record folded by the indexer from lifecycle events.
pub async fn get_synced_agent(
    State(state): State<Arc<ApiState>>,
    Path(agent_id): Path<u64>,
) -> ApiResult<SyncedAgent> {
    match db::get_synced_agent(&state.pool, &agent_id.to_string()).await? {
        Some(record) => Ok(Json(record.into())),
        None => Err(ApiError::not_found(format!("Agent {agent_id} has not been synced"))),
    }
}

/// `GET /agents/:id/events`
///
/// Returns all indexed events for the given agent.
pub async fn get_agent_events(
    State(state): State<Arc<ApiState>>,
    Path(agent_id): Path<u64>,
) -> ApiResult<EventsResponse> {
    let agent_id = agent_id.to_string();
    let events = db::get_events_for_agent(&state.pool, &agent_id).await?;
    Ok(Json(EventsResponse {
        agent_id,
        count: events.len(),
        events,
    }))
}

/// `GET /agents-by-time?start&end`
pub async fn get_agents_by_time(
    State(state): State<Arc<ApiState>>,
    Query(q): Query<TimeRangeQuery>,
) -> ApiResult<AgentIdsResponse> {
    if q.start > q.end {
        return Err(ApiError::bad_request("start must not be after end"));
    }
    let agent_ids = state.client.get_agents_by_time_range(q.start, q.end).await?;
    Ok(Json(AgentIdsResponse { agent_ids }))
}

/// `GET /creators/:address/agents`
pub async fn get_creator_agents(
    State(state): State<Arc<ApiState>>,
    Path(creator): Path<Address>,
) -> ApiResult<AgentIdsResponse> {
    let agent_ids = state.client.get_agents_by_creator(creator).await?;
    Ok(Json(AgentIdsResponse { agent_ids }))
}

/// `GET /tokens/:address/agent`
pub async fn get_token_agent(
    State(state): State<Arc<ApiState>>,
    Path(token_address): Path<Address>,
) -> ApiResult<TokenAgentResponse> {
    let agent_id = state.client.get_agent_by_token_address(token_address).await?;
    Ok(Json(TokenAgentResponse {
        token_address,
        agent_id,
    }))
}

/// `GET /tokens/:address/balances/:holder`
pub async fn get_token_balance(
    State(state): State<Arc<ApiState>>,
    Path((token, holder)): Path<(Address, Address)>,
) -> ApiResult<TokenAmount> {
    Ok(Json(state.client.token_balance(token, holder).await?))
}

// ─────────────────────────────────────────────────────────
// Handlers: AMM
// ─────────────────────────────────────────────────────────

/// `GET /pairs`
pub async fn get_pairs(State(state): State<Arc<ApiState>>) -> ApiResult<Vec<PairView>> {
    Ok(Json(state.client.get_all_pairs().await?))
}

/// `GET /agents/:id/reserves`
pub async fn get_reserves(
    State(state): State<Arc<ApiState>>,
    Path(agent_id): Path<u64>,
) -> ApiResult<PoolReserves> {
    Ok(Json(state.client.get_pool_reserves(agent_id).await?))
}

/// `GET /amm/amount-out?amount_in&reserve_in&reserve_out`
pub async fn amount_out(
    State(state): State<Arc<ApiState>>,
    Query(q): Query<AmountOutQuery>,
) -> ApiResult<TokenAmount> {
    let amount = state
        .client
        .get_amount_out(
            parse_base_units(&q.amount_in)?,
            parse_base_units(&q.reserve_in)?,
            parse_base_units(&q.reserve_out)?,
        )
        .await?;
    Ok(Json(amount))
}

/// `GET /amm/amount-in?amount_out&reserve_in&reserve_out`
pub async fn amount_in(
    State(state): State<Arc<ApiState>>,
    Query(q): Query<AmountInQuery>,
) -> ApiResult<TokenAmount> {
    let amount = state
        .client
        .get_amount_in(
            parse_base_units(&q.amount_out)?,
            parse_base_units(&q.reserve_in)?,
            parse_base_units(&q.reserve_out)?,
        )
        .await?;
    Ok(Json(amount))
}

/// `GET /amm/quote?amount_a&reserve_a&reserve_b`
pub async fn quote(
    State(state): State<Arc<ApiState>>,
    Query(q): Query<QuoteQuery>,
) -> ApiResult<TokenAmount> {
    let amount = state
        .client
        .quote(
            parse_base_units(&q.amount_a)?,
            parse_base_units(&q.reserve_a)?,
            parse_base_units(&q.reserve_b)?,
        )
        .await?;
    Ok(Json(amount))
}

// ─────────────────────────────────────────────────────────
// Handlers: indexed events and transaction log
// ─────────────────────────────────────────────────────────

/// `GET /events?type`
///
/// Returns all indexed events, optionally of a single type.
pub async fn get_all_events(
    State(state): State<Arc<ApiState>>,
    Query(q): Query<EventsQuery>,
) -> ApiResult<AllEventsResponse> {
    let events = db::get_all_events(&state.pool, q.event_type.as_deref()).await?;
    Ok(Json(AllEventsResponse {
        count: events.len(),
        events,
    }))
}

/// `GET /transactions/:address`
pub async fn get_transactions(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<Address>,
) -> ApiResult<Vec<TransactionRecord>> {
    let chain_id = state.client.network().chain_id;
    Ok(Json(
        state.txlog.recent_transactions(address, chain_id).await?,
    ))
}

/// `DELETE /transactions/:address`
pub async fn clear_transactions(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<Address>,
) -> std::result::Result<StatusCode, ApiError> {
    let chain_id = state.client.network().chain_id;
    state.txlog.clear_transactions(address, chain_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Append a confirmed write to the sender's transaction log. A storage
/// failure is logged; the transaction itself already succeeded.
async fn record(state: &ApiState, kind: &str, outcome: &TxOutcome, details: Value) {
    let Some(wallet) = state.client.wallet() else {
        return;
    };
    let network = state.client.network();
    let entry = TransactionRecord {
        hash: outcome.tx_hash.to_string(),
        kind: kind.to_string(),
        timestamp: Utc::now().timestamp_millis(),
        explorer_url: outcome.explorer_url.clone(),
        network: network.name.clone(),
        details,
    };
    if let Err(e) = state
        .txlog
        .add_transaction(wallet, network.chain_id, entry)
        .await
    {
        warn!("Failed to record transaction {}: {e}", outcome.tx_hash);
    }
}

// ─────────────────────────────────────────────────────────
// Handlers: writes
// ─────────────────────────────────────────────────────────

/// `POST /agents`
pub async fn create_agent(
    State(state): State<Arc<ApiState>>,
    Json(params): Json<CreateAgentParams>,
) -> ApiResult<CreatedAgent> {
    let created = state.client.create_agent(&params).await?;
    record(
        &state,
        "createAgent",
        &created.outcome,
        json!({
            "name": params.name,
            "symbol": params.symbol,
            "fundingTarget": params.funding_target,
            "agentId": created.agent_id,
        }),
    )
    .await;
    Ok(Json(created))
}

/// `POST /agents/:id/contribute`
pub async fn contribute(
    State(state): State<Arc<ApiState>>,
    Path(agent_id): Path<u64>,
    Json(req): Json<ContributeRequest>,
) -> ApiResult<TxOutcome> {
    let outcome = state.client.contribute(agent_id, &req.amount).await?;
    record(
        &state,
        "contribute",
        &outcome,
        json!({ "agentId": agent_id.to_string(), "amount": req.amount }),
    )
    .await;
    Ok(Json(outcome))
}

/// `POST /agents/:id/liquidity`
pub async fn add_liquidity(
    State(state): State<Arc<ApiState>>,
    Path(agent_id): Path<u64>,
    Json(req): Json<LiquidityRequest>,
) -> ApiResult<LiquidityOutcome> {
    let added = state
        .client
        .add_liquidity(agent_id, &req.token_amount, &req.eth_amount, req.slippage)
        .await?;
    if let Some(approval) = &added.approval {
        record(&state, "approve", approval, json!({ "agentId": agent_id.to_string() })).await;
    }
    record(
        &state,
        "addLiquidity",
        &added.outcome,
        json!({
            "agentId": agent_id.to_string(),
            "tokenAmount": req.token_amount,
            "ethAmount": req.eth_amount,
        }),
    )
    .await;
    Ok(Json(added))
}

/// `POST /agents/:id/buy`
pub async fn buy(
    State(state): State<Arc<ApiState>>,
    Path(agent_id): Path<u64>,
    Json(req): Json<BuyRequest>,
) -> ApiResult<SwapOutcome> {
    let swap = state
        .client
        .swap_eth_for_tokens(agent_id, &req.eth_amount, req.slippage)
        .await?;
    record_swap(&state, agent_id, true, &swap).await;
    Ok(Json(swap))
}

/// `POST /agents/:id/sell`
pub async fn sell(
    State(state): State<Arc<ApiState>>,
    Path(agent_id): Path<u64>,
    Json(req): Json<SellRequest>,
) -> ApiResult<SwapOutcome> {
    let swap = state
        .client
        .swap_tokens_for_eth(agent_id, &req.token_amount, req.slippage)
        .await?;
    record_swap(&state, agent_id, false, &swap).await;
    Ok(Json(swap))
}

async fn record_swap(state: &ApiState, agent_id: u64, is_buy: bool, swap: &SwapOutcome) {
    if let Some(approval) = &swap.approval {
        record(state, "approve", approval, json!({ "agentId": agent_id.to_string() })).await;
    }
    record(
        state,
        "swap",
        &swap.outcome,
        json!({
            "agentId": agent_id.to_string(),
            "isBuy": is_buy,
            "amountIn": swap.amount_in.formatted,
            "minAmountOut": swap.min_amount_out.formatted,
        }),
    )
    .await;
}

//! REST API handlers for treasury operations
//!
//! The server acts as the operator: every controller or minter call is made
//! with the operator's address. All chain mutations hold the chain write
//! lock from the balance snapshot through persistence, and run on a copy of
//! the state that replaces the shared one only after it has been saved.

use crate::api::websocket::{WsBroadcaster, WsEvent};
use crate::config::AppConfig;
use crate::contract::ContractError;
use crate::core::{Address, ChainState, LedgerError, LedgerReader};
use crate::retry::retry_async;
use crate::storage::{validate_username, Storage, UserRecord, UserStore, UserStoreError};
use crate::token::TokenError;
use crate::treasury::{
    DisbursementOutcome, ShortfallReport, TreasuryError, TreasuryStats,
};
use crate::wallet::WalletManager;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub chain: Arc<RwLock<ChainState>>,
    pub storage: Arc<Storage>,
    pub users: Arc<RwLock<UserStore>>,
    pub wallet_manager: Arc<RwLock<WalletManager>>,
    /// Identity used for controller and minter calls
    pub operator: Address,
    pub config: Arc<AppConfig>,
    pub ws_broadcaster: Arc<WsBroadcaster>,
}

impl ApiState {
    pub fn new(
        chain: ChainState,
        storage: Storage,
        users: UserStore,
        wallet_manager: WalletManager,
        operator: Address,
        config: AppConfig,
    ) -> Self {
        Self {
            chain: Arc::new(RwLock::new(chain)),
            storage: Arc::new(storage),
            users: Arc::new(RwLock::new(users)),
            wallet_manager: Arc::new(RwLock::new(wallet_manager)),
            operator,
            config: Arc::new(config),
            ws_broadcaster: Arc::new(WsBroadcaster::new()),
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
    /// Present when a batch failed the aggregate pre-check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortfall: Option<ShortfallReport>,
}

type ApiFailure = (StatusCode, Json<ApiError>);
type ApiResult<T> = Result<Json<T>, ApiFailure>;

#[derive(Serialize)]
pub struct TreasuryInfo {
    pub contract: Address,
    pub name: String,
    pub symbol: String,
    pub balance: u128,
    pub controller: Address,
    pub minters: Vec<Address>,
    pub stats: TreasuryStats,
    pub tokens_minted: u64,
}

#[derive(Serialize)]
pub struct DepositResponse {
    pub from: Address,
    pub amount: u128,
    pub treasury_balance: u128,
}

#[derive(Serialize)]
pub struct SweepResponse {
    pub to: Address,
    pub amount: u128,
    pub treasury_balance: u128,
}

#[derive(Serialize)]
pub struct MinterResponse {
    pub address: Address,
    /// False when the role was already held (add) or is now gone (remove)
    pub changed: bool,
    pub minters: Vec<Address>,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub username: String,
    pub address: Address,
    pub created_at: DateTime<Utc>,
    pub balance: u128,
    pub tokens: Vec<u64>,
    pub check_ins: u64,
}

#[derive(Serialize)]
pub struct MintResponse {
    pub token_id: u64,
    pub to: Address,
    pub token_uri: String,
}

#[derive(Serialize)]
pub struct CheckInResponse {
    pub address: Address,
    pub count: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub address: Address,
    pub balance: u128,
    pub nft_balance: u64,
    pub roles: Vec<String>,
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct DepositRequest {
    #[serde(default)]
    pub from: Option<String>,
    pub amount: u128,
}

#[derive(Deserialize)]
pub struct TopUpRequestBody {
    /// Defaults to every registered user's wallet; `null` entries are kept
    pub recipients: Option<Vec<Option<String>>>,
    pub amount: Option<u128>,
    pub threshold: Option<u128>,
}

#[derive(Deserialize)]
pub struct SweepRequest {
    pub to: String,
    pub amount: u128,
}

#[derive(Deserialize)]
pub struct MinterRequest {
    pub address: String,
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
}

#[derive(Deserialize)]
pub struct MintRequest {
    pub token_uri: String,
}

// ============================================================================
// Error mapping
// ============================================================================

fn failure(status: StatusCode, error: impl Into<String>) -> ApiFailure {
    (
        status,
        Json(ApiError {
            error: error.into(),
            shortfall: None,
        }),
    )
}

fn bad_request(error: impl Into<String>) -> ApiFailure {
    failure(StatusCode::BAD_REQUEST, error)
}

fn internal(error: impl Into<String>) -> ApiFailure {
    failure(StatusCode::INTERNAL_SERVER_ERROR, error)
}

fn parse_address(value: &str) -> Result<Address, ApiFailure> {
    value
        .parse()
        .map_err(|e| bad_request(format!("Invalid address {}: {}", value, e)))
}

fn treasury_status(err: &TreasuryError) -> StatusCode {
    match err {
        TreasuryError::Unauthorized { .. } => StatusCode::FORBIDDEN,
        TreasuryError::InsufficientTreasury { .. } => StatusCode::CONFLICT,
        TreasuryError::TransferRejected { .. } => StatusCode::BAD_GATEWAY,
        TreasuryError::NotMinter(_) => StatusCode::CONFLICT,
        TreasuryError::Ledger(LedgerError::Rejected { .. }) => StatusCode::BAD_GATEWAY,
        TreasuryError::AmountOverflow
        | TreasuryError::InvalidAmount
        | TreasuryError::InvalidRecipient
        | TreasuryError::Ledger(_) => StatusCode::BAD_REQUEST,
    }
}

fn contract_error(err: ContractError) -> ApiFailure {
    let status = match &err {
        ContractError::NotFound(_) | ContractError::NoDeployment => StatusCode::NOT_FOUND,
        ContractError::AlreadyExists(_) => StatusCode::CONFLICT,
        ContractError::Treasury(e) => treasury_status(e),
        ContractError::Token(TokenError::NotMinter(_) | TokenError::NotOwner { .. }) => {
            StatusCode::FORBIDDEN
        }
        ContractError::Token(TokenError::TokenNotFound(_)) => StatusCode::NOT_FOUND,
        ContractError::Token(_) => StatusCode::BAD_REQUEST,
    };

    let shortfall = match &err {
        ContractError::Treasury(e) => ShortfallReport::from_error(e),
        _ => None,
    };

    (
        status,
        Json(ApiError {
            error: err.to_string(),
            shortfall,
        }),
    )
}

fn user_error(err: UserStoreError) -> ApiFailure {
    let status = match &err {
        UserStoreError::AlreadyExists(_) => StatusCode::CONFLICT,
        UserStoreError::NotFound(_) => StatusCode::NOT_FOUND,
        UserStoreError::InvalidUsername => StatusCode::BAD_REQUEST,
        UserStoreError::IoError(_) | UserStoreError::SerializationError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    failure(status, err.to_string())
}

/// Write the chain state to disk, retrying transient failures
async fn persist(state: &ApiState, chain: &ChainState) -> Result<(), ApiFailure> {
    let storage = state.storage.as_ref();
    retry_async(&state.config.retry, "save chain state", || async move {
        storage.save(chain)
    })
    .await
    .map_err(|e| internal(format!("Failed to save chain state: {}", e)))
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// GET /api/treasury - Treasury and role info for the latest deployment
pub async fn get_treasury(State(state): State<ApiState>) -> ApiResult<TreasuryInfo> {
    let chain = state.chain.read().await;
    let address = chain.contracts.latest().map_err(contract_error)?;
    let contract = chain.contracts.get(&address).map_err(contract_error)?;
    let treasury = &contract.treasury;

    Ok(Json(TreasuryInfo {
        contract: address,
        name: contract.collection.name().to_string(),
        symbol: contract.collection.symbol().to_string(),
        balance: treasury.balance(),
        controller: *treasury.controller(),
        minters: treasury.roles().minters().copied().collect(),
        stats: treasury.stats().clone(),
        tokens_minted: contract.collection.total_supply(),
    }))
}

/// POST /api/treasury/deposit - Fund the treasury from a ledger account
///
/// `from` defaults to the operator. A named `from` is debited as-is: the
/// server holds no keys for it and performs no signature check, so this
/// endpoint must only be exposed to callers trusted with every account.
pub async fn deposit(
    State(state): State<ApiState>,
    Json(req): Json<DepositRequest>,
) -> ApiResult<DepositResponse> {
    let from = match req.from.as_deref() {
        Some(from) => parse_address(from)?,
        None => state.operator,
    };

    let mut chain = state.chain.write().await;
    let mut next = chain.clone();
    let event = next
        .deposit(None, &from, req.amount)
        .map_err(contract_error)?;
    persist(&state, &next).await?;
    *chain = next;

    state.ws_broadcaster.broadcast(WsEvent::TreasuryFunded {
        from,
        amount: event.amount,
        balance: event.balance_after,
    });

    Ok(Json(DepositResponse {
        from,
        amount: event.amount,
        treasury_balance: event.balance_after,
    }))
}

/// POST /api/treasury/topup - Run one disbursement batch
pub async fn top_up(
    State(state): State<ApiState>,
    Json(req): Json<TopUpRequestBody>,
) -> ApiResult<DisbursementOutcome> {
    let recipients: Vec<Option<Address>> = match req.recipients {
        Some(list) => list
            .iter()
            .map(|r| r.as_deref().map(parse_address).transpose())
            .collect::<Result<_, _>>()?,
        None => state
            .users
            .read()
            .await
            .addresses()
            .into_iter()
            .map(Some)
            .collect(),
    };

    let settings = state.config.topup.settings(req.amount, req.threshold);

    let mut chain = state.chain.write().await;
    let mut next = chain.clone();
    let outcome = next
        .top_up(None, &state.operator, &recipients, settings)
        .map_err(contract_error)?;
    persist(&state, &next).await?;
    *chain = next;

    state.ws_broadcaster.broadcast(WsEvent::TopUpCompleted {
        sent: outcome.sent_count(),
        skipped: outcome.skipped_count(),
        total_sent: outcome.total_sent,
        treasury_after: outcome.treasury_after,
    });

    Ok(Json(outcome))
}

/// POST /api/treasury/sweep - Move value out of the treasury
pub async fn sweep(
    State(state): State<ApiState>,
    Json(req): Json<SweepRequest>,
) -> ApiResult<SweepResponse> {
    let to = parse_address(&req.to)?;

    let mut chain = state.chain.write().await;
    let mut next = chain.clone();
    let event = next
        .sweep(None, &state.operator, &to, req.amount)
        .map_err(contract_error)?;
    persist(&state, &next).await?;
    *chain = next;

    state.ws_broadcaster.broadcast(WsEvent::Swept {
        to,
        amount: event.amount,
        balance: event.balance_after,
    });

    Ok(Json(SweepResponse {
        to,
        amount: event.amount,
        treasury_balance: event.balance_after,
    }))
}

fn current_minters(chain: &ChainState) -> Result<Vec<Address>, ApiFailure> {
    let address = chain.contracts.latest().map_err(contract_error)?;
    let contract = chain.contracts.get(&address).map_err(contract_error)?;
    Ok(contract.treasury.roles().minters().copied().collect())
}

/// POST /api/minters - Grant the minter role
pub async fn add_minter(
    State(state): State<ApiState>,
    Json(req): Json<MinterRequest>,
) -> ApiResult<MinterResponse> {
    let address = parse_address(&req.address)?;

    let mut chain = state.chain.write().await;
    let mut next = chain.clone();
    let changed = next
        .add_minter(None, &state.operator, &address)
        .map_err(contract_error)?;
    if changed {
        persist(&state, &next).await?;
        *chain = next;
    }

    Ok(Json(MinterResponse {
        address,
        changed,
        minters: current_minters(&chain)?,
    }))
}

/// DELETE /api/minters/{address} - Revoke the minter role
pub async fn remove_minter(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<MinterResponse> {
    let address = parse_address(&address)?;

    let mut chain = state.chain.write().await;
    let mut next = chain.clone();
    next.remove_minter(None, &state.operator, &address)
        .map_err(contract_error)?;
    persist(&state, &next).await?;
    *chain = next;

    Ok(Json(MinterResponse {
        address,
        changed: true,
        minters: current_minters(&chain)?,
    }))
}

fn user_response(record: &UserRecord, chain: &ChainState) -> UserResponse {
    let collection = chain
        .contracts
        .latest()
        .and_then(|address| chain.contracts.get(&address))
        .ok()
        .map(|contract| &contract.collection);

    UserResponse {
        username: record.username.clone(),
        address: record.address,
        created_at: record.created_at,
        balance: chain.balance_of(&record.address),
        tokens: collection
            .map(|c| c.tokens_of(&record.address))
            .unwrap_or_default(),
        check_ins: collection
            .and_then(|c| c.check_in_of(&record.address))
            .map(|c| c.count)
            .unwrap_or(0),
    }
}

/// POST /api/users - Register a user with a fresh child wallet
pub async fn create_user(
    State(state): State<ApiState>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<UserResponse> {
    validate_username(&req.username).map_err(user_error)?;

    let mut users = state.users.write().await;
    if users.get(&req.username).is_some() {
        return Err(user_error(UserStoreError::AlreadyExists(req.username)));
    }

    let wallet = state
        .wallet_manager
        .read()
        .await
        .create_child(&state.operator, Some(&req.username))
        .map_err(|e| internal(format!("Failed to create wallet: {}", e)))?;

    let record = users
        .create(&req.username, wallet.address())
        .map_err(user_error)?;

    let chain = state.chain.read().await;
    Ok(Json(user_response(&record, &chain)))
}

/// GET /api/users - List registered users
pub async fn list_users(State(state): State<ApiState>) -> Json<Vec<UserResponse>> {
    let users = state.users.read().await;
    let chain = state.chain.read().await;
    Json(
        users
            .list()
            .iter()
            .map(|record| user_response(record, &chain))
            .collect(),
    )
}

/// GET /api/users/{username}
pub async fn get_user(
    State(state): State<ApiState>,
    Path(username): Path<String>,
) -> ApiResult<UserResponse> {
    let users = state.users.read().await;
    let record = users.require(&username).map_err(user_error)?;
    let chain = state.chain.read().await;
    Ok(Json(user_response(record, &chain)))
}

/// POST /api/users/{username}/mint - Mint a token to the user's wallet
pub async fn mint_to_user(
    State(state): State<ApiState>,
    Path(username): Path<String>,
    Json(req): Json<MintRequest>,
) -> ApiResult<MintResponse> {
    let to = state
        .users
        .read()
        .await
        .require(&username)
        .map_err(user_error)?
        .address;

    let mut chain = state.chain.write().await;
    let mut next = chain.clone();
    let event = next
        .mint(None, &state.operator, &to, &req.token_uri)
        .map_err(contract_error)?;
    persist(&state, &next).await?;
    *chain = next;

    state.ws_broadcaster.broadcast(WsEvent::Minted {
        token_id: event.token_id,
        to,
        token_uri: event.token_uri.clone(),
    });

    Ok(Json(MintResponse {
        token_id: event.token_id,
        to,
        token_uri: event.token_uri,
    }))
}

/// POST /api/users/{username}/checkin - Record a check-in for the user
pub async fn check_in_user(
    State(state): State<ApiState>,
    Path(username): Path<String>,
) -> ApiResult<CheckInResponse> {
    let address = state
        .users
        .read()
        .await
        .require(&username)
        .map_err(user_error)?
        .address;

    let mut chain = state.chain.write().await;
    let mut next = chain.clone();
    let event = next.check_in(None, &address).map_err(contract_error)?;
    persist(&state, &next).await?;
    *chain = next;

    state.ws_broadcaster.broadcast(WsEvent::CheckedIn {
        address,
        count: event.count,
    });

    Ok(Json(CheckInResponse {
        address,
        count: event.count,
        timestamp: event.timestamp,
    }))
}

/// GET /api/balances/{address} - Ledger and token balance
pub async fn get_balance(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<BalanceResponse> {
    let address = parse_address(&address)?;
    let chain = state.chain.read().await;

    let contract = chain
        .contracts
        .latest()
        .and_then(|latest| chain.contracts.get(&latest))
        .ok();
    let nft_balance = contract
        .map(|contract| contract.collection.balance_of(&address))
        .unwrap_or(0);
    let roles = contract
        .map(|contract| contract.treasury.roles().roles_of(&address).names())
        .unwrap_or_default();

    Ok(Json(BalanceResponse {
        address,
        balance: chain.ledger.balance_of(&address),
        nft_balance,
        roles,
    }))
}

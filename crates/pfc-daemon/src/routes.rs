//! Axum router and all HTTP handlers for pfc-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.

use std::{convert::Infallible, str::FromStr, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use pfc_engine::{Challenge, ChallengeStatus, EngineError, Money, PlanTier, TradeSide};
use pfc_paper::{fill_market_order, FillError, MarketOrder, PaperFill};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    api_types::{
        ApiErrorResponse, ApplyTradeRequest, CreateChallengeRequest, ExecuteTradeRequest,
        ExecuteTradeResponse, HealthResponse, SignalQuery,
    },
    state::{persist_challenge, AppState, BusMsg, ChallengeEvent},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/challenges", post(create_challenge))
        .route("/v1/challenges/:id", get(get_challenge))
        .route("/v1/challenges/:id/activate", post(activate_challenge))
        .route("/v1/challenges/:id/trades", post(apply_trade))
        .route("/v1/challenges/:id/execute", post(execute_trade))
        .route("/v1/signal", get(signal))
        .route("/v1/stream", get(stream))
        .with_state(state)
}

/// Build a `{error, message}` rejection response.
fn refuse(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiErrorResponse {
            error: code.to_string(),
            message: message.into(),
        }),
    )
        .into_response()
}

fn not_found(id: Uuid) -> Response {
    refuse(
        StatusCode::NOT_FOUND,
        "CHALLENGE_NOT_FOUND",
        format!("no challenge with id {id}"),
    )
}

/// Map an engine rejection onto the HTTP surface.
fn engine_refusal(err: EngineError) -> Response {
    let status = match err {
        EngineError::TradingNotAllowed { .. } => StatusCode::FORBIDDEN,
        EngineError::InvalidTransition { .. } => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    };
    refuse(status, err.code(), err.to_string())
}

/// Look up a challenge, falling back to the durable store for records not in
/// memory (daemon restart). A recovered record is re-seated in memory.
async fn find_or_recover(state: &AppState, id: Uuid) -> Option<Challenge> {
    if let Some(c) = state.store.get(id).await {
        return Some(c);
    }
    let pg = state.pg.as_ref()?;
    match pg.fetch_challenge(id).await {
        Ok(Some(c)) => Some(state.store.restore(c).await),
        Ok(None) => None,
        Err(e) => {
            warn!(challenge_id = %id, "db recovery failed: {e:#}");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /v1/challenges
// ---------------------------------------------------------------------------

/// Create a challenge in PENDING_PAYMENT for the given user and plan tier.
pub(crate) async fn create_challenge(
    State(st): State<Arc<AppState>>,
    Json(req): Json<CreateChallengeRequest>,
) -> Response {
    if req.user_id.trim().is_empty() {
        return refuse(
            StatusCode::BAD_REQUEST,
            "MISSING_USER_ID",
            "userId must be a non-empty identifier",
        );
    }

    let tier = match PlanTier::from_str(&req.plan) {
        Ok(t) => t,
        Err(e) => return engine_refusal(e),
    };

    let challenge = Challenge::create(tier, req.user_id);
    st.store.insert(challenge.clone()).await;
    persist_challenge(&st, challenge.clone());

    info!(challenge_id = %challenge.id, tier = tier.as_str(), "challenge created");
    let _ = st.bus.send(BusMsg::Challenge(ChallengeEvent::of(&challenge)));

    (StatusCode::CREATED, Json(challenge)).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/challenges/:id
// ---------------------------------------------------------------------------

pub(crate) async fn get_challenge(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    match find_or_recover(&st, id).await {
        Some(c) => (StatusCode::OK, Json(c)).into_response(),
        None => not_found(id),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/challenges/:id/activate
// ---------------------------------------------------------------------------

/// Payment confirmation signal: PENDING_PAYMENT → ACTIVE. The payment itself
/// is an external concern; this endpoint trusts the caller's confirmation.
pub(crate) async fn activate_challenge(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    if find_or_recover(&st, id).await.is_none() {
        return not_found(id);
    }

    let now = Utc::now();
    match st.store.update_with(id, |c| c.activate(now)).await {
        Err(e) => engine_refusal(e),
        Ok(None) => not_found(id),
        Ok(Some(challenge)) => {
            info!(challenge_id = %id, "challenge activated");
            let _ = st.bus.send(BusMsg::Challenge(ChallengeEvent::of(&challenge)));
            persist_challenge(&st, challenge.clone());
            (StatusCode::OK, Json(challenge)).into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// POST /v1/challenges/:id/trades
// ---------------------------------------------------------------------------

/// Apply a realized trade PnL and re-evaluate pass/fail status.
///
/// The day-roll runs lazily first so the first trade of a new UTC day is
/// measured against that day's opening equity.
pub(crate) async fn apply_trade(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ApplyTradeRequest>,
) -> Response {
    let pnl = match Money::try_from_f64(req.pnl) {
        Ok(p) => p,
        Err(e) => return engine_refusal(e),
    };

    if find_or_recover(&st, id).await.is_none() {
        return not_found(id);
    }

    let now = Utc::now();
    let res = st
        .store
        .update_with(id, |c| {
            let current = c.roll_trading_day(now).unwrap_or_else(|| c.clone());
            current.apply_trade(pnl, now)
        })
        .await;

    match res {
        Err(e) => engine_refusal(e),
        Ok(None) => not_found(id),
        Ok(Some(challenge)) => {
            info!(
                challenge_id = %id,
                pnl = %pnl,
                status = challenge.status.as_str(),
                "trade applied"
            );
            let _ = st.bus.send(BusMsg::Challenge(ChallengeEvent::of(&challenge)));
            persist_challenge(&st, challenge.clone());
            (StatusCode::OK, Json(challenge)).into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// POST /v1/challenges/:id/execute
// ---------------------------------------------------------------------------

enum TradeRefusal {
    Fill(FillError),
    Engine(EngineError),
}

/// Execute a market order end-to-end: paper fill at the server-supplied live
/// price, then the realized pnl flows through the evaluation engine. One
/// atomic read-modify-write under the store's write lock.
pub(crate) async fn execute_trade(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ExecuteTradeRequest>,
) -> Response {
    let side = match TradeSide::from_str(&req.side) {
        Ok(s) => s,
        Err(e) => return engine_refusal(e),
    };

    if find_or_recover(&st, id).await.is_none() {
        return not_found(id);
    }

    let order = MarketOrder {
        challenge_id: id,
        symbol: req.symbol,
        side,
        size: req.size,
        price: req.price,
    };

    let now = Utc::now();
    let mut rng = st.slippage_rng.lock().await;
    let mut fill_slot: Option<PaperFill> = None;

    let res = st
        .store
        .update_with(id, |c| {
            let current = c.roll_trading_day(now).unwrap_or_else(|| c.clone());
            if current.status != ChallengeStatus::Active {
                return Err(TradeRefusal::Engine(EngineError::TradingNotAllowed {
                    status: current.status,
                }));
            }
            let fill = fill_market_order(&order, current.equity, &mut *rng, now)
                .map_err(TradeRefusal::Fill)?;
            let updated = current
                .apply_trade(fill.pnl, now)
                .map_err(TradeRefusal::Engine)?;
            fill_slot = Some(fill);
            Ok(updated)
        })
        .await;
    drop(rng);

    let challenge = match res {
        Err(TradeRefusal::Fill(e)) => {
            return refuse(StatusCode::BAD_REQUEST, "TRADE_REJECTED", e.to_string())
        }
        Err(TradeRefusal::Engine(e)) => return engine_refusal(e),
        Ok(None) => return not_found(id),
        Ok(Some(c)) => c,
    };

    let Some(trade) = fill_slot else {
        // Unreachable by construction: a successful update always set the slot.
        return refuse(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL",
            "fill missing after successful trade",
        );
    };

    info!(
        challenge_id = %id,
        symbol = %trade.symbol,
        side = trade.side.as_str(),
        pnl = %trade.pnl,
        status = challenge.status.as_str(),
        "order executed"
    );
    let _ = st.bus.send(BusMsg::Challenge(ChallengeEvent::of(&challenge)));
    persist_challenge(&st, challenge.clone());
    persist_trade(&st, trade.clone());

    (
        StatusCode::OK,
        Json(ExecuteTradeResponse { trade, challenge }),
    )
        .into_response()
}

/// Fire-and-forget write-through of an executed fill.
fn persist_trade(st: &Arc<AppState>, trade: PaperFill) {
    let Some(pg) = st.pg.clone() else {
        return;
    };
    tokio::spawn(async move {
        if let Err(e) = pg.insert_trade(&trade).await {
            warn!(trade_id = %trade.id, "trade write-through failed: {e:#}");
        }
    });
}

// ---------------------------------------------------------------------------
// GET /v1/signal
// ---------------------------------------------------------------------------

/// SMA-crossover bias over a comma-separated chronological price series.
pub(crate) async fn signal(Query(q): Query<SignalQuery>) -> Response {
    let parsed: Result<Vec<f64>, _> = q
        .prices
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect();

    let prices = match parsed {
        Ok(ps) if ps.iter().all(|p| p.is_finite()) => ps,
        _ => {
            return refuse(
                StatusCode::BAD_REQUEST,
                "INVALID_PRICES",
                "prices must be a comma-separated list of finite numbers",
            )
        }
    };

    (StatusCode::OK, Json(pfc_signal::calculate_signal(&prices))).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::Challenge(_) => "challenge",
                    BusMsg::LogLine { .. } => "log",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}

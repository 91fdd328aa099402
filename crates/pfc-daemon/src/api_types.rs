//! Request and response types for all pfc-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded by
//! Axum and decoded by tests. No business logic lives here; the engine types
//! themselves (Challenge, PaperFill, SignalAdvice) serialize straight onto
//! the wire.

use pfc_engine::Challenge;
use pfc_paper::PaperFill;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Error body — every non-2xx response
// ---------------------------------------------------------------------------

/// `error` is a stable machine code (e.g. "INVALID_PLAN_TIER",
/// "TRADING_FORBIDDEN"); `message` is human-readable detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// POST /v1/challenges
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChallengeRequest {
    /// Plan tier literal: STARTER | PRO | ELITE.
    pub plan: String,
    pub user_id: String,
}

// ---------------------------------------------------------------------------
// POST /v1/challenges/:id/trades
// ---------------------------------------------------------------------------

/// Realized PnL supplied by the caller (the engine consumes the delta; it
/// does not compute it). Taken as a raw float so non-finite/oversized input
/// maps to a 400 INVALID_PNL instead of a generic decode failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyTradeRequest {
    pub pnl: f64,
}

// ---------------------------------------------------------------------------
// POST /v1/challenges/:id/execute
// ---------------------------------------------------------------------------

/// A market order. `price` is the live price obtained server-side from the
/// pricing collaborator — never client truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteTradeRequest {
    pub symbol: String,
    /// BUY | SELL
    pub side: String,
    pub size: f64,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteTradeResponse {
    pub trade: PaperFill,
    pub challenge: Challenge,
}

// ---------------------------------------------------------------------------
// GET /v1/signal
// ---------------------------------------------------------------------------

/// Chronological price series, comma-separated (most-recent last).
#[derive(Debug, Clone, Deserialize)]
pub struct SignalQuery {
    pub prices: String,
}

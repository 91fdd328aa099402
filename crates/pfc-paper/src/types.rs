//! Paper execution value types.

use chrono::{DateTime, Utc};
use pfc_engine::{Money, TradeSide};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A market order to fill against a server-supplied live price.
///
/// The price is NOT client-provided truth: the service layer obtains it from
/// the pricing collaborator and passes it in here.
#[derive(Clone, Debug, PartialEq)]
pub struct MarketOrder {
    pub challenge_id: Uuid,
    pub symbol: String,
    pub side: TradeSide,
    /// Position size in lots.
    pub size: f64,
    /// Live market price at execution time.
    pub price: f64,
}

/// Fill lifecycle. Paper fills close instantly (no open-position model), so
/// every fill this crate produces is CLOSED; OPEN exists for the wire
/// contract of trade records.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FillStatus {
    Open,
    Closed,
}

/// An executed-and-closed simulated trade, ready for persistence and for
/// feeding its realized pnl into the evaluation engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperFill {
    pub id: Uuid,
    pub challenge_id: Uuid,
    pub symbol: String,
    #[serde(rename = "type")]
    pub side: TradeSide,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: f64,
    /// Realized profit/loss, side-signed.
    pub pnl: Money,
    pub status: FillStatus,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

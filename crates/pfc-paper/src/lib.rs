//! pfc-paper
//!
//! Simulated ("paper") market-order execution.
//!
//! The evaluation engine consumes a realized PnL; this crate is the producer:
//! it takes a market order plus the live price supplied by the pricing
//! collaborator, applies a uniform ±0.1% slippage on the exit, and emits an
//! instantly-closed fill whose pnl is `(exit - entry) * size`, signed by the
//! order side.
//!
//! The RNG is injected so callers control determinism — tests seed a `StdRng`,
//! the daemon feeds an entropy-seeded one. Everything else is pure.

use chrono::{DateTime, Utc};
use pfc_engine::Money;
use rand::Rng;
use uuid::Uuid;

pub mod types;

pub use types::{FillStatus, MarketOrder, PaperFill};

/// Maximum simulated slippage, as a fraction of the entry price.
pub const MAX_SLIPPAGE_PCT: f64 = 0.001;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// All rejections a paper fill can surface. The order is not executed and no
/// state changes on any of these.
#[derive(Debug, Clone, PartialEq)]
pub enum FillError {
    /// Order symbol must be non-empty.
    EmptySymbol,
    /// Live price must be finite and strictly positive.
    InvalidPrice { price: f64 },
    /// Position size must be finite and strictly positive.
    InvalidSize { size: f64 },
    /// `price * size` exceeds the challenge's current equity.
    InsufficientEquity { equity: Money, cost: Money },
    /// Cost or pnl did not fit the fixed-point money range.
    AmountOutOfRange { value: f64 },
}

impl std::fmt::Display for FillError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySymbol => write!(f, "paper fill: symbol must not be empty"),
            Self::InvalidPrice { price } => {
                write!(f, "paper fill: price must be finite and > 0, got {price}")
            }
            Self::InvalidSize { size } => {
                write!(f, "paper fill: size must be finite and > 0, got {size}")
            }
            Self::InsufficientEquity { equity, cost } => {
                write!(f, "paper fill: insufficient equity ({equity}) for trade cost ({cost})")
            }
            Self::AmountOutOfRange { value } => {
                write!(f, "paper fill: amount out of money range: {value}")
            }
        }
    }
}

impl std::error::Error for FillError {}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Fill a market order at the given live price with simulated slippage.
///
/// `equity` is the challenge's current equity; the order is rejected when its
/// notional cost exceeds it (the basic sizing rule). The fill is opened and
/// closed at `now` — no open exposure survives the call.
pub fn fill_market_order(
    order: &MarketOrder,
    equity: Money,
    rng: &mut impl Rng,
    now: DateTime<Utc>,
) -> Result<PaperFill, FillError> {
    if order.symbol.trim().is_empty() {
        return Err(FillError::EmptySymbol);
    }
    if !order.price.is_finite() || order.price <= 0.0 {
        return Err(FillError::InvalidPrice { price: order.price });
    }
    if !order.size.is_finite() || order.size <= 0.0 {
        return Err(FillError::InvalidSize { size: order.size });
    }

    let cost_f = order.price * order.size;
    let cost = Money::try_from_f64(cost_f)
        .map_err(|_| FillError::AmountOutOfRange { value: cost_f })?;
    if cost > equity {
        return Err(FillError::InsufficientEquity { equity, cost });
    }

    let entry_price = order.price;
    let slippage_pct = rng.gen_range(-MAX_SLIPPAGE_PCT..=MAX_SLIPPAGE_PCT);
    let exit_price = entry_price * (1.0 + slippage_pct);

    // Long profits when the price rises, short when it falls.
    let pnl_f = (exit_price - entry_price) * order.size * order.side.sign();
    let pnl = Money::try_from_f64(pnl_f)
        .map_err(|_| FillError::AmountOutOfRange { value: pnl_f })?;

    Ok(PaperFill {
        id: Uuid::new_v4(),
        challenge_id: order.challenge_id,
        symbol: order.symbol.clone(),
        side: order.side,
        entry_price,
        exit_price,
        size: order.size,
        pnl,
        status: FillStatus::Closed,
        opened_at: now,
        closed_at: now,
    })
}

//! Challenge data model, plan tier table, and engine errors.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// All rejections the engine can surface. Every failure leaves the input
/// challenge untouched; nothing here is fatal in the process sense.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Plan tier string is not one of STARTER / PRO / ELITE.
    InvalidPlanTier { given: String },
    /// Trade PnL is NaN, infinite, or out of fixed-point range.
    InvalidPnl { value: f64 },
    /// Trade side string is not BUY or SELL.
    InvalidTradeSide { given: String },
    /// `apply_trade` called on a challenge that is not ACTIVE.
    TradingNotAllowed { status: ChallengeStatus },
    /// `activate` called on a challenge that is not PENDING_PAYMENT.
    InvalidTransition { from: ChallengeStatus },
    /// Balance arithmetic overflowed `i64` micros. Fail-closed: the trade is
    /// rejected rather than wrapping into a wrong verdict.
    BalanceOverflow,
}

impl EngineError {
    /// Stable machine-readable code, used verbatim in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPlanTier { .. } => "INVALID_PLAN_TIER",
            Self::InvalidPnl { .. } => "INVALID_PNL",
            Self::InvalidTradeSide { .. } => "INVALID_TRADE_TYPE",
            Self::TradingNotAllowed { .. } => "TRADING_FORBIDDEN",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::BalanceOverflow => "BALANCE_OVERFLOW",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPlanTier { given } => {
                write!(f, "unrecognized plan tier: {given:?}")
            }
            Self::InvalidPnl { value } => {
                write!(f, "trade pnl must be a finite amount, got {value}")
            }
            Self::InvalidTradeSide { given } => {
                write!(f, "trade side must be BUY or SELL, got {given:?}")
            }
            Self::TradingNotAllowed { status } => {
                write!(f, "trading requires an ACTIVE challenge, status is {}", status.as_str())
            }
            Self::InvalidTransition { from } => {
                write!(f, "activation requires PENDING_PAYMENT, status is {}", from.as_str())
            }
            Self::BalanceOverflow => write!(f, "balance arithmetic overflowed"),
        }
    }
}

impl std::error::Error for EngineError {}

// ---------------------------------------------------------------------------
// ChallengeStatus
// ---------------------------------------------------------------------------

/// Challenge lifecycle state.
///
/// The string literals are wire-visible contract values; do not rename.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeStatus {
    PendingPayment,
    Active,
    Passed,
    Failed,
    Funded,
}

impl ChallengeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingPayment => "PENDING_PAYMENT",
            Self::Active => "ACTIVE",
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Funded => "FUNDED",
        }
    }

    /// Parse a wire/database literal.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "PENDING_PAYMENT" => Some(Self::PendingPayment),
            "ACTIVE" => Some(Self::Active),
            "PASSED" => Some(Self::Passed),
            "FAILED" => Some(Self::Failed),
            "FUNDED" => Some(Self::Funded),
            _ => None,
        }
    }

    /// PASSED / FAILED / FUNDED never transition onward in this engine.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Funded)
    }
}

// ---------------------------------------------------------------------------
// PlanTier + PlanSpec
// ---------------------------------------------------------------------------

/// Named plan tier fixing initial balance and risk thresholds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanTier {
    Starter,
    Pro,
    Elite,
}

/// Fixed quadruple looked up per tier at challenge creation. All amounts are
/// absolute currency values, not percentages.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PlanSpec {
    pub balance: Money,
    pub profit_target: Money,
    pub max_daily_loss: Money,
    pub max_total_loss: Money,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starter => "STARTER",
            Self::Pro => "PRO",
            Self::Elite => "ELITE",
        }
    }

    /// Static tier table. Target = 10%, daily loss = 5%, total loss = 10%
    /// of the initial balance.
    pub fn spec(&self) -> PlanSpec {
        match self {
            Self::Starter => PlanSpec {
                balance: Money::from_units(10_000),
                profit_target: Money::from_units(1_000),
                max_daily_loss: Money::from_units(500),
                max_total_loss: Money::from_units(1_000),
            },
            Self::Pro => PlanSpec {
                balance: Money::from_units(25_000),
                profit_target: Money::from_units(2_500),
                max_daily_loss: Money::from_units(1_250),
                max_total_loss: Money::from_units(2_500),
            },
            Self::Elite => PlanSpec {
                balance: Money::from_units(50_000),
                profit_target: Money::from_units(5_000),
                max_daily_loss: Money::from_units(2_500),
                max_total_loss: Money::from_units(5_000),
            },
        }
    }
}

impl FromStr for PlanTier {
    type Err = EngineError;

    /// Case-insensitive to tolerate client casing; no silent default for an
    /// unrecognized tier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STARTER" => Ok(Self::Starter),
            "PRO" => Ok(Self::Pro),
            "ELITE" => Ok(Self::Elite),
            _ => Err(EngineError::InvalidPlanTier { given: s.to_string() }),
        }
    }
}

// ---------------------------------------------------------------------------
// TradeSide
// ---------------------------------------------------------------------------

/// Direction of a market order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }

    /// +1 for long, -1 for short: pnl = (exit - entry) * size * sign.
    pub fn sign(&self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Sell => -1.0,
        }
    }
}

impl FromStr for TradeSide {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            _ => Err(EngineError::InvalidTradeSide { given: s.to_string() }),
        }
    }
}

// ---------------------------------------------------------------------------
// Challenge
// ---------------------------------------------------------------------------

/// A simulated funded-trading account under evaluation.
///
/// This is a plain value: the engine takes a `&Challenge` and returns an
/// updated copy; persistence and request serialization are the caller's
/// concern. Trades are instantly realized, so `equity` and `current_balance`
/// move identically (no open-position concept, no margin).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    /// Immutable after creation.
    pub id: Uuid,
    /// Owning trader, immutable.
    pub user_id: String,
    /// Plan tier, immutable; determines the initial limits below.
    #[serde(rename = "type")]
    pub tier: PlanTier,
    pub status: ChallengeStatus,
    /// Starting capital, immutable anchor for total-loss and profit rules.
    pub initial_balance: Money,
    /// Realized cash balance.
    pub current_balance: Money,
    /// Account value used for risk-limit comparisons.
    pub equity: Money,
    /// High-water mark of equity since creation; monotonically non-decreasing.
    pub max_equity: Money,
    /// Equity at the start of the current UTC trading day; anchor for the
    /// daily-loss rule. Re-anchored by the day-roll transition only.
    pub daily_starting_balance: Money,
    pub profit_target: Money,
    pub max_daily_loss_limit: Money,
    pub max_total_loss_limit: Money,
    pub created_at: DateTime<Utc>,
    /// Bumped on every mutation.
    pub updated_at: DateTime<Utc>,
}

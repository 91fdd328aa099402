//! Challenge state machine.
//!
//! Pure transitions over [`Challenge`] values. Each function takes the
//! pre-state by reference and returns a fresh post-state (or an error with
//! the pre-state untouched). The host must serialize read-modify-write per
//! challenge id — `apply_trade` is not commutative-safe under concurrent
//! application against the same pre-state.

use chrono::{DateTime, Utc};

use crate::money::Money;
use crate::types::{Challenge, ChallengeStatus, EngineError};

impl Challenge {
    /// Move a PENDING_PAYMENT challenge to ACTIVE upon an external payment
    /// confirmation signal. Balances and limits are untouched.
    ///
    /// Guarded: any other starting status is [`EngineError::InvalidTransition`].
    pub fn activate(&self, now: DateTime<Utc>) -> Result<Challenge, EngineError> {
        if self.status != ChallengeStatus::PendingPayment {
            return Err(EngineError::InvalidTransition { from: self.status });
        }
        Ok(Challenge {
            status: ChallengeStatus::Active,
            updated_at: now,
            ..self.clone()
        })
    }

    /// Apply one realized trade PnL and re-derive pass/fail status.
    ///
    /// Rules, evaluated on the post-trade equity with loss precedence:
    /// 1. `total_loss  = initial_balance - equity'`
    /// 2. `daily_loss  = daily_starting_balance - equity'`
    /// 3. breach of either loss limit (inclusive `>=`) → FAILED
    /// 4. else profit `equity' - initial_balance >= profit_target` → PASSED
    /// 5. else status unchanged
    ///
    /// Loss checks run before the profit check: a single trade that busts a
    /// loss limit and crosses the target in one move is ruled a failure.
    ///
    /// Guarded: only an ACTIVE challenge may trade
    /// ([`EngineError::TradingNotAllowed`] otherwise; terminal accounts are
    /// never recomputed). Arithmetic is checked — overflow rejects the trade
    /// with the state unchanged instead of wrapping into a wrong verdict.
    pub fn apply_trade(&self, pnl: Money, now: DateTime<Utc>) -> Result<Challenge, EngineError> {
        if self.status != ChallengeStatus::Active {
            return Err(EngineError::TradingNotAllowed { status: self.status });
        }

        let equity = self
            .equity
            .checked_add(pnl)
            .ok_or(EngineError::BalanceOverflow)?;
        let current_balance = self
            .current_balance
            .checked_add(pnl)
            .ok_or(EngineError::BalanceOverflow)?;
        let max_equity = self.max_equity.max(equity);

        let status = derive_status(self, equity)?;

        Ok(Challenge {
            status,
            current_balance,
            equity,
            max_equity,
            updated_at: now,
            ..self.clone()
        })
    }

    /// Start a new trading day: snapshot `daily_starting_balance = equity`
    /// once the UTC date of `now` is past the UTC date of the last mutation.
    ///
    /// Returns `None` when no roll is due (same day, or the challenge is not
    /// ACTIVE). Invoked by an external scheduler, not by `apply_trade`; the
    /// service layer also calls it immediately before each trade so the first
    /// trade of a new day is measured against that day's opening equity.
    pub fn roll_trading_day(&self, now: DateTime<Utc>) -> Option<Challenge> {
        if self.status != ChallengeStatus::Active {
            return None;
        }
        if now.date_naive() <= self.updated_at.date_naive() {
            return None;
        }
        Some(Challenge {
            daily_starting_balance: self.equity,
            updated_at: now,
            ..self.clone()
        })
    }
}

/// Re-derive lifecycle status from post-trade equity.
fn derive_status(pre: &Challenge, equity: Money) -> Result<ChallengeStatus, EngineError> {
    let total_loss = pre
        .initial_balance
        .checked_sub(equity)
        .ok_or(EngineError::BalanceOverflow)?;
    let daily_loss = pre
        .daily_starting_balance
        .checked_sub(equity)
        .ok_or(EngineError::BalanceOverflow)?;
    let profit = equity
        .checked_sub(pre.initial_balance)
        .ok_or(EngineError::BalanceOverflow)?;

    if total_loss >= pre.max_total_loss_limit || daily_loss >= pre.max_daily_loss_limit {
        Ok(ChallengeStatus::Failed)
    } else if profit >= pre.profit_target {
        Ok(ChallengeStatus::Passed)
    } else {
        Ok(pre.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlanTier;
    use chrono::TimeZone;

    fn active_starter() -> Challenge {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        Challenge::create_with(PlanTier::Starter, "u1", uuid::Uuid::nil(), t0)
            .activate(t0)
            .unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 14, 30, 0).unwrap()
    }

    #[test]
    fn activate_requires_pending_payment() {
        let c = active_starter();
        assert_eq!(
            c.activate(now()),
            Err(EngineError::InvalidTransition {
                from: ChallengeStatus::Active
            })
        );
    }

    #[test]
    fn trade_moves_balance_and_equity_together() {
        let c = active_starter();
        let c2 = c.apply_trade(Money::from_units(250), now()).unwrap();
        assert_eq!(c2.equity, Money::from_units(10_250));
        assert_eq!(c2.current_balance, Money::from_units(10_250));
        assert_eq!(c2.equity - c2.current_balance, Money::ZERO);
        assert_eq!(c2.updated_at, now());
    }

    #[test]
    fn terminal_challenge_rejects_trades() {
        let c = active_starter();
        let failed = c.apply_trade(Money::from_units(-500), now()).unwrap();
        assert_eq!(failed.status, ChallengeStatus::Failed);

        let err = failed.apply_trade(Money::from_units(100), now());
        assert_eq!(
            err,
            Err(EngineError::TradingNotAllowed {
                status: ChallengeStatus::Failed
            })
        );
    }

    #[test]
    fn pending_challenge_rejects_trades() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let c = Challenge::create_with(PlanTier::Starter, "u1", uuid::Uuid::nil(), t0);
        assert!(matches!(
            c.apply_trade(Money::from_units(10), now()),
            Err(EngineError::TradingNotAllowed { .. })
        ));
    }

    #[test]
    fn overflow_is_rejected_and_state_unchanged() {
        let c = active_starter();
        let err = c.apply_trade(Money::from_micros(i64::MAX), now());
        assert_eq!(err, Err(EngineError::BalanceOverflow));
        // Pre-state untouched by construction: apply_trade returns a copy.
        assert_eq!(c.equity, Money::from_units(10_000));
    }

    #[test]
    fn day_roll_snapshots_equity_as_daily_anchor() {
        let c = active_starter();
        let c = c.apply_trade(Money::from_units(-300), now()).unwrap();
        assert_eq!(c.daily_starting_balance, Money::from_units(10_000));

        let next_day = Utc.with_ymd_and_hms(2026, 3, 3, 0, 5, 0).unwrap();
        let rolled = c.roll_trading_day(next_day).unwrap();
        assert_eq!(rolled.daily_starting_balance, Money::from_units(9_700));
        assert_eq!(rolled.equity, Money::from_units(9_700));
        assert_eq!(rolled.updated_at, next_day);
    }

    #[test]
    fn day_roll_is_a_no_op_within_the_same_day() {
        let c = active_starter();
        assert_eq!(c.roll_trading_day(now()), None);
    }

    #[test]
    fn day_roll_ignores_non_active_challenges() {
        let c = active_starter();
        let failed = c.apply_trade(Money::from_units(-1_000), now()).unwrap();
        assert_eq!(failed.status, ChallengeStatus::Failed);
        let next_day = Utc.with_ymd_and_hms(2026, 3, 3, 0, 5, 0).unwrap();
        assert_eq!(failed.roll_trading_day(next_day), None);
    }
}

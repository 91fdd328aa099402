//! Challenge factory.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::{Challenge, ChallengeStatus, PlanTier};

impl Challenge {
    /// Construct a fresh challenge for `user_id` on the given plan tier.
    ///
    /// All balances and anchors start at the tier's initial balance; the
    /// challenge awaits an external payment confirmation before trading is
    /// possible (`status = PENDING_PAYMENT`). Pure construction — the caller
    /// persists the result.
    pub fn create(tier: PlanTier, user_id: impl Into<String>) -> Challenge {
        Challenge::create_with(tier, user_id, Uuid::new_v4(), Utc::now())
    }

    /// Deterministic variant of [`Challenge::create`] with the id and clock
    /// injected. `create` is this plus a v4 uuid and `Utc::now()`.
    pub fn create_with(
        tier: PlanTier,
        user_id: impl Into<String>,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Challenge {
        let spec = tier.spec();
        Challenge {
            id,
            user_id: user_id.into(),
            tier,
            status: ChallengeStatus::PendingPayment,
            initial_balance: spec.balance,
            current_balance: spec.balance,
            equity: spec.balance,
            max_equity: spec.balance,
            daily_starting_balance: spec.balance,
            profit_target: spec.profit_target,
            max_daily_loss_limit: spec.max_daily_loss,
            max_total_loss_limit: spec.max_total_loss,
            created_at: now,
            updated_at: now,
        }
    }
}

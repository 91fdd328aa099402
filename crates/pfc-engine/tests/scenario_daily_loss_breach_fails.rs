use chrono::{TimeZone, Utc};
use pfc_engine::{Challenge, ChallengeStatus, Money, PlanTier};

#[test]
fn scenario_daily_loss_breach_fails_inclusive() {
    let t0 = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
    let c = Challenge::create_with(PlanTier::Starter, "u1", uuid::Uuid::nil(), t0)
        .activate(t0)
        .unwrap();

    // STARTER: balance 10_000, daily loss limit 500. A single -500 trade
    // drives daily loss to exactly the limit — inclusive threshold, FAILED.
    let c = c.apply_trade(Money::from_units(-500), t0).unwrap();
    assert_eq!(c.equity, Money::from_units(9_500));
    assert_eq!(c.status, ChallengeStatus::Failed);
}

#[test]
fn scenario_total_loss_breach_fails_across_days() {
    let t0 = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
    let mut c = Challenge::create_with(PlanTier::Starter, "u1", uuid::Uuid::nil(), t0)
        .activate(t0)
        .unwrap();

    // Lose 400 a day for two days; each day stays under the 500 daily limit
    // because the anchor re-snapshots overnight.
    c = c.apply_trade(Money::from_units(-400), t0).unwrap();
    assert_eq!(c.status, ChallengeStatus::Active);

    let day2 = Utc.with_ymd_and_hms(2026, 3, 3, 9, 0, 0).unwrap();
    c = c.roll_trading_day(day2).unwrap();
    assert_eq!(c.daily_starting_balance, Money::from_units(9_600));

    c = c.apply_trade(Money::from_units(-400), day2).unwrap();
    assert_eq!(c.status, ChallengeStatus::Active);

    // Day 3: another -400 puts total loss at 1_200 >= 1_000 — FAILED by the
    // total-loss rule even though the daily loss is only 400.
    let day3 = Utc.with_ymd_and_hms(2026, 3, 4, 9, 0, 0).unwrap();
    c = c.roll_trading_day(day3).unwrap();
    c = c.apply_trade(Money::from_units(-400), day3).unwrap();
    assert_eq!(c.equity, Money::from_units(8_800));
    assert_eq!(c.status, ChallengeStatus::Failed);
}

#[test]
fn scenario_near_miss_stays_active() {
    let t0 = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
    let c = Challenge::create_with(PlanTier::Starter, "u1", uuid::Uuid::nil(), t0)
        .activate(t0)
        .unwrap();

    // One micro inside the daily limit: still ACTIVE.
    let c = c
        .apply_trade(Money::from_micros(-500 * 1_000_000 + 1), t0)
        .unwrap();
    assert_eq!(c.status, ChallengeStatus::Active);
}

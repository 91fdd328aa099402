//! The persisted representation is a flat JSON record: camelCase field names,
//! monetary fields as decimal numbers, timestamps as ISO-8601 strings, and
//! enum literals exactly as contracted. These strings are interop-visible and
//! must not drift.

use chrono::{TimeZone, Utc};
use pfc_engine::{Challenge, ChallengeStatus, PlanTier};

#[test]
fn scenario_challenge_serializes_to_contract_record() {
    let t0 = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
    let c = Challenge::create_with(PlanTier::Pro, "trader-7", uuid::Uuid::nil(), t0);

    let v = serde_json::to_value(&c).unwrap();
    assert_eq!(v["userId"], "trader-7");
    assert_eq!(v["type"], "PRO");
    assert_eq!(v["status"], "PENDING_PAYMENT");
    assert_eq!(v["initialBalance"], 25_000.0);
    assert_eq!(v["currentBalance"], 25_000.0);
    assert_eq!(v["equity"], 25_000.0);
    assert_eq!(v["maxEquity"], 25_000.0);
    assert_eq!(v["dailyStartingBalance"], 25_000.0);
    assert_eq!(v["profitTarget"], 2_500.0);
    assert_eq!(v["maxDailyLossLimit"], 1_250.0);
    assert_eq!(v["maxTotalLossLimit"], 2_500.0);
    assert_eq!(v["createdAt"], "2026-03-02T09:00:00Z");
    assert_eq!(v["updatedAt"], "2026-03-02T09:00:00Z");
}

#[test]
fn scenario_challenge_roundtrips_through_json() {
    let t0 = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
    let c = Challenge::create_with(PlanTier::Elite, "u9", uuid::Uuid::nil(), t0)
        .activate(t0)
        .unwrap();

    let json = serde_json::to_string(&c).unwrap();
    let back: Challenge = serde_json::from_str(&json).unwrap();
    assert_eq!(back, c);
    assert_eq!(back.status, ChallengeStatus::Active);
}

#[test]
fn scenario_status_literals_match_contract() {
    for (status, literal) in [
        (ChallengeStatus::PendingPayment, "PENDING_PAYMENT"),
        (ChallengeStatus::Active, "ACTIVE"),
        (ChallengeStatus::Passed, "PASSED"),
        (ChallengeStatus::Failed, "FAILED"),
        (ChallengeStatus::Funded, "FUNDED"),
    ] {
        assert_eq!(serde_json::to_value(status).unwrap(), literal);
        assert_eq!(ChallengeStatus::from_wire(literal), Some(status));
        assert_eq!(status.as_str(), literal);
    }
}

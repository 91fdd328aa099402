//! Shared runtime state for pfc-daemon.
//!
//! All types here are `Clone`-able (via `Arc` or copy). Handlers receive
//! `State<Arc<AppState>>` from Axum; this module owns nothing async itself
//! beyond the background task spawners.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pfc_engine::{Challenge, ChallengeStatus, Money};
use pfc_store::{MemoryStore, PgStore};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// BusMsg — SSE event bus payload
// ---------------------------------------------------------------------------

/// A challenge lifecycle notification: emitted after every successful
/// mutation so dashboards can follow pass/fail verdicts live.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChallengeEvent {
    pub challenge_id: Uuid,
    pub status: ChallengeStatus,
    pub equity: Money,
}

impl ChallengeEvent {
    pub fn of(c: &Challenge) -> Self {
        Self {
            challenge_id: c.id,
            status: c.status,
            equity: c.equity,
        }
    }
}

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    Challenge(ChallengeEvent),
    LogLine { level: String, msg: String },
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in the health response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Cloneable (Arc) handle shared across all Axum handlers.
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    /// Static build metadata.
    pub build: BuildInfo,
    /// Authoritative in-memory challenge map. Its write lock serializes all
    /// read-modify-write per challenge id.
    pub store: MemoryStore,
    /// Optional durable layer (write-through + restart recovery).
    pub pg: Option<PgStore>,
    /// Slippage RNG for paper fills; seeded from entropy in production and
    /// from a fixed seed in tests.
    pub slippage_rng: Mutex<StdRng>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::build_state(StdRng::from_entropy(), None)
    }

    /// Deterministic slippage for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::build_state(StdRng::seed_from_u64(seed), None)
    }

    pub fn with_pg(pg: PgStore) -> Self {
        Self::build_state(StdRng::from_entropy(), Some(pg))
    }

    fn build_state(rng: StdRng, pg: Option<PgStore>) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Self {
            bus,
            build: BuildInfo {
                service: "pfc-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            store: MemoryStore::new(),
            pg,
            slippage_rng: Mutex::new(rng),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fire-and-forget write-through of a mutated challenge to the durable store.
/// Memory stays authoritative; a DB failure is logged, not surfaced.
pub fn persist_challenge(state: &Arc<AppState>, challenge: Challenge) {
    let Some(pg) = state.pg.clone() else {
        return;
    };
    tokio::spawn(async move {
        if let Err(e) = pg.upsert_challenge(&challenge).await {
            warn!(challenge_id = %challenge.id, "challenge write-through failed: {e:#}");
        }
    });
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}

/// Spawn the trading-day scheduler.
///
/// On each interval it scans every held challenge and, when the UTC date has
/// advanced past the challenge's last mutation, re-anchors
/// `daily_starting_balance = equity` (the day-roll transition). The daily
/// loss rule is only correct if this runs before the next day's first trade;
/// the trade handlers also roll lazily as a belt, so a lagging scan never
/// misprices a breach.
pub fn spawn_day_roll(state: Arc<AppState>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let now = Utc::now();

            for id in state.store.ids().await {
                let mut rolled = None;
                let res = state
                    .store
                    .update_with::<Infallible, _>(id, |c| match c.roll_trading_day(now) {
                        Some(next) => {
                            rolled = Some(next.clone());
                            Ok(next)
                        }
                        None => Ok(c.clone()),
                    })
                    .await;

                let Ok(Some(_)) = res else { continue };
                if let Some(challenge) = rolled {
                    info!(challenge_id = %id, "trading day rolled; daily anchor re-snapshot");
                    let _ = state.bus.send(BusMsg::Challenge(ChallengeEvent::of(&challenge)));
                    persist_challenge(&state, challenge);
                }
            }
        }
    });
}

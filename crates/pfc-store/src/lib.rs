//! pfc-store
//!
//! Challenge persistence.
//!
//! The in-memory [`MemoryStore`] is the authoritative record while the daemon
//! runs: every read-modify-write happens under its single write lock, which
//! is what serializes concurrent trade requests against the same challenge id
//! (at-most-one `apply_trade` in flight per id — the engine is not
//! commutative-safe under concurrent application).
//!
//! [`PgStore`] is an optional durable layer behind it: the daemon writes
//! through after each mutation and reads from it only to recover challenges
//! that are not in memory (e.g. after a restart).

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use pfc_engine::{Challenge, ChallengeStatus, Money, PlanTier};
use pfc_paper::PaperFill;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;
use uuid::Uuid;

pub const ENV_DB_URL: &str = "PFC_DATABASE_URL";

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Authoritative in-memory challenge map, shared across handlers.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<Uuid, Challenge>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a challenge record.
    pub async fn insert(&self, challenge: Challenge) {
        let mut map = self.inner.write().await;
        map.insert(challenge.id, challenge);
    }

    /// Insert only if absent (recovery path: a concurrent request may have
    /// restored the same challenge already; the in-memory copy wins).
    pub async fn restore(&self, challenge: Challenge) -> Challenge {
        let mut map = self.inner.write().await;
        map.entry(challenge.id).or_insert(challenge).clone()
    }

    pub async fn get(&self, id: Uuid) -> Option<Challenge> {
        let map = self.inner.read().await;
        map.get(&id).cloned()
    }

    /// Ids of all challenges currently held (day-roll scan).
    pub async fn ids(&self) -> Vec<Uuid> {
        let map = self.inner.read().await;
        map.keys().copied().collect()
    }

    /// Serialized read-modify-write: `f` runs under the write lock against
    /// the current record and its result replaces it atomically.
    ///
    /// Returns `Ok(None)` when the id is unknown, `Err` (state unchanged)
    /// when `f` rejects the transition.
    pub async fn update_with<E, F>(&self, id: Uuid, f: F) -> Result<Option<Challenge>, E>
    where
        F: FnOnce(&Challenge) -> Result<Challenge, E>,
    {
        let mut map = self.inner.write().await;
        let Some(current) = map.get(&id) else {
            return Ok(None);
        };
        let next = f(current)?;
        map.insert(id, next.clone());
        Ok(Some(next))
    }
}

// ---------------------------------------------------------------------------
// PgStore
// ---------------------------------------------------------------------------

/// Connect to Postgres using PFC_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url =
        std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Durable write-through / recovery store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or fully refresh a challenge row.
    pub async fn upsert_challenge(&self, c: &Challenge) -> Result<()> {
        sqlx::query(
            r#"
            insert into challenges (
              id, user_id, tier, status,
              initial_balance_micros, current_balance_micros, equity_micros,
              max_equity_micros, daily_starting_balance_micros,
              profit_target_micros, max_daily_loss_limit_micros,
              max_total_loss_limit_micros, created_at, updated_at
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14
            )
            on conflict (id) do update set
              status = excluded.status,
              current_balance_micros = excluded.current_balance_micros,
              equity_micros = excluded.equity_micros,
              max_equity_micros = excluded.max_equity_micros,
              daily_starting_balance_micros = excluded.daily_starting_balance_micros,
              updated_at = excluded.updated_at
            "#,
        )
        .bind(c.id)
        .bind(&c.user_id)
        .bind(c.tier.as_str())
        .bind(c.status.as_str())
        .bind(c.initial_balance.raw())
        .bind(c.current_balance.raw())
        .bind(c.equity.raw())
        .bind(c.max_equity.raw())
        .bind(c.daily_starting_balance.raw())
        .bind(c.profit_target.raw())
        .bind(c.max_daily_loss_limit.raw())
        .bind(c.max_total_loss_limit.raw())
        .bind(c.created_at)
        .bind(c.updated_at)
        .execute(&self.pool)
        .await
        .context("upsert_challenge failed")?;

        Ok(())
    }

    /// Load one challenge row, if present.
    pub async fn fetch_challenge(&self, id: Uuid) -> Result<Option<Challenge>> {
        let row = sqlx::query(
            r#"
            select id, user_id, tier, status,
                   initial_balance_micros, current_balance_micros, equity_micros,
                   max_equity_micros, daily_starting_balance_micros,
                   profit_target_micros, max_daily_loss_limit_micros,
                   max_total_loss_limit_micros, created_at, updated_at
            from challenges
            where id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("fetch_challenge failed")?;

        row.map(challenge_from_row).transpose()
    }

    /// Record one executed paper fill.
    pub async fn insert_trade(&self, fill: &PaperFill) -> Result<()> {
        sqlx::query(
            r#"
            insert into trades (
              id, challenge_id, symbol, side, entry_price, exit_price,
              size, pnl_micros, status, opened_at, closed_at
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11
            )
            "#,
        )
        .bind(fill.id)
        .bind(fill.challenge_id)
        .bind(&fill.symbol)
        .bind(fill.side.as_str())
        .bind(fill.entry_price)
        .bind(fill.exit_price)
        .bind(fill.size)
        .bind(fill.pnl.raw())
        .bind(match fill.status {
            pfc_paper::FillStatus::Open => "OPEN",
            pfc_paper::FillStatus::Closed => "CLOSED",
        })
        .bind(fill.opened_at)
        .bind(fill.closed_at)
        .execute(&self.pool)
        .await
        .context("insert_trade failed")?;

        Ok(())
    }
}

fn challenge_from_row(row: sqlx::postgres::PgRow) -> Result<Challenge> {
    let tier_str: String = row.try_get("tier")?;
    let tier: PlanTier = tier_str
        .parse()
        .with_context(|| format!("challenge row has unknown tier {tier_str:?}"))?;

    let status_str: String = row.try_get("status")?;
    let Some(status) = ChallengeStatus::from_wire(&status_str) else {
        bail!("challenge row has unknown status {status_str:?}");
    };

    let money = |col: &str| -> Result<Money> {
        let raw: i64 = row.try_get(col)?;
        Ok(Money::from_micros(raw))
    };

    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(Challenge {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        tier,
        status,
        initial_balance: money("initial_balance_micros")?,
        current_balance: money("current_balance_micros")?,
        equity: money("equity_micros")?,
        max_equity: money("max_equity_micros")?,
        daily_starting_balance: money("daily_starting_balance_micros")?,
        profit_target: money("profit_target_micros")?,
        max_daily_loss_limit: money("max_daily_loss_limit_micros")?,
        max_total_loss_limit: money("max_total_loss_limit_micros")?,
        created_at,
        updated_at,
    })
}

// ---------------------------------------------------------------------------
// Unit tests (memory store; Pg paths are covered against a live DB only)
// ---------------------------------------------------------------------------

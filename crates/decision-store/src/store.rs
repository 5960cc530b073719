//! Decision persistence over Postgres.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use tracing::info;

use fraud_core::{Decision, Error, Result};

use crate::config::PostgresConfig;
use crate::schema;

/// Result of an idempotent insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted {
    Created,
    /// Primary-key conflict: some worker already decided this transaction.
    AlreadyExists,
}

/// A persisted decision row.
#[derive(Debug, Clone, FromRow)]
pub struct DecisionRow {
    pub transaction_id: String,
    pub user_id: String,
    pub decision: String,
    pub score: f64,
    pub reasons_csv: Option<String>,
    pub latency_ms: i64,
    pub evaluated_at: DateTime<Utc>,
}

impl DecisionRow {
    /// Reason labels split back out of the pipe-delimited column.
    pub fn reasons(&self) -> Vec<String> {
        self.reasons_csv
            .as_deref()
            .into_iter()
            .flat_map(|csv| csv.split('|'))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Durable store of emitted decisions; the lookup side doubles as the
/// stream processor's idempotency gate.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    /// Fetches the decision row for a transaction, if one exists.
    async fn find(&self, transaction_id: &str) -> Result<Option<DecisionRow>>;

    /// Inserts a decision row. A primary-key conflict is an accepted no-op
    /// and reports `Inserted::AlreadyExists`.
    async fn insert(&self, decision: &Decision) -> Result<Inserted>;
}

/// Postgres-backed decision store.
#[derive(Clone)]
pub struct PgDecisionStore {
    pool: PgPool,
}

impl PgDecisionStore {
    /// Connects a pool against the configured database.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| Error::decision_store(format!("postgres connect failed: {e}")))?;

        info!(
            max_connections = config.max_connections,
            "Connected to Postgres decision store"
        );
        Ok(Self { pool })
    }

    /// Wraps an existing pool (tests).
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the decision table DDL; safe to run repeatedly.
    pub async fn init_schema(&self) -> Result<()> {
        for statement in schema::all_statements() {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::decision_store(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }

    /// Round-trips `SELECT 1`; used by startup health checks.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    /// Most recent decisions for a user, newest first. Backs ops tooling;
    /// the hot path never calls this.
    pub async fn recent_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<DecisionRow>> {
        sqlx::query_as::<_, DecisionRow>(
            r#"
            SELECT transaction_id, user_id, decision, score, reasons_csv,
                   latency_ms, evaluated_at
            FROM fraud_decisions
            WHERE user_id = $1
            ORDER BY evaluated_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::decision_store(format!("recent_for_user failed: {e}")))
    }
}

#[async_trait]
impl DecisionStore for PgDecisionStore {
    async fn find(&self, transaction_id: &str) -> Result<Option<DecisionRow>> {
        sqlx::query_as::<_, DecisionRow>(
            r#"
            SELECT transaction_id, user_id, decision, score, reasons_csv,
                   latency_ms, evaluated_at
            FROM fraud_decisions
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::decision_store(format!("decision lookup failed: {e}")))
    }

    async fn insert(&self, decision: &Decision) -> Result<Inserted> {
        let result = sqlx::query(
            r#"
            INSERT INTO fraud_decisions (
                transaction_id, user_id, decision, score, reasons_csv,
                latency_ms, evaluated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (transaction_id) DO NOTHING
            "#,
        )
        .bind(&decision.transaction_id)
        .bind(&decision.user_id)
        .bind(decision.decision.as_str())
        .bind(decision.score)
        .bind(decision.reasons_csv())
        .bind(decision.latency_ms as i64)
        .bind(decision.evaluated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::decision_store(format!("decision insert failed: {e}")))?;

        if result.rows_affected() == 0 {
            Ok(Inserted::AlreadyExists)
        } else {
            Ok(Inserted::Created)
        }
    }
}

//! Decision table DDL.

/// SQL for creating the decisions table.
///
/// `transaction_id` is the primary key and the idempotency primitive:
/// concurrent reprocessing resolves through insert conflict, not locks.
pub const CREATE_DECISIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS fraud_decisions (
    transaction_id TEXT PRIMARY KEY,
    user_id        TEXT NOT NULL,
    decision       TEXT NOT NULL,
    score          DOUBLE PRECISION NOT NULL,
    reasons_csv    TEXT,
    latency_ms     BIGINT NOT NULL,
    evaluated_at   TIMESTAMP WITH TIME ZONE NOT NULL
)
"#;

/// Secondary indexes backing the downstream query patterns.
pub const CREATE_DECISION_INDEXES: [&str; 4] = [
    "CREATE INDEX IF NOT EXISTS idx_fraud_decisions_user_id
        ON fraud_decisions (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_fraud_decisions_decision
        ON fraud_decisions (decision)",
    "CREATE INDEX IF NOT EXISTS idx_fraud_decisions_evaluated_at
        ON fraud_decisions (evaluated_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_fraud_decisions_user_evaluated_at
        ON fraud_decisions (user_id, evaluated_at DESC)",
];

/// All schema statements in application order.
pub fn all_statements() -> Vec<&'static str> {
    let mut statements = vec![CREATE_DECISIONS_TABLE];
    statements.extend(CREATE_DECISION_INDEXES);
    statements
}

//! Typed operations over the per-user warm state.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::Duration;
use telemetry::metrics;
use tracing::{info, warn};

use fraud_core::geo::LastLocation;
use fraud_core::{Error, Result};

use crate::config::RedisConfig;
use crate::median::{median_of, parse_amounts};

/// Rolling window kept in the tx-time series.
const TX_WINDOW_SECS: i64 = 24 * 3600;
/// TTLs per keyspace, refreshed on every write.
const TX_TIMES_TTL_SECS: i64 = 2 * 86_400;
const AMOUNTS_TTL_SECS: i64 = 90 * 86_400;
const FIRST_SEEN_TTL_SECS: i64 = 90 * 86_400;
const LAST_LOCATION_TTL_SECS: i64 = 30 * 86_400;

/// Typed operations over a user's rolling state.
///
/// Reads and writes are split so the stream processor can read every
/// signal before applying this transaction's writes. Implementations
/// must never fail outward: reads degrade to absent/zero and writes are
/// best-effort.
#[async_trait]
pub trait UserStateStore: Send + Sync {
    /// Records a transaction instant in the user's time series, keyed by
    /// transaction id so redelivery cannot double-count, and trims entries
    /// older than 24 hours.
    async fn record_tx_time(&self, user_id: &str, transaction_id: &str, ts: i64);

    /// Count of recorded transactions in `[now - window_sec, now]`.
    async fn recent_count(&self, user_id: &str, now: i64, window_sec: i64) -> u64;

    /// Prepends an amount to the user's history, truncated to `max_size`.
    async fn record_amount(&self, user_id: &str, amount: f64, max_size: usize);

    /// Median of the stored history; 0.0 when empty. Never fails.
    async fn median_amount(&self, user_id: &str) -> f64;

    /// First-seen epoch seconds of a device for this user, if recorded.
    async fn device_first_seen(&self, user_id: &str, device_id: &str) -> Option<i64>;

    /// Records a device observation. Returns true iff this is the first
    /// time the device is seen for the user; a pre-existing first-seen
    /// timestamp is never overwritten.
    async fn observe_device(&self, user_id: &str, device_id: &str, ts: i64) -> bool;

    /// First-seen epoch seconds of an ip for this user, if recorded.
    async fn ip_first_seen(&self, user_id: &str, ip: &str) -> Option<i64>;

    /// Records an ip observation; first-seen preserved as for devices.
    async fn observe_ip(&self, user_id: &str, ip: &str, ts: i64) -> bool;

    /// The user's last recorded location, if any.
    async fn last_location(&self, user_id: &str) -> Option<LastLocation>;

    /// Unconditionally overwrites the user's last location.
    async fn set_last_location(&self, user_id: &str, lat: f64, lon: f64, ts: i64);
}

/// Redis-backed state store.
///
/// Key layout (one namespace per user, matching the warm-store data model):
/// - `user:{id}:tx_times`     ZSET  member = transaction id, score = epoch sec
/// - `user:{id}:amounts`      LIST  most-recent-first amounts
/// - `user:{id}:device_times` ZSET  member = device id, score = first-seen
/// - `user:{id}:ip_times`     ZSET  member = ip, score = first-seen
/// - `user:{id}:last_loc`     HASH  lat / lon / ts
#[derive(Clone)]
pub struct RedisStateStore {
    conn: ConnectionManager,
}

impl RedisStateStore {
    /// Connects to Redis and returns the store.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| Error::state_store(format!("invalid redis url: {e}")))?;

        let connect = ConnectionManager::new(client);
        let conn = tokio::time::timeout(
            Duration::from_millis(config.connect_timeout_ms),
            connect,
        )
        .await
        .map_err(|_| Error::state_store("redis connect timed out"))?
        .map_err(|e| Error::state_store(format!("redis connect failed: {e}")))?;

        info!(url = %config.url, "Connected to Redis state store");
        Ok(Self { conn })
    }

    /// Round-trips a PING; used by startup health checks.
    pub async fn ping(&self) -> bool {
        let mut conn = self.conn.clone();
        let res: redis::RedisResult<String> =
            redis::cmd("PING").query_async(&mut conn).await;
        res.is_ok()
    }

    fn key(user_id: &str, suffix: &str) -> String {
        format!("user:{user_id}:{suffix}")
    }

    /// ZADD NX into a first-seen ZSET; returns whether the member was new.
    async fn observe_first_seen(&self, key: &str, member: &str, ts: i64) -> bool {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.cmd("ZADD").arg(key).arg("NX").arg(ts).arg(member);
        pipe.expire(key, FIRST_SEEN_TTL_SECS).ignore();

        let res: redis::RedisResult<(i64,)> = pipe.query_async(&mut conn).await;
        match res {
            Ok((added,)) => added > 0,
            Err(e) => {
                warn!(key = %key, error = %e, "first-seen write failed");
                metrics().state_write_failures.inc();
                false
            }
        }
    }

    async fn first_seen(&self, key: &str, member: &str) -> Option<i64> {
        let mut conn = self.conn.clone();
        match conn.zscore::<_, _, Option<f64>>(key, member).await {
            Ok(score) => score.map(|s| s as i64),
            Err(e) => {
                warn!(key = %key, error = %e, "first-seen read failed");
                metrics().state_read_failures.inc();
                None
            }
        }
    }
}

#[async_trait]
impl UserStateStore for RedisStateStore {
    async fn record_tx_time(&self, user_id: &str, transaction_id: &str, ts: i64) {
        let key = Self::key(user_id, "tx_times");
        let cutoff = ts - TX_WINDOW_SECS;
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.zadd(&key, transaction_id, ts).ignore();
        pipe.zrembyscore(&key, 0, cutoff).ignore();
        pipe.expire(&key, TX_TIMES_TTL_SECS).ignore();

        let res: redis::RedisResult<()> = pipe.query_async(&mut conn).await;
        if let Err(e) = res {
            warn!(user_id = %user_id, error = %e, "tx-time write failed");
            metrics().state_write_failures.inc();
        }
    }

    async fn recent_count(&self, user_id: &str, now: i64, window_sec: i64) -> u64 {
        let key = Self::key(user_id, "tx_times");
        let mut conn = self.conn.clone();
        match conn.zcount::<_, _, _, u64>(&key, now - window_sec, now).await {
            Ok(count) => count,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "recent-count read failed");
                metrics().state_read_failures.inc();
                0
            }
        }
    }

    async fn record_amount(&self, user_id: &str, amount: f64, max_size: usize) {
        let key = Self::key(user_id, "amounts");
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.lpush(&key, amount).ignore();
        pipe.ltrim(&key, 0, max_size.saturating_sub(1) as isize).ignore();
        pipe.expire(&key, AMOUNTS_TTL_SECS).ignore();

        let res: redis::RedisResult<()> = pipe.query_async(&mut conn).await;
        if let Err(e) = res {
            warn!(user_id = %user_id, error = %e, "amount write failed");
            metrics().state_write_failures.inc();
        }
    }

    async fn median_amount(&self, user_id: &str) -> f64 {
        let key = Self::key(user_id, "amounts");
        let mut conn = self.conn.clone();
        match conn.lrange::<_, Vec<String>>(&key, 0, -1).await {
            Ok(raw) => median_of(&parse_amounts(&raw)),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "amount history read failed");
                metrics().state_read_failures.inc();
                0.0
            }
        }
    }

    async fn device_first_seen(&self, user_id: &str, device_id: &str) -> Option<i64> {
        self.first_seen(&Self::key(user_id, "device_times"), device_id)
            .await
    }

    async fn observe_device(&self, user_id: &str, device_id: &str, ts: i64) -> bool {
        self.observe_first_seen(&Self::key(user_id, "device_times"), device_id, ts)
            .await
    }

    async fn ip_first_seen(&self, user_id: &str, ip: &str) -> Option<i64> {
        self.first_seen(&Self::key(user_id, "ip_times"), ip).await
    }

    async fn observe_ip(&self, user_id: &str, ip: &str, ts: i64) -> bool {
        self.observe_first_seen(&Self::key(user_id, "ip_times"), ip, ts)
            .await
    }

    async fn last_location(&self, user_id: &str) -> Option<LastLocation> {
        let key = Self::key(user_id, "last_loc");
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = match conn.hgetall(&key).await {
            Ok(fields) => fields,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "last-location read failed");
                metrics().state_read_failures.inc();
                return None;
            }
        };

        let lat = fields.get("lat")?.parse().ok()?;
        let lon = fields.get("lon")?.parse().ok()?;
        let ts = fields.get("ts")?.parse().ok()?;
        Some(LastLocation { lat, lon, ts })
    }

    async fn set_last_location(&self, user_id: &str, lat: f64, lon: f64, ts: i64) {
        let key = Self::key(user_id, "last_loc");
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.hset_multiple(
            &key,
            &[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("ts", ts.to_string()),
            ],
        )
        .ignore();
        pipe.expire(&key, LAST_LOCATION_TTL_SECS).ignore();

        let res: redis::RedisResult<()> = pipe.query_async(&mut conn).await;
        if let Err(e) = res {
            warn!(user_id = %user_id, error = %e, "last-location write failed");
            metrics().state_write_failures.inc();
        }
    }
}

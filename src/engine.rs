//! Execution facade over the wrapped driver.
//!
//! Orchestrates the full pipeline for one call: cache lookup, rewrite on
//! miss, per-call value coercion, execution through sqlx, and single-pass
//! result materialization. Also owns the per-instance performance counters
//! and the per-connection transaction state.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPool, PgRow};
use sqlx::query::Query;
use sqlx::Postgres;
use tracing::{debug, warn};

use crate::cache::QueryCache;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult, ErrorKind};
use crate::row::ResultSet;
use crate::translate::{rewrite, Bindings, Rewritten};
use crate::value::Value;

/// Monotonic per-instance counters. Shared by the pool-level facade and every
/// connection handed out from it; atomics keep increments lock-free under
/// concurrent flows.
#[derive(Debug, Default)]
pub struct PerfCounters {
    queries_executed: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
    connection_errors: AtomicU64,
}

impl PerfCounters {
    fn record_query(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_commit(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    fn record_connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn reset(&self) {
        self.queries_executed.store(0, Ordering::Relaxed);
        self.commits.store(0, Ordering::Relaxed);
        self.rollbacks.store(0, Ordering::Relaxed);
        self.connection_errors.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of the facade's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PerformanceStats {
    pub queries_executed: u64,
    pub commits: u64,
    pub rollbacks: u64,
    pub connection_errors: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

/// The bridge between named-placeholder callers and the positional-style
/// async driver.
///
/// Cheap to clone; clones share the pool, the query cache, and the counters.
///
/// # Example
///
/// ```rust,ignore
/// use pgbridge::prelude::*;
///
/// let bridge = Bridge::connect("postgres://localhost/app").await?;
/// let rows = bridge
///     .execute(
///         "SELECT * FROM users WHERE active = :active",
///         &Bindings::new().bind("active", true),
///     )
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Bridge {
    pool: PgPool,
    cache: Arc<QueryCache>,
    counters: Arc<PerfCounters>,
    autocommit: bool,
}

impl Bridge {
    /// Connect using a `postgres://` URL and default pool/cache settings.
    pub async fn connect(url: &str) -> BridgeResult<Self> {
        let options = PgConnectOptions::from_str(url)
            .map_err(|e| BridgeError::Config(format!("invalid connection URL: {e}")))?;
        let config = BridgeConfig::default();
        let pool = config
            .pool_options()
            .connect_with(options)
            .await
            .map_err(BridgeError::from_driver)?;
        Ok(Self::from_pool(pool, &config))
    }

    /// Connect using an explicit configuration.
    pub async fn connect_with(config: &BridgeConfig) -> BridgeResult<Self> {
        let pool = config
            .pool_options()
            .connect_with(config.connect_options())
            .await
            .map_err(BridgeError::from_driver)?;
        Ok(Self::from_pool(pool, config))
    }

    /// Wrap an existing pool. Useful when the caller already manages one.
    pub fn from_pool(pool: PgPool, config: &BridgeConfig) -> Self {
        Self {
            pool,
            cache: Arc::new(QueryCache::new(config.cache_capacity)),
            counters: Arc::new(PerfCounters::default()),
            autocommit: config.autocommit,
        }
    }

    /// Execute one query on any pooled connection, autocommit semantics.
    ///
    /// Translation is served from the cache when possible; value coercion
    /// always runs per call.
    pub async fn execute(&self, query: &str, bindings: &Bindings) -> BridgeResult<ResultSet> {
        let rewritten = translate_cached(&self.cache, query)?;
        let values = coerce_all(rewritten.bind(bindings)?);

        debug!(sql = rewritten.sql(), params = values.len(), "executing");
        self.counters.record_query();
        let rows: Vec<PgRow> = build_query(rewritten.sql(), &values)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| self.wrap_driver_error(e))?;

        Ok(ResultSet::from_rows(&rows))
    }

    /// Acquire a dedicated connection carrying its own transaction state.
    pub async fn acquire(&self) -> BridgeResult<BridgeConnection> {
        let conn = self.pool.acquire().await.map_err(|e| {
            self.counters.record_connection_error();
            BridgeError::from_driver(e)
        })?;
        Ok(BridgeConnection {
            conn: Some(conn),
            in_transaction: false,
            autocommit: self.autocommit,
            cache: Arc::clone(&self.cache),
            counters: Arc::clone(&self.counters),
        })
    }

    /// Snapshot of the aggregate counters, cache accounting included.
    pub fn performance_stats(&self) -> PerformanceStats {
        PerformanceStats {
            queries_executed: self.counters.queries_executed.load(Ordering::Relaxed),
            commits: self.counters.commits.load(Ordering::Relaxed),
            rollbacks: self.counters.rollbacks.load(Ordering::Relaxed),
            connection_errors: self.counters.connection_errors.load(Ordering::Relaxed),
            cache_hits: self.cache.hits(),
            cache_misses: self.cache.misses(),
        }
    }

    /// Zero every counter. The only way any of them decreases.
    pub fn reset_performance_stats(&self) {
        self.counters.reset();
        self.cache.reset_counters();
    }

    /// Drop every cached translation.
    pub fn clear_query_cache(&self) {
        self.cache.clear();
    }

    /// Current cache occupancy and capacity.
    pub fn cache_stats(&self) -> (usize, usize) {
        (self.cache.len(), self.cache.capacity())
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn wrap_driver_error(&self, err: sqlx::Error) -> BridgeError {
        wrap_driver_error(&self.counters, err)
    }
}

/// A pooled connection with transaction tracking.
///
/// With autocommit off, the first query on a connection without an open
/// transaction begins one implicitly; the caller then ends it with
/// [`commit`](Self::commit) or [`rollback`](Self::rollback). Dropping the
/// handle mid-transaction rolls the open transaction back before the
/// connection can be reused (see [`Drop`]); abandoned work is never
/// half-committed and never inherited by the next acquirer.
pub struct BridgeConnection {
    // Present until drop; taken there so the handle can be dismantled.
    conn: Option<PoolConnection<Postgres>>,
    in_transaction: bool,
    autocommit: bool,
    cache: Arc<QueryCache>,
    counters: Arc<PerfCounters>,
}

impl BridgeConnection {
    /// Execute one query on this connection.
    pub async fn execute(&mut self, query: &str, bindings: &Bindings) -> BridgeResult<ResultSet> {
        let rewritten = translate_cached(&self.cache, query)?;
        let values = coerce_all(rewritten.bind(bindings)?);

        if !self.autocommit && !self.in_transaction {
            self.begin().await?;
        }

        debug!(sql = rewritten.sql(), params = values.len(), "executing");
        self.counters.record_query();
        let rows: Vec<PgRow> = build_query(rewritten.sql(), &values)
            .fetch_all(&mut **self.conn.as_mut().unwrap())
            .await
            .map_err(|e| wrap_driver_error(&self.counters, e))?;

        Ok(ResultSet::from_rows(&rows))
    }

    /// Execute the same query once per bindings set, translating only once.
    /// Returns the summed affected-row count; no rows are materialized.
    pub async fn execute_many(
        &mut self,
        query: &str,
        bindings_list: &[Bindings],
    ) -> BridgeResult<u64> {
        let rewritten = translate_cached(&self.cache, query)?;

        if !self.autocommit && !self.in_transaction {
            self.begin().await?;
        }

        let mut affected = 0;
        for bindings in bindings_list {
            let values = coerce_all(rewritten.bind(bindings)?);
            self.counters.record_query();
            let result = build_query(rewritten.sql(), &values)
                .execute(&mut **self.conn.as_mut().unwrap())
                .await
                .map_err(|e| wrap_driver_error(&self.counters, e))?;
            affected += result.rows_affected();
        }
        Ok(affected)
    }

    /// Open a transaction. A no-op if one is already open.
    pub async fn begin(&mut self) -> BridgeResult<()> {
        if self.in_transaction {
            return Ok(());
        }
        debug!("BEGIN");
        sqlx::query("BEGIN")
            .execute(&mut **self.conn.as_mut().unwrap())
            .await
            .map_err(|e| wrap_driver_error(&self.counters, e))?;
        self.in_transaction = true;
        Ok(())
    }

    /// Commit the open transaction. A no-op when none is open.
    pub async fn commit(&mut self) -> BridgeResult<()> {
        if !self.in_transaction {
            return Ok(());
        }
        sqlx::query("COMMIT")
            .execute(&mut **self.conn.as_mut().unwrap())
            .await
            .map_err(|e| {
                warn!("commit failed");
                wrap_driver_error(&self.counters, e)
            })?;
        self.in_transaction = false;
        self.counters.record_commit();
        Ok(())
    }

    /// Roll back the open transaction. A no-op when none is open.
    pub async fn rollback(&mut self) -> BridgeResult<()> {
        if !self.in_transaction {
            return Ok(());
        }
        sqlx::query("ROLLBACK")
            .execute(&mut **self.conn.as_mut().unwrap())
            .await
            .map_err(|e| wrap_driver_error(&self.counters, e))?;
        self.in_transaction = false;
        self.counters.record_rollback();
        Ok(())
    }

    /// Whether this connection currently holds an open transaction.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub fn autocommit(&self) -> bool {
        self.autocommit
    }

    pub fn set_autocommit(&mut self, on: bool) {
        self.autocommit = on;
    }
}

/// Abandonment safety: a handle dropped with an open transaction must not
/// hand that transaction to the pool's next acquirer. The raw BEGIN issued by
/// [`BridgeConnection::begin`] is invisible to the driver's own
/// rollback-on-drop machinery, so the cleanup happens here: a ROLLBACK is
/// driven to completion on a spawned task before the connection re-enters the
/// pool. If the ROLLBACK fails, or no runtime is available to run it, the
/// connection is detached and closed instead; the server aborts the
/// transaction when the socket goes away. Either way the outcome is a full
/// rollback, never a half-commit.
impl Drop for BridgeConnection {
    fn drop(&mut self) {
        if !self.in_transaction {
            return;
        }
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        warn!("connection dropped mid-transaction, rolling back");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let counters = Arc::clone(&self.counters);
                handle.spawn(async move {
                    match sqlx::query("ROLLBACK").execute(&mut *conn).await {
                        Ok(_) => counters.record_rollback(),
                        // Keep an untrustworthy connection out of the pool.
                        Err(_) => drop(conn.detach()),
                    }
                });
            }
            Err(_) => drop(conn.detach()),
        }
    }
}

/// Fetch the translation for `query`, rewriting and caching on miss.
fn translate_cached(cache: &QueryCache, query: &str) -> BridgeResult<Arc<Rewritten>> {
    if let Some(entry) = cache.get(query) {
        return Ok(entry);
    }
    let entry = Arc::new(rewrite(query)?);
    cache.put(query, Arc::clone(&entry));
    Ok(entry)
}

fn coerce_all(values: Vec<Value>) -> Vec<Value> {
    values.into_iter().map(Value::coerce).collect()
}

/// Classify a driver failure, counting it when the connection is implicated.
fn wrap_driver_error(counters: &PerfCounters, err: sqlx::Error) -> BridgeError {
    let err = BridgeError::from_driver(err);
    if err.kind() == ErrorKind::Connection {
        counters.record_connection_error();
    }
    warn!(error = %err, "driver failure");
    err
}

/// Bind an ordered value list onto a driver query.
fn build_query<'q>(sql: &'q str, values: &[Value]) -> Query<'q, Postgres, PgArguments> {
    let mut query = sqlx::query(sql);
    for value in values {
        query = match value {
            // Text-typed NULL; see the Value::Null docs for non-text columns.
            Value::Null => query.bind(None::<String>),
            Value::Bool(v) => query.bind(*v),
            Value::Int(v) => query.bind(*v),
            Value::Float(v) => query.bind(*v),
            Value::Text(v) => query.bind(v.clone()),
            Value::Uuid(v) => query.bind(*v),
            Value::Bytes(v) => query.bind(v.clone()),
            Value::Json(v) => query.bind(v.clone()),
            Value::Timestamp(v) => query.bind(*v),
            Value::Date(v) => query.bind(*v),
        };
    }
    query
}

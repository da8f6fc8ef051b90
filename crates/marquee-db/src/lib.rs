pub mod config;
pub mod error;
pub mod movies;
pub mod permissions;
pub mod schema;
pub mod tokens;
pub mod users;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, InterruptHandle};
use tracing::{debug, error, info, warn};

pub use config::DbConfig;
pub use error::DataError;

pub type Result<T, E = DataError> = std::result::Result<T, E>;

/// Pooled handle to the record store. Cheap to clone; every clone shares
/// the same pool.
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
    query_timeout: Duration,
}

impl Database {
    /// Open (creating if needed) the database file named in `config` and
    /// bootstrap the schema.
    pub fn open(config: &DbConfig) -> Result<Self> {
        let busy = config.query_timeout;
        let manager = SqliteConnectionManager::file(&config.path).with_init(move |conn| {
            // WAL mode for concurrent reads
            conn.pragma_update(None, "journal_mode", "WAL")?;
            init_connection(conn, busy)
        });

        let db = Self::build(manager, config, config.max_connections, config.min_idle)?;
        info!(
            "Database opened at {} (max {} connections)",
            config.path.display(),
            config.max_connections
        );
        Ok(db)
    }

    /// A private in-memory database that lives as long as this handle and its
    /// clones. Pool size is pinned to one connection: shared-cache memory
    /// databases lock whole tables, so a second writer would fail instead of
    /// waiting.
    pub fn open_in_memory(config: &DbConfig) -> Result<Self> {
        let busy = config.query_timeout;
        let manager = SqliteConnectionManager::memory().with_init(move |conn| init_connection(conn, busy));
        Self::build(manager, config, 1, Some(1))
    }

    fn build(
        manager: SqliteConnectionManager,
        config: &DbConfig,
        max_size: u32,
        min_idle: Option<u32>,
    ) -> Result<Self> {
        let pool = Pool::builder()
            .max_size(max_size)
            .min_idle(min_idle.map(|n| n.min(max_size)))
            .idle_timeout(config.idle_timeout)
            .connection_timeout(config.connection_timeout)
            .build(manager)?;

        schema::bootstrap(&*pool.get()?)?;

        Ok(Self {
            pool,
            query_timeout: config.query_timeout,
        })
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Round-trip a trivial statement to prove the backend is reachable.
    pub async fn ping(&self) -> Result<()> {
        self.run("ping", |conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }

    /// (connections, idle connections) currently held by the pool.
    pub fn pool_state(&self) -> (u32, u32) {
        let state = self.pool.state();
        (state.connections, state.idle_connections)
    }

    /// Run `f` against a pooled connection on the blocking thread pool,
    /// bounded by the query deadline.
    ///
    /// When the deadline passes, the statement in flight is interrupted so the
    /// connection goes back to the pool, and `DataError::Timeout` is returned.
    /// `f` is never started once the deadline has passed.
    pub(crate) async fn run<F, T>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        let timeout = self.query_timeout;
        let deadline = Instant::now() + timeout;

        // Holds the interrupt handle only while `f` owns the connection.
        let in_flight: Arc<Mutex<Option<InterruptHandle>>> = Arc::default();
        let slot = Arc::clone(&in_flight);
        // Set once the caller has been told `Timeout`; `f` must not start after.
        let expired = Arc::new(AtomicBool::new(false));
        let gave_up = Arc::clone(&expired);

        let task = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            set_slot(&slot, Some(conn.get_interrupt_handle()));

            if gave_up.load(Ordering::SeqCst) || Instant::now() >= deadline {
                set_slot(&slot, None);
                return Err(DataError::Timeout {
                    operation,
                    after: timeout,
                });
            }

            let result = f(&mut *conn);
            set_slot(&slot, None);
            result
        });

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(Err(DataError::Sqlite(e)))) if error::is_interrupted(&e) => {
                Err(DataError::Timeout {
                    operation,
                    after: timeout,
                })
            }
            Ok(Ok(result)) => {
                debug!(operation, ok = result.is_ok(), "query finished");
                result
            }
            Ok(Err(join_err)) => {
                error!(operation, "database worker failed: {}", join_err);
                Err(DataError::Task(join_err.to_string()))
            }
            Err(_) => {
                expired.store(true, Ordering::SeqCst);
                if let Ok(guard) = in_flight.lock() {
                    if let Some(handle) = guard.as_ref() {
                        handle.interrupt();
                    }
                }
                warn!(operation, "query exceeded {:?}, interrupted", timeout);
                Err(DataError::Timeout {
                    operation,
                    after: timeout,
                })
            }
        }
    }
}

fn init_connection(conn: &mut Connection, busy: Duration) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(busy)
}

fn set_slot(slot: &Mutex<Option<InterruptHandle>>, handle: Option<InterruptHandle>) {
    if let Ok(mut guard) = slot.lock() {
        *guard = handle;
    }
}

//! # Relational Store
//!
//! Sole owner of durable user records.
//!
//! ## Requirements
//!
//! - One `users` table, one row per record
//! - Pool shared by every request handler, fixed capacity, callers queue for a slot
//!   for at most `DB_ACQUIRE_TIMEOUT_MS`, then fail with a 500
//! - Health checks never wait longer than `DB_CONNECT_TIMEOUT_MS`
//! - Store may still be starting when the server comes up (container start order)
//!
//! ## Bring-Up
//!
//! - Pool is created lazily, exactly once per process
//! - Every attempt opens a pool and runs `SELECT 1` before it is trusted
//! - Fixed delay between attempts, bounded attempt count
//! - Concurrent callers wait on the same in-flight bring-up and share its outcome
//! - A failed bring-up is not cached, a caller arriving after it starts over
//!
//! ## Backends
//!
//! - MySQL in deployments, built from `DB_HOST`/`DB_USER`/`DB_PASSWORD`/`DB_NAME`/`DB_PORT`
//! - SQLite through `DATABASE_URL` for local runs and tests
use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, AtomicU64, Ordering},
    },
    time::Duration,
};

use sqlx::{
    AnyPool,
    any::{AnyPoolOptions, install_default_drivers},
};
use tokio::{
    sync::{Mutex, OnceCell},
    time::{sleep, timeout},
};
use tracing::{debug, error, info, instrument, warn};

use crate::{config::DatabaseConfig, error::DatabaseError};

const MYSQL_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        firstname VARCHAR(255) NOT NULL,
        lastname VARCHAR(255) NOT NULL,
        age BIGINT NOT NULL,
        gender VARCHAR(16) NOT NULL,
        interests VARCHAR(500) NOT NULL,
        description TEXT NOT NULL
    ) DEFAULT CHARSET = utf8mb4 COLLATE = utf8mb4_unicode_ci
"#;

const SQLITE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        firstname TEXT NOT NULL,
        lastname TEXT NOT NULL,
        age INTEGER NOT NULL,
        gender TEXT NOT NULL,
        interests TEXT NOT NULL,
        description TEXT NOT NULL
    )
"#;

pub struct Database {
    config: DatabaseConfig,
    pool: OnceCell<AnyPool>,
    /// Held for the whole of a bring-up run, stores the outcome of the last failed one.
    bring_up: Mutex<Option<Arc<DatabaseError>>>,
    /// Failed bring-up runs so far, bumped while `bring_up` is held.
    failures: AtomicU64,
    attempts: AtomicU32,
}

impl Database {
    pub fn new(config: DatabaseConfig) -> Self {
        install_default_drivers();

        Self {
            config,
            pool: OnceCell::new(),
            bring_up: Mutex::new(None),
            failures: AtomicU64::new(0),
            attempts: AtomicU32::new(0),
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Pool if a bring-up already succeeded, never waits.
    pub fn get(&self) -> Option<&AnyPool> {
        self.pool.get()
    }

    /// Total connection attempts made by this process.
    pub fn connect_attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Existing pool, or the outcome of the bring-up in flight when the
    /// caller arrived. Only callers arriving after a failed run start a new one.
    pub async fn ensure_pool(&self) -> Result<&AnyPool, Arc<DatabaseError>> {
        if let Some(pool) = self.pool.get() {
            return Ok(pool);
        }

        let seen = self.failures.load(Ordering::Acquire);
        let mut last_error = self.bring_up.lock().await;

        if let Some(pool) = self.pool.get() {
            return Ok(pool);
        }

        if self.failures.load(Ordering::Acquire) != seen {
            if let Some(e) = last_error.as_ref() {
                debug!("Sharing failed bring-up result");
                return Err(e.clone());
            }
        }

        match self.run_bring_up().await {
            Ok(pool) => {
                *last_error = None;
                Ok(self.pool.get_or_init(|| async { pool }).await)
            }
            Err(e) => {
                let e = Arc::new(e);
                *last_error = Some(e.clone());
                self.failures.fetch_add(1, Ordering::Release);

                Err(e)
            }
        }
    }

    /// `SELECT 1` against the existing pool, bounded by the connect timeout.
    /// Does not trigger a bring-up.
    pub async fn ping(&self) -> bool {
        match self.get() {
            Some(pool) => self.round_trip(pool).await.is_ok(),
            None => false,
        }
    }

    pub async fn round_trip(&self, pool: &AnyPool) -> Result<(), sqlx::Error> {
        timeout(
            self.config.connect_timeout,
            sqlx::query("SELECT 1").execute(pool),
        )
        .await
        .unwrap_or(Err(sqlx::Error::PoolTimedOut))
        .map(|_| ())
    }

    pub async fn close(&self) {
        if let Some(pool) = self.get() {
            info!("Closing database pool");
            pool.close().await;
        }
    }

    #[instrument(skip(self), fields(target = %self.config.describe()))]
    async fn run_bring_up(&self) -> Result<AnyPool, DatabaseError> {
        let attempts = self.config.connect_retries.max(1);
        let mut attempt = 1;

        loop {
            self.attempts.fetch_add(1, Ordering::Relaxed);

            match self.connect().await {
                Ok(pool) => {
                    info!("Database connected (attempt {attempt})");
                    return Ok(pool);
                }
                Err(e) if attempt >= attempts => {
                    error!("Database connection failed (attempt {attempt}): {e}");
                    return Err(DatabaseError::Exhausted {
                        attempts,
                        source: e,
                    });
                }
                Err(e) => {
                    warn!("Database connection failed (attempt {attempt}): {e}");
                    sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn connect(&self) -> Result<AnyPool, sqlx::Error> {
        let mut options = AnyPoolOptions::new()
            .max_connections(self.config.pool_size.max(1))
            .acquire_timeout(self.config.acquire_timeout);

        // An in-memory database lives only as long as its connection.
        if self.config.is_sqlite() {
            options = options
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }

        let pool = options.connect_lazy(&self.config.url())?;

        let prepared = timeout(self.config.connect_timeout, self.prepare(&pool))
            .await
            .unwrap_or(Err(sqlx::Error::PoolTimedOut));

        if let Err(e) = prepared {
            pool.close().await;
            return Err(e);
        }

        Ok(pool)
    }

    async fn prepare(&self, pool: &AnyPool) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(pool).await?;

        let schema = if self.config.is_sqlite() {
            SQLITE_SCHEMA
        } else {
            MYSQL_SCHEMA
        };
        sqlx::query(schema).execute(pool).await?;

        Ok(())
    }
}

//! `deadpool` connection pool for catalog queries

use std::time::Duration;

use deadpool::managed::{self, Metrics, PoolError, RecycleResult, TimeoutType};
use hdbconnect_async::Connection;

use crate::constants::HEALTH_CHECK_QUERY;
use crate::{Error, Result};

const WAIT_TIMEOUT: Duration = Duration::from_secs(10);
const CREATE_TIMEOUT: Duration = Duration::from_secs(30);
const RECYCLE_TIMEOUT: Duration = Duration::from_secs(5);

pub type Pool = managed::Pool<HanaConnectionManager>;
pub type PooledConnection = managed::Object<HanaConnectionManager>;

/// Opens connections from a HANA URL and probes them before reuse
#[derive(Debug)]
pub struct HanaConnectionManager {
    url: String,
}

impl managed::Manager for HanaConnectionManager {
    type Type = Connection;
    type Error = hdbconnect::HdbError;

    async fn create(&self) -> std::result::Result<Connection, hdbconnect::HdbError> {
        Connection::new(self.url.clone()).await
    }

    async fn recycle(&self, conn: &mut Connection, metrics: &Metrics) -> RecycleResult<Self::Error> {
        // Builds can sit idle between runs; drop sessions the server closed
        if let Err(e) = conn.query(HEALTH_CHECK_QUERY).await {
            tracing::debug!(
                error = %e,
                recycled = metrics.recycle_count,
                "Discarding stale pooled connection"
            );
            return Err(e.into());
        }
        Ok(())
    }
}

/// Build a pool of at most `max_size` connections to `url`
pub fn create_pool(url: String, max_size: usize) -> Result<Pool> {
    Pool::builder(HanaConnectionManager { url })
        .max_size(max_size)
        .wait_timeout(Some(WAIT_TIMEOUT))
        .create_timeout(Some(CREATE_TIMEOUT))
        .recycle_timeout(Some(RECYCLE_TIMEOUT))
        .runtime(deadpool::Runtime::Tokio1)
        .build()
        .map_err(|e| Error::Config(format!("Failed to create connection pool: {e}")))
}

/// Borrow a connection.
///
/// Driver failures while opening a connection keep their `HdbError`; only a
/// wait for a free slot that runs out is reported as [`Error::PoolExhausted`].
pub async fn get_connection(pool: &Pool) -> Result<PooledConnection> {
    pool.get().await.map_err(|e| {
        tracing::debug!(error = %e, "Failed to acquire pooled connection");
        match e {
            PoolError::Backend(e) => Error::Connection(e),
            PoolError::Timeout(TimeoutType::Wait) => Error::PoolExhausted,
            PoolError::Timeout(kind) => {
                Error::Pool(format!("Timed out during connection {kind:?}"))
            }
            other => Error::Pool(other.to_string()),
        }
    })
}

// src/shipments/database/connection.rs

use crate::shipments::error::{PipelineResult, QueryError};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

pub struct DbConnection;

impl DbConnection {
    /// Opens the shipment store read-only for a single operation.
    ///
    /// Every fetch is a single autocommitted read: the connection is opened
    /// here and dropped by the caller at the end of the operation. No pooling,
    /// no transactions spanning statements.
    pub fn open_read_only(path: &Path) -> PipelineResult<Connection> {
        if !path.exists() {
            return Err(QueryError::StoreUnavailable(path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "failed to open store");
            QueryError::StoreUnavailable(path.to_path_buf())
        })?;

        // PRAGMA settings are connection-specific, so set them every time.
        // No statement has run yet, so a failure here is still an open
        // failure, not an execution one.
        conn.execute_batch(
            "PRAGMA query_only=ON;
             PRAGMA busy_timeout=5000;",
        )
        .map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "failed to configure store connection");
            QueryError::StoreUnavailable(path.to_path_buf())
        })?;

        tracing::debug!(path = %path.display(), "opened read-only store connection");
        Ok(conn)
    }
}

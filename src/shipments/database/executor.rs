// src/shipments/database/executor.rs

use crate::shipments::error::{PipelineResult, QueryError};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;

/// Result of executing one sanitized fetch statement.
///
/// `columns` preserves the statement's result-column order (the JSON maps in
/// `rows` sort keys alphabetically, so order-dependent consumers such as the
/// document router read `columns` instead).
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct FetchResult {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, Value>>,
}

impl FetchResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Executes a Sanitizer-approved fetch statement and shapes the rows.
///
/// Rows come back in engine result order, never re-sorted. Any engine fault
/// (syntax error, type mismatch) is reported as `ExecutionError` and never
/// retried; the statement is machine-generated and a retry would replay the
/// same text.
pub fn execute_fetch(conn: &Connection, sql: &str) -> PipelineResult<FetchResult> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| QueryError::ExecutionError(e.to_string()))?;

    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let column_count = columns.len();

    let mut result = FetchResult {
        columns,
        rows: Vec::new(),
    };

    let mut rows = stmt
        .query([])
        .map_err(|e| QueryError::ExecutionError(e.to_string()))?;

    while let Some(row) = rows
        .next()
        .map_err(|e| QueryError::ExecutionError(e.to_string()))?
    {
        let mut shaped = serde_json::Map::new();
        for idx in 0..column_count {
            let value = match row.get_ref(idx) {
                Ok(ValueRef::Null) => Value::Null,
                Ok(ValueRef::Integer(i)) => Value::from(i),
                Ok(ValueRef::Real(f)) => {
                    serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
                }
                Ok(ValueRef::Text(t)) => Value::from(String::from_utf8_lossy(t).into_owned()),
                Ok(ValueRef::Blob(_)) => {
                    tracing::warn!(column = %result.columns[idx], "blob column dropped from result row");
                    Value::Null
                }
                Err(e) => return Err(QueryError::ExecutionError(e.to_string())),
            };
            shaped.insert(result.columns[idx].clone(), value);
        }
        result.rows.push(shaped);
    }

    tracing::debug!(rows = result.rows.len(), "fetch executed");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE shipments (shipmentName TEXT, status TEXT, totalAmount TEXT);
             INSERT INTO shipments VALUES ('Acme March', 'Done', '$12,500.00');
             INSERT INTO shipments VALUES ('Acme April', 'In Transit', '$9,000.00');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_rows_shaped_in_result_order() {
        let conn = seeded_db();
        let result =
            execute_fetch(&conn, "SELECT shipmentName, status FROM shipments").unwrap();
        assert_eq!(result.columns, vec!["shipmentName", "status"]);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0]["shipmentName"], "Acme March");
        assert_eq!(result.rows[1]["status"], "In Transit");
    }

    #[test]
    fn test_engine_fault_is_execution_error() {
        let conn = seeded_db();
        let err = execute_fetch(&conn, "SELECT nope FROM shipments").unwrap_err();
        assert!(matches!(err, QueryError::ExecutionError(_)));
    }

    #[test]
    fn test_currency_strip_expression_executes() {
        let conn = seeded_db();
        let result = execute_fetch(
            &conn,
            "SELECT SUM(CAST(REPLACE(REPLACE(totalAmount, '$', ''), ',', '') AS REAL)) AS total FROM shipments",
        )
        .unwrap();
        assert_eq!(result.rows[0]["total"], serde_json::json!(21500.0));
    }
}

// src/shipments/database/schema.rs

use crate::shipments::error::{PipelineResult, QueryError};
use rusqlite::Connection;

/// One column reflected from the store, as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub declared_type: String,
}

/// Reflects the target table's columns into descriptors.
///
/// Regenerated per request on purpose: the table may be re-created between
/// requests (the upload path drops and reloads it), so nothing is cached.
pub fn reflect_columns(conn: &Connection, table: &str) -> PipelineResult<Vec<ColumnDescriptor>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info(\"{}\")", table))
        .map_err(|e| QueryError::SchemaUnavailable {
            table: table.to_string(),
            detail: e.to_string(),
        })?;

    let rows = stmt
        .query_map([], |row| {
            Ok(ColumnDescriptor {
                name: row.get::<_, String>(1)?,
                declared_type: row.get::<_, String>(2)?,
            })
        })
        .map_err(|e| QueryError::SchemaUnavailable {
            table: table.to_string(),
            detail: e.to_string(),
        })?;

    let mut columns = Vec::new();
    for row in rows {
        columns.push(row.map_err(|e| QueryError::SchemaUnavailable {
            table: table.to_string(),
            detail: e.to_string(),
        })?);
    }

    if columns.is_empty() {
        // Table missing or the store was never populated.
        return Err(QueryError::SchemaUnavailable {
            table: table.to_string(),
            detail: "no columns found".to_string(),
        });
    }

    Ok(columns)
}

/// Renders the reflected columns as the single-line description consumed by
/// the generation prompt: `Table 'shipments' columns: etd (TEXT), ...`.
pub fn describe_table(conn: &Connection, table: &str) -> PipelineResult<String> {
    let columns = reflect_columns(conn, table)?;
    let parts: Vec<String> = columns
        .iter()
        .map(|c| format!("{} ({})", c.name, c.declared_type))
        .collect();
    let description = format!("Table '{}' columns: {}.", table, parts.join(", "));
    tracing::debug!(table, %description, "reflected table schema");
    Ok(description)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE shipments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                shipmentName TEXT,
                status TEXT,
                totalAmount TEXT
            );",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_describe_table_renders_columns_in_order() {
        let conn = memory_db();
        let description = describe_table(&conn, "shipments").unwrap();
        assert_eq!(
            description,
            "Table 'shipments' columns: id (INTEGER), shipmentName (TEXT), status (TEXT), totalAmount (TEXT)."
        );
    }

    #[test]
    fn test_missing_table_is_schema_unavailable() {
        let conn = Connection::open_in_memory().unwrap();
        let err = describe_table(&conn, "shipments").unwrap_err();
        assert!(matches!(err, QueryError::SchemaUnavailable { .. }));
    }
}

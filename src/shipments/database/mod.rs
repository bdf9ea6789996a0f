// src/shipments/database/mod.rs
// Read-only access to the shipment store: per-operation connections,
// schema reflection, and fetch execution.

pub mod connection;
pub mod executor;
pub mod schema;

pub use connection::DbConnection;
pub use executor::{execute_fetch, FetchResult};
pub use schema::{describe_table, reflect_columns, ColumnDescriptor};

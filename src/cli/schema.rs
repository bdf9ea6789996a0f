// src/cli/schema.rs

use crate::settings::AppSettings;
use crate::shipments::database::{describe_table, DbConnection};
use crate::shipments::QueryError;

/// Prints the schema description exactly as the generator would see it.
pub fn run(settings: &AppSettings) -> Result<(), QueryError> {
    let conn = DbConnection::open_read_only(&settings.db_path)?;
    let description = describe_table(&conn, "shipments")?;
    println!("{}", description);
    Ok(())
}

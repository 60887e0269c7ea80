use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn apply(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS preferences (
            record_type TEXT PRIMARY KEY NOT NULL,
            preferred_mode TEXT NOT NULL,
            preferred_location_id TEXT,
            preferred_location_name TEXT,
            updated_at INTEGER NOT NULL
        );
        "#,
    )
    .context("applying preference schema")?;
    Ok(())
}

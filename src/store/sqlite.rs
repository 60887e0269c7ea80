use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use time::OffsetDateTime;

use super::{schema, Preference, PreferenceStore, StoreError, StoreResult};
use crate::model::Mode;

/// Preference store persisted in a small SQLite database.
pub struct SqlitePreferenceStore {
    conn: Mutex<Connection>,
}

impl SqlitePreferenceStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating data directory {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("opening preference database {}", path.display()))?;
        prepare_connection(&conn)?;
        schema::apply(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory preferences")?;
        schema::apply(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn read(&self, record_type: &str) -> Result<Option<Preference>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT preferred_mode, preferred_location_id, preferred_location_name
                 FROM preferences
                 WHERE record_type = ?1",
                params![record_type],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()
            .context("reading stored preference")?;
        let Some((mode, location_id, location_name)) = row else {
            return Ok(None);
        };
        let preferred_mode = mode.parse::<Mode>().unwrap_or_else(|_| {
            tracing::warn!(%mode, record_type, "unknown stored mode, falling back to notes");
            Mode::Notes
        });
        Ok(Some(Preference {
            preferred_mode,
            preferred_location_id: location_id,
            preferred_location_name: location_name,
        }))
    }

    fn write(&self, record_type: &str, preference: &Preference) -> Result<()> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.conn
            .lock()
            .execute(
                "INSERT INTO preferences
                    (record_type, preferred_mode, preferred_location_id, preferred_location_name, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(record_type) DO UPDATE SET
                    preferred_mode = excluded.preferred_mode,
                    preferred_location_id = excluded.preferred_location_id,
                    preferred_location_name = excluded.preferred_location_name,
                    updated_at = excluded.updated_at",
                params![
                    record_type,
                    preference.preferred_mode.to_string(),
                    preference.preferred_location_id,
                    preference.preferred_location_name,
                    now
                ],
            )
            .context("writing preference")?;
        Ok(())
    }

    fn remove(&self, record_type: &str) -> Result<()> {
        self.conn
            .lock()
            .execute(
                "DELETE FROM preferences WHERE record_type = ?1",
                params![record_type],
            )
            .context("clearing preference")?;
        Ok(())
    }
}

fn prepare_connection(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    Ok(())
}

fn unavailable(err: anyhow::Error) -> StoreError {
    StoreError::unavailable(format!("{err:#}"))
}

#[async_trait]
impl PreferenceStore for SqlitePreferenceStore {
    async fn load(&self, record_type: &str) -> StoreResult<Option<Preference>> {
        self.read(record_type).map_err(unavailable)
    }

    async fn save(&self, record_type: &str, preference: &Preference) -> StoreResult<()> {
        self.write(record_type, preference).map_err(unavailable)
    }

    async fn clear(&self, record_type: &str) -> StoreResult<()> {
        self.remove(record_type).map_err(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn preferences_survive_reopen() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("data").join("preferences.db");
        let preference = Preference {
            preferred_mode: Mode::Remote,
            preferred_location_id: Some("loc-1".into()),
            preferred_location_name: Some("Docs".into()),
        };
        {
            let store = SqlitePreferenceStore::open(&path)?;
            store.save("account", &preference).await?;
        }
        let store = SqlitePreferenceStore::open(&path)?;
        assert_eq!(store.load("account").await?, Some(preference));
        assert_eq!(store.load("contact").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn save_overwrites_and_clear_removes() -> anyhow::Result<()> {
        let store = SqlitePreferenceStore::open_in_memory()?;
        let mut preference = Preference::default();
        store.save("account", &preference).await?;
        preference.preferred_mode = Mode::Remote;
        preference.preferred_location_id = Some("loc-2".into());
        store.save("account", &preference).await?;
        assert_eq!(store.load("account").await?, Some(preference));

        store.clear("account").await?;
        assert_eq!(store.load("account").await?, None);
        Ok(())
    }
}

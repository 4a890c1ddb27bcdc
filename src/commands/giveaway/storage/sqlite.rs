use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serenity::model::id::{GuildId, MessageId};
use tracing::info;
use uuid::Uuid;

use crate::commands::giveaway::models::{Giveaway, GiveawayUpdate};
use crate::commands::giveaway::storage::{GiveawayStore, sort_by_end_time};
use crate::error::{Error, Result};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS giveaways (
        id               TEXT PRIMARY KEY,
        guild_id         INTEGER NOT NULL,
        message_id       INTEGER NOT NULL,
        active           INTEGER NOT NULL,
        end_time_ms      INTEGER NOT NULL,
        record           TEXT NOT NULL,
        lease_holder     TEXT,
        lease_expires_ms INTEGER
    );
    CREATE INDEX IF NOT EXISTS giveaways_message_idx ON giveaways (guild_id, message_id);
    CREATE INDEX IF NOT EXISTS giveaways_active_idx ON giveaways (active, end_time_ms);
";

// Durable store: every giveaway is kept as a JSON document next to the
// columns used for lookups, expiration scans and leases.
pub struct SqliteGiveawayStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGiveawayStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!("Opened giveaway database at {}", path.display());
        Self::from_connection(conn)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteGiveawayStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // rusqlite blocks on disk I/O, so the work runs on the blocking pool
    // instead of a runtime worker.
    async fn with_connection<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock()?;
            work(&mut conn)
        })
        .await
        .map_err(|err| Error::Storage(format!("SQLite task failed: {}", err)))?
    }

    fn read_record(conn: &Connection, id: &str) -> Result<Option<Giveaway>> {
        let record = conn
            .query_row(
                "SELECT record FROM giveaways WHERE id = ?1",
                params![id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        match record {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn write_record(conn: &Connection, giveaway: &Giveaway) -> Result<()> {
        let json = serde_json::to_string(giveaway)?;
        conn.execute(
            "INSERT INTO giveaways (id, guild_id, message_id, active, end_time_ms, record)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                guild_id = excluded.guild_id,
                message_id = excluded.message_id,
                active = excluded.active,
                end_time_ms = excluded.end_time_ms,
                record = excluded.record",
            params![
                giveaway.id,
                giveaway.guild_id.get() as i64,
                giveaway.message_id.get() as i64,
                giveaway.active,
                giveaway.end_time_epoch_ms,
                json,
            ],
        )?;
        Ok(())
    }

    fn query_records(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Giveaway>> {
        let mut stmt = conn.prepare(sql)?;
        let documents = stmt
            .query_map(params, |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        documents
            .iter()
            .map(|json| serde_json::from_str::<Giveaway>(json).map_err(Error::from))
            .collect()
    }
}

#[async_trait]
impl GiveawayStore for SqliteGiveawayStore {
    async fn get(&self, id: &str) -> Result<Option<Giveaway>> {
        let id = id.to_string();
        self.with_connection(move |conn| Self::read_record(conn, &id))
            .await
    }

    async fn set(&self, giveaway: &Giveaway) -> Result<()> {
        let giveaway = giveaway.clone();
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;

            if let Some(existing) = Self::read_record(&tx, &giveaway.id)? {
                if !existing.active && giveaway.active {
                    let message = format!("The giveaway {} can't be re-activated.", giveaway.id);
                    return Err(Error::Storage(message));
                }
            }

            Self::write_record(&tx, &giveaway)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn update_partial(&self, id: &str, update: &GiveawayUpdate) -> Result<()> {
        let id = id.to_string();
        let update = update.clone();
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;

            let mut record = match Self::read_record(&tx, &id)? {
                Some(record) => record,
                None => return Err(Error::Storage(format!("The giveaway {} doesn't exist.", id))),
            };
            record.apply(&update)?;

            Self::write_record(&tx, &record)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn scan_active(&self) -> Result<Vec<Giveaway>> {
        self.with_connection(|conn| {
            Self::query_records(
                conn,
                "SELECT record FROM giveaways WHERE active = 1 ORDER BY end_time_ms",
                [],
            )
        })
        .await
    }

    async fn find_active_by_message(
        &self,
        guild_id: GuildId,
        message_id: MessageId,
    ) -> Result<Option<Giveaway>> {
        self.with_connection(move |conn| {
            let giveaways = Self::query_records(
                conn,
                "SELECT record FROM giveaways
                 WHERE guild_id = ?1 AND message_id = ?2 AND active = 1
                 LIMIT 1",
                params![guild_id.get() as i64, message_id.get() as i64],
            )?;
            Ok(giveaways.into_iter().next())
        })
        .await
    }

    async fn list_active_by_guild(&self, guild_id: GuildId) -> Result<Vec<Giveaway>> {
        self.with_connection(move |conn| {
            let mut giveaways = Self::query_records(
                conn,
                "SELECT record FROM giveaways WHERE guild_id = ?1 AND active = 1",
                params![guild_id.get() as i64],
            )?;
            sort_by_end_time(&mut giveaways);
            Ok(giveaways)
        })
        .await
    }

    async fn try_acquire_lease(
        &self,
        id: &str,
        holder: Uuid,
        now_ms: i64,
        ttl_ms: i64,
    ) -> Result<bool> {
        let id = id.to_string();
        self.with_connection(move |conn| {
            let updated = conn.execute(
                "UPDATE giveaways SET lease_holder = ?2, lease_expires_ms = ?3
                 WHERE id = ?1
                   AND (lease_holder IS NULL OR lease_expires_ms <= ?4 OR lease_holder = ?2)",
                params![id, holder.to_string(), now_ms.saturating_add(ttl_ms), now_ms],
            )?;
            Ok(updated == 1)
        })
        .await
    }

    async fn release_lease(&self, id: &str, holder: Uuid) -> Result<()> {
        let id = id.to_string();
        self.with_connection(move |conn| {
            conn.execute(
                "UPDATE giveaways SET lease_holder = NULL, lease_expires_ms = NULL
                 WHERE id = ?1 AND lease_holder = ?2",
                params![id, holder.to_string()],
            )?;
            Ok(())
        })
        .await
    }
}

//! Implements a SQLite backed notification store.

use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use rusqlite::{Connection, Row, types::Type};
use time::OffsetDateTime;

use crate::{
    Error, UserId,
    db::CreateTable,
    notification::{
        ChannelRegistry, NotificationId, NotificationKind, NotificationPayload,
        NotificationPriority, NotificationRecord, NotificationStore, Subscription,
    },
};

/// Stores notifications in a SQLite database and pushes new ones to the
/// channels opened through it.
///
/// Timestamps are stored as whole Unix seconds.
#[derive(Clone)]
pub struct SQLiteNotificationStore {
    connection: Arc<Mutex<Connection>>,
    registry: ChannelRegistry,
}

impl SQLiteNotificationStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            connection,
            registry: ChannelRegistry::new(),
        }
    }

    /// The registry that new notifications are published through.
    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Write `record` to the database without publishing it.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::ValidationError] if the record is malformed,
    /// - [Error::DatabaseLockError] if the database lock is poisoned,
    /// - or [Error::SqlError] if there is some other SQL error, e.g. the ID is taken.
    pub fn insert(&self, record: &NotificationRecord) -> Result<(), Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        insert_record(&connection, record)
    }

    /// Run `query` on the blocking thread pool.
    ///
    /// The calling task only waits on the result, so a caller's timeout still
    /// fires while the database is busy or locked. The query itself runs to
    /// completion either way.
    async fn run<T, F>(&self, query: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, Error> + Send + 'static,
    {
        let connection = self.connection.clone();

        tokio::task::spawn_blocking(move || {
            let connection = connection.lock().map_err(|_| Error::DatabaseLockError)?;
            query(&connection)
        })
        .await
        .map_err(|error| Error::PersistenceFailure(format!("database task failed: {error}")))?
    }
}

fn insert_record(connection: &Connection, record: &NotificationRecord) -> Result<(), Error> {
    record.validate()?;

    let data = serde_json::to_string(&record.payload.data)
        .map_err(|error| Error::ValidationError(error.to_string()))?;

    connection.execute(
        "INSERT INTO notification (id, user_id, kind, title, message, data, priority,
            is_read, created_at, expires_at, action_url, action_label)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        (
            record.id.as_ref(),
            record.user_id,
            record.payload.kind.as_str(),
            &record.payload.title,
            &record.payload.message,
            data,
            record.payload.priority.as_str(),
            record.read,
            record.created_at.unix_timestamp(),
            record
                .payload
                .expires_at
                .map(OffsetDateTime::unix_timestamp),
            &record.payload.action_url,
            &record.payload.action_label,
        ),
    )?;

    Ok(())
}

#[async_trait]
impl NotificationStore for SQLiteNotificationStore {
    /// Rows that cannot be decoded, e.g. with an unknown kind, are skipped
    /// with a warning.
    async fn fetch_recent(
        &self,
        user_id: UserId,
        limit: u64,
    ) -> Result<Vec<NotificationRecord>, Error> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.run(move |connection| {
            connection
                .prepare(
                    "SELECT id, user_id, kind, title, message, data, priority, is_read,
                        created_at, expires_at, action_url, action_label
                    FROM notification
                    WHERE user_id = :user_id
                    ORDER BY created_at DESC, rowid DESC
                    LIMIT :limit",
                )?
                .query_map(
                    rusqlite::named_params! { ":user_id": user_id, ":limit": limit },
                    map_notification_row,
                )?
                .filter_map(skip_malformed_row)
                .collect()
        })
        .await
    }

    async fn fetch_unread_count(&self, user_id: UserId) -> Result<u64, Error> {
        let count: i64 = self
            .run(move |connection| {
                Ok(connection.query_row(
                    "SELECT COUNT(id) FROM notification WHERE user_id = ?1 AND is_read = 0",
                    (user_id,),
                    |row| row.get(0),
                )?)
            })
            .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// # Errors
    /// Returns [Error::NotFound] if there is no notification with `id`.
    async fn persist_read(&self, id: &NotificationId) -> Result<(), Error> {
        let id = id.clone();

        let updated = self
            .run(move |connection| {
                Ok(connection.execute(
                    "UPDATE notification SET is_read = 1 WHERE id = ?1",
                    (id.as_ref(),),
                )?)
            })
            .await?;

        match updated {
            0 => Err(Error::NotFound),
            _ => Ok(()),
        }
    }

    async fn persist_read_all(&self, user_id: UserId) -> Result<(), Error> {
        self.run(move |connection| {
            connection.execute(
                "UPDATE notification SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
                (user_id,),
            )?;

            Ok(())
        })
        .await
    }

    async fn persist_delete(&self, id: &NotificationId) -> Result<(), Error> {
        let id = id.clone();

        self.run(move |connection| {
            connection.execute("DELETE FROM notification WHERE id = ?1", (id.as_ref(),))?;

            Ok(())
        })
        .await
    }

    async fn open_channel(&self, user_id: UserId) -> Result<Subscription, Error> {
        self.registry.subscribe(user_id)
    }

    async fn create(
        &self,
        user_id: UserId,
        payload: NotificationPayload,
    ) -> Result<NotificationRecord, Error> {
        let now = OffsetDateTime::now_utc();

        let record = NotificationRecord {
            id: NotificationId::generate(),
            user_id,
            created_at: now.replace_nanosecond(0).unwrap_or(now),
            read: false,
            payload,
        };

        let stored = record.clone();
        self.run(move |connection| insert_record(connection, &stored))
            .await?;
        self.registry.publish(&record);

        Ok(record)
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> Result<usize, Error> {
        let deleted = self
            .run(move |connection| {
                Ok(connection.execute(
                    "DELETE FROM notification WHERE expires_at IS NOT NULL AND expires_at < ?1",
                    (now.unix_timestamp(),),
                )?)
            })
            .await?;

        if deleted > 0 {
            tracing::info!("Deleted {deleted} expired notifications");
        }

        Ok(deleted)
    }
}

impl CreateTable for SQLiteNotificationStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS notification (
                id TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                data TEXT NOT NULL,
                priority TEXT NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                expires_at INTEGER,
                action_url TEXT,
                action_label TEXT
            )",
            (),
        )?;

        connection.execute(
            "CREATE INDEX IF NOT EXISTS idx_notification_user_created
            ON notification(user_id, created_at);",
            (),
        )?;

        Ok(())
    }
}

fn map_timestamp(index: usize, seconds: i64) -> Result<OffsetDateTime, rusqlite::Error> {
    OffsetDateTime::from_unix_timestamp(seconds).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Integer, Box::new(error))
    })
}

fn map_text<T>(index: usize, raw: &str) -> Result<T, rusqlite::Error>
where
    T: FromStr<Err = Error>,
{
    T::from_str(raw)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}

/// Drop rows that hold values this version cannot decode, keeping other errors.
fn skip_malformed_row(
    row: Result<NotificationRecord, rusqlite::Error>,
) -> Option<Result<NotificationRecord, Error>> {
    match row {
        Ok(record) => Some(Ok(record)),
        Err(
            error @ (rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)),
        ) => {
            tracing::warn!("Skipping malformed notification row: {error}");
            None
        }
        Err(error) => Some(Err(error.into())),
    }
}

/// Map a database row to a [NotificationRecord].
fn map_notification_row(row: &Row) -> Result<NotificationRecord, rusqlite::Error> {
    let raw_id: String = row.get(0)?;
    let id = map_text::<NotificationId>(0, &raw_id)?;
    let user_id = row.get(1)?;

    let raw_kind: String = row.get(2)?;
    let kind = map_text::<NotificationKind>(2, &raw_kind)?;
    let title = row.get(3)?;
    let message = row.get(4)?;

    let raw_data: String = row.get(5)?;
    let data = serde_json::from_str(&raw_data).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(error))
    })?;

    let raw_priority: String = row.get(6)?;
    let priority = map_text::<NotificationPriority>(6, &raw_priority)?;
    let read = row.get(7)?;
    let created_at = map_timestamp(8, row.get(8)?)?;
    let expires_at = row
        .get::<_, Option<i64>>(9)?
        .map(|seconds| map_timestamp(9, seconds))
        .transpose()?;
    let action_url = row.get(10)?;
    let action_label = row.get(11)?;

    Ok(NotificationRecord {
        id,
        user_id,
        created_at,
        read,
        payload: NotificationPayload {
            kind,
            title,
            message,
            data,
            priority,
            expires_at,
            action_url,
            action_label,
        },
    })
}

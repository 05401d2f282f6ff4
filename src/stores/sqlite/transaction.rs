//! Implements a SQLite backed transaction store.

use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use rusqlite::{Connection, Row, types::Type};
use rust_decimal::Decimal;
use time::Date;

use crate::{
    Error, UserId,
    db::CreateTable,
    transaction::{TransactionBuilder, TransactionKind, TransactionRecord, TransactionStore},
};

/// Stores transactions in a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteTransactionStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteTransactionStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// Create a new transaction for `user_id` in the database.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::ValidationError] if the amount in `builder` is negative,
    /// - [Error::DatabaseLockError] if the database lock is poisoned,
    /// - or [Error::SqlError] if there is some other SQL error.
    pub fn create(
        &self,
        user_id: UserId,
        builder: TransactionBuilder,
    ) -> Result<TransactionRecord, Error> {
        builder.validate()?;

        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        connection.execute(
            "INSERT INTO \"transaction\" (user_id, amount, kind, category, date, description)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                user_id,
                builder.amount.to_string(),
                builder.kind.as_str(),
                &builder.category,
                builder.occurred_on,
                &builder.description,
            ),
        )?;

        let id = connection.last_insert_rowid();

        Ok(builder.finalise(id))
    }
}

#[async_trait]
impl TransactionStore for SQLiteTransactionStore {
    /// Retrieve up to `limit` transactions for `user_id` dated on or after
    /// `since`, most recent first.
    ///
    /// Transactions on the same date are ordered by descending ID, so the
    /// most recently entered comes first.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::DatabaseLockError] if the database lock is poisoned,
    /// - or [Error::SqlError] if there is some other SQL error.
    async fn fetch_transactions(
        &self,
        user_id: UserId,
        since: Date,
        limit: u64,
    ) -> Result<Vec<TransactionRecord>, Error> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?
            .prepare(
                "SELECT id, amount, kind, category, date, description FROM \"transaction\"
                WHERE user_id = :user_id AND date >= :since
                ORDER BY date DESC, id DESC
                LIMIT :limit",
            )?
            .query_map(
                rusqlite::named_params! {
                    ":user_id": user_id,
                    ":since": since,
                    ":limit": limit,
                },
                map_transaction_row,
            )?
            .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
            .collect()
    }
}

impl CreateTable for SQLiteTransactionStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                amount TEXT NOT NULL,
                kind TEXT NOT NULL,
                category TEXT NOT NULL,
                date TEXT NOT NULL,
                description TEXT
            )",
            (),
        )?;

        // Serves the newest-first window fetch.
        connection.execute(
            "CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date);",
            (),
        )?;

        Ok(())
    }
}

/// Map a database row to a [TransactionRecord].
fn map_transaction_row(row: &Row) -> Result<TransactionRecord, rusqlite::Error> {
    let id = row.get(0)?;

    let raw_amount: String = row.get(1)?;
    let amount = Decimal::from_str(&raw_amount)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(error)))?;

    let raw_kind: String = row.get(2)?;
    let kind = TransactionKind::from_str(&raw_kind)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(error)))?;

    let category = row.get(3)?;
    let occurred_on = row.get(4)?;
    let description = row.get(5)?;

    Ok(TransactionRecord {
        id,
        amount,
        kind,
        category,
        occurred_on,
        description,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        Error,
        db::initialize,
        transaction::{TransactionKind, TransactionRecord, TransactionStore},
    };

    use super::SQLiteTransactionStore;

    fn get_test_store() -> SQLiteTransactionStore {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        SQLiteTransactionStore::new(Arc::new(Mutex::new(connection)))
    }

    #[test]
    fn create_succeeds() {
        let store = get_test_store();

        let transaction = store
            .create(
                1,
                TransactionRecord::build(dec!(12.30), TransactionKind::Expense, date!(2024 - 01 - 20))
                    .category("Food")
                    .description("Lunch"),
            )
            .unwrap();

        assert!(transaction.id > 0);
        assert_eq!(transaction.amount, dec!(12.30));
        assert_eq!(transaction.category, "Food");
        assert_eq!(transaction.description.as_deref(), Some("Lunch"));
    }

    #[test]
    fn create_rejects_negative_amount() {
        let store = get_test_store();

        let result = store.create(
            1,
            TransactionRecord::build(dec!(-1), TransactionKind::Income, date!(2024 - 01 - 20)),
        );

        assert!(matches!(result, Err(Error::ValidationError(_))));
    }

    #[tokio::test]
    async fn fetch_round_trips_records() {
        let store = get_test_store();
        let created = store
            .create(
                1,
                TransactionRecord::build(dec!(0.10), TransactionKind::Income, date!(2024 - 03 - 01))
                    .category("Interest"),
            )
            .unwrap();

        let fetched = store
            .fetch_transactions(1, date!(2024 - 01 - 01), 100)
            .await
            .unwrap();

        assert_eq!(fetched, vec![created]);
    }

    #[tokio::test]
    async fn fetch_is_newest_first_and_capped() {
        let store = get_test_store();
        let dates = [
            date!(2024 - 01 - 15),
            date!(2024 - 02 - 03),
            date!(2024 - 01 - 20),
            date!(2024 - 02 - 03),
        ];
        let created: Vec<TransactionRecord> = dates
            .into_iter()
            .map(|date| {
                store
                    .create(1, TransactionRecord::build(dec!(1), TransactionKind::Expense, date))
                    .unwrap()
            })
            .collect();

        let fetched = store
            .fetch_transactions(1, date!(2024 - 01 - 01), 3)
            .await
            .unwrap();

        let ids: Vec<i64> = fetched.iter().map(|transaction| transaction.id).collect();
        assert_eq!(ids, vec![created[3].id, created[1].id, created[2].id]);
    }

    #[tokio::test]
    async fn fetch_filters_by_user_and_date() {
        let store = get_test_store();
        let mine = store
            .create(
                1,
                TransactionRecord::build(dec!(5), TransactionKind::Expense, date!(2024 - 02 - 01)),
            )
            .unwrap();
        store
            .create(
                1,
                TransactionRecord::build(dec!(5), TransactionKind::Expense, date!(2024 - 01 - 31)),
            )
            .unwrap();
        store
            .create(
                2,
                TransactionRecord::build(dec!(5), TransactionKind::Expense, date!(2024 - 02 - 01)),
            )
            .unwrap();

        let fetched = store
            .fetch_transactions(1, date!(2024 - 02 - 01), 100)
            .await
            .unwrap();

        assert_eq!(fetched, vec![mine]);
    }
}

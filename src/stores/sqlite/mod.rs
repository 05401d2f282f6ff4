//! SQLite implementations of the transaction and notification stores.

mod notification;
mod transaction;

pub use notification::SQLiteNotificationStore;
pub use transaction::SQLiteTransactionStore;

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{Error, db::initialize};

/// The stores for one database, sharing a single connection.
#[derive(Clone)]
pub struct SQLiteStores {
    /// The transaction store.
    pub transactions: Arc<SQLiteTransactionStore>,
    /// The notification store.
    pub notifications: Arc<SQLiteNotificationStore>,
}

/// Creates both stores on top of `db_connection`.
///
/// This function will modify the database by adding the tables for
/// transactions and notifications if they do not exist yet.
///
/// # Errors
/// Returns an error if the database cannot be initialized.
pub fn create_stores(db_connection: Connection) -> Result<SQLiteStores, Error> {
    initialize(&db_connection)?;

    let connection = Arc::new(Mutex::new(db_connection));

    Ok(SQLiteStores {
        transactions: Arc::new(SQLiteTransactionStore::new(connection.clone())),
        notifications: Arc::new(SQLiteNotificationStore::new(connection)),
    })
}

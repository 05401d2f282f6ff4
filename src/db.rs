/*! Sets up the tables used by the SQLite stores. */

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{
    Error,
    stores::sqlite::{SQLiteNotificationStore, SQLiteTransactionStore},
};

/// A trait for adding an object schema to a database.
pub trait CreateTable {
    /// Create a table for the model.
    ///
    /// # Errors
    /// Returns an error if the table already exists or if there is an SQL error.
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error>;
}

/// Create the tables for transactions and notifications if they do not exist.
///
/// # Errors
/// Returns an [Error::SqlError] if a table could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    SQLiteTransactionStore::create_table(&transaction)?;
    SQLiteNotificationStore::create_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

//! Storage backends for the [TransactionStore](crate::TransactionStore) and
//! [NotificationStore](crate::NotificationStore) traits.

pub mod sqlite;

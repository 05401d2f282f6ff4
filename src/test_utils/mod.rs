#![allow(missing_docs)]

pub(crate) mod notification_store;
pub(crate) mod transaction_store;

pub(crate) use notification_store::FakeNotificationStore;
pub(crate) use transaction_store::FakeTransactionStore;

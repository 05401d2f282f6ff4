//! Budget Pulse is the in-memory core of a personal finance dashboard.
//!
//! It turns a raw transaction feed into windowed summaries (totals, category
//! breakdown, monthly trend, top categories) and keeps a live notification
//! inbox consistent across pull-loaded snapshots, push-delivered records and
//! local read/delete intents.
//!
//! The two entry points are [DashboardService], which runs the
//! fetch-then-aggregate flow for a window, and [NotificationHub], which owns
//! the notification state for one user session.

#![warn(missing_docs)]

mod context;
mod dashboard;
mod database_id;
mod db;
mod logging;
mod notification;
mod timezone;
mod transaction;

pub mod stores;

#[cfg(test)]
mod test_utils;

pub use context::{DEFAULT_NOTIFICATION_LIMIT, DEFAULT_TRANSACTION_FETCH_CAP, SessionContext};
pub use dashboard::{
    CategoryTotal, DashboardService, DashboardSnapshot, MonthKey, MonthlyTrend, SummaryResult,
    aggregate,
};
pub use database_id::{TransactionId, UserId};
pub use db::initialize as initialize_db;
pub use logging::init_logging;
pub use notification::{
    ChannelRegistry, HubHandle, HubStatus, NotificationHub, NotificationId,
    NotificationKind, NotificationPayload, NotificationPriority, NotificationRecord,
    NotificationState, NotificationStore, Subscription, bill_reminder, budget_warning,
    format_relative, goal_achievement, system_update,
};
pub use timezone::get_local_offset;
pub use transaction::{
    AggregationWindow, ExportColumns, TransactionBuilder, TransactionKind, TransactionRecord,
    TransactionStore, UNCATEGORIZED_LABEL, WindowEnd, WindowPreset, export_csv,
};

/// The errors that may occur in the dashboard core.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// An upstream fetch of transactions or notifications failed.
    ///
    /// Aggregation is not attempted and no retry is made, the caller decides
    /// what to do next.
    #[error("data is unavailable: {0}")]
    DataUnavailable(String),

    /// A fetch or aggregation finished for a window that has since been
    /// superseded.
    ///
    /// This is a concurrency-control outcome, not a user-facing failure.
    /// [DashboardService] discards it silently.
    #[error("request for epoch {epoch} was superseded by epoch {current}")]
    StaleRequest {
        /// The epoch the request was tagged with.
        epoch: u64,
        /// The epoch that was current when the request completed.
        current: u64,
    },

    /// A notification mutation could not be persisted.
    ///
    /// The optimistic local change has already been rolled back when the
    /// caller sees this error.
    #[error("could not persist notification change: {0}")]
    PersistenceFailure(String),

    /// The push channel failed or disconnected.
    ///
    /// The hub keeps working in pull-only mode until the channel is opened
    /// again.
    #[error("notification channel error: {0}")]
    SubscriptionError(String),

    /// An externally supplied record was malformed.
    #[error("invalid data: {0}")]
    ValidationError(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The notification hub task has stopped and can no longer accept intents.
    #[error("the notification hub has shut down")]
    HubClosed,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// The transactions could not be written as CSV.
    #[error("could not write CSV: {0}")]
    CsvError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<csv::Error> for Error {
    fn from(value: csv::Error) -> Self {
        Error::CsvError(value.to_string())
    }
}

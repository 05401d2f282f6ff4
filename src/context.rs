//! Session-scoped settings shared by the dashboard service and the notification hub.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, UserId, timezone::local_today};

/// The maximum number of transactions fetched for one summary.
///
/// The store drops the oldest records beyond this cap, so summaries over long
/// windows may be incomplete.
pub const DEFAULT_TRANSACTION_FETCH_CAP: u64 = 100;

/// The number of notifications loaded into the inbox.
pub const DEFAULT_NOTIFICATION_LIMIT: u64 = 50;

const DEFAULT_PERSISTENCE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 64;

/// Settings for one user session.
///
/// A context is created once when the session starts and handed to
/// [DashboardService](crate::DashboardService) and
/// [NotificationHub](crate::NotificationHub). Nothing reads these settings
/// from global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    /// The user the session belongs to.
    pub user_id: UserId,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// The maximum number of transactions fetched per summary.
    #[serde(default = "default_fetch_cap")]
    pub transaction_fetch_cap: u64,
    /// How many notifications [HubHandle::load](crate::HubHandle::load) fetches.
    #[serde(default = "default_notification_limit")]
    pub notification_limit: u64,
    /// How long a notification store call may take before it counts as failed.
    #[serde(default = "default_persistence_timeout", with = "duration_millis")]
    pub persistence_timeout: Duration,
    /// The number of pending intents the hub buffers before callers wait.
    #[serde(default = "default_command_queue_capacity")]
    pub command_queue_capacity: usize,
}

impl SessionContext {
    /// Create a context for `user_id` with the default limits.
    pub fn new(user_id: UserId, local_timezone: &str) -> Self {
        Self {
            user_id,
            local_timezone: local_timezone.to_owned(),
            transaction_fetch_cap: DEFAULT_TRANSACTION_FETCH_CAP,
            notification_limit: DEFAULT_NOTIFICATION_LIMIT,
            persistence_timeout: DEFAULT_PERSISTENCE_TIMEOUT,
            command_queue_capacity: DEFAULT_COMMAND_QUEUE_CAPACITY,
        }
    }

    /// Set the transaction fetch cap.
    pub fn transaction_fetch_cap(mut self, cap: u64) -> Self {
        self.transaction_fetch_cap = cap;
        self
    }

    /// Set how many notifications are loaded into the inbox.
    pub fn notification_limit(mut self, limit: u64) -> Self {
        self.notification_limit = limit;
        self
    }

    /// Set the timeout for notification store calls.
    pub fn persistence_timeout(mut self, timeout: Duration) -> Self {
        self.persistence_timeout = timeout;
        self
    }

    /// Set the capacity of the hub's intent queue.
    ///
    /// A capacity of zero is raised to one.
    pub fn command_queue_capacity(mut self, capacity: usize) -> Self {
        self.command_queue_capacity = capacity.max(1);
        self
    }

    /// Today's date in the session's local timezone.
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezoneError] if the timezone name is not valid.
    pub fn today(&self) -> Result<Date, Error> {
        local_today(&self.local_timezone)
    }
}

fn default_fetch_cap() -> u64 {
    DEFAULT_TRANSACTION_FETCH_CAP
}

fn default_notification_limit() -> u64 {
    DEFAULT_NOTIFICATION_LIMIT
}

fn default_persistence_timeout() -> Duration {
    DEFAULT_PERSISTENCE_TIMEOUT
}

fn default_command_queue_capacity() -> usize {
    DEFAULT_COMMAND_QUEUE_CAPACITY
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{DEFAULT_NOTIFICATION_LIMIT, DEFAULT_TRANSACTION_FETCH_CAP, SessionContext};

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{"user_id": 7, "local_timezone": "Pacific/Auckland"}"#;

        let context: SessionContext = serde_json::from_str(json).unwrap();

        assert_eq!(context, SessionContext::new(7, "Pacific/Auckland"));
        assert_eq!(context.transaction_fetch_cap, DEFAULT_TRANSACTION_FETCH_CAP);
        assert_eq!(context.notification_limit, DEFAULT_NOTIFICATION_LIMIT);
    }

    #[test]
    fn persistence_timeout_is_read_as_milliseconds() {
        let json =
            r#"{"user_id": 1, "local_timezone": "Etc/UTC", "persistence_timeout": 250}"#;

        let context: SessionContext = serde_json::from_str(json).unwrap();

        assert_eq!(context.persistence_timeout, Duration::from_millis(250));
    }

    #[test]
    fn zero_queue_capacity_is_raised_to_one() {
        let context = SessionContext::new(1, "Etc/UTC").command_queue_capacity(0);

        assert_eq!(context.command_queue_capacity, 1);
    }
}

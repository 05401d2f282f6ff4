//! Defines the notification store trait.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    Error, UserId,
    notification::{
        channel::Subscription,
        core::{NotificationId, NotificationPayload, NotificationRecord},
    },
};

/// Persists notifications and delivers new ones as they are created.
///
/// The hub bounds every call with a timeout, which can only fire while the
/// returned future is waiting. Implementations that block, e.g. on a database
/// lock, must do so off the async worker, e.g. with
/// [tokio::task::spawn_blocking].
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Fetch the `limit` most recent notifications for `user_id`, newest first.
    async fn fetch_recent(
        &self,
        user_id: UserId,
        limit: u64,
    ) -> Result<Vec<NotificationRecord>, Error>;

    /// Count every unread notification for `user_id`, loaded or not.
    async fn fetch_unread_count(&self, user_id: UserId) -> Result<u64, Error>;

    /// Mark the notification `id` as read.
    ///
    /// Implementations may return [Error::NotFound] for an unknown `id`.
    async fn persist_read(&self, id: &NotificationId) -> Result<(), Error>;

    /// Mark every notification for `user_id` as read.
    async fn persist_read_all(&self, user_id: UserId) -> Result<(), Error>;

    /// Delete the notification `id`.
    ///
    /// Deleting a notification that does not exist is not an error.
    async fn persist_delete(&self, id: &NotificationId) -> Result<(), Error>;

    /// Open the push channel for `user_id`.
    ///
    /// The channel stays open until the returned [Subscription] is dropped.
    async fn open_channel(&self, user_id: UserId) -> Result<Subscription, Error>;

    /// Store a new notification for `user_id` and push it to open channels.
    async fn create(
        &self,
        user_id: UserId,
        payload: NotificationPayload,
    ) -> Result<NotificationRecord, Error>;

    /// Delete every notification that expired before `now`.
    ///
    /// Returns the number of deleted notifications.
    async fn delete_expired(&self, now: OffsetDateTime) -> Result<usize, Error>;
}

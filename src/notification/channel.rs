//! The push channel that delivers new notifications as they are created.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{Error, UserId, notification::core::NotificationRecord};

/// The number of undelivered records buffered per subscriber.
const SUBSCRIBER_BUFFER: usize = 32;

/// A live feed of new notifications for one user.
///
/// The subscription is released when it is dropped, or explicitly with
/// [Subscription::unsubscribe].
pub struct Subscription {
    records: mpsc::Receiver<NotificationRecord>,
    guard: UnsubscribeGuard,
}

impl Subscription {
    /// Create a subscription that receives from `records` and calls
    /// `unsubscribe` exactly once when released.
    pub fn new(
        records: mpsc::Receiver<NotificationRecord>,
        unsubscribe: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            records,
            guard: UnsubscribeGuard(Some(Box::new(unsubscribe))),
        }
    }

    /// Wait for the next record.
    ///
    /// Returns `None` once the channel has been closed by the sender.
    pub async fn recv(&mut self) -> Option<NotificationRecord> {
        self.records.recv().await
    }

    /// Release the subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }

    pub(crate) fn into_parts(self) -> (mpsc::Receiver<NotificationRecord>, UnsubscribeGuard) {
        (self.records, self.guard)
    }
}

/// Calls the unsubscribe callback when dropped.
pub(crate) struct UnsubscribeGuard(Option<Box<dyn FnOnce() + Send + Sync>>);

impl Drop for UnsubscribeGuard {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.0.take() {
            unsubscribe();
        }
    }
}

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    senders: HashMap<u64, (UserId, mpsc::Sender<NotificationRecord>)>,
}

/// Fans newly created notifications out to the open subscriptions of their user.
///
/// Store implementations keep one registry and publish every record they
/// create through it.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    subscribers: Arc<Mutex<Subscribers>>,
}

impl ChannelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a subscription for the records of `user_id`.
    ///
    /// # Errors
    /// Returns [Error::SubscriptionError] if the registry lock is poisoned.
    pub fn subscribe(&self, user_id: UserId) -> Result<Subscription, Error> {
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_BUFFER);

        let id = {
            let mut subscribers = self.subscribers.lock().map_err(|_| {
                Error::SubscriptionError("channel registry lock poisoned".to_owned())
            })?;
            let id = subscribers.next_id;
            subscribers.next_id += 1;
            subscribers.senders.insert(id, (user_id, sender));
            id
        };

        tracing::debug!("Opened notification channel {id} for user {user_id}");

        let registry = self.subscribers.clone();
        Ok(Subscription::new(receiver, move || {
            if let Ok(mut subscribers) = registry.lock() {
                subscribers.senders.remove(&id);
                tracing::debug!("Closed notification channel {id}");
            }
        }))
    }

    /// Deliver `record` to every subscription of its user.
    ///
    /// A subscriber whose buffer is full has fallen behind and is
    /// disconnected, so it sees its channel end instead of silently missing
    /// records. It can load and subscribe again. Closed subscribers are removed.
    pub fn publish(&self, record: &NotificationRecord) {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            tracing::warn!("Could not publish notification {}: registry lock poisoned", record.id);
            return;
        };

        subscribers.senders.retain(|id, (user_id, sender)| {
            if *user_id != record.user_id {
                return true;
            }

            match sender.try_send(record.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        "Notification channel {id} is full, disconnecting it at {}",
                        record.id
                    );
                    false
                }
                Err(TrySendError::Closed(_)) => false,
            }
        });
    }

    /// The number of open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .map(|subscribers| subscribers.senders.len())
            .unwrap_or(0)
    }

    /// Close every open subscription from the sending side.
    ///
    /// Subscribers see their channel end, as they would if the connection to
    /// the backend dropped.
    pub fn disconnect_all(&self) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.senders.clear();
        }
    }
}

//! The notification hub owns the inbox for one user session.
//!
//! Every intent from the handle and every record from the push channel goes
//! through one command queue and is applied by a single task, so mutations
//! are applied one at a time in arrival order.

use std::sync::Arc;

use serde::Serialize;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};

use crate::{
    Error, SessionContext,
    notification::{
        channel::UnsubscribeGuard,
        core::{NotificationId, NotificationRecord},
        state::{Inbox, NotificationState, Undo},
        store::NotificationStore,
    },
};

/// Whether push delivery is currently working.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct HubStatus {
    /// True while the push channel is open.
    ///
    /// When false the hub only changes on [HubHandle::load].
    pub push_connected: bool,
    /// Why the push channel was last lost or could not be opened.
    pub last_error: Option<String>,
}

type Reply<T> = oneshot::Sender<Result<T, Error>>;

enum Command {
    Load {
        limit: u64,
        reply: Reply<NotificationState>,
    },
    MarkAsRead {
        id: NotificationId,
        reply: Reply<()>,
    },
    MarkAllAsRead {
        reply: Reply<()>,
    },
    Delete {
        id: NotificationId,
        reply: Reply<()>,
    },
    Receive(NotificationRecord),
    ChannelClosed {
        generation: u64,
    },
    Reconnect {
        reply: Reply<()>,
    },
    Snapshot {
        reply: Reply<NotificationState>,
    },
    Shutdown {
        reply: Reply<()>,
    },
}

/// An open push channel and the task forwarding its records to the hub.
struct PushChannel {
    generation: u64,
    forwarder: JoinHandle<()>,
    _guard: UnsubscribeGuard,
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// The task that applies notification intents and pushed records in order.
///
/// Start it with [NotificationHub::start] and talk to it through the returned
/// [HubHandle].
pub struct NotificationHub<S> {
    store: Arc<S>,
    context: Arc<SessionContext>,
    inbox: Inbox,
    commands: mpsc::WeakSender<Command>,
    state: watch::Sender<NotificationState>,
    status: watch::Sender<HubStatus>,
    channel: Option<PushChannel>,
    generation: u64,
}

impl<S> NotificationHub<S>
where
    S: NotificationStore + 'static,
{
    /// Spawn a hub for the session described by `context`.
    ///
    /// The push channel is opened straight away. The inbox stays empty until
    /// the first [HubHandle::load]. The hub stops on [HubHandle::shutdown] or
    /// once every handle has been dropped, releasing the push channel either way.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(store: Arc<S>, context: Arc<SessionContext>) -> HubHandle {
        let capacity = context.command_queue_capacity.max(1);
        let (command_sender, command_receiver) = mpsc::channel(capacity);
        let (state_sender, state_receiver) = watch::channel(NotificationState::default());
        let (status_sender, status_receiver) = watch::channel(HubStatus::default());

        let hub = Self {
            store,
            context: context.clone(),
            inbox: Inbox::default(),
            commands: command_sender.downgrade(),
            state: state_sender,
            status: status_sender,
            channel: None,
            generation: 0,
        };

        tokio::spawn(hub.run(command_receiver));

        HubHandle {
            commands: command_sender,
            state: state_receiver,
            status: status_receiver,
            default_limit: context.notification_limit,
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let user_id = self.context.user_id;
        tracing::info!("Notification hub started for user {user_id}");

        // A failed open is recorded in the status, the hub still serves pulls.
        let _ = self.open_channel().await;

        while let Some(command) = commands.recv().await {
            match command {
                Command::Load { limit, reply } => {
                    let _ = reply.send(self.load(limit).await);
                }
                Command::MarkAsRead { id, reply } => {
                    let _ = reply.send(self.mark_as_read(id).await);
                }
                Command::MarkAllAsRead { reply } => {
                    let _ = reply.send(self.mark_all_as_read().await);
                }
                Command::Delete { id, reply } => {
                    let _ = reply.send(self.delete(id).await);
                }
                Command::Receive(record) => self.receive(record),
                Command::ChannelClosed { generation } => self.channel_closed(generation),
                Command::Reconnect { reply } => {
                    let _ = reply.send(self.open_channel().await);
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(Ok(self.inbox.snapshot()));
                }
                Command::Shutdown { reply } => {
                    self.channel = None;
                    let _ = reply.send(Ok(()));
                    break;
                }
            }
        }

        self.channel = None;
        tracing::info!("Notification hub stopped for user {user_id}");
    }

    async fn load(&mut self, limit: u64) -> Result<NotificationState, Error> {
        let user_id = self.context.user_id;

        let (records, unread_count) = tokio::join!(
            self.call_store(
                "fetch notifications",
                self.store.fetch_recent(user_id, limit),
                Error::DataUnavailable,
            ),
            self.call_store(
                "count unread notifications",
                self.store.fetch_unread_count(user_id),
                Error::DataUnavailable,
            ),
        );
        let records = records?;
        let unread_count = unread_count?;

        let records: Vec<_> = records
            .into_iter()
            .filter(|record| self.accept(record))
            .collect();
        self.inbox.replace(records, unread_count);
        self.publish_state();

        Ok(self.inbox.snapshot())
    }

    async fn mark_as_read(&mut self, id: NotificationId) -> Result<(), Error> {
        let loaded = match self.inbox.is_read(&id) {
            Some(true) => return Ok(()),
            Some(false) => true,
            None => false,
        };

        let undo = self.inbox.mark_read(&id);
        self.publish_state();

        let result = self
            .call_store(
                "mark notification as read",
                self.store.persist_read(&id),
                Error::PersistenceFailure,
            )
            .await;

        self.settle(undo, result)?;

        if !loaded {
            self.recount_older_unread().await;
        }

        Ok(())
    }

    async fn mark_all_as_read(&mut self) -> Result<(), Error> {
        let undo = self.inbox.mark_all_read();
        self.publish_state();

        let result = self
            .call_store(
                "mark all notifications as read",
                self.store.persist_read_all(self.context.user_id),
                Error::PersistenceFailure,
            )
            .await;

        self.settle(Some(undo), result)
    }

    async fn delete(&mut self, id: NotificationId) -> Result<(), Error> {
        let loaded = self.inbox.is_read(&id).is_some();
        let undo = self.inbox.delete(&id);
        self.publish_state();

        let result = self
            .call_store(
                "delete notification",
                self.store.persist_delete(&id),
                Error::PersistenceFailure,
            )
            .await;

        self.settle(Some(undo), result)?;

        if !loaded {
            self.recount_older_unread().await;
        }

        Ok(())
    }

    /// Refresh `older_unread_count` after changing a notification that is not loaded.
    ///
    /// The change itself has been stored, so a failed count only leaves the
    /// old figure in place until the next load.
    async fn recount_older_unread(&mut self) {
        let counted = self
            .call_store(
                "count unread notifications",
                self.store.fetch_unread_count(self.context.user_id),
                Error::DataUnavailable,
            )
            .await;

        match counted {
            Ok(count) => {
                self.inbox.set_server_unread_count(count);
                self.publish_state();
            }
            Err(error) => tracing::warn!("Keeping the previous unread count: {error}"),
        }
    }

    fn receive(&mut self, record: NotificationRecord) {
        if !self.accept(&record) {
            return;
        }

        let id = record.id.clone();
        if self.inbox.receive(record) {
            self.publish_state();
        } else {
            tracing::debug!("Ignoring notification {id}, it has already been seen");
        }
    }

    /// Check a record from the store or the push channel, logging why it is dropped.
    fn accept(&self, record: &NotificationRecord) -> bool {
        if let Err(error) = record.validate() {
            tracing::warn!("Dropping malformed notification: {error}");
            return false;
        }

        if record.user_id != self.context.user_id {
            tracing::warn!(
                "Dropping notification {} addressed to user {}",
                record.id,
                record.user_id
            );
            return false;
        }

        true
    }

    /// Undo the optimistic change if persisting it failed.
    fn settle(&mut self, undo: Option<Undo>, result: Result<(), Error>) -> Result<(), Error> {
        if let Err(error) = &result {
            tracing::warn!("Rolling back notification change: {error}");

            if let Some(undo) = undo {
                self.inbox.rollback(undo);
                self.publish_state();
            }
        }

        result
    }

    /// Run a store call with the session's persistence timeout, wrapping any
    /// failure with `wrap`.
    async fn call_store<T>(
        &self,
        action: &str,
        call: impl Future<Output = Result<T, Error>>,
        wrap: fn(String) -> Error,
    ) -> Result<T, Error> {
        let timeout = self.context.persistence_timeout;

        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(wrap(format!("could not {action}: {error}"))),
            Err(_) => Err(wrap(format!(
                "could not {action}: no response within {timeout:?}"
            ))),
        }
    }

    async fn open_channel(&mut self) -> Result<(), Error> {
        self.channel = None;

        let opened = self
            .call_store(
                "open the push channel",
                self.store.open_channel(self.context.user_id),
                Error::SubscriptionError,
            )
            .await;

        match opened {
            Ok(subscription) => {
                self.generation += 1;
                let (records, guard) = subscription.into_parts();
                let forwarder = tokio::spawn(forward(
                    records,
                    self.commands.clone(),
                    self.generation,
                ));

                self.channel = Some(PushChannel {
                    generation: self.generation,
                    forwarder,
                    _guard: guard,
                });
                self.status.send_replace(HubStatus {
                    push_connected: true,
                    last_error: None,
                });

                Ok(())
            }
            Err(error) => {
                tracing::warn!("Continuing in pull-only mode: {error}");
                self.status.send_replace(HubStatus {
                    push_connected: false,
                    last_error: Some(error.to_string()),
                });

                Err(error)
            }
        }
    }

    fn channel_closed(&mut self, generation: u64) {
        let is_current = self
            .channel
            .as_ref()
            .is_some_and(|channel| channel.generation == generation);
        if !is_current {
            return;
        }

        self.channel = None;

        let error = Error::SubscriptionError("the push channel disconnected".to_owned());
        tracing::warn!("Continuing in pull-only mode: {error}");
        self.status.send_replace(HubStatus {
            push_connected: false,
            last_error: Some(error.to_string()),
        });
    }

    fn publish_state(&self) {
        self.state.send_replace(self.inbox.snapshot());
    }
}

/// Feed pushed records into the hub's queue until either side goes away.
async fn forward(
    mut records: mpsc::Receiver<NotificationRecord>,
    commands: mpsc::WeakSender<Command>,
    generation: u64,
) {
    while let Some(record) = records.recv().await {
        let Some(commands) = commands.upgrade() else {
            return;
        };

        if commands.send(Command::Receive(record)).await.is_err() {
            return;
        }
    }

    if let Some(commands) = commands.upgrade() {
        let _ = commands.send(Command::ChannelClosed { generation }).await;
    }
}

/// Submits intents to a running [NotificationHub] and reads its state.
///
/// Cloning the handle is cheap. Every method returns [Error::HubClosed] once
/// the hub has stopped.
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<NotificationState>,
    status: watch::Receiver<HubStatus>,
    default_limit: u64,
}

impl HubHandle {
    /// Replace the inbox with the `limit` most recent notifications.
    ///
    /// # Errors
    /// Returns [Error::DataUnavailable] if the store fails or does not answer
    /// in time. The inbox is left as it was.
    pub async fn load(&self, limit: u64) -> Result<NotificationState, Error> {
        self.request(|reply| Command::Load { limit, reply }).await
    }

    /// Load with the session's default notification limit.
    ///
    /// # Errors
    /// See [HubHandle::load].
    pub async fn refresh(&self) -> Result<NotificationState, Error> {
        self.load(self.default_limit).await
    }

    /// Mark one notification as read.
    ///
    /// Marking a read notification again does nothing.
    ///
    /// # Errors
    /// Returns [Error::PersistenceFailure] if the change could not be stored,
    /// in which case the notification is unread again.
    pub async fn mark_as_read(&self, id: &NotificationId) -> Result<(), Error> {
        let id = id.clone();
        self.request(|reply| Command::MarkAsRead { id, reply }).await
    }

    /// Mark every notification as read, including unread ones that are not loaded.
    ///
    /// # Errors
    /// Returns [Error::PersistenceFailure] if the change could not be stored,
    /// in which case the previously unread notifications are unread again.
    pub async fn mark_all_as_read(&self) -> Result<(), Error> {
        self.request(|reply| Command::MarkAllAsRead { reply }).await
    }

    /// Delete a notification.
    ///
    /// A deleted notification is never shown again this session, even if the
    /// push channel or a later load delivers it.
    ///
    /// # Errors
    /// Returns [Error::PersistenceFailure] if the deletion could not be
    /// stored, in which case the notification is put back where it was.
    pub async fn delete(&self, id: &NotificationId) -> Result<(), Error> {
        let id = id.clone();
        self.request(|reply| Command::Delete { id, reply }).await
    }

    /// Queue a record delivered outside the hub's own push channel.
    pub async fn receive(&self, record: NotificationRecord) -> Result<(), Error> {
        self.commands
            .send(Command::Receive(record))
            .await
            .map_err(|_| Error::HubClosed)
    }

    /// Open the push channel again after it failed or disconnected.
    ///
    /// # Errors
    /// Returns [Error::SubscriptionError] if the channel could not be opened.
    pub async fn reconnect(&self) -> Result<(), Error> {
        self.request(|reply| Command::Reconnect { reply }).await
    }

    /// The inbox after every intent queued before this call has been applied.
    pub async fn snapshot(&self) -> Result<NotificationState, Error> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// The inbox as last published.
    pub fn state(&self) -> NotificationState {
        self.state.borrow().clone()
    }

    /// The push channel status as last published.
    pub fn status(&self) -> HubStatus {
        self.status.borrow().clone()
    }

    /// Watch the inbox change.
    pub fn watch_state(&self) -> watch::Receiver<NotificationState> {
        self.state.clone()
    }

    /// Watch the push channel status change.
    pub fn watch_status(&self) -> watch::Receiver<HubStatus> {
        self.status.clone()
    }

    /// Stop the hub and release its push channel.
    ///
    /// Intents queued before the shutdown are still applied.
    pub async fn shutdown(self) -> Result<(), Error> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T, Error> {
        let (reply, response) = oneshot::channel();

        self.commands
            .send(command(reply))
            .await
            .map_err(|_| Error::HubClosed)?;

        response.await.map_err(|_| Error::HubClosed)?
    }
}

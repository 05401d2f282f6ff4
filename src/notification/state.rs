//! The notification list and unread counter owned by the hub.

use std::collections::HashSet;

use serde::Serialize;

use crate::notification::core::{NotificationId, NotificationRecord};

/// A read-only snapshot of the inbox.
///
/// `unread_count` always equals the number of unread `items`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NotificationState {
    /// The loaded notifications, most recent first.
    pub items: Vec<NotificationRecord>,
    /// The number of unread notifications in `items`.
    pub unread_count: usize,
    /// Unread notifications on the server that did not fit in the loaded page.
    pub older_unread_count: u64,
}

/// What to put back if a local change cannot be persisted.
#[derive(Debug)]
pub(crate) enum Undo {
    MarkRead(NotificationId),
    MarkAllRead {
        ids: Vec<NotificationId>,
        older_unread_count: u64,
    },
    Delete {
        id: NotificationId,
        removed: Option<(usize, NotificationRecord)>,
    },
}

/// The inbox state plus the bookkeeping needed to keep it consistent.
#[derive(Debug, Default)]
pub(crate) struct Inbox {
    state: NotificationState,
    ids: HashSet<NotificationId>,
    deleted: HashSet<NotificationId>,
}

impl Inbox {
    pub(crate) fn snapshot(&self) -> NotificationState {
        self.state.clone()
    }

    /// Whether the loaded notification `id` has been read, `None` if it is not loaded.
    pub(crate) fn is_read(&self, id: &NotificationId) -> Option<bool> {
        self.position(id).map(|index| self.state.items[index].read)
    }

    /// Overwrite the inbox with a freshly fetched snapshot.
    ///
    /// Duplicate IDs and notifications deleted in this session are skipped.
    pub(crate) fn replace(&mut self, records: Vec<NotificationRecord>, server_unread_count: u64) {
        self.ids.clear();
        self.state.items.clear();

        for record in records {
            if self.deleted.contains(&record.id) || !self.ids.insert(record.id.clone()) {
                continue;
            }
            self.state.items.push(record);
        }

        self.state.unread_count = self.state.items.iter().filter(|item| !item.read).count();
        self.set_server_unread_count(server_unread_count);
    }

    /// Work out the unread notifications outside the loaded page from the
    /// server's total.
    pub(crate) fn set_server_unread_count(&mut self, server_unread_count: u64) {
        self.state.older_unread_count =
            server_unread_count.saturating_sub(self.state.unread_count as u64);
    }

    /// Put a pushed record at the head of the list.
    ///
    /// Returns false if the record has already been seen.
    pub(crate) fn receive(&mut self, record: NotificationRecord) -> bool {
        if self.deleted.contains(&record.id) || self.ids.contains(&record.id) {
            return false;
        }

        self.ids.insert(record.id.clone());
        if !record.read {
            self.state.unread_count += 1;
        }
        self.state.items.insert(0, record);

        true
    }

    /// Mark `id` as read, returning how to undo it if anything changed.
    pub(crate) fn mark_read(&mut self, id: &NotificationId) -> Option<Undo> {
        let index = self.position(id)?;
        let item = &mut self.state.items[index];

        if item.read {
            return None;
        }

        item.read = true;
        self.state.unread_count = self.state.unread_count.saturating_sub(1);

        Some(Undo::MarkRead(id.clone()))
    }

    pub(crate) fn mark_all_read(&mut self) -> Undo {
        let mut ids = Vec::new();

        for item in self.state.items.iter_mut().filter(|item| !item.read) {
            item.read = true;
            ids.push(item.id.clone());
        }

        let older_unread_count = self.state.older_unread_count;
        self.state.unread_count = 0;
        self.state.older_unread_count = 0;

        Undo::MarkAllRead {
            ids,
            older_unread_count,
        }
    }

    /// Remove `id` from the list and remember that it was deleted.
    pub(crate) fn delete(&mut self, id: &NotificationId) -> Undo {
        self.deleted.insert(id.clone());

        let removed = self.position(id).map(|index| {
            let record = self.state.items.remove(index);
            self.ids.remove(id);
            if !record.read {
                self.state.unread_count = self.state.unread_count.saturating_sub(1);
            }
            (index, record)
        });

        Undo::Delete {
            id: id.clone(),
            removed,
        }
    }

    pub(crate) fn rollback(&mut self, undo: Undo) {
        match undo {
            Undo::MarkRead(id) => self.mark_unread(&id),
            Undo::MarkAllRead {
                ids,
                older_unread_count,
            } => {
                for id in &ids {
                    self.mark_unread(id);
                }
                self.state.older_unread_count = older_unread_count;
            }
            Undo::Delete { id, removed } => {
                self.deleted.remove(&id);

                if let Some((index, record)) = removed {
                    if !record.read {
                        self.state.unread_count += 1;
                    }
                    self.ids.insert(record.id.clone());
                    let index = index.min(self.state.items.len());
                    self.state.items.insert(index, record);
                }
            }
        }
    }

    fn mark_unread(&mut self, id: &NotificationId) {
        if let Some(index) = self.position(id) {
            let item = &mut self.state.items[index];
            if item.read {
                item.read = false;
                self.state.unread_count += 1;
            }
        }
    }

    fn position(&self, id: &NotificationId) -> Option<usize> {
        if !self.ids.contains(id) {
            return None;
        }

        self.state.items.iter().position(|item| &item.id == id)
    }
}

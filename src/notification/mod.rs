//! Notifications and the live inbox.
//!
//! This module contains:
//! - The `NotificationRecord` model, its payload and validation
//! - Helpers for building the notifications the application sends
//! - The `NotificationStore` trait and the push channel plumbing
//! - The `NotificationHub` that keeps one session's inbox consistent

mod channel;
mod core;
mod factory;
mod hub;
mod state;
mod store;

pub use channel::{ChannelRegistry, Subscription};
pub use self::core::{
    NotificationId, NotificationKind, NotificationPayload, NotificationPriority,
    NotificationRecord,
};
pub use factory::{
    bill_reminder, budget_warning, format_relative, goal_achievement, system_update,
};
pub use hub::{HubHandle, HubStatus, NotificationHub};
pub use state::NotificationState;
pub use store::NotificationStore;

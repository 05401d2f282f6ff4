//! Core notification domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, UserId};

/// A validated, non-empty notification identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    /// Create a notification ID.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::ValidationError] if `id` is blank.
    pub fn new(id: &str) -> Result<Self, Error> {
        let id = id.trim();

        if id.is_empty() {
            Err(Error::ValidationError(
                "notification ID cannot be empty".to_owned(),
            ))
        } else {
            Ok(Self(id.to_owned()))
        }
    }

    /// Generate a new random ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl AsRef<str> for NotificationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for NotificationId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationId::new(s)
    }
}

impl Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// An upcoming payment.
    BillReminder,
    /// Spending is approaching or over a budget.
    BudgetWarning,
    /// A savings goal was reached.
    GoalAchievement,
    /// News about the application itself.
    SystemUpdate,
}

impl NotificationKind {
    /// The snake_case name used in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BillReminder => "bill_reminder",
            Self::BudgetWarning => "budget_warning",
            Self::GoalAchievement => "goal_achievement",
            Self::SystemUpdate => "system_update",
        }
    }

    /// A human readable label, e.g. "Bill Reminder".
    pub fn label(self) -> &'static str {
        match self {
            Self::BillReminder => "Bill Reminder",
            Self::BudgetWarning => "Budget Warning",
            Self::GoalAchievement => "Goal Achievement",
            Self::SystemUpdate => "System Update",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bill_reminder" => Ok(Self::BillReminder),
            "budget_warning" => Ok(Self::BudgetWarning),
            "goal_achievement" => Ok(Self::GoalAchievement),
            "system_update" => Ok(Self::SystemUpdate),
            other => Err(Error::ValidationError(format!(
                "unknown notification kind \"{other}\""
            ))),
        }
    }
}

/// How urgently a notification needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    #[allow(missing_docs)]
    Low,
    #[allow(missing_docs)]
    Medium,
    #[allow(missing_docs)]
    High,
    #[allow(missing_docs)]
    Urgent,
}

impl NotificationPriority {
    /// The snake_case name used in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl FromStr for NotificationPriority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            other => Err(Error::ValidationError(format!(
                "unknown notification priority \"{other}\""
            ))),
        }
    }
}

/// The content of a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// What the notification is about.
    pub kind: NotificationKind,
    /// A short headline.
    pub title: String,
    /// The body text.
    pub message: String,
    /// Structured details, always a JSON object.
    #[serde(default)]
    pub data: serde_json::Value,
    /// How urgently the notification needs attention.
    pub priority: NotificationPriority,
    /// When the notification stops being relevant.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    /// Where the user should go to act on the notification.
    pub action_url: Option<String>,
    /// The text for the link to `action_url`.
    pub action_label: Option<String>,
}

/// A notification as stored and shown in the inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// The ID of the notification.
    pub id: NotificationId,
    /// The user the notification was sent to.
    pub user_id: UserId,
    /// When the notification was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Whether the user has read the notification.
    pub read: bool,
    /// The content of the notification.
    pub payload: NotificationPayload,
}

impl NotificationRecord {
    /// Check that a record supplied by a store or the push channel is well formed.
    ///
    /// # Errors
    /// Returns [Error::ValidationError] if the ID or title is blank, `data` is
    /// neither null nor a JSON object, or the record expires before it was
    /// created.
    pub fn validate(&self) -> Result<(), Error> {
        if self.id.as_ref().trim().is_empty() {
            return Err(Error::ValidationError(
                "notification ID cannot be empty".to_owned(),
            ));
        }

        if self.payload.title.trim().is_empty() {
            return Err(Error::ValidationError(format!(
                "notification {} has an empty title",
                self.id
            )));
        }

        if !(self.payload.data.is_object() || self.payload.data.is_null()) {
            return Err(Error::ValidationError(format!(
                "notification {} has data that is not a JSON object",
                self.id
            )));
        }

        if self
            .payload
            .expires_at
            .is_some_and(|expires_at| expires_at < self.created_at)
        {
            return Err(Error::ValidationError(format!(
                "notification {} expires before it was created",
                self.id
            )));
        }

        Ok(())
    }
}

//! Helpers for building the notifications the application sends.

use rust_decimal::{Decimal, RoundingStrategy};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    notification::core::{NotificationKind, NotificationPayload, NotificationPriority},
};

/// A warning that spending in a category is approaching or over its budget.
///
/// The priority is urgent once the budget is spent, high from 90% and medium
/// below that.
///
/// # Errors
/// Returns [Error::ValidationError] if `budget_amount` is not positive.
pub fn budget_warning(
    category_id: &str,
    budget_amount: Decimal,
    spent_amount: Decimal,
) -> Result<NotificationPayload, Error> {
    if budget_amount <= Decimal::ZERO {
        return Err(Error::ValidationError(format!(
            "budget amount {budget_amount} must be positive"
        )));
    }

    let percentage = (spent_amount / budget_amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let priority = if spent_amount >= budget_amount {
        NotificationPriority::Urgent
    } else if spent_amount >= budget_amount * Decimal::new(9, 1) {
        NotificationPriority::High
    } else {
        NotificationPriority::Medium
    };

    Ok(NotificationPayload {
        kind: NotificationKind::BudgetWarning,
        title: format!("Budget Alert: {percentage}% spent"),
        message: format!(
            "You've spent ${spent_amount:.2} of your ${budget_amount:.2} budget this month."
        ),
        data: serde_json::json!({
            "category_id": category_id,
            "budget_amount": budget_amount,
            "spent_amount": spent_amount,
            "percentage": percentage,
        }),
        priority,
        expires_at: None,
        action_url: Some("/dashboard/budget".to_owned()),
        action_label: Some("View Budget".to_owned()),
    })
}

/// A reminder about an upcoming payment.
pub fn bill_reminder(description: &str, amount: Decimal, due_date: Date) -> NotificationPayload {
    NotificationPayload {
        kind: NotificationKind::BillReminder,
        title: format!("Bill Reminder: {description}"),
        message: format!(
            "Don't forget about your upcoming payment of ${amount:.2} due on {due_date}."
        ),
        data: serde_json::json!({
            "amount": amount,
            "due_date": due_date.to_string(),
            "description": description,
        }),
        priority: NotificationPriority::Medium,
        expires_at: None,
        action_url: Some("/dashboard/transactions".to_owned()),
        action_label: Some("View Transactions".to_owned()),
    }
}

/// A congratulation for reaching a savings goal.
pub fn goal_achievement(goal_name: &str, target_amount: Decimal) -> NotificationPayload {
    NotificationPayload {
        kind: NotificationKind::GoalAchievement,
        title: format!("Goal Achieved: {goal_name}"),
        message: format!(
            "Congratulations! You've reached your savings goal of ${target_amount:.2}."
        ),
        data: serde_json::json!({
            "goal_name": goal_name,
            "target_amount": target_amount,
        }),
        priority: NotificationPriority::High,
        expires_at: None,
        action_url: Some("/dashboard/budget".to_owned()),
        action_label: Some("View Goals".to_owned()),
    }
}

/// News about the application, optionally linking to more details.
pub fn system_update(title: &str, message: &str, action_url: Option<&str>) -> NotificationPayload {
    NotificationPayload {
        kind: NotificationKind::SystemUpdate,
        title: title.to_owned(),
        message: message.to_owned(),
        data: serde_json::json!({}),
        priority: NotificationPriority::Low,
        expires_at: None,
        action_url: action_url.map(str::to_owned),
        action_label: action_url.map(|_| "Learn More".to_owned()),
    }
}

/// Describe how long ago `created_at` was, e.g. "5m ago".
///
/// Anything a week or older is shown as its date.
pub fn format_relative(created_at: OffsetDateTime, now: OffsetDateTime) -> String {
    let minutes = (now - created_at).whole_minutes();

    if minutes < 1 {
        return "Just now".to_owned();
    }
    if minutes < 60 {
        return format!("{minutes}m ago");
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }

    let days = hours / 24;
    if days < 7 {
        return format!("{days}d ago");
    }

    created_at.date().to_string()
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use time::macros::{date, datetime};

    use crate::{
        Error,
        notification::core::{NotificationKind, NotificationPriority},
    };

    use super::{bill_reminder, budget_warning, format_relative, goal_achievement, system_update};

    #[test]
    fn budget_warning_below_ninety_percent_is_medium() {
        let payload = budget_warning("cat-1", dec!(500), dec!(425)).unwrap();

        assert_eq!(payload.kind, NotificationKind::BudgetWarning);
        assert_eq!(payload.title, "Budget Alert: 85% spent");
        assert_eq!(
            payload.message,
            "You've spent $425.00 of your $500.00 budget this month."
        );
        assert_eq!(payload.priority, NotificationPriority::Medium);
        assert_eq!(payload.data["category_id"], "cat-1");
    }

    #[test]
    fn budget_warning_from_ninety_percent_is_high() {
        let payload = budget_warning("cat-1", dec!(500), dec!(450)).unwrap();

        assert_eq!(payload.priority, NotificationPriority::High);
    }

    #[test]
    fn budget_warning_over_budget_is_urgent() {
        let payload = budget_warning("cat-1", dec!(500), dec!(612.50)).unwrap();

        assert_eq!(payload.title, "Budget Alert: 123% spent");
        assert_eq!(payload.priority, NotificationPriority::Urgent);
    }

    #[test]
    fn budget_warning_needs_positive_budget() {
        let result = budget_warning("cat-1", dec!(0), dec!(10));

        assert!(matches!(result, Err(Error::ValidationError(_))));
    }

    #[test]
    fn bill_reminder_mentions_amount_and_date() {
        let payload = bill_reminder("Netflix Subscription", dec!(15.99), date!(2024 - 06 - 03));

        assert_eq!(payload.title, "Bill Reminder: Netflix Subscription");
        assert_eq!(
            payload.message,
            "Don't forget about your upcoming payment of $15.99 due on 2024-06-03."
        );
        assert_eq!(payload.priority, NotificationPriority::Medium);
    }

    #[test]
    fn goal_achievement_is_high_priority() {
        let payload = goal_achievement("Emergency Fund", dec!(1000));

        assert_eq!(payload.title, "Goal Achieved: Emergency Fund");
        assert_eq!(payload.priority, NotificationPriority::High);
    }

    #[test]
    fn system_update_only_labels_links() {
        let with_link = system_update("New", "Feature", Some("/dashboard/insights"));
        let without_link = system_update("New", "Feature", None);

        assert_eq!(with_link.action_label.as_deref(), Some("Learn More"));
        assert_eq!(without_link.action_url, None);
        assert_eq!(without_link.action_label, None);
    }

    #[test]
    fn relative_times() {
        let now = datetime!(2024-06-10 12:00 UTC);

        assert_eq!(format_relative(datetime!(2024-06-10 11:59:30 UTC), now), "Just now");
        assert_eq!(format_relative(datetime!(2024-06-10 11:55 UTC), now), "5m ago");
        assert_eq!(format_relative(datetime!(2024-06-10 09:00 UTC), now), "3h ago");
        assert_eq!(format_relative(datetime!(2024-06-08 12:00 UTC), now), "2d ago");
        assert_eq!(format_relative(datetime!(2024-05-01 12:00 UTC), now), "2024-05-01");
    }
}

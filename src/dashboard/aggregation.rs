//! Transaction data aggregation for the dashboard.
//!
//! Reduces a transaction snapshot to totals, per-category expenses and
//! per-month income and expense in a single pass.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::{
    dashboard::summary::{CategoryTotal, MonthKey, MonthlyTrend, SummaryResult},
    transaction::{AggregationWindow, TransactionKind, TransactionRecord},
};

/// The number of categories listed in [SummaryResult::top_categories].
pub(crate) const TOP_CATEGORY_COUNT: usize = 5;

/// The number of transactions listed in [SummaryResult::recent_transactions].
pub(crate) const RECENT_TRANSACTION_COUNT: usize = 10;

#[derive(Default)]
struct CategoryAccumulator {
    total: Decimal,
    count: usize,
}

#[derive(Default)]
struct MonthAccumulator {
    income: Decimal,
    expense: Decimal,
}

/// Summarise `transactions` over `window`.
///
/// `transactions` is expected to be the newest-first snapshot returned by a
/// [TransactionStore](crate::TransactionStore), already capped by the caller.
/// Nothing is fetched here. Records dated outside `window` are skipped.
///
/// The result is a pure function of the input: categories are ordered by
/// total descending with ties broken by name, months are ordered oldest
/// first, and categories whose expenses add up to zero are left out.
pub fn aggregate(transactions: &[TransactionRecord], window: &AggregationWindow) -> SummaryResult {
    let mut total_income = Decimal::ZERO;
    let mut total_expense = Decimal::ZERO;
    let mut categories: BTreeMap<&str, CategoryAccumulator> = BTreeMap::new();
    let mut months: BTreeMap<MonthKey, MonthAccumulator> = BTreeMap::new();
    let mut recent_transactions = Vec::with_capacity(RECENT_TRANSACTION_COUNT);

    for transaction in transactions
        .iter()
        .filter(|transaction| window.contains(transaction.occurred_on))
    {
        let month = months
            .entry(MonthKey::from(transaction.occurred_on))
            .or_default();

        match transaction.kind {
            TransactionKind::Income => {
                total_income += transaction.amount;
                month.income += transaction.amount;
            }
            TransactionKind::Expense => {
                total_expense += transaction.amount;
                month.expense += transaction.amount;

                let category = categories.entry(transaction.category_label()).or_default();
                category.total += transaction.amount;
                category.count += 1;
            }
        }

        if recent_transactions.len() < RECENT_TRANSACTION_COUNT {
            recent_transactions.push(transaction.clone());
        }
    }

    let category_breakdown = sort_categories(categories);
    let top_categories = category_breakdown
        .iter()
        .take(TOP_CATEGORY_COUNT)
        .cloned()
        .collect();

    let monthly_trend = months
        .into_iter()
        .map(|(month_key, totals)| MonthlyTrend {
            month_key,
            label: month_key.label(),
            income: totals.income,
            expense: totals.expense,
            net: totals.income - totals.expense,
        })
        .collect();

    SummaryResult {
        total_income,
        total_expense,
        balance: total_income - total_expense,
        category_breakdown,
        monthly_trend,
        top_categories,
        recent_transactions,
    }
}

fn sort_categories(categories: BTreeMap<&str, CategoryAccumulator>) -> Vec<CategoryTotal> {
    let mut sorted: Vec<CategoryTotal> = categories
        .into_iter()
        .filter(|(_, accumulator)| !accumulator.total.is_zero())
        .map(|(category, accumulator)| CategoryTotal {
            category: category.to_owned(),
            total: accumulator.total,
            transaction_count: accumulator.count,
        })
        .collect();

    sorted.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.category.cmp(&b.category))
    });

    sorted
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::{Date, macros::date};

    use crate::{
        dashboard::summary::{CategoryTotal, MonthKey, SummaryResult},
        transaction::{AggregationWindow, TransactionKind, TransactionRecord},
    };

    use super::{RECENT_TRANSACTION_COUNT, TOP_CATEGORY_COUNT, aggregate};

    fn income(id: i64, amount: Decimal, date: Date) -> TransactionRecord {
        TransactionRecord::build(amount, TransactionKind::Income, date)
            .category("Salary")
            .finalise(id)
    }

    fn expense(id: i64, amount: Decimal, category: &str, date: Date) -> TransactionRecord {
        TransactionRecord::build(amount, TransactionKind::Expense, date)
            .category(category)
            .finalise(id)
    }

    fn all_time() -> AggregationWindow {
        AggregationWindow::since(date!(2000 - 01 - 01))
    }

    #[test]
    fn summarises_income_and_expenses_across_months() {
        // Newest first, as the store returns them.
        let transactions = vec![
            expense(3, dec!(10), "Food", date!(2024 - 02 - 03)),
            expense(2, dec!(40), "Food", date!(2024 - 01 - 20)),
            income(1, dec!(100), date!(2024 - 01 - 15)),
        ];

        let got = aggregate(&transactions, &all_time());

        assert_eq!(got.total_income, dec!(100));
        assert_eq!(got.total_expense, dec!(50));
        assert_eq!(got.balance, dec!(50));
        assert_eq!(
            got.category_breakdown,
            vec![CategoryTotal {
                category: "Food".to_owned(),
                total: dec!(50),
                transaction_count: 2,
            }]
        );
        assert_eq!(got.monthly_trend.len(), 2);
        assert_eq!(got.monthly_trend[0].month_key, MonthKey { year: 2024, month: 1 });
        assert_eq!(got.monthly_trend[0].label, "Jan");
        assert_eq!(got.monthly_trend[0].income, dec!(100));
        assert_eq!(got.monthly_trend[0].expense, dec!(40));
        assert_eq!(got.monthly_trend[0].net, dec!(60));
        assert_eq!(got.monthly_trend[1].month_key, MonthKey { year: 2024, month: 2 });
        assert_eq!(got.monthly_trend[1].income, dec!(0));
        assert_eq!(got.monthly_trend[1].expense, dec!(10));
        assert_eq!(got.recent_transactions, transactions);
    }

    #[test]
    fn empty_input_gives_empty_summary() {
        let got = aggregate(&[], &all_time());

        assert_eq!(got, SummaryResult::default());
        assert_eq!(got.balance, Decimal::ZERO);
    }

    #[test]
    fn category_totals_add_up_to_total_expense() {
        let transactions = vec![
            expense(1, dec!(12.34), "Food", date!(2024 - 03 - 05)),
            expense(2, dec!(0.01), "Transport", date!(2024 - 03 - 04)),
            income(3, dec!(1000), date!(2024 - 03 - 03)),
            expense(4, dec!(99.99), "Rent", date!(2024 - 02 - 01)),
            expense(5, dec!(7.66), "Food", date!(2024 - 01 - 01)),
            expense(6, dec!(3.33), "", date!(2023 - 12 - 31)),
        ];

        let got = aggregate(&transactions, &all_time());

        let category_sum: Decimal = got.category_breakdown.iter().map(|c| c.total).sum();
        assert_eq!(category_sum, got.total_expense);
        assert_eq!(got.total_expense, dec!(123.33));
    }

    #[test]
    fn balance_is_exact_across_repeated_aggregation() {
        let transactions: Vec<_> = (0..50)
            .map(|i| {
                if i % 3 == 0 {
                    income(i, dec!(0.1), date!(2024 - 01 - 10))
                } else {
                    expense(i, dec!(0.2), "Food", date!(2024 - 01 - 10))
                }
            })
            .collect();

        let first = aggregate(&transactions, &all_time());
        let second = aggregate(&transactions, &all_time());

        assert_eq!(first, second);
        assert_eq!(first.balance, first.total_income - first.total_expense);
        assert_eq!(first.total_income, dec!(1.7));
        assert_eq!(first.total_expense, dec!(6.6));
        assert_eq!(first.balance, dec!(-4.9));
    }

    #[test]
    fn monthly_trend_counts_every_transaction_once() {
        let transactions = vec![
            income(1, dec!(5), date!(2024 - 03 - 31)),
            expense(2, dec!(7), "Food", date!(2024 - 03 - 01)),
            expense(3, dec!(11), "Food", date!(2024 - 02 - 29)),
            income(4, dec!(13), date!(2023 - 02 - 28)),
        ];

        let got = aggregate(&transactions, &all_time());

        let month_income: Decimal = got.monthly_trend.iter().map(|m| m.income).sum();
        let month_expense: Decimal = got.monthly_trend.iter().map(|m| m.expense).sum();
        assert_eq!(month_income, got.total_income);
        assert_eq!(month_expense, got.total_expense);
        let keys: Vec<String> = got
            .monthly_trend
            .iter()
            .map(|m| m.month_key.to_string())
            .collect();
        assert_eq!(keys, vec!["2023-02", "2024-02", "2024-03"]);
    }

    #[test]
    fn categories_sort_by_total_then_name() {
        let transactions = vec![
            expense(1, dec!(20), "Zoo", date!(2024 - 01 - 05)),
            expense(2, dec!(20), "Apples", date!(2024 - 01 - 04)),
            expense(3, dec!(50), "Rent", date!(2024 - 01 - 03)),
            expense(4, dec!(5), "Bus", date!(2024 - 01 - 02)),
        ];

        let got = aggregate(&transactions, &all_time());

        let names: Vec<&str> = got
            .category_breakdown
            .iter()
            .map(|c| c.category.as_str())
            .collect();
        assert_eq!(names, vec!["Rent", "Apples", "Zoo", "Bus"]);
    }

    #[test]
    fn top_categories_are_a_prefix_of_the_breakdown() {
        let transactions: Vec<_> = ["A", "B", "C", "D", "E", "F", "G"]
            .iter()
            .enumerate()
            .map(|(i, category)| {
                expense(
                    i as i64,
                    Decimal::from(i as i64 + 1),
                    category,
                    date!(2024 - 01 - 01),
                )
            })
            .collect();

        let got = aggregate(&transactions, &all_time());

        assert_eq!(got.top_categories.len(), TOP_CATEGORY_COUNT);
        assert_eq!(
            got.top_categories,
            got.category_breakdown[..TOP_CATEGORY_COUNT].to_vec()
        );
        assert_eq!(got.top_categories[0].category, "G");
    }

    #[test]
    fn income_is_not_a_category() {
        let transactions = vec![income(1, dec!(100), date!(2024 - 01 - 01))];

        let got = aggregate(&transactions, &all_time());

        assert!(got.category_breakdown.is_empty());
        assert!(got.top_categories.is_empty());
    }

    #[test]
    fn zero_total_categories_are_not_emitted() {
        let transactions = vec![
            expense(1, dec!(0), "Freebies", date!(2024 - 01 - 02)),
            expense(2, dec!(3), "Food", date!(2024 - 01 - 01)),
        ];

        let got = aggregate(&transactions, &all_time());

        assert_eq!(got.category_breakdown.len(), 1);
        assert_eq!(got.category_breakdown[0].category, "Food");
    }

    #[test]
    fn blank_categories_are_grouped_as_uncategorized() {
        let transactions = vec![
            expense(1, dec!(1), "", date!(2024 - 01 - 02)),
            expense(2, dec!(2), "  ", date!(2024 - 01 - 01)),
        ];

        let got = aggregate(&transactions, &all_time());

        assert_eq!(got.category_breakdown.len(), 1);
        assert_eq!(got.category_breakdown[0].category, "Uncategorized");
        assert_eq!(got.category_breakdown[0].transaction_count, 2);
    }

    #[test]
    fn recent_transactions_keeps_the_newest_ten() {
        let transactions: Vec<_> = (0..15)
            .map(|i| expense(i, dec!(1), "Food", date!(2024 - 01 - 31) - time::Duration::days(i)))
            .collect();

        let got = aggregate(&transactions, &all_time());

        assert_eq!(got.recent_transactions.len(), RECENT_TRANSACTION_COUNT);
        assert_eq!(
            got.recent_transactions,
            transactions[..RECENT_TRANSACTION_COUNT].to_vec()
        );
    }

    #[test]
    fn skips_transactions_outside_the_window() {
        let transactions = vec![
            expense(1, dec!(8), "Food", date!(2024 - 02 - 01)),
            expense(2, dec!(4), "Food", date!(2024 - 01 - 31)),
            expense(3, dec!(2), "Food", date!(2023 - 12 - 31)),
        ];
        let window =
            AggregationWindow::between(date!(2024 - 01 - 01), date!(2024 - 02 - 01)).unwrap();

        let got = aggregate(&transactions, &window);

        assert_eq!(got.total_expense, dec!(4));
        assert_eq!(got.recent_transactions.len(), 1);
        assert_eq!(got.recent_transactions[0].id, 2);
    }
}

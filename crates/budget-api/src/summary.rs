//! KPI arithmetic for the dashboard home view

use serde::Serialize;

use crate::models::{Goal, Transaction, TransactionType};

/// Income/expense totals over a set of transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub income: f64,
    pub expenses: f64,
    /// income - expenses
    pub balance: f64,
    pub count: usize,
}

impl Totals {
    pub fn from_transactions<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut totals = Totals::default();
        for tx in transactions {
            // Amounts are stored unsigned; the type carries the direction
            let amount = tx.amount.abs();
            match tx.kind {
                TransactionType::Income => totals.income += amount,
                TransactionType::Expense => totals.expenses += amount,
            }
            totals.count += 1;
        }
        totals.balance = totals.income - totals.expenses;
        totals
    }
}

/// Change from `previous` to `current` in percent, one decimal.
///
/// `None` when there is no baseline to compare against.
pub fn percentage_change(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 || !previous.is_finite() || !current.is_finite() {
        return None;
    }
    Some(round1((current - previous) / previous.abs() * 100.0))
}

/// How far a goal is towards its target, in percent within `[0, 100]`.
pub fn goal_progress(goal: &Goal) -> f64 {
    if goal.goal_amount <= 0.0 {
        return if goal.current_amount > 0.0 { 100.0 } else { 0.0 };
    }
    (goal.current_amount / goal.goal_amount * 100.0).clamp(0.0, 100.0)
}

/// Figures shown on the dashboard home view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub totals: Totals,
    pub active_goals: usize,
    /// Mean progress of active goals, one decimal; 0 when there are none
    pub average_goal_progress: f64,
    /// Sum of what active goals still need
    pub remaining_goal_amount: f64,
}

impl DashboardSummary {
    pub fn build(transactions: &[Transaction], goals: &[Goal]) -> Self {
        let active: Vec<&Goal> = goals.iter().filter(|g| g.is_active).collect();
        let average_goal_progress = if active.is_empty() {
            0.0
        } else {
            round1(active.iter().map(|g| goal_progress(g)).sum::<f64>() / active.len() as f64)
        };
        let remaining_goal_amount = active
            .iter()
            .map(|g| (g.goal_amount - g.current_amount).max(0.0))
            .sum();

        Self {
            totals: Totals::from_transactions(transactions),
            active_goals: active.len(),
            average_goal_progress,
            remaining_goal_amount,
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(amount: f64, kind: TransactionType) -> Transaction {
        Transaction {
            id: 1,
            name: "t".into(),
            amount,
            description: None,
            kind,
            transaction_category: None,
            transaction_date: "2026-10-01".into(),
            created_at: None,
            updated_at: None,
        }
    }

    fn goal(goal_amount: f64, current_amount: f64, is_active: bool) -> Goal {
        Goal {
            id: 1,
            name: "g".into(),
            goal_amount,
            current_amount,
            is_active,
            approximate_days: None,
        }
    }

    #[test]
    fn totals_split_income_and_expenses() {
        let txs = vec![
            tx(1000.0, TransactionType::Income),
            tx(250.0, TransactionType::Expense),
            tx(-50.0, TransactionType::Expense),
        ];
        let totals = Totals::from_transactions(&txs);
        assert_eq!(totals.income, 1000.0);
        assert_eq!(totals.expenses, 300.0);
        assert_eq!(totals.balance, 700.0);
        assert_eq!(totals.count, 3);
    }

    #[test]
    fn totals_of_nothing_are_zero() {
        assert_eq!(Totals::from_transactions(&[]), Totals::default());
    }

    #[test]
    fn percentage_change_rounds_to_one_decimal() {
        assert_eq!(percentage_change(200.0, 170.0), Some(-15.0));
        assert_eq!(percentage_change(300.0, 400.0), Some(33.3));
        assert_eq!(percentage_change(-100.0, -50.0), Some(50.0));
        assert_eq!(percentage_change(0.0, 10.0), None);
    }

    #[test]
    fn goal_progress_is_clamped() {
        assert_eq!(goal_progress(&goal(1000.0, 250.0, true)), 25.0);
        assert_eq!(goal_progress(&goal(1000.0, 1500.0, true)), 100.0);
        assert_eq!(goal_progress(&goal(1000.0, -10.0, true)), 0.0);
        assert_eq!(goal_progress(&goal(0.0, 0.0, true)), 0.0);
    }

    #[test]
    fn summary_counts_only_active_goals() {
        let goals = vec![
            goal(1000.0, 500.0, true),
            goal(200.0, 50.0, true),
            goal(999.0, 0.0, false),
        ];
        let summary = DashboardSummary::build(&[tx(10.0, TransactionType::Income)], &goals);
        assert_eq!(summary.active_goals, 2);
        assert_eq!(summary.average_goal_progress, 37.5);
        assert_eq!(summary.remaining_goal_amount, 650.0);
        assert_eq!(summary.totals.balance, 10.0);
    }

    #[test]
    fn summary_without_goals() {
        let summary = DashboardSummary::build(&[], &[]);
        assert_eq!(summary.active_goals, 0);
        assert_eq!(summary.average_goal_progress, 0.0);
    }
}

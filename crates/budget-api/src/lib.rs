//! Budget backend resources
//!
//! `BudgetApi` wraps a `budget_gateway::Gateway` with typed calls for the
//! user profile, transactions, categories, and goals. `summary` turns the
//! fetched lists into the dashboard's headline figures.

pub mod client;
pub mod models;
pub mod summary;

pub use budget_gateway::{GatewayError as Error, Result};
pub use client::{BudgetApi, Categories, Goals, Transactions};
pub use models::*;
pub use summary::{DashboardSummary, Totals, goal_progress, percentage_change};

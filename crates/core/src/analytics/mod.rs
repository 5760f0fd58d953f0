//! Cross-event financial analytics.

pub mod aggregator;
pub mod types;

pub use aggregator::{AnalyticsAggregator, utilization_percent};
pub use types::{
    AnalyticsTotals, BudgetAnalytics, CategoryTotal, EventTypeTotal, MonthlyTotal,
    PendingApprovals,
};

//! Workflow domain types for expense review.
//!
//! This module defines the review status carried by every expense entry
//! and the audit record produced when an approver acts on one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use eventledger_shared::types::UserId;

/// Review status of an expense entry.
///
/// Statuses are unordered: an approver may move an entry between any two
/// of them at any time. Only `Approved` entries count toward a budget's
/// spent amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    /// Awaiting review. New and re-edited entries start here.
    #[default]
    Pending,
    /// Accepted; contributes to the spent amount.
    Approved,
    /// Declined.
    Rejected,
}

impl ExpenseStatus {
    /// All statuses, in display order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Approved, Self::Rejected];

    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true if entries in this status count toward the spent amount.
    #[must_use]
    pub fn counts_toward_spend(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A review decision with its audit data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewAction {
    /// Status the entry moves to.
    pub new_status: ExpenseStatus,
    /// Approver who made the decision.
    pub reviewed_by: UserId,
    /// When the decision was made.
    pub reviewed_at: DateTime<Utc>,
    /// Replacement notes, if the approver supplied any.
    pub notes: Option<String>,
}

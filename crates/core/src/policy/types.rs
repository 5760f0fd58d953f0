//! Actors, roles and the actions they attempt.

use serde::{Deserialize, Serialize};
use std::fmt;

use eventledger_shared::types::UserId;

/// Platform role carried in the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Club administrator.
    Admin,
    /// Member of the event committee.
    CommitteeMember,
    /// Plain club member.
    Member,
}

impl Role {
    /// Parse a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "committee_member" | "committee-member" | "committee" => Some(Self::CommitteeMember),
            "member" => Some(Self::Member),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::CommitteeMember => "committee_member",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The user making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// User id.
    pub id: UserId,
    /// Recognised role, or `None` for a role string the platform does not know.
    pub role: Option<Role>,
}

impl Actor {
    /// Creates an actor with a known role.
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self {
            id,
            role: Some(role),
        }
    }

    /// Creates an actor from the raw role claim.
    #[must_use]
    pub fn from_claim(id: UserId, role: &str) -> Self {
        Self {
            id,
            role: Role::parse(role),
        }
    }

    /// Returns true for administrators.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }
}

/// Something an actor attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Create a budget.
    CreateBudget,
    /// Read one budget.
    ViewBudget,
    /// List budgets.
    ListBudgets,
    /// Edit budget-level fields.
    UpdateBudget,
    /// Soft-delete a budget.
    DeleteBudget,
    /// Submit an expense.
    AddExpense,
    /// Approve, reject or reset an expense.
    ReviewExpense,
    /// Edit an expense.
    EditExpense,
    /// Remove an expense.
    DeleteExpense,
    /// Read cross-event analytics.
    ViewAnalytics,
    /// Export a budget document.
    ExportBudget,
    /// Run the event link repair pass.
    ReconcileLinks,
}

impl Action {
    /// Returns a short human-readable name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateBudget => "create budget",
            Self::ViewBudget => "view budget",
            Self::ListBudgets => "list budgets",
            Self::UpdateBudget => "update budget",
            Self::DeleteBudget => "delete budget",
            Self::AddExpense => "add expense",
            Self::ReviewExpense => "review expense",
            Self::EditExpense => "edit expense",
            Self::DeleteExpense => "delete expense",
            Self::ViewAnalytics => "view analytics",
            Self::ExportBudget => "export budget",
            Self::ReconcileLinks => "reconcile event links",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who owns the resource an action targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ownership {
    /// Creator of the target budget.
    pub budget_creator: Option<UserId>,
    /// Payer of the target expense.
    pub expense_payer: Option<UserId>,
}

impl Ownership {
    /// No owned resource (collection-level actions).
    #[must_use]
    pub const fn none() -> Self {
        Self {
            budget_creator: None,
            expense_payer: None,
        }
    }

    /// A budget owned by `creator`.
    #[must_use]
    pub const fn budget(creator: UserId) -> Self {
        Self {
            budget_creator: Some(creator),
            expense_payer: None,
        }
    }

    /// An expense paid by `payer` inside a budget owned by `creator`.
    #[must_use]
    pub const fn expense(creator: UserId, payer: UserId) -> Self {
        Self {
            budget_creator: Some(creator),
            expense_payer: Some(payer),
        }
    }
}

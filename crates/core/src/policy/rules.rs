//! The authorization table.

use thiserror::Error;

use super::types::{Action, Actor, Ownership, Role};

/// Policy denial.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Not allowed to {action}: {reason}")]
pub struct PolicyDenial {
    /// The attempted action.
    pub action: Action,
    /// Why it was denied.
    pub reason: &'static str,
}

impl PolicyDenial {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        403
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        "FORBIDDEN"
    }
}

/// Stateless authorization policy consulted by every ledger operation.
pub struct AuthorizationPolicy;

impl AuthorizationPolicy {
    /// Decide whether `actor` may perform `action` on a resource with `ownership`.
    ///
    /// # Errors
    ///
    /// Returns `PolicyDenial` when the table does not grant the action.
    pub fn authorize(
        actor: &Actor,
        action: Action,
        ownership: &Ownership,
    ) -> Result<(), PolicyDenial> {
        let Some(role) = actor.role else {
            return Err(PolicyDenial {
                action,
                reason: "unrecognised role",
            });
        };

        let is_creator = ownership.budget_creator == Some(actor.id);
        let is_payer = ownership.expense_payer == Some(actor.id);

        let allowed = match (role, action) {
            (Role::Admin, _) => true,

            (
                Role::CommitteeMember,
                Action::CreateBudget
                | Action::ViewBudget
                | Action::ListBudgets
                | Action::AddExpense
                | Action::ViewAnalytics
                | Action::ExportBudget,
            ) => true,
            (Role::CommitteeMember, Action::UpdateBudget | Action::DeleteBudget) => is_creator,
            (Role::CommitteeMember, Action::EditExpense | Action::DeleteExpense) => {
                is_creator || is_payer
            }

            (Role::Member, Action::EditExpense | Action::DeleteExpense) => is_payer,

            (_, Action::ReviewExpense | Action::ReconcileLinks) | (Role::Member, _) => false,
        };

        if allowed {
            Ok(())
        } else {
            Err(PolicyDenial {
                action,
                reason: denial_reason(role, action),
            })
        }
    }

    /// Returns true if `actor` may perform `action`.
    #[must_use]
    pub fn allows(actor: &Actor, action: Action, ownership: &Ownership) -> bool {
        Self::authorize(actor, action, ownership).is_ok()
    }
}

fn denial_reason(role: Role, action: Action) -> &'static str {
    match action {
        Action::ReviewExpense | Action::ReconcileLinks => "administrators only",
        Action::UpdateBudget | Action::DeleteBudget => "only the budget creator or an administrator",
        Action::EditExpense | Action::DeleteExpense => {
            "only the payer, the budget creator or an administrator"
        }
        _ if role == Role::Member => "requires a committee or administrator role",
        _ => "not permitted",
    }
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;

//! Request payload validation.
//!
//! Forms are the loosely-typed shapes the API deserializes. Each one is
//! checked in full before anything is mutated, and every offending field is
//! reported at once rather than stopping at the first problem.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use eventledger_shared::FieldError;
use eventledger_shared::types::{EventId, PageRequest};

use super::types::{
    AMOUNT_SCALE, BudgetPatch, BudgetStatus, ExpenseCategory, ExpensePatch, MAX_AMOUNT, NewBudget,
    NewExpense,
};
use crate::workflow::ExpenseStatus;

/// One or more invalid request fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid request: {}", summary(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

fn summary(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    /// Single-field error.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![FieldError::new(field, message)])
    }

    /// Offending fields.
    #[must_use]
    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }
}

#[derive(Default)]
struct Collector(Vec<FieldError>);

impl Collector {
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    fn reject_extras(&mut self, extra: &Map<String, Value>) {
        let mut keys: Vec<&String> = extra.keys().collect();
        keys.sort();
        for key in keys {
            self.push(key, "field is not editable");
        }
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.0.is_empty() {
            Ok(value())
        } else {
            Err(ValidationErrors(self.0))
        }
    }
}

/// Parses a non-negative decimal from a JSON number or numeric string.
///
/// Amounts must fit the storage column: at most four decimal places and no
/// more than [`MAX_AMOUNT`].
fn parse_amount(value: &Value) -> Result<Decimal, &'static str> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err("must be a number"),
    };
    let amount = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| "must be a number")?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err("must not be negative");
    }
    let amount = amount.normalize();
    if amount.scale() > AMOUNT_SCALE {
        return Err("must have at most 4 decimal places");
    }
    if amount > MAX_AMOUNT {
        return Err("must not exceed 999999999999999.9999");
    }
    Ok(amount)
}

/// Parses an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC).
fn parse_date(value: &Value) -> Result<DateTime<Utc>, &'static str> {
    let Value::String(text) = value else {
        return Err("must be a date string");
    };
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or("must be an RFC 3339 timestamp or YYYY-MM-DD")
}

fn required_text(c: &mut Collector, field: &str, value: Option<&String>) -> Option<String> {
    match value.map(|v| v.trim()) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        Some(_) => {
            c.push(field, "must not be empty");
            None
        }
        None => {
            c.push(field, "is required");
            None
        }
    }
}

fn optional_notes(notes: Option<String>) -> Option<String> {
    notes.filter(|n| !n.trim().is_empty())
}

/// Payload for creating a budget.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BudgetForm {
    /// Event id.
    #[serde(default, alias = "eventId")]
    pub event_id: Option<String>,
    /// Allocation ceiling.
    #[serde(default, alias = "totalAmount")]
    pub total_amount: Option<Value>,
    /// Optional notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Any other field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BudgetForm {
    /// Validates the form.
    ///
    /// # Errors
    ///
    /// Returns every invalid field.
    pub fn validate(self) -> Result<NewBudget, ValidationErrors> {
        let mut c = Collector::default();
        c.reject_extras(&self.extra);

        let event_id = match self.event_id.as_deref().map(str::trim) {
            None | Some("") => {
                c.push("event_id", "is required");
                None
            }
            Some(raw) => match Uuid::parse_str(raw) {
                Ok(id) => Some(EventId::from_uuid(id)),
                Err(_) => {
                    c.push("event_id", "must be a UUID");
                    None
                }
            },
        };

        let total_amount = match &self.total_amount {
            None | Some(Value::Null) => {
                c.push("total_amount", "is required");
                None
            }
            Some(v) => parse_amount(v)
                .map_err(|m| c.push("total_amount", m))
                .ok(),
        };

        let notes = optional_notes(self.notes);
        c.finish(|| NewBudget {
            event_id: event_id.unwrap_or_default(),
            total_amount: total_amount.unwrap_or_default(),
            notes,
        })
    }
}

/// Payload for editing budget fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BudgetPatchForm {
    /// New allocation ceiling.
    #[serde(default, alias = "totalAmount")]
    pub total_amount: Option<Value>,
    /// New status.
    #[serde(default)]
    pub status: Option<String>,
    /// New notes; explicit `null` clears them.
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub notes: Option<Option<String>>,
    /// Any other field, including `spent_amount` and `expenses`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BudgetPatchForm {
    /// Validates the form.
    ///
    /// # Errors
    ///
    /// Returns every invalid field. An empty patch is an error.
    pub fn validate(self) -> Result<BudgetPatch, ValidationErrors> {
        let mut c = Collector::default();
        c.reject_extras(&self.extra);

        let total_amount = self
            .total_amount
            .as_ref()
            .filter(|v| !v.is_null())
            .and_then(|v| parse_amount(v).map_err(|m| c.push("total_amount", m)).ok());

        let status = self.status.as_deref().and_then(|raw| {
            let parsed = BudgetStatus::parse(raw);
            if parsed.is_none() {
                c.push("status", "must be one of active, closed, cancelled");
            }
            parsed
        });

        let patch = BudgetPatch {
            total_amount,
            status,
            notes: self.notes.map(optional_notes),
        };
        if c.0.is_empty() && patch.is_empty() {
            return Err(ValidationErrors::single("body", "no editable fields supplied"));
        }
        c.finish(|| patch)
    }
}

fn parse_category(c: &mut Collector, raw: &str) -> Option<ExpenseCategory> {
    let parsed = ExpenseCategory::parse(raw);
    if parsed.is_none() {
        c.push(
            "category",
            "must be one of venue, food, transportation, materials, marketing, speaker, other",
        );
    }
    parsed
}

/// Payload for submitting an expense.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseForm {
    /// Category.
    #[serde(default)]
    pub category: Option<String>,
    /// Amount.
    #[serde(default)]
    pub amount: Option<Value>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Receipt reference.
    #[serde(default)]
    pub receipt: Option<String>,
    /// Expense date.
    #[serde(default)]
    pub date: Option<Value>,
    /// Optional notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Any other field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExpenseForm {
    /// Validates the form.
    ///
    /// # Errors
    ///
    /// Returns every invalid field.
    pub fn validate(self) -> Result<NewExpense, ValidationErrors> {
        let mut c = Collector::default();
        c.reject_extras(&self.extra);

        let category = match self.category.as_deref() {
            Some(raw) => parse_category(&mut c, raw),
            None => {
                c.push("category", "is required");
                None
            }
        };

        let amount = match &self.amount {
            None | Some(Value::Null) => {
                c.push("amount", "is required");
                None
            }
            Some(v) => parse_amount(v).map_err(|m| c.push("amount", m)).ok(),
        };

        let description = required_text(&mut c, "description", self.description.as_ref());
        let receipt = required_text(&mut c, "receipt", self.receipt.as_ref());

        let date = self
            .date
            .as_ref()
            .filter(|v| !v.is_null())
            .and_then(|v| parse_date(v).map_err(|m| c.push("date", m)).ok());

        let notes = optional_notes(self.notes);
        c.finish(|| NewExpense {
            category: category.unwrap_or(ExpenseCategory::Other),
            amount: amount.unwrap_or_default(),
            description: description.unwrap_or_default(),
            receipt: receipt.unwrap_or_default(),
            date,
            notes,
        })
    }
}

/// Payload for editing an expense.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpensePatchForm {
    /// New category.
    #[serde(default)]
    pub category: Option<String>,
    /// New amount.
    #[serde(default)]
    pub amount: Option<Value>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New receipt reference.
    #[serde(default)]
    pub receipt: Option<String>,
    /// New expense date.
    #[serde(default)]
    pub date: Option<Value>,
    /// New notes; explicit `null` clears them.
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub notes: Option<Option<String>>,
    /// Any other field, including `status` and `paid_by`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExpensePatchForm {
    /// Validates the form.
    ///
    /// # Errors
    ///
    /// Returns every invalid field. An empty patch is an error.
    pub fn validate(self) -> Result<ExpensePatch, ValidationErrors> {
        let mut c = Collector::default();
        c.reject_extras(&self.extra);

        let category = self
            .category
            .as_deref()
            .and_then(|raw| parse_category(&mut c, raw));

        let amount = self
            .amount
            .as_ref()
            .filter(|v| !v.is_null())
            .and_then(|v| parse_amount(v).map_err(|m| c.push("amount", m)).ok());

        let description = self
            .description
            .as_ref()
            .and_then(|d| required_text(&mut c, "description", Some(d)));
        let receipt = self
            .receipt
            .as_ref()
            .and_then(|r| required_text(&mut c, "receipt", Some(r)));

        let date = self
            .date
            .as_ref()
            .filter(|v| !v.is_null())
            .and_then(|v| parse_date(v).map_err(|m| c.push("date", m)).ok());

        let patch = ExpensePatch {
            category,
            amount,
            description,
            receipt,
            date,
            notes: self.notes.map(optional_notes),
        };
        if c.0.is_empty() && patch.is_empty() {
            return Err(ValidationErrors::single("body", "no editable fields supplied"));
        }
        c.finish(|| patch)
    }
}

/// Payload for a review decision.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusForm {
    /// Target status.
    #[serde(default)]
    pub status: Option<String>,
    /// Replacement notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl StatusForm {
    /// Validates the form.
    ///
    /// # Errors
    ///
    /// Returns an error if the status is missing or unknown.
    pub fn validate(self) -> Result<(ExpenseStatus, Option<String>), ValidationErrors> {
        let status = match self.status.as_deref() {
            None => return Err(ValidationErrors::single("status", "is required")),
            Some(raw) => ExpenseStatus::parse(raw).ok_or_else(|| {
                ValidationErrors::single("status", "must be one of pending, approved, rejected")
            })?,
        };
        Ok((status, optional_notes(self.notes)))
    }
}

/// Validated list filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BudgetFilter {
    /// Only budgets in this status.
    pub status: Option<BudgetStatus>,
    /// Only the budget for this event.
    pub event_id: Option<EventId>,
    /// Case-insensitive match on the event title.
    pub search: Option<String>,
}

/// Query string for listing budgets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BudgetListForm {
    /// Status filter.
    #[serde(default)]
    pub status: Option<String>,
    /// Event filter.
    #[serde(default, alias = "eventId")]
    pub event_id: Option<String>,
    /// Event title search.
    #[serde(default)]
    pub search: Option<String>,
    /// Page number, 1-based.
    #[serde(default)]
    pub page: Option<u32>,
    /// Page size.
    #[serde(default)]
    pub limit: Option<u32>,
}

impl BudgetListForm {
    /// Validates the query. Blank values are ignored.
    ///
    /// # Errors
    ///
    /// Returns every invalid field.
    pub fn validate(
        self,
        default_limit: u32,
        max_limit: u32,
    ) -> Result<(BudgetFilter, PageRequest), ValidationErrors> {
        let mut c = Collector::default();
        let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let status = non_blank(self.status).and_then(|raw| {
            let parsed = BudgetStatus::parse(&raw);
            if parsed.is_none() {
                c.push("status", "must be one of active, closed, cancelled");
            }
            parsed
        });

        let event_id = non_blank(self.event_id).and_then(|raw| match Uuid::parse_str(&raw) {
            Ok(id) => Some(EventId::from_uuid(id)),
            Err(_) => {
                c.push("event_id", "must be a UUID");
                None
            }
        });

        let filter = BudgetFilter {
            status,
            event_id,
            search: non_blank(self.search),
        };
        let page = PageRequest::from_query(self.page, self.limit, default_limit, max_limit);
        c.finish(|| (filter, page))
    }
}

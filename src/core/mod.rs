//! Core domain types for the recurring installment ledger.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod generator;
pub mod schedule;

pub use generator::{KindReport, RunReport};

/// Errors that can occur when creating a [`Contact`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactError {
    /// The contact code is not exactly four alphanumeric characters.
    InvalidCode,
    /// The due day lies outside 1..=31.
    InvalidDueDay(u32),
    /// The monthly amount is not positive.
    NonPositiveAmount,
}

impl std::fmt::Display for ContactError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContactError::InvalidCode => {
                write!(f, "contact code must be four alphanumeric characters")
            }
            ContactError::InvalidDueDay(day) => write!(f, "due day {day} is outside 1..=31"),
            ContactError::NonPositiveAmount => write!(f, "monthly amount must be positive"),
        }
    }
}

impl std::error::Error for ContactError {}

/// Errors that can occur when building an installment series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallmentError {
    /// The total amount is not positive.
    NonPositiveAmount,
    /// A series must contain at least one installment.
    EmptySeries,
    /// A due date in the series falls outside the representable calendar.
    DateOverflow,
}

impl std::fmt::Display for InstallmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallmentError::NonPositiveAmount => write!(f, "total amount must be positive"),
            InstallmentError::EmptySeries => write!(f, "installment count must be at least 1"),
            InstallmentError::DateOverflow => write!(f, "due date out of calendar range"),
        }
    }
}

impl std::error::Error for InstallmentError {}

/// Which side of the ledger a contact feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    /// Produces accounts-receivable installments.
    Client,
    /// Produces accounts-payable installments.
    Supplier,
}

impl ContactKind {
    /// Table holding installments produced by contacts of this kind.
    pub fn table(&self) -> &'static str {
        match self {
            ContactKind::Client => "receivables",
            ContactKind::Supplier => "payables",
        }
    }

    /// Invoice reference prefix distinguishing the two polarities.
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            ContactKind::Client => "AR",
            ContactKind::Supplier => "AP",
        }
    }

    /// Filter value used in storage queries.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactKind::Client => "client",
            ContactKind::Supplier => "supplier",
        }
    }
}

/// Cadence at which a recurring contact produces installments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
}

/// A client or supplier owned by a tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Unique identifier for this contact.
    pub id: Uuid,
    /// Tenant that owns the contact and every row derived from it.
    pub tenant_id: Uuid,
    pub kind: ContactKind,
    /// Display name.
    pub name: String,
    /// Four-character uppercase code used in invoice references.
    pub code: String,
    /// Whether the scheduler generates installments for this contact.
    pub recurring: bool,
    /// Amount charged per cycle.
    pub monthly_amount: f64,
    /// Day of month the charge falls due, clamped in short months.
    pub due_day: u32,
    pub frequency: Frequency,
    /// Maximum number of installments to generate; 0 means unlimited.
    pub installments_cap: u32,
    pub active: bool,
    /// Next date an installment falls due; `None` until first seeded.
    #[serde(default)]
    pub next_due_date: Option<NaiveDate>,
}

impl Contact {
    /// Creates a recurring contact after validating code, amount and due day.
    pub fn new(
        tenant_id: Uuid,
        kind: ContactKind,
        name: impl Into<String>,
        code: &str,
        monthly_amount: f64,
        due_day: u32,
        frequency: Frequency,
    ) -> Result<Self, ContactError> {
        if code.len() != 4 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ContactError::InvalidCode);
        }
        if !(1..=31).contains(&due_day) {
            return Err(ContactError::InvalidDueDay(due_day));
        }
        if !monthly_amount.is_finite() || monthly_amount <= 0.0 {
            return Err(ContactError::NonPositiveAmount);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            kind,
            name: name.into(),
            code: code.to_ascii_uppercase(),
            recurring: true,
            monthly_amount,
            due_day,
            frequency,
            installments_cap: 0,
            active: true,
            next_due_date: None,
        })
    }

    /// Idempotency key for the cycle containing `due_date`.
    ///
    /// At most one installment may exist per `(contact, reference)` pair;
    /// storage backends enforce this as a uniqueness constraint.
    pub fn invoice_reference(&self, due_date: NaiveDate) -> String {
        format!(
            "{}-{}-{:04}-{:02}",
            self.kind.reference_prefix(),
            self.code,
            due_date.year(),
            due_date.month()
        )
    }
}

/// One payable or receivable ledger entry for a single due cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub contact_id: Uuid,
    /// Derived idempotency key, unique per contact.
    pub invoice_reference: String,
    pub total_amount: f64,
    pub installment_amount: f64,
    pub installment_index: u32,
    pub installment_count: u32,
    pub due_date: NaiveDate,
    pub settled: bool,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Installment {
    /// Single-cycle installment as emitted by the recurring generator.
    pub fn for_cycle(contact: &Contact, due_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: contact.tenant_id,
            contact_id: contact.id,
            invoice_reference: contact.invoice_reference(due_date),
            total_amount: contact.monthly_amount,
            installment_amount: contact.monthly_amount,
            installment_index: 1,
            installment_count: 1,
            due_date,
            settled: false,
            notes: None,
            created_at: Utc::now(),
        }
    }

    /// Splits `total` across `count` monthly installments starting at
    /// `first_due`.
    ///
    /// Per-installment amounts are rounded to cents and the rounding
    /// remainder lands on the first installment, so the series sums exactly
    /// to `total`. References past a single-row series are suffixed with
    /// the index to keep the `(contact, reference)` pair unique.
    pub fn series(
        contact: &Contact,
        total: f64,
        count: u32,
        first_due: NaiveDate,
    ) -> Result<Vec<Self>, InstallmentError> {
        if !total.is_finite() || total <= 0.0 {
            return Err(InstallmentError::NonPositiveAmount);
        }
        if count == 0 {
            return Err(InstallmentError::EmptySeries);
        }

        let total_cents = (total * 100.0).round() as i64;
        let share = total_cents / i64::from(count);
        let remainder = total_cents - share * i64::from(count);
        let base_reference = contact.invoice_reference(first_due);
        let due_day = first_due.day();

        let mut due = first_due;
        let mut out = Vec::with_capacity(count as usize);
        for index in 1..=count {
            let cents = if index == 1 { share + remainder } else { share };
            let invoice_reference = if count > 1 {
                format!("{base_reference}/{index}")
            } else {
                base_reference.clone()
            };
            out.push(Self {
                id: Uuid::new_v4(),
                tenant_id: contact.tenant_id,
                contact_id: contact.id,
                invoice_reference,
                total_amount: total,
                installment_amount: cents as f64 / 100.0,
                installment_index: index,
                installment_count: count,
                due_date: due,
                settled: false,
                notes: None,
                created_at: Utc::now(),
            });
            if index < count {
                due = schedule::advance(due, Frequency::Monthly, due_day)
                    .ok_or(InstallmentError::DateOverflow)?;
            }
        }
        Ok(out)
    }
}

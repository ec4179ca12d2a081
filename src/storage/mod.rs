//! Storage adapters for the hosted accounts ledger.

pub mod memory;
pub mod rest;
pub mod retry;

pub use memory::MemoryStore;
pub use rest::RestTableStore;
pub use retry::RetryingStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::core::{Contact, ContactKind, Installment};

/// Errors surfaced by ledger storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The referenced contact does not exist.
    ContactNotFound,
    /// An installment with the same contact and invoice reference already
    /// exists.
    Conflict,
    /// A failure that may succeed when retried.
    Transient(String),
    /// A failure that will not resolve on retry.
    Permanent(String),
}

impl StoreError {
    /// Whether retrying the operation can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::ContactNotFound => write!(f, "contact not found"),
            StoreError::Conflict => write!(f, "installment already exists"),
            StoreError::Transient(msg) => write!(f, "transient storage failure: {msg}"),
            StoreError::Permanent(msg) => write!(f, "storage failure: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Abstraction over the hosted table store backing the ledger.
///
/// The generator receives an implementation by reference, so tests can
/// substitute [`MemoryStore`] for the hosted backend.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Lists contacts of the given kind that are active and recurring.
    async fn list_recurring_contacts(
        &self,
        kind: ContactKind,
    ) -> Result<Vec<Contact>, StoreError>;

    /// Inserts an installment into the table for `kind`.
    ///
    /// Fails with [`StoreError::Conflict`] when an installment with the
    /// same `(contact_id, invoice_reference)` pair already exists; callers
    /// treat that as "already generated".
    async fn insert_installment(
        &self,
        kind: ContactKind,
        installment: &Installment,
    ) -> Result<(), StoreError>;

    /// Number of installments already recorded for the contact.
    async fn count_installments(
        &self,
        kind: ContactKind,
        contact_id: Uuid,
    ) -> Result<u64, StoreError>;

    /// Persists an advanced next-due-date on the contact.
    async fn update_next_due_date(
        &self,
        contact_id: Uuid,
        next_due_date: NaiveDate,
    ) -> Result<(), StoreError>;
}

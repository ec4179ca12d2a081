//! In-memory store used by tests and local runs.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use super::{LedgerStore, StoreError};
use crate::core::{Contact, ContactKind, Installment};

/// Store backed by plain vectors, enforcing the same uniqueness constraint
/// as the hosted backend.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    contacts: Vec<Contact>,
    receivables: Vec<Installment>,
    payables: Vec<Installment>,
}

impl Inner {
    fn rows(&self, kind: ContactKind) -> &Vec<Installment> {
        match kind {
            ContactKind::Client => &self.receivables,
            ContactKind::Supplier => &self.payables,
        }
    }

    fn rows_mut(&mut self, kind: ContactKind) -> &mut Vec<Installment> {
        match kind {
            ContactKind::Client => &mut self.receivables,
            ContactKind::Supplier => &mut self.payables,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a contact, replacing any existing contact with the same id.
    pub fn upsert_contact(&self, contact: Contact) {
        let mut inner = self.lock();
        match inner.contacts.iter_mut().find(|c| c.id == contact.id) {
            Some(existing) => *existing = contact,
            None => inner.contacts.push(contact),
        }
    }

    /// Snapshot of a contact, for assertions.
    pub fn contact(&self, id: Uuid) -> Option<Contact> {
        self.lock().contacts.iter().find(|c| c.id == id).cloned()
    }

    /// Snapshot of one side's installments, for assertions.
    pub fn installments(&self, kind: ContactKind) -> Vec<Installment> {
        self.lock().rows(kind).clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only happens after a panic in another test thread.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn list_recurring_contacts(
        &self,
        kind: ContactKind,
    ) -> Result<Vec<Contact>, StoreError> {
        Ok(self
            .lock()
            .contacts
            .iter()
            .filter(|c| c.kind == kind && c.active && c.recurring)
            .cloned()
            .collect())
    }

    async fn insert_installment(
        &self,
        kind: ContactKind,
        installment: &Installment,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let rows = inner.rows_mut(kind);
        let duplicate = rows.iter().any(|row| {
            row.contact_id == installment.contact_id
                && row.invoice_reference == installment.invoice_reference
        });
        if duplicate {
            return Err(StoreError::Conflict);
        }
        rows.push(installment.clone());
        Ok(())
    }

    async fn count_installments(
        &self,
        kind: ContactKind,
        contact_id: Uuid,
    ) -> Result<u64, StoreError> {
        Ok(self
            .lock()
            .rows(kind)
            .iter()
            .filter(|row| row.contact_id == contact_id)
            .count() as u64)
    }

    async fn update_next_due_date(
        &self,
        contact_id: Uuid,
        next_due_date: NaiveDate,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let contact = inner
            .contacts
            .iter_mut()
            .find(|c| c.id == contact_id)
            .ok_or(StoreError::ContactNotFound)?;
        contact.next_due_date = Some(next_due_date);
        Ok(())
    }
}

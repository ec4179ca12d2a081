//! Recurring installment generation.
//!
//! One run walks every active recurring contact of both kinds, emits the
//! installment for any cycle that has come due, and advances the contact's
//! next due date. Duplicate-generation safety comes entirely from the
//! storage layer's uniqueness constraint: an insert that conflicts means
//! another run (or an overlapping invocation) already covered the cycle.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use super::{Contact, ContactKind, Installment, schedule};
use crate::storage::{LedgerStore, StoreError};

/// Outcome counters for one contact kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindReport {
    /// Contacts returned by the listing query.
    pub contacts: usize,
    /// Installments inserted by this run.
    pub generated: u32,
    /// Cycles another run had already covered.
    pub already_generated: u32,
    /// Contacts whose next due date lies in the future.
    pub not_due: u32,
    /// Contacts that reached their installment cap.
    pub capped: u32,
    /// Contacts skipped after a storage failure.
    pub failed: u32,
}

/// Aggregated outcome of one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub receivables: KindReport,
    pub payables: KindReport,
}

impl RunReport {
    /// Total installments inserted across both kinds.
    pub fn generated(&self) -> u32 {
        self.receivables.generated + self.payables.generated
    }
}

/// Generates due installments for every active recurring contact.
///
/// Client contacts feed the receivables table, supplier contacts the
/// payables table; the two passes are independent. A failure listing either
/// kind aborts the run, while a failure on an individual contact is logged
/// and the pass continues with the next contact.
pub async fn run(store: &dyn LedgerStore, today: NaiveDate) -> Result<RunReport, StoreError> {
    Ok(RunReport {
        receivables: run_kind(store, ContactKind::Client, today).await?,
        payables: run_kind(store, ContactKind::Supplier, today).await?,
    })
}

async fn run_kind(
    store: &dyn LedgerStore,
    kind: ContactKind,
    today: NaiveDate,
) -> Result<KindReport, StoreError> {
    let contacts = store.list_recurring_contacts(kind).await?;
    let mut report = KindReport {
        contacts: contacts.len(),
        ..KindReport::default()
    };

    for contact in &contacts {
        match generate_for(store, contact, today).await {
            Ok(Outcome::Generated) => report.generated += 1,
            Ok(Outcome::AlreadyGenerated) => report.already_generated += 1,
            Ok(Outcome::NotDue) => report.not_due += 1,
            Ok(Outcome::Capped) => report.capped += 1,
            Err(e) => {
                warn!(
                    contact = %contact.id,
                    name = %contact.name,
                    %e,
                    "Skipping contact after storage failure"
                );
                report.failed += 1;
            }
        }
    }

    info!(
        kind = kind.as_str(),
        contacts = report.contacts,
        generated = report.generated,
        failed = report.failed,
        "Finished generation pass"
    );
    Ok(report)
}

enum Outcome {
    Generated,
    AlreadyGenerated,
    NotDue,
    Capped,
}

async fn generate_for(
    store: &dyn LedgerStore,
    contact: &Contact,
    today: NaiveDate,
) -> Result<Outcome, StoreError> {
    let due = match contact.next_due_date {
        Some(date) => date,
        None => {
            // First run for this contact: seed and persist the schedule
            // even when the seeded date is still ahead.
            let seeded =
                schedule::seed(today, contact.due_day).ok_or_else(calendar_overflow)?;
            store.update_next_due_date(contact.id, seeded).await?;
            seeded
        }
    };
    if due > today {
        return Ok(Outcome::NotDue);
    }

    if contact.installments_cap > 0 {
        let existing = store.count_installments(contact.kind, contact.id).await?;
        if existing >= u64::from(contact.installments_cap) {
            return Ok(Outcome::Capped);
        }
    }

    let installment = Installment::for_cycle(contact, due);
    let outcome = match store.insert_installment(contact.kind, &installment).await {
        Ok(()) => Outcome::Generated,
        // Another run already covered this cycle. Advancing below still
        // heals a stale next due date left by a failed update.
        Err(StoreError::Conflict) => Outcome::AlreadyGenerated,
        Err(e) => return Err(e),
    };

    // The next date derives from the scheduled due date, not from today, so
    // a run delayed past several cycles catches up one cycle per run.
    let next = schedule::advance(due, contact.frequency, contact.due_day)
        .ok_or_else(calendar_overflow)?;
    if let Err(e) = store.update_next_due_date(contact.id, next).await {
        warn!(
            contact = %contact.id,
            %e,
            "Failed to advance next due date; the next run retries this cycle"
        );
    }
    Ok(outcome)
}

fn calendar_overflow() -> StoreError {
    StoreError::Permanent("due date out of calendar range".into())
}

//! Retry wrapper for ledger stores.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use super::{LedgerStore, StoreError};
use crate::core::{Contact, ContactKind, Installment};

/// Wrapper that adds retry logic with exponential backoff to a store.
///
/// Transient errors are retried until `max_retries` is reached. The delay
/// starts at `base_delay` and doubles after each failed attempt. Conflicts
/// and permanent errors are returned immediately.
pub struct RetryingStore<S> {
    inner: S,
    max_retries: u32,
    base_delay: Duration,
}

impl<S> RetryingStore<S> {
    /// Create a new `RetryingStore` wrapping `inner`.
    pub fn new(inner: S, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
        }
    }

    async fn with_retry<'a, T, F>(&'a self, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(val) => return Ok(val),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let factor = 2f64.powi(attempt as i32);
                    let delay = self.base_delay.mul_f64(factor);
                    debug!(attempt, ?delay, %e, "Retrying storage operation");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl<S: LedgerStore> LedgerStore for RetryingStore<S> {
    async fn list_recurring_contacts(
        &self,
        kind: ContactKind,
    ) -> Result<Vec<Contact>, StoreError> {
        self.with_retry(|| Box::pin(self.inner.list_recurring_contacts(kind)))
            .await
    }

    async fn insert_installment(
        &self,
        kind: ContactKind,
        installment: &Installment,
    ) -> Result<(), StoreError> {
        self.with_retry(|| Box::pin(self.inner.insert_installment(kind, installment)))
            .await
    }

    async fn count_installments(
        &self,
        kind: ContactKind,
        contact_id: Uuid,
    ) -> Result<u64, StoreError> {
        self.with_retry(|| Box::pin(self.inner.count_installments(kind, contact_id)))
            .await
    }

    async fn update_next_due_date(
        &self,
        contact_id: Uuid,
        next_due_date: NaiveDate,
    ) -> Result<(), StoreError> {
        self.with_retry(|| Box::pin(self.inner.update_next_due_date(contact_id, next_due_date)))
            .await
    }
}

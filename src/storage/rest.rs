//! Adapter for a hosted table store speaking PostgREST-style HTTP.
//!
//! Rows are plain JSON objects; filters travel as query parameters
//! (`column=eq.value`). The backend enforces the installment uniqueness
//! constraint and reports violations as HTTP 409, which this adapter maps
//! to [`StoreError::Conflict`].

use async_trait::async_trait;
use chrono::NaiveDate;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header;
use hyper::{Method, Request, StatusCode};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use super::{LedgerStore, StoreError};
use crate::core::{Contact, ContactKind, Installment};

/// Table holding contact rows.
const CONTACTS_TABLE: &str = "contacts";

/// Adapter backed by the hosted table store's REST API.
pub struct RestTableStore {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    base_url: String,
    api_key: String,
    tenant_id: Option<Uuid>,
}

impl RestTableStore {
    /// Creates an adapter rooted at `base_url`, authenticating with the
    /// given service key.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let https = HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| StoreError::Permanent(e.to_string()))?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build::<_, Full<Bytes>>(https);
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            tenant_id: None,
        })
    }

    /// Restricts every query to a single tenant's rows.
    pub fn with_tenant(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    fn tenant_filter(&self) -> String {
        match self.tenant_id {
            Some(tenant) => format!("&tenant_id=eq.{tenant}"),
            None => String::new(),
        }
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        body: Option<serde_json::Value>,
        prefer: Option<&str>,
    ) -> Result<(StatusCode, Bytes), StoreError> {
        let mut builder = Request::builder()
            .method(method)
            .uri(&url)
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key));
        if let Some(prefer) = prefer {
            builder = builder.header("Prefer", prefer);
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Full::from(Bytes::from(body.to_string()))),
            None => builder.body(Full::new(Bytes::new())),
        }
        .map_err(|e| StoreError::Permanent(e.to_string()))?;

        let res = self
            .client
            .request(req)
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;
        let status = res.status();
        let bytes = res
            .into_body()
            .collect()
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?
            .to_bytes();
        Ok((status, bytes))
    }
}

/// Maps a non-success response to the matching error kind.
fn error_for_status(status: StatusCode, body: &[u8]) -> StoreError {
    let detail = String::from_utf8_lossy(body);
    if status == StatusCode::CONFLICT {
        StoreError::Conflict
    } else if status.is_server_error() {
        StoreError::Transient(format!("{status}: {detail}"))
    } else {
        StoreError::Permanent(format!("{status}: {detail}"))
    }
}

#[async_trait]
impl LedgerStore for RestTableStore {
    async fn list_recurring_contacts(
        &self,
        kind: ContactKind,
    ) -> Result<Vec<Contact>, StoreError> {
        let url = format!(
            "{}/{}?kind=eq.{}&recurring=is.true&active=is.true{}",
            self.base_url,
            CONTACTS_TABLE,
            kind.as_str(),
            self.tenant_filter()
        );
        let (status, bytes) = self.send(Method::GET, url, None, None).await?;
        if !status.is_success() {
            return Err(error_for_status(status, &bytes));
        }
        let contacts: Vec<Contact> =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Permanent(e.to_string()))?;
        debug!(kind = kind.as_str(), count = contacts.len(), "Listed recurring contacts");
        Ok(contacts)
    }

    async fn insert_installment(
        &self,
        kind: ContactKind,
        installment: &Installment,
    ) -> Result<(), StoreError> {
        let url = format!("{}/{}", self.base_url, kind.table());
        let body =
            serde_json::to_value(installment).map_err(|e| StoreError::Permanent(e.to_string()))?;
        let (status, bytes) = self
            .send(Method::POST, url, Some(body), Some("return=representation"))
            .await?;
        if !status.is_success() {
            return Err(error_for_status(status, &bytes));
        }
        info!(
            table = kind.table(),
            reference = %installment.invoice_reference,
            "Inserted installment"
        );
        Ok(())
    }

    async fn count_installments(
        &self,
        kind: ContactKind,
        contact_id: Uuid,
    ) -> Result<u64, StoreError> {
        let url = format!(
            "{}/{}?contact_id=eq.{}&select=id{}",
            self.base_url,
            kind.table(),
            contact_id,
            self.tenant_filter()
        );
        let (status, bytes) = self.send(Method::GET, url, None, None).await?;
        if !status.is_success() {
            return Err(error_for_status(status, &bytes));
        }
        let rows: Vec<serde_json::Value> =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Permanent(e.to_string()))?;
        Ok(rows.len() as u64)
    }

    async fn update_next_due_date(
        &self,
        contact_id: Uuid,
        next_due_date: NaiveDate,
    ) -> Result<(), StoreError> {
        let url = format!(
            "{}/{}?id=eq.{}{}",
            self.base_url,
            CONTACTS_TABLE,
            contact_id,
            self.tenant_filter()
        );
        let body = json!({ "next_due_date": next_due_date });
        let (status, bytes) = self
            .send(
                Method::PATCH,
                url,
                Some(body),
                Some("return=representation"),
            )
            .await?;
        if !status.is_success() {
            return Err(error_for_status(status, &bytes));
        }
        // With return=representation the store echoes the updated rows; an
        // empty array means the filter matched nothing.
        let rows: Vec<serde_json::Value> =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Permanent(e.to_string()))?;
        if rows.is_empty() {
            return Err(StoreError::ContactNotFound);
        }
        debug!(contact = %contact_id, %next_due_date, "Advanced next due date");
        Ok(())
    }
}

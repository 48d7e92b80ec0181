//! Invoice model and repository.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clearbill_core::{CustomerId, InvoiceId};

/// A single invoice line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub product_code: String,
    /// Value in smallest currency unit (e.g., cents).
    pub value: i64,
}

/// An invoice as stored and returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub description: String,
    pub customer_ref: CustomerId,
    pub currency_code: String,
    pub exchange_rate: f64,
    pub transaction_date: DateTime<Utc>,
    pub items: Vec<InvoiceItem>,
    /// Email of the identity that last modified the invoice.
    pub created_by: String,
}

impl Invoice {
    pub fn total(&self) -> i64 {
        self.items.iter().map(|item| item.value).sum()
    }
}

/// Keyed invoice storage.
pub trait InvoiceRepository: Send + Sync {
    fn get(&self, id: InvoiceId) -> Option<Invoice>;
    fn upsert(&self, invoice: Invoice);
    fn delete(&self, id: InvoiceId) -> bool;
    fn list(&self) -> Vec<Invoice>;
}

/// In-memory repository for dev/test deployments.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceRepository {
    inner: RwLock<HashMap<InvoiceId, Invoice>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InvoiceRepository for InMemoryInvoiceRepository {
    fn get(&self, id: InvoiceId) -> Option<Invoice> {
        let map = self.inner.read().ok()?;
        map.get(&id).cloned()
    }

    fn upsert(&self, invoice: Invoice) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(invoice.id, invoice);
        }
    }

    fn delete(&self, id: InvoiceId) -> bool {
        match self.inner.write() {
            Ok(mut map) => map.remove(&id).is_some(),
            Err(_) => false,
        }
    }

    fn list(&self) -> Vec<Invoice> {
        match self.inner.read() {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }
}

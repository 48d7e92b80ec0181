//! Request/response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clearbill_auth::RequestPrincipal;
use clearbill_core::{CustomerId, InvoiceId};
use clearbill_invoicing::InvoiceItem;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceRequest {
    /// Absent for new invoices.
    pub id: Option<InvoiceId>,
    pub description: String,
    pub customer_ref: CustomerId,
    pub currency_code: String,
    /// Zero or absent means "resolve from the currency directory".
    #[serde(default)]
    pub exchange_rate: f64,
    pub transaction_date: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<InvoiceItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceItemRequest {
    pub product_code: String,
    pub value: i64,
}

impl From<InvoiceItemRequest> for InvoiceItem {
    fn from(item: InvoiceItemRequest) -> Self {
        InvoiceItem {
            product_code: item.product_code,
            value: item.value,
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ClaimEntry {
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub authenticated: bool,
    pub email: String,
    pub scheme: String,
    pub claims: Vec<ClaimEntry>,
}

impl MeResponse {
    pub fn from_principal(principal: &RequestPrincipal) -> Self {
        Self {
            authenticated: principal.is_authenticated(),
            email: principal.email().to_string(),
            scheme: principal.scheme().to_string(),
            claims: principal
                .claims()
                .iter()
                .map(|claim| ClaimEntry {
                    kind: claim.kind.as_str().to_string(),
                    value: claim.value.clone(),
                })
                .collect(),
        }
    }
}

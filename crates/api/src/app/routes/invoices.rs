//! Invoice CRUD handlers.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
};

use clearbill_auth::UserContext;
use clearbill_core::InvoiceId;
use clearbill_invoicing::InvoiceDraft;

use crate::app::{AppServices, dto, errors};

pub async fn list(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    Json(services.invoices.list_invoices()).into_response()
}

pub async fn get_by_id(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match InvoiceId::from_str(&id) {
        Ok(id) => id,
        Err(err) => return errors::domain_error_to_response(err),
    };

    match services.invoices.get_invoice(id) {
        Ok(invoice) => Json(invoice).into_response(),
        Err(err) => errors::domain_error_to_response(err),
    }
}

pub async fn modify(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<UserContext>,
    Json(body): Json<dto::InvoiceRequest>,
) -> axum::response::Response {
    let draft = InvoiceDraft {
        id: body.id,
        description: body.description,
        customer_ref: body.customer_ref,
        currency_code: body.currency_code,
        exchange_rate: body.exchange_rate,
        transaction_date: body.transaction_date,
        items: body.items.into_iter().map(Into::into).collect(),
    };

    match services.invoices.modify_invoice(draft, &identity) {
        Ok(invoice) => Json(invoice).into_response(),
        Err(err) => errors::domain_error_to_response(err),
    }
}

pub async fn remove(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match InvoiceId::from_str(&id) {
        Ok(id) => id,
        Err(err) => return errors::domain_error_to_response(err),
    };

    match services.invoices.delete_invoice(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => errors::domain_error_to_response(err),
    }
}

/// `GET /api/dev` — exercises a policy that combines a role requirement with
/// a permission requirement.
pub async fn dev() -> axum::response::Response {
    (StatusCode::OK, "Development endpoint is working.").into_response()
}

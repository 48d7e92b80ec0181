//! Customer and currency lookups.

use std::sync::Arc;

use axum::{Extension, Json, response::IntoResponse};

use crate::app::AppServices;

pub async fn customers(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    Json(services.invoices.available_customers()).into_response()
}

pub async fn currencies(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    Json(services.invoices.available_currencies()).into_response()
}

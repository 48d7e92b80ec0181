//! `clearbill-invoicing` — thin invoice collaborator behind the auth boundary.
//!
//! Deterministic domain logic plus an in-memory repository; no HTTP and no
//! real persistence. Consumes the verified request identity only through
//! `clearbill_auth::UserContext`.

pub mod directory;
pub mod invoice;
pub mod service;

pub use directory::{CurrencyDirectory, CustomerDirectory, CustomerInfo};
pub use invoice::{InMemoryInvoiceRepository, Invoice, InvoiceItem, InvoiceRepository};
pub use service::{InvoiceDraft, InvoiceService, InvoiceServiceConfig};

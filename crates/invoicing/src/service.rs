//! Invoice application service.
//!
//! Validates drafts against the customer/currency directories and stamps each
//! change with the acting identity. Deeper business validation is deliberately
//! out of scope here.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use clearbill_auth::UserContext;
use clearbill_core::{CustomerId, DomainError, DomainResult, InvoiceId};

use crate::directory::{CurrencyDirectory, CustomerDirectory, CustomerInfo};
use crate::invoice::{Invoice, InvoiceItem, InvoiceRepository};

/// Base currency; always allowed, always rate 1.0.
const BASE_CURRENCY: &str = "EUR";

/// Configuration for the invoice service.
#[derive(Debug, Clone)]
pub struct InvoiceServiceConfig {
    pub allowed_currencies: Vec<String>,
}

impl Default for InvoiceServiceConfig {
    fn default() -> Self {
        Self {
            allowed_currencies: vec![
                BASE_CURRENCY.to_string(),
                "USD".to_string(),
                "GBP".to_string(),
            ],
        }
    }
}

/// Incoming invoice data before validation.
#[derive(Debug, Clone)]
pub struct InvoiceDraft {
    /// Absent for new invoices.
    pub id: Option<InvoiceId>,
    pub description: String,
    pub customer_ref: CustomerId,
    pub currency_code: String,
    /// Zero means "resolve from the currency directory".
    pub exchange_rate: f64,
    pub transaction_date: DateTime<Utc>,
    pub items: Vec<InvoiceItem>,
}

pub struct InvoiceService {
    repository: Arc<dyn InvoiceRepository>,
    customers: CustomerDirectory,
    currencies: CurrencyDirectory,
    config: InvoiceServiceConfig,
}

impl InvoiceService {
    pub fn new(
        repository: Arc<dyn InvoiceRepository>,
        customers: CustomerDirectory,
        currencies: CurrencyDirectory,
        config: InvoiceServiceConfig,
    ) -> Self {
        Self {
            repository,
            customers,
            currencies,
            config,
        }
    }

    /// Currencies that are both quoted by the directory and allowed by
    /// configuration. The base currency is always available.
    pub fn available_currencies(&self) -> Vec<String> {
        let mut currencies: Vec<String> = self
            .currencies
            .euro_exchange_rates()
            .keys()
            .filter(|code| self.config.allowed_currencies.iter().any(|a| a == *code))
            .cloned()
            .collect();

        if self.config.allowed_currencies.iter().any(|a| a == BASE_CURRENCY) {
            currencies.insert(0, BASE_CURRENCY.to_string());
        }

        currencies
    }

    pub fn available_customers(&self) -> &[CustomerInfo] {
        self.customers.active_customers()
    }

    /// Create or update an invoice from a validated draft.
    pub fn modify_invoice(&self, draft: InvoiceDraft, identity: &UserContext) -> DomainResult<Invoice> {
        if !self.customers.contains(draft.customer_ref) {
            return Err(DomainError::validation("invalid customer id"));
        }

        if !self
            .available_currencies()
            .iter()
            .any(|code| code == &draft.currency_code)
        {
            return Err(DomainError::validation("invalid currency"));
        }

        let exchange_rate = if draft.exchange_rate == 0.0 {
            if draft.currency_code == BASE_CURRENCY {
                1.0
            } else {
                self.currencies
                    .rate_for(&draft.currency_code)
                    .ok_or_else(|| DomainError::validation("invalid currency"))?
            }
        } else {
            draft.exchange_rate
        };

        let invoice = Invoice {
            id: draft.id.unwrap_or_default(),
            description: draft.description,
            customer_ref: draft.customer_ref,
            currency_code: draft.currency_code,
            exchange_rate,
            transaction_date: draft.transaction_date,
            items: draft.items,
            created_by: identity.identity_email().to_string(),
        };

        tracing::info!(invoice_id = %invoice.id, by = %invoice.created_by, "invoice stored");
        self.repository.upsert(invoice.clone());
        Ok(invoice)
    }

    pub fn get_invoice(&self, id: InvoiceId) -> DomainResult<Invoice> {
        self.repository.get(id).ok_or(DomainError::NotFound)
    }

    pub fn list_invoices(&self) -> Vec<Invoice> {
        self.repository.list()
    }

    pub fn delete_invoice(&self, id: InvoiceId) -> DomainResult<()> {
        if self.repository.delete(id) {
            Ok(())
        } else {
            Err(DomainError::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::InMemoryInvoiceRepository;
    use clearbill_auth::{ClaimKind, ClaimSet};

    fn service() -> InvoiceService {
        InvoiceService::new(
            Arc::new(InMemoryInvoiceRepository::new()),
            CustomerDirectory::with_demo_customers(),
            CurrencyDirectory::with_demo_rates(),
            InvoiceServiceConfig::default(),
        )
    }

    fn identity() -> UserContext {
        UserContext::from_claims(
            &ClaimSet::new().with(ClaimKind::UserEmail, "alice.smith@example.com"),
        )
    }

    fn draft(service: &InvoiceService) -> InvoiceDraft {
        InvoiceDraft {
            id: None,
            description: "consulting".to_string(),
            customer_ref: service.available_customers()[0].id,
            currency_code: "USD".to_string(),
            exchange_rate: 0.0,
            transaction_date: Utc::now(),
            items: vec![InvoiceItem {
                product_code: "CONS-1".to_string(),
                value: 10_000,
            }],
        }
    }

    #[test]
    fn available_currencies_are_filtered_by_configuration() {
        let currencies = service().available_currencies();
        // JPY is quoted but not allowed.
        assert_eq!(currencies, vec!["EUR", "GBP", "USD"]);
    }

    #[test]
    fn modify_stores_and_stamps_identity() {
        let service = service();
        let invoice = service.modify_invoice(draft(&service), &identity()).unwrap();

        assert_eq!(invoice.created_by, "alice.smith@example.com");
        assert_eq!(invoice.exchange_rate, 1.08, "rate resolved from directory");
        assert_eq!(service.get_invoice(invoice.id).unwrap(), invoice);
    }

    #[test]
    fn unknown_customer_is_rejected() {
        let service = service();
        let mut bad = draft(&service);
        bad.customer_ref = CustomerId::new();

        let err = service.modify_invoice(bad, &identity()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn disallowed_currency_is_rejected() {
        let service = service();
        let mut bad = draft(&service);
        bad.currency_code = "JPY".to_string();

        let err = service.modify_invoice(bad, &identity()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn explicit_exchange_rate_is_kept() {
        let service = service();
        let mut with_rate = draft(&service);
        with_rate.exchange_rate = 1.2345;

        let invoice = service.modify_invoice(with_rate, &identity()).unwrap();
        assert_eq!(invoice.exchange_rate, 1.2345);
    }

    #[test]
    fn base_currency_defaults_to_unit_rate() {
        let service = service();
        let mut eur = draft(&service);
        eur.currency_code = "EUR".to_string();

        let invoice = service.modify_invoice(eur, &identity()).unwrap();
        assert_eq!(invoice.exchange_rate, 1.0);
    }

    #[test]
    fn delete_missing_invoice_is_not_found() {
        let err = service().delete_invoice(InvoiceId::new()).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }
}

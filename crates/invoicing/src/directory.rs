//! Static customer and currency lookups.
//!
//! Stand-ins for the external directory services an invoices API would call;
//! both are seeded at startup and read-only afterwards.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::uuid;

use clearbill_core::CustomerId;

/// Directory entry for an active customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerInfo {
    pub id: CustomerId,
    pub name: String,
    pub is_key_account: bool,
}

/// Active-customer directory.
#[derive(Debug, Clone)]
pub struct CustomerDirectory {
    customers: Vec<CustomerInfo>,
}

impl CustomerDirectory {
    pub fn new(customers: Vec<CustomerInfo>) -> Self {
        Self { customers }
    }

    /// The demo customer list.
    pub fn with_demo_customers() -> Self {
        let customer = |id: uuid::Uuid, name: &str, is_key_account: bool| CustomerInfo {
            id: CustomerId::from_uuid(id),
            name: name.to_string(),
            is_key_account,
        };

        Self::new(vec![
            customer(
                uuid!("a1b2c3d4-e5f6-4789-9012-abcdefabcdef"),
                "Acme Corporation",
                true,
            ),
            customer(
                uuid!("b2c3d4e5-f678-4901-2345-bcdefabcdefa"),
                "Globex Inc.",
                false,
            ),
            customer(
                uuid!("c3d4e5f6-7890-1234-5678-cdefabcdefab"),
                "Soylent Corp.",
                true,
            ),
            customer(uuid!("d4e5f678-9012-3456-7890-defabcdefabc"), "Initech", true),
        ])
    }

    pub fn active_customers(&self) -> &[CustomerInfo] {
        &self.customers
    }

    pub fn contains(&self, id: CustomerId) -> bool {
        self.customers.iter().any(|c| c.id == id)
    }
}

/// EUR exchange-rate directory.
#[derive(Debug, Clone)]
pub struct CurrencyDirectory {
    rates: BTreeMap<String, f64>,
}

impl CurrencyDirectory {
    pub fn new(rates: BTreeMap<String, f64>) -> Self {
        Self { rates }
    }

    /// Representative demo rates.
    pub fn with_demo_rates() -> Self {
        let mut rates = BTreeMap::new();
        rates.insert("USD".to_string(), 1.08);
        rates.insert("GBP".to_string(), 0.85);
        rates.insert("JPY".to_string(), 130.0);
        Self::new(rates)
    }

    /// Exchange rates against EUR, keyed by currency code.
    pub fn euro_exchange_rates(&self) -> &BTreeMap<String, f64> {
        &self.rates
    }

    pub fn rate_for(&self, currency_code: &str) -> Option<f64> {
        self.rates.get(currency_code).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_customers_are_resolvable() {
        let directory = CustomerDirectory::with_demo_customers();
        assert_eq!(directory.active_customers().len(), 4);

        let acme = directory.active_customers()[0].clone();
        assert!(directory.contains(acme.id));
        assert!(!directory.contains(CustomerId::new()));
    }

    #[test]
    fn demo_rates_cover_expected_currencies() {
        let directory = CurrencyDirectory::with_demo_rates();
        assert!(directory.rate_for("USD").is_some());
        assert!(directory.rate_for("CHF").is_none());
    }
}

//! Flat local-delivery fees by postal code.
//!
//! Exact codes take precedence over prefixes; among prefixes the longest match wins.
//! Codes that match nothing carry no fee.

use std::collections::HashMap;

use model::Money;

/// Miami-Dade and Broward delivery zones served by the store's own drivers.
const EXACT_FEES: &[(&str, i64)] = &[
    ("33109", 4500), // Fisher Island
    ("33139", 2500), // South Beach
    ("33140", 2500),
    ("33141", 2500),
    ("33149", 3500), // Key Biscayne
];

const PREFIX_FEES: &[(&str, i64)] = &[
    ("331", 2000), // Miami
    ("330", 3000), // North Miami-Dade, Homestead
    ("333", 3000), // Fort Lauderdale
];

/// Lookup table from postal code to local-delivery fee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFeeTable {
    exact: HashMap<String, Money>,
    prefixes: Vec<(String, Money)>,
}

impl DeliveryFeeTable {
    /// Builds a table from explicit entries.
    pub fn new<E, P>(exact: E, prefixes: P) -> Self
    where
        E: IntoIterator<Item = (String, Money)>,
        P: IntoIterator<Item = (String, Money)>,
    {
        let mut prefixes: Vec<(String, Money)> = prefixes.into_iter().collect();
        // Longest prefix first so the first hit is the most specific one.
        prefixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self {
            exact: exact.into_iter().collect(),
            prefixes,
        }
    }

    /// The store's standard delivery zones.
    pub fn standard() -> Self {
        Self::new(
            EXACT_FEES
                .iter()
                .map(|(zip, cents)| (zip.to_string(), Money::from_cents(*cents))),
            PREFIX_FEES
                .iter()
                .map(|(prefix, cents)| (prefix.to_string(), Money::from_cents(*cents))),
        )
    }

    /// Resolves the fee for a postal code. ZIP+4 codes are matched on their first five digits.
    pub fn resolve(&self, postal_code: &str) -> Option<Money> {
        let code = normalize(postal_code);
        if code.is_empty() {
            return None;
        }
        if let Some(fee) = self.exact.get(code) {
            return Some(*fee);
        }
        self.prefixes
            .iter()
            .find(|(prefix, _)| code.starts_with(prefix.as_str()))
            .map(|(_, fee)| *fee)
    }
}

impl Default for DeliveryFeeTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn normalize(postal_code: &str) -> &str {
    let trimmed = postal_code.trim();
    trimmed.split('-').next().unwrap_or(trimmed)
}

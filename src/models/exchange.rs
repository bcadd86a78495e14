use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_EXCHANGE_CODE, DEFAULT_EXCHANGE_SUFFIX, DEFAULT_HOME_CURRENCY};

/// Home exchange of the tickers in the sheet
///
/// Carries the provider suffix used by the symbol mapper and the currency
/// the provider quotes prices in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    /// Short exchange code ("BIST")
    pub code: String,
    /// Provider symbol suffix (".IS")
    pub suffix: String,
    /// Quote currency of live prices ("TRY")
    pub currency: String,
}

impl Default for Exchange {
    fn default() -> Self {
        Self {
            code: DEFAULT_EXCHANGE_CODE.to_string(),
            suffix: DEFAULT_EXCHANGE_SUFFIX.to_string(),
            currency: DEFAULT_HOME_CURRENCY.to_string(),
        }
    }
}

impl Exchange {
    pub fn new(code: impl Into<String>, suffix: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            suffix: suffix.into(),
            currency: currency.into().to_uppercase(),
        }
    }

    /// Whether a target denominated in `currency` can be compared with live prices as-is
    pub fn quotes_in(&self, currency: &str) -> bool {
        self.currency.eq_ignore_ascii_case(currency.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_default_is_bist() {
        let exchange = Exchange::default();
        assert_eq!(exchange.code, "BIST");
        assert_eq!(exchange.suffix, ".IS");
        assert_eq!(exchange.currency, "TRY");
    }

    #[test]
    fn test_quotes_in_ignores_case() {
        let exchange = Exchange::default();
        assert!(exchange.quotes_in("try"));
        assert!(exchange.quotes_in(" TRY "));
        assert!(!exchange.quotes_in("EUR"));
    }
}

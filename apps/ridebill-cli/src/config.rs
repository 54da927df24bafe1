//! # Configuration
//!
//! Application configuration loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Command-line flags (`--tax-rate`, `--db`, ...)
//! 2. Environment variables (`RIDEBILL_*`)
//! 3. Defaults (this file)
//!
//! Configuration is read-only after startup.

use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use ridebill_core::validation::validate_tax_rate;
use ridebill_core::{
    Money, Percent, TaxApplication, DEFAULT_PAYMENT_TERMS_DAYS, MAX_PAYMENT_TERMS_DAYS,
};

/// Application configuration.
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    /// Database file; platform data directory when unset.
    pub db_path: Option<PathBuf>,

    /// Tax rate applied to new bills unless overridden per command.
    pub default_tax_rate: Percent,

    /// Tax mode applied to new bills unless overridden per command.
    pub default_tax_application: TaxApplication,

    /// Days between invoice date and due date.
    pub payment_terms_days: i64,

    /// Currency symbol appended to exported amounts; empty for bare numbers.
    pub currency_symbol: String,
}

impl Default for AppConfig {
    /// ## Default Values
    /// - Tax: 21% excluded
    /// - Payment terms: 30 days
    /// - Currency: €
    fn default() -> Self {
        AppConfig {
            db_path: None,
            default_tax_rate: Percent::new(Decimal::from(21)),
            default_tax_application: TaxApplication::Excluded,
            payment_terms_days: DEFAULT_PAYMENT_TERMS_DAYS,
            currency_symbol: "€".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the process environment.
    ///
    /// ## Environment Variables
    /// - `RIDEBILL_DB_PATH`: database file
    /// - `RIDEBILL_TAX_RATE`: default tax rate in percent (e.g. "21")
    /// - `RIDEBILL_TAX_APPLICATION`: `excluded` or `included`
    /// - `RIDEBILL_PAYMENT_TERMS_DAYS`: days until a bill is due
    /// - `RIDEBILL_CURRENCY_SYMBOL`: symbol on exported amounts
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(path) = lookup("RIDEBILL_DB_PATH").filter(|p| !p.trim().is_empty()) {
            config.db_path = Some(PathBuf::from(path));
        }

        if let Some(raw) = lookup("RIDEBILL_TAX_RATE") {
            let rate: Percent = raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("RIDEBILL_TAX_RATE".to_string()))?;
            validate_tax_rate(rate)
                .map_err(|_| ConfigError::InvalidValue("RIDEBILL_TAX_RATE".to_string()))?;
            config.default_tax_rate = rate;
        }

        if let Some(raw) = lookup("RIDEBILL_TAX_APPLICATION") {
            config.default_tax_application = raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("RIDEBILL_TAX_APPLICATION".to_string()))?;
        }

        if let Some(raw) = lookup("RIDEBILL_PAYMENT_TERMS_DAYS") {
            config.payment_terms_days = raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|days| (0..=MAX_PAYMENT_TERMS_DAYS).contains(days))
                .ok_or_else(|| ConfigError::InvalidValue("RIDEBILL_PAYMENT_TERMS_DAYS".to_string()))?;
        }

        if let Some(symbol) = lookup("RIDEBILL_CURRENCY_SYMBOL") {
            config.currency_symbol = symbol;
        }

        Ok(config)
    }

    /// Formats an amount with the configured symbol, e.g. `212.36 €`.
    pub fn format_money(&self, amount: Money) -> String {
        if self.currency_symbol.is_empty() {
            amount.to_string()
        } else {
            format!("{} {}", amount, self.currency_symbol)
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Could not determine a data directory; set RIDEBILL_DB_PATH")]
    NoDataDirectory,

    #[error("Could not create data directory: {0}")]
    DataDirectory(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.default_tax_rate, Percent::new(dec!(21)));
        assert_eq!(config.default_tax_application, TaxApplication::Excluded);
        assert_eq!(config.payment_terms_days, 30);
        assert!(config.db_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("RIDEBILL_TAX_RATE", "10%"),
            ("RIDEBILL_TAX_APPLICATION", "included"),
            ("RIDEBILL_PAYMENT_TERMS_DAYS", "15"),
            ("RIDEBILL_DB_PATH", "/tmp/rb.db"),
        ]))
        .unwrap();

        assert_eq!(config.default_tax_rate, Percent::new(dec!(10)));
        assert_eq!(config.default_tax_application, TaxApplication::Included);
        assert_eq!(config.payment_terms_days, 15);
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/rb.db")));

        let generous = AppConfig::from_lookup(lookup(&[("RIDEBILL_TAX_RATE", "150")])).unwrap();
        assert_eq!(generous.default_tax_rate, Percent::new(dec!(150)));
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("RIDEBILL_TAX_RATE", "abc"),
            ("RIDEBILL_TAX_RATE", "-5"),
            ("RIDEBILL_TAX_APPLICATION", "sometimes"),
            ("RIDEBILL_PAYMENT_TERMS_DAYS", "-1"),
            ("RIDEBILL_PAYMENT_TERMS_DAYS", "3651"),
            ("RIDEBILL_PAYMENT_TERMS_DAYS", "9223372036854775807"),
        ] {
            let result = AppConfig::from_lookup(lookup(&[(key, value)]));
            assert!(
                matches!(result, Err(ConfigError::InvalidValue(ref k)) if k == key),
                "{key}={value} should be rejected"
            );
        }
    }

    #[test]
    fn test_format_money() {
        let config = AppConfig::default();
        assert_eq!(config.format_money(Money::new(dec!(212.355))), "212.36 €");

        let plain = AppConfig {
            currency_symbol: String::new(),
            ..AppConfig::default()
        };
        assert_eq!(plain.format_money(Money::new(dec!(5))), "5.00");
    }
}

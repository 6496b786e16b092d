use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Whether a currency is government-issued money or a crypto asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyKind {
    Fiat,
    Crypto,
}

/// Currency code supported by the gateway.
///
/// The catalog is static: four fiat currencies and three crypto assets,
/// loaded once and immutable for the process lifetime. Balances and amounts
/// are `Decimal` everywhere; crypto amounts routinely carry 8 fractional
/// digits, so integer minor units are not an option here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Inr,
    Usd,
    Eur,
    Gbp,
    Btc,
    Eth,
    Usdt,
}

impl Currency {
    /// Every currency in the catalog, fiat first.
    pub const ALL: [Currency; 7] = [
        Currency::Inr,
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Btc,
        Currency::Eth,
        Currency::Usdt,
    ];

    /// Fiat currencies in draw-down priority order (INR first).
    ///
    /// The order is a contract: a crypto send funded from fiat depletes
    /// these left to right.
    pub const FIAT: [Currency; 4] = [Currency::Inr, Currency::Usd, Currency::Eur, Currency::Gbp];

    /// Supported crypto assets.
    pub const CRYPTO: [Currency; 3] = [Currency::Btc, Currency::Eth, Currency::Usdt];

    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Inr => "INR",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Btc => "BTC",
            Currency::Eth => "ETH",
            Currency::Usdt => "USDT",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Currency::Inr => "Indian Rupee",
            Currency::Usd => "US Dollar",
            Currency::Eur => "Euro",
            Currency::Gbp => "British Pound",
            Currency::Btc => "Bitcoin",
            Currency::Eth => "Ethereum",
            Currency::Usdt => "Tether",
        }
    }

    /// Display glyph shown next to amounts.
    #[must_use]
    pub const fn glyph(self) -> &'static str {
        match self {
            Currency::Inr => "₹",
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Gbp => "£",
            Currency::Btc => "₿",
            Currency::Eth => "Ξ",
            Currency::Usdt => "₮",
        }
    }

    #[must_use]
    pub const fn kind(self) -> CurrencyKind {
        match self {
            Currency::Inr | Currency::Usd | Currency::Eur | Currency::Gbp => CurrencyKind::Fiat,
            Currency::Btc | Currency::Eth | Currency::Usdt => CurrencyKind::Crypto,
        }
    }

    #[must_use]
    pub const fn is_fiat(self) -> bool {
        matches!(self.kind(), CurrencyKind::Fiat)
    }

    #[must_use]
    pub const fn is_crypto(self) -> bool {
        matches!(self.kind(), CurrencyKind::Crypto)
    }

    /// Fixed cross-rate of one unit of this fiat currency in INR, the base
    /// unit all mixed fiat holdings are summed in. `None` for crypto.
    ///
    /// These constants are deliberately the only copy in the codebase;
    /// every conversion site goes through them.
    #[must_use]
    pub fn inr_cross_rate(self) -> Option<Decimal> {
        match self {
            Currency::Inr => Some(Decimal::ONE),
            Currency::Usd => Some(Decimal::new(835, 1)),
            Currency::Eur => Some(Decimal::new(90, 0)),
            Currency::Gbp => Some(Decimal::new(105, 0)),
            _ => None,
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "INR" => Ok(Currency::Inr),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            "BTC" => Ok(Currency::Btc),
            "ETH" => Ok(Currency::Eth),
            "USDT" => Ok(Currency::Usdt),
            other => Err(EngineError::UnknownCurrency(other.to_string())),
        }
    }
}

//! Settlement planning for crypto sends.
//!
//! Planning is pure: given the sender's wallet, the requested amount and a
//! price quote, [`plan_send_crypto`] decides how the sender's mixed holdings
//! are drawn down and what the recipient is credited, without touching any
//! state. The engine applies a plan transactionally afterwards, so every
//! rejection here happens before any mutation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Currency, EngineError, ResultEngine, Wallet};

/// Price of one unit of a crypto asset, as supplied by the rate source.
///
/// Quotes are resolved by the caller *before* any wallet lock is taken; the
/// engine never performs network I/O itself.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CryptoQuote {
    pub price_inr: Decimal,
    pub price_usd: Decimal,
}

impl CryptoQuote {
    /// Price of one unit in the given fiat currency.
    ///
    /// INR and USD are quoted directly. EUR and GBP are approximated from
    /// the USD price with fixed multipliers (0.85 / 0.75), matching the
    /// published behavior of the gateway.
    #[must_use]
    pub fn price_in(self, fiat: Currency) -> Option<Decimal> {
        match fiat {
            Currency::Inr => Some(self.price_inr),
            Currency::Usd => Some(self.price_usd),
            Currency::Eur => Some(self.price_usd * Decimal::new(85, 2)),
            Currency::Gbp => Some(self.price_usd * Decimal::new(75, 2)),
            _ => None,
        }
    }
}

/// How a send was funded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendingMethod {
    /// The sender's crypto balance covered the full amount.
    CryptoDirect,
    /// Fiat balances were liquidated to cover the amount.
    FiatToCrypto,
}

impl SendingMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CryptoDirect => "crypto_direct",
            Self::FiatToCrypto => "fiat_to_crypto",
        }
    }
}

/// One fiat balance reduction, in that currency's native unit.
#[derive(Clone, Debug, PartialEq)]
pub struct FiatDeduction {
    pub currency: Currency,
    pub amount: Decimal,
}

/// The computed outcome of a send, ready to be applied to both wallets.
#[derive(Clone, Debug, PartialEq)]
pub struct SettlementPlan {
    pub method: SendingMethod,
    /// Amount removed from the sender's balance in the sent crypto asset.
    pub crypto_deducted: Decimal,
    /// Fiat reductions in draw-down order (empty for a direct send).
    pub fiat_deductions: Vec<FiatDeduction>,
    /// Amount credited to the recipient in their chosen fiat currency.
    pub recipient_fiat_amount: Decimal,
}

/// Total crypto the sender could cover: their direct balance plus what the
/// whole of their fiat holdings would buy at the quoted INR price.
#[must_use]
pub fn total_available(sender: &Wallet, symbol: Currency, quote: CryptoQuote) -> Decimal {
    sender.balance(symbol) + sender.total_fiat_in_inr() / quote.price_inr
}

pub fn plan_send_crypto(
    sender: &Wallet,
    amount: Decimal,
    symbol: Currency,
    recipient_fiat: Currency,
    quote: CryptoQuote,
) -> ResultEngine<SettlementPlan> {
    if amount <= Decimal::ZERO {
        return Err(EngineError::InvalidAmount(format!(
            "crypto amount must be > 0, got {amount}"
        )));
    }
    if !symbol.is_crypto() {
        return Err(EngineError::UnknownCurrency(symbol.code().to_string()));
    }
    let recipient_price = quote
        .price_in(recipient_fiat)
        .ok_or_else(|| EngineError::UnknownCurrency(recipient_fiat.code().to_string()))?;

    let direct = sender.balance(symbol);
    let available = total_available(sender, symbol, quote);
    if amount > available {
        return Err(EngineError::InsufficientBalance {
            available,
            currency: symbol,
        });
    }

    let recipient_fiat_amount = amount * recipient_price;

    if direct >= amount {
        return Ok(SettlementPlan {
            method: SendingMethod::CryptoDirect,
            crypto_deducted: amount,
            fiat_deductions: Vec::new(),
            recipient_fiat_amount,
        });
    }

    // The full requested amount is funded from fiat, depleted in the fixed
    // priority order; the final currency touched is only partially drawn.
    let mut remaining_inr = amount * quote.price_inr;
    let mut fiat_deductions = Vec::new();
    for fiat in Currency::FIAT {
        if remaining_inr <= Decimal::ZERO {
            break;
        }
        let Some(rate) = fiat.inr_cross_rate() else {
            continue;
        };
        let balance = sender.balance(fiat);
        if balance <= Decimal::ZERO {
            continue;
        }
        let needed_native = remaining_inr / rate;
        let deduction = needed_native.min(balance);
        remaining_inr -= deduction * rate;
        fiat_deductions.push(FiatDeduction {
            currency: fiat,
            amount: deduction,
        });
    }

    // Whatever direct crypto existed (insufficient on its own) is zeroed
    // out alongside the fiat draw-down.
    Ok(SettlementPlan {
        method: SendingMethod::FiatToCrypto,
        crypto_deducted: direct,
        fiat_deductions,
        recipient_fiat_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn usdt_quote() -> CryptoQuote {
        CryptoQuote {
            price_inr: dec("83.5"),
            price_usd: dec("1.0"),
        }
    }

    fn btc_quote() -> CryptoQuote {
        CryptoQuote {
            price_inr: dec("3500000"),
            price_usd: dec("42000"),
        }
    }

    fn wallet(entries: &[(Currency, &str)]) -> Wallet {
        let mut wallet = Wallet::zeroed();
        for (currency, amount) in entries {
            wallet.credit(*currency, dec(amount)).unwrap();
        }
        wallet
    }

    #[test]
    fn direct_send_when_crypto_balance_suffices() {
        let sender = wallet(&[(Currency::Btc, "1"), (Currency::Inr, "500")]);
        let plan =
            plan_send_crypto(&sender, dec("0.5"), Currency::Btc, Currency::Usd, btc_quote())
                .unwrap();

        assert_eq!(plan.method, SendingMethod::CryptoDirect);
        assert_eq!(plan.crypto_deducted, dec("0.5"));
        assert!(plan.fiat_deductions.is_empty());
        assert_eq!(plan.recipient_fiat_amount, dec("0.5") * dec("42000"));
    }

    #[test]
    fn draw_down_depletes_inr_before_usd() {
        // Spec-level scenario: 1000 INR + 50 USD, sending crypto worth
        // 1200 INR. INR must be zeroed first; USD covers the 200 INR
        // shortfall at the 83.5 cross-rate.
        let sender = wallet(&[(Currency::Inr, "1000"), (Currency::Usd, "50")]);
        let quote = usdt_quote();
        let plan =
            plan_send_crypto(&sender, dec("1200") / dec("83.5"), Currency::Usdt, Currency::Inr, quote)
                .unwrap();

        assert_eq!(plan.method, SendingMethod::FiatToCrypto);
        assert_eq!(plan.fiat_deductions.len(), 2);
        assert_eq!(plan.fiat_deductions[0].currency, Currency::Inr);
        assert_eq!(plan.fiat_deductions[0].amount, dec("1000"));
        assert_eq!(plan.fiat_deductions[1].currency, Currency::Usd);
        // 200 INR shortfall / 83.5 ≈ 2.395 USD.
        let expected_usd = (dec("1200") / dec("83.5") * dec("83.5") - dec("1000")) / dec("83.5");
        assert_eq!(plan.fiat_deductions[1].amount, expected_usd);
    }

    #[test]
    fn partial_crypto_balance_is_zeroed_on_fiat_funding() {
        // 0.001 BTC held, 0.002 requested: fiat funds the whole request and
        // the stray crypto balance is swept to zero.
        let sender = wallet(&[(Currency::Btc, "0.001"), (Currency::Inr, "10000")]);
        let plan =
            plan_send_crypto(&sender, dec("0.002"), Currency::Btc, Currency::Inr, btc_quote())
                .unwrap();

        assert_eq!(plan.method, SendingMethod::FiatToCrypto);
        assert_eq!(plan.crypto_deducted, dec("0.001"));
        assert_eq!(plan.fiat_deductions.len(), 1);
        assert_eq!(
            plan.fiat_deductions[0].amount,
            dec("0.002") * dec("3500000")
        );
    }

    #[test]
    fn insufficient_balance_reports_total_available() {
        let sender = wallet(&[(Currency::Inr, "83.5")]);
        let err = plan_send_crypto(&sender, dec("2"), Currency::Usdt, Currency::Usd, usdt_quote())
            .unwrap_err();

        assert_eq!(
            err,
            EngineError::InsufficientBalance {
                available: dec("1"),
                currency: Currency::Usdt,
            }
        );
    }

    #[test]
    fn rejects_non_positive_amount_and_bad_currencies() {
        let sender = wallet(&[(Currency::Inr, "1000")]);
        assert!(matches!(
            plan_send_crypto(&sender, dec("0"), Currency::Btc, Currency::Inr, btc_quote()),
            Err(EngineError::InvalidAmount(_))
        ));
        assert!(matches!(
            plan_send_crypto(&sender, dec("1"), Currency::Inr, Currency::Inr, btc_quote()),
            Err(EngineError::UnknownCurrency(_))
        ));
        assert!(matches!(
            plan_send_crypto(&sender, dec("1"), Currency::Btc, Currency::Eth, btc_quote()),
            Err(EngineError::UnknownCurrency(_))
        ));
    }

    #[test]
    fn recipient_pricing_approximates_eur_and_gbp_from_usd() {
        let quote = btc_quote();
        assert_eq!(quote.price_in(Currency::Inr).unwrap(), dec("3500000"));
        assert_eq!(quote.price_in(Currency::Usd).unwrap(), dec("42000"));
        assert_eq!(quote.price_in(Currency::Eur).unwrap(), dec("35700"));
        assert_eq!(quote.price_in(Currency::Gbp).unwrap(), dec("31500"));
        assert!(quote.price_in(Currency::Btc).is_none());
    }

    #[test]
    fn value_is_conserved_modulo_the_recipient_rate() {
        // Fiat-funded send settled back to INR: what leaves the sender in
        // INR terms equals what the recipient is credited.
        let sender = wallet(&[(Currency::Inr, "1000"), (Currency::Usd, "50")]);
        let quote = usdt_quote();
        let amount = dec("12");
        let plan =
            plan_send_crypto(&sender, amount, Currency::Usdt, Currency::Inr, quote).unwrap();

        let deducted_inr: Decimal = plan
            .fiat_deductions
            .iter()
            .map(|d| d.amount * d.currency.inr_cross_rate().unwrap())
            .sum();
        let credited_inr = plan.recipient_fiat_amount;
        let drift = (deducted_inr - credited_inr).abs();
        assert!(drift < dec("0.0000000001"), "drift was {drift}");
    }
}

//! Upstream price feeds.
//!
//! Two real feeds are supported: a Binance-style ticker endpoint (primary)
//! and a CoinGecko-style simple-price endpoint (secondary). Both are behind
//! the [`PriceUpstream`] trait so tests can point the source at local
//! doubles.

use async_trait::async_trait;
use engine::Currency;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::{PriceQuote, Provenance};

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("access restricted in this region (HTTP 451)")]
    RegionRestricted,
    #[error("rate limited (HTTP 429)")]
    RateLimited,
    #[error("unexpected status: {0}")]
    Status(StatusCode),
}

#[async_trait]
pub trait PriceUpstream: Send + Sync {
    fn provenance(&self) -> Provenance;
    async fn fetch(&self) -> Result<Vec<PriceQuote>, UpstreamError>;
}

/// Binance-style ticker feed. Quotes are USD(T)-denominated; INR prices are
/// derived via the fixed USD cross-rate.
pub struct BinanceUpstream {
    client: Client,
    base_url: String,
}

impl BinanceUpstream {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    symbol: String,
    price: String,
}

#[async_trait]
impl PriceUpstream for BinanceUpstream {
    fn provenance(&self) -> Provenance {
        Provenance::Binance
    }

    async fn fetch(&self) -> Result<Vec<PriceQuote>, UpstreamError> {
        let url = format!("{}/api/v3/ticker/price", self.base_url);
        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS => {
                return Err(UpstreamError::RegionRestricted);
            }
            status if !status.is_success() => return Err(UpstreamError::Status(status)),
            _ => {}
        }

        let tickers: Vec<TickerPrice> = response.json().await?;
        debug!(count = tickers.len(), "fetched ticker prices");

        let usd_inr = Currency::Usd
            .inr_cross_rate()
            .unwrap_or_else(|| Decimal::new(835, 1));

        let mut quotes = Vec::with_capacity(Currency::CRYPTO.len());
        for symbol in Currency::CRYPTO {
            let pair = format!("{}USDT", symbol.code());
            let price_usd = match symbol {
                // Tether itself has no USDT pair; it is the quote asset.
                Currency::Usdt => Some(Decimal::ONE),
                _ => tickers
                    .iter()
                    .find(|t| t.symbol == pair)
                    .and_then(|t| t.price.parse().ok()),
            };
            let Some(price_usd) = price_usd else { continue };

            quotes.push(PriceQuote {
                symbol: symbol.code().to_string(),
                name: symbol.display_name().to_string(),
                price_usd,
                price_inr: price_usd * usd_inr,
                change_24h: 0.0,
                glyph: symbol.glyph().to_string(),
            });
        }
        Ok(quotes)
    }
}

/// CoinGecko-style simple-price feed, used when the primary is down or
/// region-restricted.
pub struct CoingeckoUpstream {
    client: Client,
    base_url: String,
}

impl CoingeckoUpstream {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CoinEntry {
    usd: Option<Decimal>,
    inr: Option<Decimal>,
    usd_24h_change: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SimplePriceResponse {
    bitcoin: Option<CoinEntry>,
    ethereum: Option<CoinEntry>,
    tether: Option<CoinEntry>,
}

#[async_trait]
impl PriceUpstream for CoingeckoUpstream {
    fn provenance(&self) -> Provenance {
        Provenance::Coingecko
    }

    async fn fetch(&self) -> Result<Vec<PriceQuote>, UpstreamError> {
        let url = format!(
            "{}/api/v3/simple/price?ids=bitcoin,ethereum,tether&vs_currencies=usd,inr&include_24hr_change=true",
            self.base_url
        );
        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(UpstreamError::RateLimited),
            status if !status.is_success() => return Err(UpstreamError::Status(status)),
            _ => {}
        }

        let body: SimplePriceResponse = response.json().await?;

        let entries = [
            (Currency::Btc, body.bitcoin),
            (Currency::Eth, body.ethereum),
            (Currency::Usdt, body.tether),
        ];

        let quotes = entries
            .into_iter()
            .map(|(symbol, entry)| {
                let entry = entry.unwrap_or_default();
                let fallback = crate::fallback_quote(symbol);
                PriceQuote {
                    symbol: symbol.code().to_string(),
                    name: symbol.display_name().to_string(),
                    price_usd: entry.usd.unwrap_or(fallback.price_usd),
                    price_inr: entry.inr.unwrap_or(fallback.price_inr),
                    change_24h: entry.usd_24h_change.unwrap_or(0.0),
                    glyph: symbol.glyph().to_string(),
                }
            })
            .collect();
        Ok(quotes)
    }
}

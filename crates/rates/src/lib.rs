//! The rate source: live crypto prices with caching and layered fallback.
//!
//! Callers always get an answer. A request first serves the cached snapshot
//! if it is fresh; otherwise it refreshes from the primary upstream, falls
//! back to the secondary on failure, then to the stale cache, and finally to
//! a fixed price table. Failures are absorbed here and surface only as the
//! provenance tag on the returned board, never as an error.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use engine::Currency;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub use upstream::{BinanceUpstream, CoingeckoUpstream, PriceUpstream, UpstreamError};

mod upstream;

/// Minimum spacing between secondary-upstream calls; it rate-limits hard.
const SECONDARY_MIN_INTERVAL: Duration = Duration::from_secs(2);

/// Which source produced a price board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Binance,
    Coingecko,
    Cached,
    Fallback,
    Mock,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binance => "binance",
            Self::Coingecko => "coingecko",
            Self::Cached => "cached",
            Self::Fallback => "fallback",
            Self::Mock => "mock",
        }
    }
}

impl core::fmt::Display for Provenance {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current price of one crypto asset in both quote currencies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub symbol: String,
    pub name: String,
    pub price_usd: Decimal,
    pub price_inr: Decimal,
    pub change_24h: f64,
    pub glyph: String,
}

/// A full snapshot of all supported prices plus where it came from.
#[derive(Clone, Debug)]
pub struct PriceBoard {
    pub quotes: Vec<PriceQuote>,
    pub provenance: Provenance,
    /// True when the board was served from the cache rather than fetched on
    /// this request.
    pub cached: bool,
    /// Age of the underlying snapshot.
    pub age: Duration,
    pub fetched_at: DateTime<Utc>,
}

impl PriceBoard {
    pub fn quote(&self, symbol: &str) -> Option<&PriceQuote> {
        let symbol = symbol.trim().to_ascii_uppercase();
        self.quotes.iter().find(|q| q.symbol == symbol)
    }
}

/// One exchange-account holding, for the demo exchange wallet view.
#[derive(Clone, Debug, Serialize)]
pub struct ExchangeBalance {
    pub asset: String,
    pub balance: Decimal,
}

#[derive(Clone, Debug)]
pub struct RateSourceConfig {
    pub primary_base: String,
    pub secondary_base: String,
    pub ttl: Duration,
    pub request_timeout: Duration,
}

impl Default for RateSourceConfig {
    fn default() -> Self {
        Self {
            primary_base: "https://api.binance.com".to_string(),
            secondary_base: "https://api.coingecko.com".to_string(),
            ttl: Duration::from_secs(60),
            request_timeout: Duration::from_secs(5),
        }
    }
}

struct CacheSnapshot {
    quotes: Vec<PriceQuote>,
    provenance: Provenance,
    taken: Instant,
    taken_at: DateTime<Utc>,
}

#[derive(Default)]
struct SourceState {
    cache: Option<CacheSnapshot>,
    last_secondary: Option<Instant>,
}

pub struct RateSource {
    primary: Box<dyn PriceUpstream>,
    secondary: Box<dyn PriceUpstream>,
    ttl: Duration,
    /// Guards the cache *and* the refresh: a caller that finds the cache
    /// stale refreshes while holding the lock, so concurrent callers wait
    /// for the in-flight result instead of issuing duplicate upstream calls.
    state: Mutex<SourceState>,
}

impl RateSource {
    pub fn new(config: RateSourceConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self::with_upstreams(
            Box::new(BinanceUpstream::new(client.clone(), config.primary_base)),
            Box::new(CoingeckoUpstream::new(client, config.secondary_base)),
            config.ttl,
        ))
    }

    pub fn with_upstreams(
        primary: Box<dyn PriceUpstream>,
        secondary: Box<dyn PriceUpstream>,
        ttl: Duration,
    ) -> Self {
        Self {
            primary,
            secondary,
            ttl,
            state: Mutex::new(SourceState::default()),
        }
    }

    /// Current prices for every supported asset. Infallible by design: the
    /// worst case is the fixed fallback table.
    pub async fn get_all(&self) -> PriceBoard {
        let mut state = self.state.lock().await;

        if let Some(cache) = &state.cache {
            let age = cache.taken.elapsed();
            if age < self.ttl {
                debug!(age_ms = age.as_millis() as u64, "serving cached prices");
                return PriceBoard {
                    quotes: cache.quotes.clone(),
                    provenance: cache.provenance,
                    cached: true,
                    age,
                    fetched_at: cache.taken_at,
                };
            }
        }

        match self.primary.fetch().await {
            Ok(quotes) => {
                return Self::store(&mut state, quotes, self.primary.provenance());
            }
            Err(err) => warn!(upstream = %self.primary.provenance(), "price fetch failed: {err}"),
        }

        // The secondary is shared infrastructure that bans aggressive
        // callers; space requests out.
        if let Some(last) = state.last_secondary {
            let since = last.elapsed();
            if since < SECONDARY_MIN_INTERVAL {
                tokio::time::sleep(SECONDARY_MIN_INTERVAL - since).await;
            }
        }
        state.last_secondary = Some(Instant::now());

        match self.secondary.fetch().await {
            Ok(quotes) => {
                return Self::store(&mut state, quotes, self.secondary.provenance());
            }
            Err(err) => warn!(upstream = %self.secondary.provenance(), "price fetch failed: {err}"),
        }

        if let Some(cache) = &state.cache {
            let age = cache.taken.elapsed();
            warn!(
                age_ms = age.as_millis() as u64,
                "all upstreams failed, serving stale cache"
            );
            return PriceBoard {
                quotes: cache.quotes.clone(),
                provenance: Provenance::Cached,
                cached: true,
                age,
                fetched_at: cache.taken_at,
            };
        }

        warn!("all upstreams failed with no cache, serving fallback table");
        PriceBoard {
            quotes: fallback_table(),
            provenance: Provenance::Fallback,
            cached: false,
            age: Duration::ZERO,
            fetched_at: Utc::now(),
        }
    }

    /// Current price of one asset; `None` for an unknown symbol.
    pub async fn get(&self, symbol: &str) -> Option<PriceQuote> {
        self.get_all().await.quote(symbol).cloned()
    }

    /// Demo exchange-account holdings. A real deployment would issue a
    /// signed account request here; the demo always reports the mock
    /// portfolio, tagged accordingly.
    pub fn exchange_balances(&self) -> (Vec<ExchangeBalance>, Provenance) {
        let dec = |s: &str| s.parse::<Decimal>().unwrap_or_default();
        (
            vec![
                ExchangeBalance {
                    asset: "BTC".to_string(),
                    balance: dec("0.15432"),
                },
                ExchangeBalance {
                    asset: "ETH".to_string(),
                    balance: dec("2.8765"),
                },
                ExchangeBalance {
                    asset: "USDT".to_string(),
                    balance: dec("1250.50"),
                },
            ],
            Provenance::Mock,
        )
    }

    fn store(state: &mut SourceState, quotes: Vec<PriceQuote>, provenance: Provenance) -> PriceBoard {
        let taken_at = Utc::now();
        state.cache = Some(CacheSnapshot {
            quotes: quotes.clone(),
            provenance,
            taken: Instant::now(),
            taken_at,
        });
        PriceBoard {
            quotes,
            provenance,
            cached: false,
            age: Duration::ZERO,
            fetched_at: taken_at,
        }
    }
}

/// The fixed last-resort price for one asset.
pub(crate) fn fallback_quote(symbol: Currency) -> PriceQuote {
    let (usd, inr) = match symbol {
        Currency::Btc => (Decimal::new(42_000, 0), Decimal::new(3_507_000, 0)),
        Currency::Eth => (Decimal::new(3_200, 0), Decimal::new(267_200, 0)),
        // Everything else is priced as the stablecoin.
        _ => (Decimal::ONE, Decimal::new(835, 1)),
    };
    PriceQuote {
        symbol: symbol.code().to_string(),
        name: symbol.display_name().to_string(),
        price_usd: usd,
        price_inr: inr,
        change_24h: 0.0,
        glyph: symbol.glyph().to_string(),
    }
}

fn fallback_table() -> Vec<PriceQuote> {
    Currency::CRYPTO.into_iter().map(fallback_quote).collect()
}

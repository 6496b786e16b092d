//! Read-only price surface backed by the rate source.

use api_types::prices::{
    CatalogResponse, ConvertDirection, ConvertOutcome, ConvertRequest, ConvertResponse,
    CurrencyInfo, ExchangeBalanceView, ExchangeBalancesResponse, LivePricesResponse, PriceView,
};
use axum::{Json, extract::State};
use chrono::Utc;
use engine::CryptoQuote;
use rates::{PriceBoard, Provenance};
use rust_decimal::Decimal;

use crate::{ServerError, server::ServerState, views};

fn price_views(board: &PriceBoard) -> Vec<PriceView> {
    board
        .quotes
        .iter()
        .map(|quote| PriceView {
            symbol: quote.symbol.clone(),
            name: quote.name.clone(),
            price_usd: quote.price_usd,
            price_inr: quote.price_inr,
            change_24h: quote.change_24h,
            glyph: quote.glyph.clone(),
        })
        .collect()
}

fn board_message(board: &PriceBoard) -> &'static str {
    match board.provenance {
        Provenance::Binance if board.cached => "Binance data (served from cache)",
        Provenance::Binance => "Live data from Binance API",
        Provenance::Coingecko if board.cached => "CoinGecko data (served from cache)",
        Provenance::Coingecko => "Live data from CoinGecko API",
        Provenance::Cached => "Cached data (upstreams temporarily unavailable)",
        Provenance::Fallback => "Using fallback data (all upstreams unavailable)",
        Provenance::Mock => "Demo data",
    }
}

/// Never fails: the rate source absorbs upstream failures and tags the
/// provenance instead.
pub async fn live(State(state): State<ServerState>) -> Json<LivePricesResponse> {
    let board = state.rates.get_all().await;

    Json(LivePricesResponse {
        success: true,
        data: price_views(&board),
        source: board.provenance.to_string(),
        message: board_message(&board).to_string(),
        cached: board.cached,
        cache_age_ms: board.age.as_millis() as u64,
        timestamp: board.fetched_at,
    })
}

/// The static currency catalog.
pub async fn catalog() -> Json<CatalogResponse> {
    let data = engine::Currency::ALL
        .into_iter()
        .map(|currency| CurrencyInfo {
            code: views::api_currency(currency),
            name: currency.display_name().to_string(),
            glyph: currency.glyph().to_string(),
            kind: match currency.kind() {
                engine::CurrencyKind::Fiat => "fiat".to_string(),
                engine::CurrencyKind::Crypto => "crypto".to_string(),
            },
        })
        .collect();

    Json(CatalogResponse {
        success: true,
        data,
    })
}

/// Conversion quote between a fiat currency and a crypto asset.
pub async fn convert(
    State(state): State<ServerState>,
    Json(payload): Json<ConvertRequest>,
) -> Result<Json<ConvertResponse>, ServerError> {
    if payload.amount <= Decimal::ZERO {
        return Err(ServerError::Generic("invalid amount".to_string()));
    }

    let from = views::engine_currency(payload.from_currency);
    let to = views::engine_currency(payload.to_currency);

    let (fiat, crypto) = match payload.direction {
        ConvertDirection::FiatToCrypto => (from, to),
        ConvertDirection::CryptoToFiat => (to, from),
    };
    if !fiat.is_fiat() || !crypto.is_crypto() {
        return Err(ServerError::Generic(
            "unsupported conversion pair".to_string(),
        ));
    }

    let quote = state
        .rates
        .get(crypto.code())
        .await
        .ok_or_else(|| ServerError::Generic("crypto price not found".to_string()))?;
    let quote = CryptoQuote {
        price_inr: quote.price_inr,
        price_usd: quote.price_usd,
    };
    let price = quote
        .price_in(fiat)
        .ok_or_else(|| ServerError::Generic("unsupported conversion pair".to_string()))?;

    let converted_amount = match payload.direction {
        ConvertDirection::FiatToCrypto => payload.amount / price,
        ConvertDirection::CryptoToFiat => payload.amount * price,
    };

    Ok(Json(ConvertResponse {
        success: true,
        data: ConvertOutcome {
            original_amount: payload.amount,
            converted_amount,
            from_currency: payload.from_currency,
            to_currency: payload.to_currency,
            direction: payload.direction,
            timestamp: Utc::now(),
        },
    }))
}

/// Demo exchange-account holdings valued at the current board.
pub async fn exchange_balances(
    State(state): State<ServerState>,
) -> Json<ExchangeBalancesResponse> {
    let (holdings, provenance) = state.rates.exchange_balances();
    let board = state.rates.get_all().await;

    let balances: Vec<ExchangeBalanceView> = holdings
        .into_iter()
        .map(|holding| {
            let (usd_value, inr_value) = board
                .quote(&holding.asset)
                .map(|quote| {
                    (
                        holding.balance * quote.price_usd,
                        holding.balance * quote.price_inr,
                    )
                })
                .unwrap_or((Decimal::ZERO, Decimal::ZERO));
            ExchangeBalanceView {
                asset: holding.asset,
                balance: holding.balance,
                usd_value,
                inr_value,
            }
        })
        .collect();

    let total_usd_value = balances.iter().map(|b| b.usd_value).sum();
    let total_inr_value = balances.iter().map(|b| b.inr_value).sum();

    Json(ExchangeBalancesResponse {
        success: true,
        balances,
        source: provenance.to_string(),
        total_usd_value,
        total_inr_value,
        timestamp: Utc::now(),
    })
}

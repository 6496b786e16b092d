//! Transfer API endpoints: history, fiat sends and the crypto settlement
//! entry point.

use api_types::transaction::{
    ConversionDetails, HistoryResponse, SendCryptoRequest, SendCryptoResponse, SendFiatRequest,
    SendFiatResponse,
};
use axum::{Extension, Json, extract::State};

use crate::{ServerError, auth::CurrentUser, server::ServerState, views};

pub async fn list(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
) -> Result<Json<HistoryResponse>, ServerError> {
    let records = {
        let engine = state.engine.read().await;
        engine.transactions_for(user.id).await?
    };

    Ok(Json(HistoryResponse {
        success: true,
        data: records.into_iter().map(views::transfer_view).collect(),
    }))
}

pub async fn send_fiat(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Json(payload): Json<SendFiatRequest>,
) -> Result<Json<SendFiatResponse>, ServerError> {
    let currency = views::engine_currency(payload.currency.unwrap_or(api_types::Currency::Inr));

    let outcome = {
        let mut engine = state.engine.write().await;
        engine
            .send_fiat(
                user.id,
                payload.recipient_id,
                payload.amount,
                currency,
                payload.note,
            )
            .await?
    };

    Ok(Json(SendFiatResponse {
        success: true,
        message: format!(
            "{}{} sent successfully to {}",
            currency.glyph(),
            payload.amount,
            outcome.recipient_display_name
        ),
        reference: outcome.reference,
        new_balances: views::balance_map(&outcome.sender_wallet),
    }))
}

pub async fn send_crypto(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Json(payload): Json<SendCryptoRequest>,
) -> Result<Json<SendCryptoResponse>, ServerError> {
    let symbol = views::engine_currency(payload.crypto_symbol);
    let recipient_fiat = views::engine_currency(payload.recipient_currency);

    // Resolve the quote before taking the engine lock: the rate source may
    // suspend on upstream I/O and must never hold up wallet mutations.
    let quote = state
        .rates
        .get(symbol.code())
        .await
        .ok_or_else(|| ServerError::Generic("crypto price not found".to_string()))?;

    let outcome = {
        let mut engine = state.engine.write().await;
        engine
            .send_crypto(engine::SendCryptoCmd {
                sender_id: user.id,
                recipient_id: payload.recipient_id,
                amount: payload.crypto_amount,
                symbol,
                recipient_fiat,
                note: payload.note,
                quote: engine::CryptoQuote {
                    price_inr: quote.price_inr,
                    price_usd: quote.price_usd,
                },
            })
            .await?
    };

    Ok(Json(SendCryptoResponse {
        success: true,
        message: format!(
            "{} {} sent successfully",
            payload.crypto_amount,
            symbol.code()
        ),
        reference: outcome.reference,
        sending_method: views::api_method(outcome.method),
        sender_balances: views::balance_map(&outcome.sender_wallet),
        recipient_balances: views::balance_map(&outcome.recipient_wallet),
        conversion: ConversionDetails {
            sent_crypto_amount: payload.crypto_amount,
            sent_crypto_symbol: payload.crypto_symbol,
            received_fiat_amount: outcome.recipient_fiat_amount,
            received_fiat_currency: payload.recipient_currency,
            exchange_rate: outcome.realized_rate,
        },
    }))
}

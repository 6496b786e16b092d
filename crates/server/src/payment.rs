//! Deposit flow: QR generation and payment confirmation.

use api_types::payment::{ConfirmRequest, ConfirmResponse, GenerateQrRequest, GenerateQrResponse};
use axum::{Extension, Json, extract::State};
use rust_decimal::Decimal;

use crate::{ServerError, auth::CurrentUser, server::ServerState, views};

/// Renderer the QR image is delegated to; no image generation in-process.
const QR_RENDERER: &str = "https://api.qrserver.com/v1/create-qr-code/";

/// Percent-encode a URL component (RFC 3986 unreserved set kept).
fn encode_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

/// Opaque UPI-style payload naming amount, currency and reference, wrapped
/// into the external renderer URL.
fn qr_payload(amount: Decimal, currency: engine::Currency, reference: &str) -> String {
    let upi = format!(
        "upi://pay?pa=merchant@cryptogate&pn=CryptoGate&am={amount}&cu={code}&tn=Payment for {reference}",
        code = currency.code(),
    );
    format!("{QR_RENDERER}?size=300x300&data={}", encode_component(&upi))
}

pub async fn generate_qr(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Json(payload): Json<GenerateQrRequest>,
) -> Result<Json<GenerateQrResponse>, ServerError> {
    if payload.amount <= Decimal::ZERO {
        return Err(ServerError::Generic("invalid amount".to_string()));
    }
    let currency = views::engine_currency(payload.currency);

    let record = {
        let mut engine = state.engine.write().await;
        engine.begin_deposit(user.id, payload.amount, currency).await?
    };

    Ok(Json(GenerateQrResponse {
        success: true,
        qr_code: qr_payload(record.amount, currency, &record.reference),
        reference: record.reference,
        amount: record.amount,
        currency: payload.currency,
        status: views::api_status(record.status),
    }))
}

pub async fn confirm(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>, ServerError> {
    if payload.reference.trim().is_empty() {
        return Err(ServerError::Generic("reference required".to_string()));
    }

    let (record, wallet) = {
        let mut engine = state.engine.write().await;
        engine.confirm_deposit(user.id, payload.reference.trim()).await?
    };

    Ok(Json(ConfirmResponse {
        success: true,
        message: format!(
            "{}{} added successfully",
            record.currency.glyph(),
            record.amount
        ),
        balances: views::balance_map(&wallet),
        transaction: views::transfer_view(record),
    }))
}

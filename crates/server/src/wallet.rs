//! Wallet API endpoints

use api_types::wallet::{BalancesResponse, WithdrawRequest, WithdrawResponse};
use axum::{Extension, Json, extract::State};

use crate::{ServerError, auth::CurrentUser, server::ServerState, views};

pub async fn balances(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
) -> Result<Json<BalancesResponse>, ServerError> {
    let engine = state.engine.read().await;
    let wallet = engine.balances(user.id)?;

    Ok(Json(BalancesResponse {
        success: true,
        balances: views::balance_map(wallet),
    }))
}

pub async fn withdraw(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Json(payload): Json<WithdrawRequest>,
) -> Result<Json<WithdrawResponse>, ServerError> {
    let currency = views::engine_currency(payload.currency);

    let (record, wallet) = {
        let mut engine = state.engine.write().await;
        engine.withdraw(user.id, payload.amount, currency).await?
    };

    Ok(Json(WithdrawResponse {
        success: true,
        message: format!(
            "{}{} withdrawn successfully",
            currency.glyph(),
            record.amount
        ),
        reference: record.reference,
        balances: views::balance_map(&wallet),
    }))
}

//! Admin API endpoints: aggregate views over all users and transfers.

use std::collections::BTreeMap;

use api_types::admin::{
    AdminStats, AdminStatsResponse, AdminTransactionsResponse, AdminUserView, AdminUsersResponse,
    TopUser,
};
use axum::{Extension, Json, extract::State};
use chrono::{Duration, Utc};
use rates::PriceBoard;
use rust_decimal::Decimal;

use crate::{ServerError, auth::CurrentUser, server::ServerState, views};

fn require_admin(user: &CurrentUser) -> Result<(), ServerError> {
    if user.is_admin {
        Ok(())
    } else {
        Err(ServerError::Forbidden)
    }
}

/// Whole-wallet value in INR: fiat at the fixed cross-rates, crypto at the
/// current board prices.
fn wallet_inr_value(wallet: &engine::Wallet, board: &PriceBoard) -> Decimal {
    let crypto: Decimal = wallet
        .entries()
        .filter(|(currency, _)| currency.is_crypto())
        .filter_map(|(currency, amount)| {
            board
                .quote(currency.code())
                .map(|quote| amount * quote.price_inr)
        })
        .sum();
    wallet.total_fiat_in_inr() + crypto
}

pub async fn users(
    Extension(caller): Extension<CurrentUser>,
    State(state): State<ServerState>,
) -> Result<Json<AdminUsersResponse>, ServerError> {
    require_admin(&caller)?;

    let engine = state.engine.read().await;
    let data = engine
        .all_users()
        .into_iter()
        .map(|user| AdminUserView {
            id: user.id,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            is_admin: user.is_admin,
            created_at: user.created_at,
            balances: views::balance_map(&user.wallet),
        })
        .collect();

    Ok(Json(AdminUsersResponse {
        success: true,
        data,
    }))
}

pub async fn transactions(
    Extension(caller): Extension<CurrentUser>,
    State(state): State<ServerState>,
) -> Result<Json<AdminTransactionsResponse>, ServerError> {
    require_admin(&caller)?;

    let records = {
        let engine = state.engine.read().await;
        engine.all_transactions().await?
    };

    Ok(Json(AdminTransactionsResponse {
        success: true,
        data: records.into_iter().map(views::transfer_view).collect(),
    }))
}

pub async fn stats(
    Extension(caller): Extension<CurrentUser>,
    State(state): State<ServerState>,
) -> Result<Json<AdminStatsResponse>, ServerError> {
    require_admin(&caller)?;

    // Prices are resolved before touching the engine lock.
    let board = state.rates.get_all().await;
    let now = Utc::now();
    let yesterday = now - Duration::days(1);

    let engine = state.engine.read().await;
    let records = engine.all_transactions().await?;
    let users = engine.all_users();

    let total_transactions = records.len() as u64;
    let total_volume: Decimal = records.iter().map(|r| r.amount).sum();
    let completed = records
        .iter()
        .filter(|r| r.status == engine::TransferStatus::Completed)
        .count() as u64;
    let success_rate = if total_transactions > 0 {
        ((completed as f64 / total_transactions as f64) * 100.0).round() as u32
    } else {
        0
    };

    let recent_transactions = records.iter().filter(|r| r.created_at > yesterday).count() as u64;
    let recent_users = users.iter().filter(|u| u.created_at > yesterday).count() as u64;

    let mut transaction_kinds = BTreeMap::new();
    for record in &records {
        *transaction_kinds.entry(views::api_kind(record.kind)).or_insert(0u64) += 1;
    }

    let average_transaction_value = if total_transactions > 0 {
        total_volume / Decimal::from(total_transactions)
    } else {
        Decimal::ZERO
    };

    let mut valued: Vec<TopUser> = users
        .iter()
        .map(|user| TopUser {
            id: user.id,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            total_inr_value: wallet_inr_value(&user.wallet, &board),
        })
        .collect();
    valued.sort_by(|a, b| b.total_inr_value.cmp(&a.total_inr_value));
    valued.truncate(5);

    Ok(Json(AdminStatsResponse {
        success: true,
        stats: AdminStats {
            total_users: users.len() as u64,
            total_transactions,
            total_volume,
            success_rate,
            recent_transactions,
            recent_users,
            transaction_kinds,
            average_transaction_value,
            top_users: valued,
        },
    }))
}

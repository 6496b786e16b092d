use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tokio::sync::RwLock;

use crate::{admin, auth, payment, prices, transactions, users, wallet};
use engine::Engine;
use rates::RateSource;

/// Shared state behind every handler.
///
/// The engine sits behind one `RwLock`: mutating endpoints take the write
/// lock for their whole read-check-mutate sequence, which serializes
/// concurrent sends against the same wallets. Rate lookups happen before
/// the lock is taken, so no network wait ever holds it.
#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<RwLock<Engine>>,
    pub rates: Arc<RateSource>,
    pub db: DatabaseConnection,
}

pub fn router(state: ServerState) -> Router {
    let protected = Router::new()
        .route("/wallet/balances", get(wallet::balances))
        .route("/wallet/withdraw", post(wallet::withdraw))
        .route("/payment/generate-qr", post(payment::generate_qr))
        .route("/payment/confirm", post(payment::confirm))
        .route("/users/search", get(users::search))
        .route("/transactions", get(transactions::list))
        .route("/transactions/send", post(transactions::send_fiat))
        .route("/transactions/send-crypto", post(transactions::send_crypto))
        .route("/admin/users", get(admin::users))
        .route("/admin/transactions", get(admin::transactions))
        .route("/admin/stats", get(admin::stats))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/crypto/live-prices", get(prices::live))
        .route("/crypto/prices", get(prices::catalog))
        .route("/crypto/convert", post(prices::convert))
        .route("/crypto/wallet-balances", get(prices::exchange_balances))
        .merge(protected)
        .with_state(state)
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(state, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

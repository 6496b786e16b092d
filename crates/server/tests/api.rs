use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use engine::Engine;
use http_body_util::BodyExt;
use migration::MigratorTrait;
use rates::{RateSource, RateSourceConfig};
use sea_orm::Database;
use serde_json::{Value, json};
use server::ServerState;
use tokio::sync::RwLock;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// State with a mock primary price feed (BTC 42000, ETH 3200, USDT 1).
async fn test_state() -> (ServerState, MockServer) {
    let feed = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/ticker/price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "symbol": "BTCUSDT", "price": "42000.00" },
            { "symbol": "ETHUSDT", "price": "3200.00" }
        ])))
        .mount(&feed)
        .await;

    let state = state_with_rates(RateSourceConfig {
        primary_base: feed.uri(),
        secondary_base: feed.uri(),
        ttl: Duration::from_secs(60),
        request_timeout: Duration::from_secs(5),
    })
    .await;
    (state, feed)
}

async fn state_with_rates(config: RateSourceConfig) -> ServerState {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db.clone()).build().await.unwrap();

    ServerState {
        engine: Arc::new(RwLock::new(engine)),
        rates: Arc::new(RateSource::new(config).unwrap()),
        db,
    }
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, email: &str, name: &str) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": email, "password": "pw12345", "display_name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

/// Deposit and confirm through the public flow.
async fn fund(app: &Router, token: &str, amount: f64, currency: &str) {
    let (status, body) = send(
        app,
        "POST",
        "/payment/generate-qr",
        Some(token),
        Some(json!({ "amount": amount, "currency": currency })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reference = body["reference"].as_str().unwrap().to_string();

    let (status, _) = send(
        app,
        "POST",
        "/payment/confirm",
        Some(token),
        Some(json!({ "reference": reference })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn register_login_and_read_balances() {
    let (state, _feed) = test_state().await;
    let app = server::router(state);

    let (token, _) = register(&app, "alice@example.com", "Alice").await;

    let (status, body) = send(&app, "GET", "/wallet/balances", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["balances"]["INR"], json!(0.0));
    assert_eq!(body["balances"]["BTC"], json!(0.0));

    // Fresh login issues a working second token.
    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "pw12345" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let second = body["token"].as_str().unwrap();
    let (status, _) = send(&app, "GET", "/wallet/balances", Some(second), None).await;
    assert_eq!(status, StatusCode::OK);

    // Wrong password and missing token are both 401.
    let (status, _) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, "GET", "/wallet/balances", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let (state, _feed) = test_state().await;
    let app = server::router(state);

    register(&app, "bob@example.com", "Bob").await;
    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": "bob@example.com", "password": "pw", "display_name": "Bob 2" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn deposit_confirms_once_then_404s() {
    let (state, _feed) = test_state().await;
    let app = server::router(state);
    let (token, _) = register(&app, "carol@example.com", "Carol").await;

    let (status, body) = send(
        &app,
        "POST",
        "/payment/generate-qr",
        Some(&token),
        Some(json!({ "amount": 500, "currency": "INR" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("pending"));
    assert!(body["qr_code"].as_str().unwrap().contains("api.qrserver.com"));
    let reference = body["reference"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/payment/confirm",
        Some(&token),
        Some(json!({ "reference": reference })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balances"]["INR"], json!(500.0));

    // A second confirm is a no-op error, not a double credit.
    let (status, _) = send(
        &app,
        "POST",
        "/payment/confirm",
        Some(&token),
        Some(json!({ "reference": reference })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "GET", "/wallet/balances", Some(&token), None).await;
    assert_eq!(body["balances"]["INR"], json!(500.0));

    // Non-positive amounts never create a pending deposit.
    let (status, _) = send(
        &app,
        "POST",
        "/payment/generate-qr",
        Some(&token),
        Some(json!({ "amount": 0, "currency": "INR" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn crypto_send_settles_recipient_in_fiat() {
    let (state, _feed) = test_state().await;
    let app = server::router(state);
    let (sender_token, _) = register(&app, "alice@example.com", "Alice").await;
    let (recipient_token, recipient_id) = register(&app, "bob@example.com", "Bob").await;
    fund(&app, &sender_token, 10_000.0, "INR").await;

    // 10 USDT at the mock feed price (1 USD / 83.5 INR each) costs 835 INR.
    let (status, body) = send(
        &app,
        "POST",
        "/transactions/send-crypto",
        Some(&sender_token),
        Some(json!({
            "recipient_id": recipient_id,
            "crypto_amount": 10,
            "crypto_symbol": "USDT",
            "recipient_currency": "USD",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sending_method"], json!("fiat_to_crypto"));
    assert_eq!(body["sender_balances"]["INR"], json!(9165.0));
    assert_eq!(body["recipient_balances"]["USD"], json!(10.0));
    assert_eq!(body["conversion"]["received_fiat_amount"], json!(10.0));
    assert_eq!(body["conversion"]["exchange_rate"], json!(1.0));

    // The recipient is credited fiat, never crypto.
    let (_, body) = send(&app, "GET", "/wallet/balances", Some(&recipient_token), None).await;
    assert_eq!(body["balances"]["USD"], json!(10.0));
    assert_eq!(body["balances"]["USDT"], json!(0.0));

    // Both sides see a paired record referencing the same correlation id.
    let (_, sender_history) =
        send(&app, "GET", "/transactions", Some(&sender_token), None).await;
    let (_, recipient_history) =
        send(&app, "GET", "/transactions", Some(&recipient_token), None).await;
    let debit = &sender_history["data"][0];
    let credit = &recipient_history["data"][0];
    assert_eq!(debit["kind"], json!("crypto_send"));
    assert_eq!(credit["kind"], json!("crypto_receive_as_fiat"));
    assert_eq!(debit["correlation_id"], credit["correlation_id"]);
}

#[tokio::test]
async fn insufficient_crypto_send_is_rejected_with_available_amount() {
    let (state, _feed) = test_state().await;
    let app = server::router(state);
    let (token, _) = register(&app, "alice@example.com", "Alice").await;
    let (_, recipient_id) = register(&app, "bob@example.com", "Bob").await;
    fund(&app, &token, 83.5, "INR").await;

    let (status, body) = send(
        &app,
        "POST",
        "/transactions/send-crypto",
        Some(&token),
        Some(json!({
            "recipient_id": recipient_id,
            "crypto_amount": 2,
            "crypto_symbol": "USDT",
            "recipient_currency": "USD",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    // The error reports the computed total the sender could cover (1 USDT).
    assert!(body["error"].as_str().unwrap().contains("available: 1"));

    let (_, body) = send(&app, "GET", "/wallet/balances", Some(&token), None).await;
    assert_eq!(body["balances"]["INR"], json!(83.5));
}

#[tokio::test]
async fn fiat_send_and_withdraw() {
    let (state, _feed) = test_state().await;
    let app = server::router(state);
    let (alice_token, _) = register(&app, "alice@example.com", "Alice").await;
    let (bob_token, bob_id) = register(&app, "bob@example.com", "Bob").await;
    fund(&app, &alice_token, 1000.0, "INR").await;

    let (status, body) = send(
        &app,
        "POST",
        "/transactions/send",
        Some(&alice_token),
        Some(json!({ "recipient_id": bob_id, "amount": 250 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_balances"]["INR"], json!(750.0));

    let (status, body) = send(
        &app,
        "POST",
        "/wallet/withdraw",
        Some(&bob_token),
        Some(json!({ "amount": 100, "currency": "INR" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balances"]["INR"], json!(150.0));

    // Withdrawing more than the balance is a 400.
    let (status, _) = send(
        &app,
        "POST",
        "/wallet/withdraw",
        Some(&bob_token),
        Some(json!({ "amount": 1000, "currency": "INR" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_search_excludes_caller_and_requires_auth() {
    let (state, _feed) = test_state().await;
    let app = server::router(state);
    let (token, _) = register(&app, "alice@example.com", "Alice").await;
    register(&app, "bob@example.com", "Bob Example").await;

    let (status, body) = send(&app, "GET", "/users/search?q=example", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let hits = body["data"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["email"], json!("bob@example.com"));

    let (status, _) = send(&app, "GET", "/users/search?q=example", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_are_gated() {
    let (state, _feed) = test_state().await;

    // Seed an admin the way the app binary does.
    {
        let mut engine = state.engine.write().await;
        engine
            .register("admin@example.com", "admin123", "Admin", true)
            .await
            .unwrap();
    }
    let app = server::router(state);

    let (user_token, _) = register(&app, "mallory@example.com", "Mallory").await;
    let (status, _) = send(&app, "GET", "/admin/stats", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "admin@example.com", "password": "admin123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let admin_token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "GET", "/admin/stats", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["total_users"], json!(2));

    let (status, body) = send(&app, "GET", "/admin/users", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, "GET", "/admin/transactions", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn live_prices_fall_back_when_upstreams_are_unreachable() {
    // No mock feed at all: both upstream bases point at a closed port.
    let state = state_with_rates(RateSourceConfig {
        primary_base: "http://127.0.0.1:9".to_string(),
        secondary_base: "http://127.0.0.1:9".to_string(),
        ttl: Duration::from_secs(60),
        request_timeout: Duration::from_millis(250),
    })
    .await;
    let app = server::router(state);

    let (status, body) = send(&app, "GET", "/crypto/live-prices", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["source"], json!("fallback"));
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
}

#[tokio::test]
async fn conversion_quotes_round_trip() {
    let (state, _feed) = test_state().await;
    let app = server::router(state);

    let (status, body) = send(
        &app,
        "POST",
        "/crypto/convert",
        None,
        Some(json!({
            "amount": 835,
            "from_currency": "INR",
            "to_currency": "USDT",
            "direction": "fiat-to-crypto",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["converted_amount"], json!(10.0));

    let (status, _) = send(
        &app,
        "POST",
        "/crypto/convert",
        None,
        Some(json!({
            "amount": 5,
            "from_currency": "INR",
            "to_currency": "USD",
            "direction": "fiat-to-crypto",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn exchange_balances_report_mock_source_with_valuations() {
    let (state, _feed) = test_state().await;
    let app = server::router(state);

    let (status, body) = send(&app, "GET", "/crypto/wallet-balances", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], json!("mock"));
    let balances = body["balances"].as_array().unwrap();
    let btc = balances.iter().find(|b| b["asset"] == json!("BTC")).unwrap();
    // 0.15432 BTC at the mock feed price of 42000 USD.
    assert_eq!(btc["usd_value"], json!(6481.44));
}

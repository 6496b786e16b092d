use engine::{
    Currency, CryptoQuote, Engine, EngineError, SendCryptoCmd, SendingMethod, TransferKind,
    TransferStatus,
};
use migration::MigratorTrait;
use rust_decimal::Decimal;
use sea_orm::Database;

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

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

/// Fund a wallet through the public deposit flow.
async fn fund(engine: &mut Engine, user_id: uuid::Uuid, amount: &str, currency: Currency) {
    let record = engine
        .begin_deposit(user_id, dec(amount), currency)
        .await
        .unwrap();
    engine
        .confirm_deposit(user_id, &record.reference)
        .await
        .unwrap();
}

#[tokio::test]
async fn register_zeroes_every_currency_and_rejects_duplicates() {
    let mut engine = engine_with_db().await;

    let alice = engine
        .register("alice@example.com", "pw", "Alice", false)
        .await
        .unwrap();
    for currency in Currency::ALL {
        assert_eq!(alice.wallet.balance(currency), Decimal::ZERO);
    }

    // Same address modulo case must collide.
    let err = engine
        .register("Alice@Example.com", "pw2", "Alice Again", false)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
}

#[tokio::test]
async fn deposit_confirm_credits_exactly_once() {
    let mut engine = engine_with_db().await;
    let user = engine
        .register("bob@example.com", "pw", "Bob", false)
        .await
        .unwrap();

    let record = engine
        .begin_deposit(user.id, dec("500"), Currency::Inr)
        .await
        .unwrap();
    assert_eq!(record.status, TransferStatus::Pending);
    // Nothing is credited while the deposit is pending.
    assert_eq!(
        engine.balances(user.id).unwrap().balance(Currency::Inr),
        Decimal::ZERO
    );

    let (confirmed, wallet) = engine.confirm_deposit(user.id, &record.reference).await.unwrap();
    assert_eq!(confirmed.status, TransferStatus::Completed);
    assert_eq!(wallet.balance(Currency::Inr), dec("500"));

    // Confirming again is a no-op error and must not double-credit.
    let err = engine
        .confirm_deposit(user.id, &record.reference)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    assert_eq!(
        engine.balances(user.id).unwrap().balance(Currency::Inr),
        dec("500")
    );
}

#[tokio::test]
async fn withdraw_debits_and_appends_a_completed_record() {
    let mut engine = engine_with_db().await;
    let user = engine
        .register("carol@example.com", "pw", "Carol", false)
        .await
        .unwrap();
    fund(&mut engine, user.id, "100", Currency::Usd).await;

    let (record, wallet) = engine
        .withdraw(user.id, dec("40"), Currency::Usd)
        .await
        .unwrap();
    assert_eq!(record.kind, TransferKind::Withdrawal);
    assert_eq!(record.status, TransferStatus::Completed);
    assert_eq!(wallet.balance(Currency::Usd), dec("60"));

    let err = engine
        .withdraw(user.id, dec("100"), Currency::Usd)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance { .. }));
}

#[tokio::test]
async fn fiat_send_moves_balance_and_pairs_records() {
    let mut engine = engine_with_db().await;
    let alice = engine
        .register("alice@example.com", "pw", "Alice", false)
        .await
        .unwrap();
    let bob = engine
        .register("bob@example.com", "pw", "Bob", false)
        .await
        .unwrap();
    fund(&mut engine, alice.id, "1000", Currency::Inr).await;

    let outcome = engine
        .send_fiat(alice.id, bob.id, dec("250"), Currency::Inr, None)
        .await
        .unwrap();
    assert_eq!(outcome.sender_wallet.balance(Currency::Inr), dec("750"));
    assert_eq!(
        engine.balances(bob.id).unwrap().balance(Currency::Inr),
        dec("250")
    );

    let alice_history = engine.transactions_for(alice.id).await.unwrap();
    let bob_history = engine.transactions_for(bob.id).await.unwrap();
    let debit = &alice_history[0];
    let credit = &bob_history[0];
    assert_eq!(debit.kind, TransferKind::TransferOut);
    assert_eq!(credit.kind, TransferKind::TransferIn);
    assert_eq!(debit.correlation_id, credit.correlation_id);
    assert_eq!(debit.counterparty.as_deref(), Some("bob@example.com"));
    assert_eq!(credit.counterparty.as_deref(), Some("alice@example.com"));
}

#[tokio::test]
async fn crypto_send_from_direct_balance() {
    let mut engine = engine_with_db().await;
    let alice = engine
        .register("alice@example.com", "pw", "Alice", false)
        .await
        .unwrap();
    let bob = engine
        .register("bob@example.com", "pw", "Bob", false)
        .await
        .unwrap();
    fund(&mut engine, alice.id, "1", Currency::Btc).await;

    let outcome = engine
        .send_crypto(SendCryptoCmd {
            sender_id: alice.id,
            recipient_id: bob.id,
            amount: dec("0.4"),
            symbol: Currency::Btc,
            recipient_fiat: Currency::Usd,
            note: None,
            quote: btc_quote(),
        })
        .await
        .unwrap();

    assert_eq!(outcome.method, SendingMethod::CryptoDirect);
    assert_eq!(outcome.sender_wallet.balance(Currency::Btc), dec("0.6"));
    let expected_usd = dec("0.4") * dec("42000");
    assert_eq!(outcome.recipient_fiat_amount, expected_usd);
    assert_eq!(outcome.recipient_wallet.balance(Currency::Usd), expected_usd);
    assert_eq!(outcome.realized_rate, dec("42000"));

    // Paired-record invariant: one correlation id, debit + credit kinds,
    // equal crypto legs.
    let alice_history = engine.transactions_for(alice.id).await.unwrap();
    let bob_history = engine.transactions_for(bob.id).await.unwrap();
    let debit = &alice_history[0];
    let credit = &bob_history[0];
    assert_eq!(debit.kind, TransferKind::CryptoSend);
    assert_eq!(credit.kind, TransferKind::CryptoReceiveAsFiat);
    assert_eq!(debit.correlation_id, credit.correlation_id);
    assert_eq!(debit.crypto_amount, credit.crypto_amount);
    assert_eq!(debit.crypto_symbol, Some(Currency::Btc));
    assert_eq!(credit.crypto_symbol, Some(Currency::Btc));
    assert_eq!(credit.amount, expected_usd);
}

#[tokio::test]
async fn crypto_send_waterfalls_inr_before_usd() {
    let mut engine = engine_with_db().await;
    let alice = engine
        .register("alice@example.com", "pw", "Alice", false)
        .await
        .unwrap();
    let bob = engine
        .register("bob@example.com", "pw", "Bob", false)
        .await
        .unwrap();
    fund(&mut engine, alice.id, "1000", Currency::Inr).await;
    fund(&mut engine, alice.id, "50", Currency::Usd).await;

    // Request crypto worth 1200 INR: INR is zeroed, USD covers the 200 INR
    // shortfall at the 83.5 cross-rate.
    let amount = dec("1200") / dec("83.5");
    let outcome = engine
        .send_crypto(SendCryptoCmd {
            sender_id: alice.id,
            recipient_id: bob.id,
            amount,
            symbol: Currency::Usdt,
            recipient_fiat: Currency::Inr,
            note: None,
            quote: usdt_quote(),
        })
        .await
        .unwrap();

    assert_eq!(outcome.method, SendingMethod::FiatToCrypto);
    assert_eq!(outcome.sender_wallet.balance(Currency::Inr), Decimal::ZERO);
    let expected_usd_left = dec("50") - (amount * dec("83.5") - dec("1000")) / dec("83.5");
    assert_eq!(outcome.sender_wallet.balance(Currency::Usd), expected_usd_left);

    // No balance anywhere may go negative, whatever the sequence.
    for currency in Currency::ALL {
        assert!(outcome.sender_wallet.balance(currency) >= Decimal::ZERO);
        assert!(outcome.recipient_wallet.balance(currency) >= Decimal::ZERO);
    }
}

#[tokio::test]
async fn insufficient_crypto_send_changes_nothing() {
    let mut engine = engine_with_db().await;
    let alice = engine
        .register("alice@example.com", "pw", "Alice", false)
        .await
        .unwrap();
    let bob = engine
        .register("bob@example.com", "pw", "Bob", false)
        .await
        .unwrap();
    fund(&mut engine, alice.id, "83.5", Currency::Inr).await;

    let before_alice = engine.transactions_for(alice.id).await.unwrap().len();
    let before_bob = engine.transactions_for(bob.id).await.unwrap().len();

    let err = engine
        .send_crypto(SendCryptoCmd {
            sender_id: alice.id,
            recipient_id: bob.id,
            amount: dec("2"),
            symbol: Currency::Usdt,
            recipient_fiat: Currency::Usd,
            note: None,
            quote: usdt_quote(),
        })
        .await
        .unwrap_err();

    // The error carries the computed total the sender could have covered.
    assert_eq!(
        err,
        EngineError::InsufficientBalance {
            available: dec("1"),
            currency: Currency::Usdt,
        }
    );
    assert_eq!(
        engine.balances(alice.id).unwrap().balance(Currency::Inr),
        dec("83.5")
    );
    assert_eq!(
        engine.balances(bob.id).unwrap().balance(Currency::Usd),
        Decimal::ZERO
    );
    assert_eq!(
        engine.transactions_for(alice.id).await.unwrap().len(),
        before_alice
    );
    assert_eq!(
        engine.transactions_for(bob.id).await.unwrap().len(),
        before_bob
    );
}

#[tokio::test]
async fn search_excludes_caller_and_caps_results() {
    let mut engine = engine_with_db().await;
    let caller = engine
        .register("caller@example.com", "pw", "Caller", false)
        .await
        .unwrap();
    for i in 0..12 {
        engine
            .register(&format!("match{i}@example.com"), "pw", &format!("Match {i}"), false)
            .await
            .unwrap();
    }

    let hits = engine.search_users(caller.id, "match");
    assert_eq!(hits.len(), 10);
    assert!(hits.iter().all(|u| u.id != caller.id));

    // The caller matches their own email but must never see themselves.
    let hits = engine.search_users(caller.id, "caller");
    assert!(hits.is_empty());

    assert!(engine.search_users(caller.id, "  ").is_empty());
}

#[tokio::test]
async fn state_survives_an_engine_rebuild() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    let mut engine = Engine::builder().database(db.clone()).build().await.unwrap();
    let user = engine
        .register("dora@example.com", "pw", "Dora", false)
        .await
        .unwrap();
    fund(&mut engine, user.id, "12.5", Currency::Usd).await;

    let rebuilt = Engine::builder().database(db).build().await.unwrap();
    assert_eq!(
        rebuilt.balances(user.id).unwrap().balance(Currency::Usd),
        dec("12.5")
    );
    assert!(rebuilt.authenticate("dora@example.com", "pw").is_ok());
}

//! Domain core of the payment gateway.
//!
//! The [`Engine`] owns every user and wallet in memory and treats that state
//! as the source of truth for balances. Each mutation is first written to
//! the database inside a transaction (transfer records plus the touched
//! balance rows); only after the commit is the in-memory state updated, so
//! a failed write never leaves phantom balances behind.
//!
//! The engine performs no network I/O: crypto price quotes are resolved by
//! the caller and passed in, which keeps rate lookups outside any wallet
//! lock held around these methods.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

pub use currency::{Currency, CurrencyKind};
pub use error::EngineError;
pub use settlement::{CryptoQuote, FiatDeduction, SendingMethod, SettlementPlan};
pub use transfers::{TransferKind, TransferRecord, TransferStatus};
pub use users::User;
pub use wallet::Wallet;

mod currency;
mod error;
pub mod settlement;
mod transfers;
mod users;
mod wallet;

type ResultEngine<T> = Result<T, EngineError>;

/// Inputs for a crypto send. The quote must already be resolved.
#[derive(Clone, Debug)]
pub struct SendCryptoCmd {
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub amount: Decimal,
    pub symbol: Currency,
    pub recipient_fiat: Currency,
    pub note: Option<String>,
    pub quote: CryptoQuote,
}

/// Result of a completed crypto send.
#[derive(Clone, Debug)]
pub struct SettlementOutcome {
    pub reference: String,
    pub correlation_id: Uuid,
    pub method: SendingMethod,
    pub recipient_fiat_amount: Decimal,
    /// Effective price of one unit of the sent asset in the recipient's
    /// currency (`recipient_fiat_amount / amount`).
    pub realized_rate: Decimal,
    pub sender_wallet: Wallet,
    pub recipient_wallet: Wallet,
    pub recipient_display_name: String,
}

/// Result of a completed fiat peer transfer.
#[derive(Clone, Debug)]
pub struct FiatSendOutcome {
    pub reference: String,
    pub sender_wallet: Wallet,
    pub recipient_display_name: String,
}

#[derive(Debug)]
pub struct Engine {
    users: HashMap<Uuid, User>,
    by_email: HashMap<String, Uuid>,
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    fn new_reference(prefix: &str) -> String {
        let id = Uuid::new_v4().simple().to_string();
        format!("{prefix}{}", id[..12].to_uppercase())
    }

    fn user_ref(&self, user_id: Uuid) -> ResultEngine<&User> {
        self.users
            .get(&user_id)
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    /// Persist the given currencies of a wallet inside an open transaction.
    async fn persist_balances(
        db_tx: &DatabaseTransaction,
        user_id: Uuid,
        wallet: &Wallet,
        currencies: impl IntoIterator<Item = Currency>,
    ) -> ResultEngine<()> {
        for currency in currencies {
            wallet::balance_row(user_id, currency, wallet.balance(currency))
                .update(db_tx)
                .await?;
        }
        Ok(())
    }

    /// Register a new user with a zeroed wallet in every catalog currency.
    pub async fn register(
        &mut self,
        email: &str,
        password: &str,
        display_name: &str,
        is_admin: bool,
    ) -> ResultEngine<User> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() || display_name.trim().is_empty() {
            return Err(EngineError::InvalidAmount(
                "email, password and display name are required".to_string(),
            ));
        }
        let key = users::normalize(email);
        if self.by_email.contains_key(&key) {
            return Err(EngineError::ExistingKey(email.to_string()));
        }

        let user = User::new(
            email.to_string(),
            password.to_string(),
            display_name.trim().to_string(),
            is_admin,
            Utc::now(),
        );

        let db_tx = self.database.begin().await?;
        users::ActiveModel::from(&user).insert(&db_tx).await?;
        for (currency, amount) in user.wallet.entries() {
            wallet::balance_row(user.id, currency, amount)
                .insert(&db_tx)
                .await?;
        }
        db_tx.commit().await?;

        self.by_email.insert(key, user.id);
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Verify credentials; returns the user on a match.
    pub fn authenticate(&self, email: &str, password: &str) -> ResultEngine<&User> {
        let invalid = || EngineError::KeyNotFound("invalid credentials".to_string());
        let id = self
            .by_email
            .get(&users::normalize(email))
            .ok_or_else(invalid)?;
        let user = self.users.get(id).ok_or_else(invalid)?;
        if user.password != password {
            return Err(invalid());
        }
        Ok(user)
    }

    pub fn user(&self, user_id: Uuid) -> ResultEngine<&User> {
        self.user_ref(user_id)
    }

    pub fn all_users(&self) -> Vec<&User> {
        let mut users: Vec<&User> = self.users.values().collect();
        users.sort_by_key(|u| u.created_at);
        users
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Substring search over display name and email, excluding the caller.
    /// Capped at 10 results.
    pub fn search_users(&self, caller: Uuid, query: &str) -> Vec<&User> {
        let query = users::normalize(query);
        if query.is_empty() {
            return Vec::new();
        }
        let mut matches: Vec<&User> = self
            .users
            .values()
            .filter(|user| user.id != caller && user.matches(&query))
            .collect();
        matches.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        matches.truncate(10);
        matches
    }

    pub fn balances(&self, user_id: Uuid) -> ResultEngine<&Wallet> {
        Ok(&self.user_ref(user_id)?.wallet)
    }

    /// Start a deposit: a `Pending` record carrying a fresh reference. No
    /// balance changes until the payment is confirmed.
    pub async fn begin_deposit(
        &mut self,
        user_id: Uuid,
        amount: Decimal,
        currency: Currency,
    ) -> ResultEngine<TransferRecord> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount(format!(
                "deposit amount must be > 0, got {amount}"
            )));
        }
        self.user_ref(user_id)?;

        let correlation_id = Uuid::new_v4();
        let record = TransferRecord::new(
            user_id,
            TransferKind::Deposit,
            TransferStatus::Pending,
            amount,
            currency,
            Self::new_reference("TXN"),
            correlation_id,
            Utc::now(),
        );

        transfers::ActiveModel::from(&record)
            .insert(&self.database)
            .await?;
        Ok(record)
    }

    /// Complete a pending deposit: flips the record to `Completed` and
    /// credits the wallet, both in one transaction. Confirming an unknown
    /// or already-completed reference fails with `KeyNotFound` and changes
    /// nothing, so a double confirm credits exactly once.
    pub async fn confirm_deposit(
        &mut self,
        user_id: Uuid,
        reference: &str,
    ) -> ResultEngine<(TransferRecord, Wallet)> {
        let model = transfers::Entity::find()
            .filter(transfers::Column::Reference.eq(reference))
            .filter(transfers::Column::UserId.eq(user_id.to_string()))
            .filter(transfers::Column::Status.eq(TransferStatus::Pending.as_str()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;

        let mut record = TransferRecord::try_from(model)?;

        let mut wallet = self.user_ref(user_id)?.wallet.clone();
        wallet.credit(record.currency, record.amount)?;

        let db_tx = self.database.begin().await?;
        let update = transfers::ActiveModel {
            id: ActiveValue::Set(record.id.to_string()),
            status: ActiveValue::Set(TransferStatus::Completed.as_str().to_string()),
            ..Default::default()
        };
        update.update(&db_tx).await?;
        Self::persist_balances(&db_tx, user_id, &wallet, [record.currency]).await?;
        db_tx.commit().await?;

        record.status = TransferStatus::Completed;
        if let Some(user) = self.users.get_mut(&user_id) {
            user.wallet = wallet.clone();
        }
        Ok((record, wallet))
    }

    /// Withdraw from a single balance; records a completed `Withdrawal`.
    pub async fn withdraw(
        &mut self,
        user_id: Uuid,
        amount: Decimal,
        currency: Currency,
    ) -> ResultEngine<(TransferRecord, Wallet)> {
        let mut wallet = self.user_ref(user_id)?.wallet.clone();
        wallet.debit(currency, amount)?;

        let record = TransferRecord::new(
            user_id,
            TransferKind::Withdrawal,
            TransferStatus::Completed,
            amount,
            currency,
            Self::new_reference("TXN"),
            Uuid::new_v4(),
            Utc::now(),
        );

        let db_tx = self.database.begin().await?;
        transfers::ActiveModel::from(&record).insert(&db_tx).await?;
        Self::persist_balances(&db_tx, user_id, &wallet, [currency]).await?;
        db_tx.commit().await?;

        if let Some(user) = self.users.get_mut(&user_id) {
            user.wallet = wallet.clone();
        }
        Ok((record, wallet))
    }

    /// Fiat-only peer transfer: one currency, debited and credited as-is.
    pub async fn send_fiat(
        &mut self,
        sender_id: Uuid,
        recipient_id: Uuid,
        amount: Decimal,
        currency: Currency,
        note: Option<String>,
    ) -> ResultEngine<FiatSendOutcome> {
        if sender_id == recipient_id {
            return Err(EngineError::InvalidAmount(
                "sender and recipient must differ".to_string(),
            ));
        }
        if !currency.is_fiat() {
            return Err(EngineError::UnknownCurrency(currency.code().to_string()));
        }
        let (sender_email, mut sender_wallet) = {
            let sender = self.user_ref(sender_id)?;
            (sender.email.clone(), sender.wallet.clone())
        };
        let (recipient_email, recipient_name, mut recipient_wallet) = {
            let recipient = self.user_ref(recipient_id)?;
            (
                recipient.email.clone(),
                recipient.display_name.clone(),
                recipient.wallet.clone(),
            )
        };

        sender_wallet.debit(currency, amount)?;
        recipient_wallet.credit(currency, amount)?;

        let reference = Self::new_reference("TXN");
        let correlation_id = Uuid::new_v4();
        let created_at = Utc::now();

        let mut debit = TransferRecord::new(
            sender_id,
            TransferKind::TransferOut,
            TransferStatus::Completed,
            amount,
            currency,
            reference.clone(),
            correlation_id,
            created_at,
        );
        debit.counterparty = Some(recipient_email);
        debit.note = note.clone();

        let mut credit = TransferRecord::new(
            recipient_id,
            TransferKind::TransferIn,
            TransferStatus::Completed,
            amount,
            currency,
            reference.clone(),
            correlation_id,
            created_at,
        );
        credit.counterparty = Some(sender_email);
        credit.note = note;

        let db_tx = self.database.begin().await?;
        transfers::ActiveModel::from(&debit).insert(&db_tx).await?;
        transfers::ActiveModel::from(&credit).insert(&db_tx).await?;
        Self::persist_balances(&db_tx, sender_id, &sender_wallet, [currency]).await?;
        Self::persist_balances(&db_tx, recipient_id, &recipient_wallet, [currency]).await?;
        db_tx.commit().await?;

        if let Some(user) = self.users.get_mut(&sender_id) {
            user.wallet = sender_wallet.clone();
        }
        if let Some(user) = self.users.get_mut(&recipient_id) {
            user.wallet = recipient_wallet;
        }
        Ok(FiatSendOutcome {
            reference,
            sender_wallet,
            recipient_display_name: recipient_name,
        })
    }

    /// Send crypto to another user, settled as a fiat credit on their side.
    ///
    /// The whole read-check-mutate sequence runs under the caller's write
    /// lock on the engine; all preconditions are re-checked here so nothing
    /// is mutated on rejection.
    pub async fn send_crypto(&mut self, cmd: SendCryptoCmd) -> ResultEngine<SettlementOutcome> {
        if cmd.sender_id == cmd.recipient_id {
            return Err(EngineError::InvalidAmount(
                "sender and recipient must differ".to_string(),
            ));
        }
        let mut sender_wallet = {
            let sender = self.user_ref(cmd.sender_id)?;
            sender.wallet.clone()
        };
        let (recipient_name, mut recipient_wallet) = {
            let recipient = self.user_ref(cmd.recipient_id)?;
            (recipient.display_name.clone(), recipient.wallet.clone())
        };

        let plan = settlement::plan_send_crypto(
            &sender_wallet,
            cmd.amount,
            cmd.symbol,
            cmd.recipient_fiat,
            cmd.quote,
        )?;

        let mut sender_touched = Vec::new();
        if plan.crypto_deducted > Decimal::ZERO {
            sender_wallet.debit(cmd.symbol, plan.crypto_deducted)?;
            sender_touched.push(cmd.symbol);
        }
        for deduction in &plan.fiat_deductions {
            sender_wallet.debit(deduction.currency, deduction.amount)?;
            sender_touched.push(deduction.currency);
        }
        recipient_wallet.credit(cmd.recipient_fiat, plan.recipient_fiat_amount)?;

        let reference = Self::new_reference("CRYPTO");
        let correlation_id = Uuid::new_v4();
        let created_at = Utc::now();

        let mut debit = TransferRecord::new(
            cmd.sender_id,
            TransferKind::CryptoSend,
            TransferStatus::Completed,
            cmd.amount,
            cmd.symbol,
            reference.clone(),
            correlation_id,
            created_at,
        );
        debit.crypto_amount = Some(cmd.amount);
        debit.crypto_symbol = Some(cmd.symbol);
        debit.fiat_amount = Some(plan.recipient_fiat_amount);
        debit.fiat_currency = Some(cmd.recipient_fiat);
        debit.counterparty = Some(self.user_ref(cmd.recipient_id)?.email.clone());
        debit.note = cmd.note.clone();

        let mut credit = TransferRecord::new(
            cmd.recipient_id,
            TransferKind::CryptoReceiveAsFiat,
            TransferStatus::Completed,
            plan.recipient_fiat_amount,
            cmd.recipient_fiat,
            reference.clone(),
            correlation_id,
            created_at,
        );
        credit.crypto_amount = Some(cmd.amount);
        credit.crypto_symbol = Some(cmd.symbol);
        credit.fiat_amount = Some(plan.recipient_fiat_amount);
        credit.fiat_currency = Some(cmd.recipient_fiat);
        credit.counterparty = Some(self.user_ref(cmd.sender_id)?.email.clone());
        credit.note = cmd.note;

        let db_tx = self.database.begin().await?;
        transfers::ActiveModel::from(&debit).insert(&db_tx).await?;
        transfers::ActiveModel::from(&credit).insert(&db_tx).await?;
        Self::persist_balances(&db_tx, cmd.sender_id, &sender_wallet, sender_touched).await?;
        Self::persist_balances(
            &db_tx,
            cmd.recipient_id,
            &recipient_wallet,
            [cmd.recipient_fiat],
        )
        .await?;
        db_tx.commit().await?;

        if let Some(user) = self.users.get_mut(&cmd.sender_id) {
            user.wallet = sender_wallet.clone();
        }
        if let Some(user) = self.users.get_mut(&cmd.recipient_id) {
            user.wallet = recipient_wallet.clone();
        }
        Ok(SettlementOutcome {
            reference,
            correlation_id,
            method: plan.method,
            recipient_fiat_amount: plan.recipient_fiat_amount,
            realized_rate: plan.recipient_fiat_amount / cmd.amount,
            sender_wallet,
            recipient_wallet,
            recipient_display_name: recipient_name,
        })
    }

    /// The caller's transfer history, newest first.
    pub async fn transactions_for(&self, user_id: Uuid) -> ResultEngine<Vec<TransferRecord>> {
        self.user_ref(user_id)?;
        let models = transfers::Entity::find()
            .filter(transfers::Column::UserId.eq(user_id.to_string()))
            .order_by_desc(transfers::Column::CreatedAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(TransferRecord::try_from).collect()
    }

    /// Every transfer in the system, newest first (admin view).
    pub async fn all_transactions(&self) -> ResultEngine<Vec<TransferRecord>> {
        let models = transfers::Entity::find()
            .order_by_desc(transfers::Column::CreatedAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(TransferRecord::try_from).collect()
    }
}

/// The builder for `Engine`. Loads users and balances from the database so
/// the in-memory state starts from what was persisted.
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    pub async fn build(self) -> ResultEngine<Engine> {
        let mut users = HashMap::new();
        let mut by_email = HashMap::new();

        let user_models = users::Entity::find().all(&self.database).await?;
        for model in user_models {
            let mut user = User::try_from(model)?;

            let balance_models = wallet::Entity::find()
                .filter(wallet::Column::UserId.eq(user.id.to_string()))
                .all(&self.database)
                .await?;
            for row in balance_models {
                let currency = Currency::try_from(row.currency.as_str())?;
                let amount: Decimal = row.amount.parse().map_err(|_| {
                    EngineError::InvalidAmount(format!(
                        "unparseable stored amount: {}",
                        row.amount
                    ))
                })?;
                user.wallet.load_balance(currency, amount)?;
            }

            by_email.insert(users::normalize(&user.email), user.id);
            users.insert(user.id, user);
        }

        Ok(Engine {
            users,
            by_email,
            database: self.database,
        })
    }
}

//! Transfer records: the append-only ledger behind every money movement.
//!
//! A record is immutable once written, with one exception: a deposit is
//! created `Pending` and may transition to `Completed` exactly once when the
//! payment is confirmed. Nothing is ever updated or deleted beyond that.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    Deposit,
    Withdrawal,
    TransferOut,
    TransferIn,
    CryptoSend,
    CryptoReceiveAsFiat,
}

impl TransferKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::TransferOut => "transfer_out",
            Self::TransferIn => "transfer_in",
            Self::CryptoSend => "crypto_send",
            Self::CryptoReceiveAsFiat => "crypto_receive_as_fiat",
        }
    }
}

impl TryFrom<&str> for TransferKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            "transfer_out" => Ok(Self::TransferOut),
            "transfer_in" => Ok(Self::TransferIn),
            "crypto_send" => Ok(Self::CryptoSend),
            "crypto_receive_as_fiat" => Ok(Self::CryptoReceiveAsFiat),
            other => Err(EngineError::KeyNotFound(format!(
                "invalid transfer kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Completed,
}

impl TransferStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

impl TryFrom<&str> for TransferStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            other => Err(EngineError::KeyNotFound(format!(
                "invalid transfer status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransferRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TransferKind,
    pub status: TransferStatus,
    /// Principal amount of the record in `currency`. For a crypto send this
    /// is the crypto amount; for the paired fiat credit it is the fiat
    /// amount.
    pub amount: Decimal,
    pub currency: Currency,
    pub crypto_amount: Option<Decimal>,
    pub crypto_symbol: Option<Currency>,
    pub fiat_amount: Option<Decimal>,
    pub fiat_currency: Option<Currency>,
    /// Email of the other side of a transfer, when there is one.
    pub counterparty: Option<String>,
    pub note: Option<String>,
    /// Human-facing reference (deposit confirmation, receipts).
    pub reference: String,
    /// Links the paired debit/credit records of one settlement.
    pub correlation_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl TransferRecord {
    pub(crate) fn new(
        user_id: Uuid,
        kind: TransferKind,
        status: TransferStatus,
        amount: Decimal,
        currency: Currency,
        reference: String,
        correlation_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            status,
            amount,
            currency,
            crypto_amount: None,
            crypto_symbol: None,
            fiat_amount: None,
            fiat_currency: None,
            counterparty: None,
            note: None,
            reference,
            correlation_id,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transfers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub status: String,
    /// Amounts are stored as canonical decimal strings; SQLite has no exact
    /// numeric type.
    pub amount: String,
    pub currency: String,
    pub crypto_amount: Option<String>,
    pub crypto_symbol: Option<String>,
    pub fiat_amount: Option<String>,
    pub fiat_currency: Option<String>,
    pub counterparty: Option<String>,
    pub note: Option<String>,
    pub reference: String,
    pub correlation_id: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&TransferRecord> for ActiveModel {
    fn from(record: &TransferRecord) -> Self {
        Self {
            id: ActiveValue::Set(record.id.to_string()),
            user_id: ActiveValue::Set(record.user_id.to_string()),
            kind: ActiveValue::Set(record.kind.as_str().to_string()),
            status: ActiveValue::Set(record.status.as_str().to_string()),
            amount: ActiveValue::Set(record.amount.to_string()),
            currency: ActiveValue::Set(record.currency.code().to_string()),
            crypto_amount: ActiveValue::Set(record.crypto_amount.map(|a| a.to_string())),
            crypto_symbol: ActiveValue::Set(record.crypto_symbol.map(|c| c.code().to_string())),
            fiat_amount: ActiveValue::Set(record.fiat_amount.map(|a| a.to_string())),
            fiat_currency: ActiveValue::Set(record.fiat_currency.map(|c| c.code().to_string())),
            counterparty: ActiveValue::Set(record.counterparty.clone()),
            note: ActiveValue::Set(record.note.clone()),
            reference: ActiveValue::Set(record.reference.clone()),
            correlation_id: ActiveValue::Set(record.correlation_id.to_string()),
            created_at: ActiveValue::Set(record.created_at),
        }
    }
}

fn parse_decimal(raw: &str) -> ResultEngine<Decimal> {
    raw.parse()
        .map_err(|_| EngineError::InvalidAmount(format!("unparseable stored amount: {raw}")))
}

impl TryFrom<Model> for TransferRecord {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let not_exists = || EngineError::KeyNotFound("transfer not exists".to_string());
        Ok(Self {
            id: Uuid::parse_str(&model.id).map_err(|_| not_exists())?,
            user_id: Uuid::parse_str(&model.user_id).map_err(|_| not_exists())?,
            kind: TransferKind::try_from(model.kind.as_str())?,
            status: TransferStatus::try_from(model.status.as_str())?,
            amount: parse_decimal(&model.amount)?,
            currency: Currency::try_from(model.currency.as_str())?,
            crypto_amount: model.crypto_amount.as_deref().map(parse_decimal).transpose()?,
            crypto_symbol: model
                .crypto_symbol
                .as_deref()
                .map(Currency::try_from)
                .transpose()?,
            fiat_amount: model.fiat_amount.as_deref().map(parse_decimal).transpose()?,
            fiat_currency: model
                .fiat_currency
                .as_deref()
                .map(Currency::try_from)
                .transpose()?,
            counterparty: model.counterparty,
            note: model.note,
            reference: model.reference,
            correlation_id: Uuid::parse_str(&model.correlation_id).map_err(|_| not_exists())?,
            created_at: model.created_at,
        })
    }
}

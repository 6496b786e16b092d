use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Currency codes accepted and produced by the API.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Inr,
    Usd,
    Eur,
    Gbp,
    Btc,
    Eth,
    Usdt,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Self::Inr => "INR",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Btc => "BTC",
            Self::Eth => "ETH",
            Self::Usdt => "USDT",
        }
    }
}

pub mod auth {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RegisterRequest {
        pub email: String,
        pub password: String,
        pub display_name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoginRequest {
        pub email: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AuthResponse {
        pub success: bool,
        pub token: String,
        pub user: super::user::UserView,
    }
}

pub mod user {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub id: Uuid,
        pub email: String,
        pub display_name: String,
        pub is_admin: bool,
    }

    /// Search hit; deliberately excludes balances and the admin flag.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserSummary {
        pub id: Uuid,
        pub email: String,
        pub display_name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SearchResponse {
        pub success: bool,
        pub data: Vec<UserSummary>,
    }
}

pub mod wallet {
    use super::*;
    use std::collections::BTreeMap;

    /// Full wallet map, every catalog currency present.
    pub type BalanceMap = BTreeMap<Currency, Decimal>;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalancesResponse {
        pub success: bool,
        pub balances: BalanceMap,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WithdrawRequest {
        pub amount: Decimal,
        pub currency: Currency,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WithdrawResponse {
        pub success: bool,
        pub message: String,
        pub reference: String,
        pub balances: BalanceMap,
    }
}

pub mod payment {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GenerateQrRequest {
        pub amount: Decimal,
        pub currency: Currency,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GenerateQrResponse {
        pub success: bool,
        /// Reference to pass back to the confirm endpoint.
        pub reference: String,
        /// URL of the externally rendered QR image.
        pub qr_code: String,
        pub amount: Decimal,
        pub currency: Currency,
        pub status: super::transaction::TransferStatus,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ConfirmRequest {
        pub reference: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ConfirmResponse {
        pub success: bool,
        pub message: String,
        pub balances: super::wallet::BalanceMap,
        pub transaction: super::transaction::TransferView,
    }
}

pub mod transaction {
    use super::*;

    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
    )]
    #[serde(rename_all = "snake_case")]
    pub enum TransferKind {
        Deposit,
        Withdrawal,
        TransferOut,
        TransferIn,
        CryptoSend,
        CryptoReceiveAsFiat,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransferStatus {
        Pending,
        Completed,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SendingMethod {
        CryptoDirect,
        FiatToCrypto,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferView {
        pub id: Uuid,
        pub kind: TransferKind,
        pub status: TransferStatus,
        pub amount: Decimal,
        pub currency: Currency,
        pub crypto_amount: Option<Decimal>,
        pub crypto_symbol: Option<Currency>,
        pub fiat_amount: Option<Decimal>,
        pub fiat_currency: Option<Currency>,
        pub counterparty: Option<String>,
        pub note: Option<String>,
        pub reference: String,
        pub correlation_id: Uuid,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HistoryResponse {
        pub success: bool,
        pub data: Vec<TransferView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SendFiatRequest {
        pub recipient_id: Uuid,
        pub amount: Decimal,
        /// Defaults to INR when omitted.
        pub currency: Option<Currency>,
        pub note: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SendFiatResponse {
        pub success: bool,
        pub reference: String,
        pub message: String,
        pub new_balances: super::wallet::BalanceMap,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SendCryptoRequest {
        pub recipient_id: Uuid,
        pub crypto_amount: Decimal,
        pub crypto_symbol: Currency,
        /// Fiat currency the recipient is credited in.
        pub recipient_currency: Currency,
        pub note: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ConversionDetails {
        pub sent_crypto_amount: Decimal,
        pub sent_crypto_symbol: Currency,
        pub received_fiat_amount: Decimal,
        pub received_fiat_currency: Currency,
        /// Realized price of one unit in the recipient currency.
        pub exchange_rate: Decimal,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SendCryptoResponse {
        pub success: bool,
        pub reference: String,
        pub message: String,
        pub sending_method: SendingMethod,
        pub sender_balances: super::wallet::BalanceMap,
        pub recipient_balances: super::wallet::BalanceMap,
        pub conversion: ConversionDetails,
    }
}

pub mod prices {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PriceView {
        pub symbol: String,
        pub name: String,
        pub price_usd: Decimal,
        pub price_inr: Decimal,
        pub change_24h: f64,
        pub glyph: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LivePricesResponse {
        pub success: bool,
        pub data: Vec<PriceView>,
        /// Which upstream (or fallback) produced the snapshot.
        pub source: String,
        pub message: String,
        pub cached: bool,
        pub cache_age_ms: u64,
        pub timestamp: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CurrencyInfo {
        pub code: Currency,
        pub name: String,
        pub glyph: String,
        pub kind: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CatalogResponse {
        pub success: bool,
        pub data: Vec<CurrencyInfo>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub enum ConvertDirection {
        #[serde(rename = "fiat-to-crypto")]
        FiatToCrypto,
        #[serde(rename = "crypto-to-fiat")]
        CryptoToFiat,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ConvertRequest {
        pub amount: Decimal,
        pub from_currency: Currency,
        pub to_currency: Currency,
        pub direction: ConvertDirection,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ConvertOutcome {
        pub original_amount: Decimal,
        pub converted_amount: Decimal,
        pub from_currency: Currency,
        pub to_currency: Currency,
        pub direction: ConvertDirection,
        pub timestamp: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ConvertResponse {
        pub success: bool,
        pub data: ConvertOutcome,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExchangeBalanceView {
        pub asset: String,
        pub balance: Decimal,
        pub usd_value: Decimal,
        pub inr_value: Decimal,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExchangeBalancesResponse {
        pub success: bool,
        pub balances: Vec<ExchangeBalanceView>,
        pub source: String,
        pub total_usd_value: Decimal,
        pub total_inr_value: Decimal,
        pub timestamp: DateTime<Utc>,
    }
}

pub mod admin {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AdminUserView {
        pub id: Uuid,
        pub email: String,
        pub display_name: String,
        pub is_admin: bool,
        pub created_at: DateTime<Utc>,
        pub balances: super::wallet::BalanceMap,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AdminUsersResponse {
        pub success: bool,
        pub data: Vec<AdminUserView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AdminTransactionsResponse {
        pub success: bool,
        pub data: Vec<super::transaction::TransferView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TopUser {
        pub id: Uuid,
        pub email: String,
        pub display_name: String,
        /// Whole wallet valued in INR at the fixed cross-rates.
        pub total_inr_value: Decimal,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AdminStats {
        pub total_users: u64,
        pub total_transactions: u64,
        /// Sum of record amounts as recorded, regardless of currency.
        pub total_volume: Decimal,
        /// Percentage of completed transactions, rounded.
        pub success_rate: u32,
        pub recent_transactions: u64,
        pub recent_users: u64,
        pub transaction_kinds: BTreeMap<super::transaction::TransferKind, u64>,
        pub average_transaction_value: Decimal,
        pub top_users: Vec<TopUser>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AdminStatsResponse {
        pub success: bool,
        pub stats: AdminStats,
    }
}

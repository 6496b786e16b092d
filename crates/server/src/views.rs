//! Mapping between engine domain types and the wire DTOs.

use api_types::transaction::{SendingMethod, TransferKind, TransferStatus, TransferView};
use api_types::user::UserView;
use api_types::wallet::BalanceMap;

pub(crate) fn api_currency(currency: engine::Currency) -> api_types::Currency {
    match currency {
        engine::Currency::Inr => api_types::Currency::Inr,
        engine::Currency::Usd => api_types::Currency::Usd,
        engine::Currency::Eur => api_types::Currency::Eur,
        engine::Currency::Gbp => api_types::Currency::Gbp,
        engine::Currency::Btc => api_types::Currency::Btc,
        engine::Currency::Eth => api_types::Currency::Eth,
        engine::Currency::Usdt => api_types::Currency::Usdt,
    }
}

pub(crate) fn engine_currency(currency: api_types::Currency) -> engine::Currency {
    match currency {
        api_types::Currency::Inr => engine::Currency::Inr,
        api_types::Currency::Usd => engine::Currency::Usd,
        api_types::Currency::Eur => engine::Currency::Eur,
        api_types::Currency::Gbp => engine::Currency::Gbp,
        api_types::Currency::Btc => engine::Currency::Btc,
        api_types::Currency::Eth => engine::Currency::Eth,
        api_types::Currency::Usdt => engine::Currency::Usdt,
    }
}

pub(crate) fn api_kind(kind: engine::TransferKind) -> TransferKind {
    match kind {
        engine::TransferKind::Deposit => TransferKind::Deposit,
        engine::TransferKind::Withdrawal => TransferKind::Withdrawal,
        engine::TransferKind::TransferOut => TransferKind::TransferOut,
        engine::TransferKind::TransferIn => TransferKind::TransferIn,
        engine::TransferKind::CryptoSend => TransferKind::CryptoSend,
        engine::TransferKind::CryptoReceiveAsFiat => TransferKind::CryptoReceiveAsFiat,
    }
}

pub(crate) fn api_status(status: engine::TransferStatus) -> TransferStatus {
    match status {
        engine::TransferStatus::Pending => TransferStatus::Pending,
        engine::TransferStatus::Completed => TransferStatus::Completed,
    }
}

pub(crate) fn api_method(method: engine::SendingMethod) -> SendingMethod {
    match method {
        engine::SendingMethod::CryptoDirect => SendingMethod::CryptoDirect,
        engine::SendingMethod::FiatToCrypto => SendingMethod::FiatToCrypto,
    }
}

pub(crate) fn balance_map(wallet: &engine::Wallet) -> BalanceMap {
    wallet
        .entries()
        .map(|(currency, amount)| (api_currency(currency), amount))
        .collect()
}

pub(crate) fn user_view(user: &engine::User) -> UserView {
    UserView {
        id: user.id,
        email: user.email.clone(),
        display_name: user.display_name.clone(),
        is_admin: user.is_admin,
    }
}

pub(crate) fn transfer_view(record: engine::TransferRecord) -> TransferView {
    TransferView {
        id: record.id,
        kind: api_kind(record.kind),
        status: api_status(record.status),
        amount: record.amount,
        currency: api_currency(record.currency),
        crypto_amount: record.crypto_amount,
        crypto_symbol: record.crypto_symbol.map(api_currency),
        fiat_amount: record.fiat_amount,
        fiat_currency: record.fiat_currency.map(api_currency),
        counterparty: record.counterparty,
        note: record.note,
        reference: record.reference,
        correlation_id: record.correlation_id,
        created_at: record.created_at,
    }
}

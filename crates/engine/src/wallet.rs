//! The multi-currency wallet held by every user.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::entity::{ActiveValue, prelude::*};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine};

/// Per-user mapping of currency to a non-negative balance.
///
/// Every known currency is present from registration, so lookups never
/// distinguish "absent" from "zero". All mutation goes through
/// [`Wallet::credit`] and [`Wallet::debit`]; the non-negative invariant is
/// enforced there and nowhere else.
#[derive(Clone, Debug, PartialEq)]
pub struct Wallet {
    balances: HashMap<Currency, Decimal>,
}

impl Wallet {
    /// A wallet with every catalog currency at zero.
    #[must_use]
    pub fn zeroed() -> Self {
        Self {
            balances: Currency::ALL
                .into_iter()
                .map(|currency| (currency, Decimal::ZERO))
                .collect(),
        }
    }

    #[must_use]
    pub fn balance(&self, currency: Currency) -> Decimal {
        self.balances.get(&currency).copied().unwrap_or_default()
    }

    /// Iterate over all `(currency, balance)` pairs in catalog order.
    pub fn entries(&self) -> impl Iterator<Item = (Currency, Decimal)> + '_ {
        Currency::ALL
            .into_iter()
            .map(|currency| (currency, self.balance(currency)))
    }

    /// Sum of all fiat holdings converted to INR at the fixed cross-rates.
    #[must_use]
    pub fn total_fiat_in_inr(&self) -> Decimal {
        Currency::FIAT
            .into_iter()
            .filter_map(|fiat| {
                let rate = fiat.inr_cross_rate()?;
                Some(self.balance(fiat) * rate)
            })
            .sum()
    }

    pub fn credit(&mut self, currency: Currency, amount: Decimal) -> ResultEngine<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount(format!(
                "credit amount must be > 0, got {amount}"
            )));
        }
        let balance = self.balances.entry(currency).or_default();
        *balance += amount;
        Ok(*balance)
    }

    pub fn debit(&mut self, currency: Currency, amount: Decimal) -> ResultEngine<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount(format!(
                "debit amount must be > 0, got {amount}"
            )));
        }
        let balance = self.balances.entry(currency).or_default();
        if amount > *balance {
            return Err(EngineError::InsufficientBalance {
                available: *balance,
                currency,
            });
        }
        *balance -= amount;
        Ok(*balance)
    }

    /// Overwrite one balance. Only for loading persisted state; rejects
    /// negative values rather than ever holding one.
    pub(crate) fn load_balance(&mut self, currency: Currency, amount: Decimal) -> ResultEngine<()> {
        if amount < Decimal::ZERO {
            return Err(EngineError::InvalidAmount(format!(
                "persisted balance is negative: {amount} {currency}"
            )));
        }
        self.balances.insert(currency, amount);
        Ok(())
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// One persisted balance row per user and currency.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub currency: String,
    /// Canonical decimal string; SQLite has no exact numeric type.
    pub amount: String,
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

pub(crate) fn balance_row(user_id: Uuid, currency: Currency, amount: Decimal) -> ActiveModel {
    ActiveModel {
        user_id: ActiveValue::Set(user_id.to_string()),
        currency: ActiveValue::Set(currency.code().to_string()),
        amount: ActiveValue::Set(amount.to_string()),
    }
}

//! Registered users and their lookup rules.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{EngineError, Wallet};

/// A registered user together with the wallet they exclusively own.
#[derive(Clone, Debug)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub wallet: Wallet,
}

impl User {
    pub(crate) fn new(
        email: String,
        password: String,
        display_name: String,
        is_admin: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            display_name,
            password,
            is_admin,
            created_at,
            wallet: Wallet::zeroed(),
        }
    }

    /// True if `query` (already normalized) is a substring of the user's
    /// normalized name or email.
    pub(crate) fn matches(&self, query: &str) -> bool {
        normalize(&self.display_name).contains(query) || normalize(&self.email).contains(query)
    }
}

/// Case- and width-insensitive form used for email uniqueness and search.
pub(crate) fn normalize(text: &str) -> String {
    text.trim().nfkc().collect::<String>().to_lowercase()
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub is_admin: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::wallet::Entity")]
    Balances,
    #[sea_orm(has_many = "super::transfers::Entity")]
    Transfers,
}

impl Related<super::wallet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Balances.def()
    }
}

impl Related<super::transfers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transfers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&User> for ActiveModel {
    fn from(user: &User) -> Self {
        Self {
            id: ActiveValue::Set(user.id.to_string()),
            email: ActiveValue::Set(user.email.clone()),
            password: ActiveValue::Set(user.password.clone()),
            display_name: ActiveValue::Set(user.display_name.clone()),
            is_admin: ActiveValue::Set(user.is_admin),
            created_at: ActiveValue::Set(user.created_at),
        }
    }
}

impl TryFrom<Model> for User {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("user not exists".to_string()))?,
            email: model.email,
            display_name: model.display_name,
            password: model.password,
            is_admin: model.is_admin,
            created_at: model.created_at,
            wallet: Wallet::zeroed(),
        })
    }
}

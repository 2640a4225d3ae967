//! Category registry per merchant.
//!
//! Categories are typed (income or expense) and unique per normalized name
//! within `(owner, kind)`. They are archived, never deleted, so historical
//! transactions keep their reference.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, TransactionKind};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub kind: TransactionKind,
    pub description: Option<String>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

/// Partial update for `Engine::update_category`. `None` keeps the value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub archived: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub name_norm: String,
    pub kind: String,
    pub description: Option<String>,
    pub archived: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::merchants::Entity",
        from = "Column::OwnerId",
        to = "super::merchants::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Merchant,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::merchants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Merchant.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Category {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            owner_id: model.owner_id,
            name: model.name,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            description: model.description,
            archived: model.archived,
            created_at: model.created_at,
        })
    }
}

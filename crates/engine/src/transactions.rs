//! Ledger transactions.
//!
//! A `Transaction` is an immutable income or expense entry. Rows are never
//! updated or deleted: a correction is a new entry with the opposite sign
//! that points at the original through `reverses_id`.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, util::model_currency};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Sign applied to `amount_minor` when computing net values.
    pub fn sign(self) -> i64 {
        match self {
            Self::Income => 1,
            Self::Expense => -1,
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::InvalidKind(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    #[default]
    Card,
    BankTransfer,
    Mobile,
    Other,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 5] = [
        Self::Cash,
        Self::Card,
        Self::BankTransfer,
        Self::Mobile,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::BankTransfer => "bank_transfer",
            Self::Mobile => "mobile",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for PaymentMethod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == value)
            .ok_or_else(|| EngineError::InvalidKind(format!("invalid payment method: {value}")))
    }
}

/// Ledger entry as returned to callers.
///
/// `amount_minor` is positive for regular entries and negative for
/// reversals; `kind` tells whether it counts as income or expense.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub currency: Currency,
    pub category_id: Option<Uuid>,
    pub payment_method: PaymentMethod,
    pub description: Option<String>,
    pub reference_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub reverses_id: Option<Uuid>,
}

impl Transaction {
    /// Amount with the income/expense sign applied.
    pub fn signed_amount_minor(&self) -> i64 {
        self.kind.sign() * self.amount_minor
    }
}

/// Input for `Engine::record_transaction`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount_minor: i64,
    /// Defaults to the merchant base currency.
    pub currency: Option<Currency>,
    pub category_id: Option<Uuid>,
    pub payment_method: PaymentMethod,
    pub description: Option<String>,
    pub reference_id: Option<String>,
    /// Defaults to now.
    pub occurred_at: Option<DateTime<Utc>>,
}

impl NewTransaction {
    pub fn new(kind: TransactionKind, amount_minor: i64) -> Self {
        Self {
            kind,
            amount_minor,
            currency: None,
            category_id: None,
            payment_method: PaymentMethod::default(),
            description: None,
            reference_id: None,
            occurred_at: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub kind: String,
    pub amount_minor: i64,
    pub currency: String,
    pub category_id: Option<Uuid>,
    pub payment_method: String,
    pub description: Option<String>,
    pub reference_id: Option<String>,
    pub occurred_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
    pub reverses_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::merchants::Entity",
        from = "Column::OwnerId",
        to = "super::merchants::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Merchant,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Category,
}

impl Related<super::merchants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Merchant.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            owner_id: model.owner_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            currency: model_currency(&model.currency)?,
            category_id: model.category_id,
            payment_method: PaymentMethod::try_from(model.payment_method.as_str())?,
            description: model.description,
            reference_id: model.reference_id,
            occurred_at: model.occurred_at,
            created_at: model.created_at,
            reverses_id: model.reverses_id,
        })
    }
}

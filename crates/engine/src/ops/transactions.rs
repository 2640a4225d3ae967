use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    DateRange, EngineError, Money, NewTransaction, PaymentMethod, ResultEngine, Transaction,
    TransactionKind, transactions,
    util::{ensure_base_currency, model_currency, normalize_optional_text},
};

use super::{Engine, with_tx};

const DEFAULT_LIMIT: u64 = 100;
const MAX_LIMIT: u64 = 1000;
const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_REFERENCE_LEN: usize = 100;

/// Filters for listing transactions. Results are newest first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    pub category_id: Option<Uuid>,
    pub payment_method: Option<PaymentMethod>,
    /// Inclusive calendar range on `occurred_at`.
    pub range: Option<DateRange>,
    /// 1..=1000, defaults to 100.
    pub limit: Option<u64>,
}

fn validate_limit(limit: Option<u64>) -> ResultEngine<u64> {
    match limit {
        None => Ok(DEFAULT_LIMIT),
        Some(limit) if (1..=MAX_LIMIT).contains(&limit) => Ok(limit),
        Some(limit) => Err(EngineError::InvalidAmount(format!(
            "limit must be between 1 and {MAX_LIMIT}, got {limit}"
        ))),
    }
}

fn bounded_text(value: Option<&str>, label: &str, max: usize) -> ResultEngine<Option<String>> {
    let text = normalize_optional_text(value);
    if text.as_ref().is_some_and(|t| t.chars().count() > max) {
        return Err(EngineError::InvalidName(format!(
            "{label} must be at most {max} characters"
        )));
    }
    Ok(text)
}

impl Engine {
    /// Appends an income or expense entry to the ledger.
    ///
    /// The amount must be positive and in the merchant base currency. The
    /// optional category must belong to the merchant, share the kind and not
    /// be archived.
    pub async fn record_transaction(
        &self,
        owner: Uuid,
        input: NewTransaction,
    ) -> ResultEngine<Transaction> {
        if input.amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        if input.amount_minor > Money::MAX_ENTRY.minor() {
            return Err(EngineError::InvalidAmount(format!(
                "amount_minor must be at most {}",
                Money::MAX_ENTRY.minor()
            )));
        }
        let description = bounded_text(
            input.description.as_deref(),
            "description",
            MAX_DESCRIPTION_LEN,
        )?;
        let reference_id = bounded_text(
            input.reference_id.as_deref(),
            "reference_id",
            MAX_REFERENCE_LEN,
        )?;

        with_tx!(self, |db_tx| {
            let merchant = self.require_merchant(&db_tx, owner).await?;
            let base = model_currency(&merchant.base_currency)?;
            let currency = input.currency.unwrap_or(base);
            ensure_base_currency(base, currency)?;

            if let Some(category_id) = input.category_id {
                let category = self.require_category(&db_tx, owner, category_id).await?;
                if category.kind != input.kind.as_str() {
                    return Err(EngineError::InvalidKind(format!(
                        "category '{}' is an {} category",
                        category.name, category.kind
                    )));
                }
                if category.archived {
                    return Err(EngineError::InvalidName(format!(
                        "category '{}' is archived",
                        category.name
                    )));
                }
            }

            let now = Utc::now();
            let model = transactions::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                owner_id: ActiveValue::Set(owner),
                kind: ActiveValue::Set(input.kind.as_str().to_string()),
                amount_minor: ActiveValue::Set(input.amount_minor),
                currency: ActiveValue::Set(currency.code().to_string()),
                category_id: ActiveValue::Set(input.category_id),
                payment_method: ActiveValue::Set(input.payment_method.as_str().to_string()),
                description: ActiveValue::Set(description),
                reference_id: ActiveValue::Set(reference_id),
                occurred_at: ActiveValue::Set(input.occurred_at.unwrap_or(now)),
                created_at: ActiveValue::Set(now),
                reverses_id: ActiveValue::Set(None),
            }
            .insert(&db_tx)
            .await?;

            tracing::debug!(owner = %owner, transaction = %model.id, "transaction recorded");
            Transaction::try_from(model)
        })
    }

    /// Appends the offsetting entry for `id`.
    ///
    /// The reversal keeps kind, category and payment method of the original
    /// with the amount negated. Each transaction can be reversed once and a
    /// reversal cannot be reversed.
    pub async fn reverse_transaction(
        &self,
        owner: Uuid,
        id: Uuid,
        note: Option<&str>,
        occurred_at: Option<DateTime<Utc>>,
    ) -> ResultEngine<Transaction> {
        let note = bounded_text(note, "note", MAX_DESCRIPTION_LEN)?;

        with_tx!(self, |db_tx| {
            let original = self.require_transaction(&db_tx, owner, id).await?;
            if original.reverses_id.is_some() {
                return Err(EngineError::InvalidKind(
                    "a reversal entry cannot be reversed".to_string(),
                ));
            }
            let already = transactions::Entity::find()
                .filter(transactions::Column::ReversesId.eq(id))
                .one(&db_tx)
                .await?;
            if already.is_some() {
                return Err(EngineError::ExistingKey(format!(
                    "reversal of transaction {id}"
                )));
            }

            let now = Utc::now();
            let description = note.or_else(|| Some(format!("Reversal of {id}")));
            let model = transactions::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                owner_id: ActiveValue::Set(owner),
                kind: ActiveValue::Set(original.kind.clone()),
                amount_minor: ActiveValue::Set(-original.amount_minor),
                currency: ActiveValue::Set(original.currency.clone()),
                category_id: ActiveValue::Set(original.category_id),
                payment_method: ActiveValue::Set(original.payment_method.clone()),
                description: ActiveValue::Set(description),
                reference_id: ActiveValue::Set(original.reference_id.clone()),
                occurred_at: ActiveValue::Set(occurred_at.unwrap_or(now)),
                created_at: ActiveValue::Set(now),
                reverses_id: ActiveValue::Set(Some(id)),
            }
            .insert(&db_tx)
            .await?;

            tracing::info!(owner = %owner, original = %id, reversal = %model.id, "transaction reversed");
            Transaction::try_from(model)
        })
    }

    pub async fn transaction(&self, owner: Uuid, id: Uuid) -> ResultEngine<Transaction> {
        let model = self.require_transaction(&self.database, owner, id).await?;
        Transaction::try_from(model)
    }

    /// Lists the merchant transactions matching `filter`, newest first.
    pub async fn list_transactions(
        &self,
        owner: Uuid,
        filter: &TransactionFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        let limit = validate_limit(filter.limit)?;

        let mut query =
            transactions::Entity::find().filter(transactions::Column::OwnerId.eq(owner));
        if let Some(kind) = filter.kind {
            query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(transactions::Column::CategoryId.eq(category_id));
        }
        if let Some(method) = filter.payment_method {
            query = query.filter(transactions::Column::PaymentMethod.eq(method.as_str()));
        }
        if let Some(range) = filter.range {
            query = query
                .filter(transactions::Column::OccurredAt.gte(range.start_utc()))
                .filter(transactions::Column::OccurredAt.lt(range.end_exclusive_utc()));
        }

        query
            .order_by_desc(transactions::Column::OccurredAt)
            .order_by_desc(transactions::Column::CreatedAt)
            .limit(limit)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_bounds() {
        assert_eq!(validate_limit(None).unwrap(), 100);
        assert_eq!(validate_limit(Some(1000)).unwrap(), 1000);
        assert!(validate_limit(Some(0)).is_err());
        assert!(validate_limit(Some(1001)).is_err());
    }
}

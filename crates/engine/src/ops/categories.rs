use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Category, CategoryUpdate, EngineError, ResultEngine, TransactionKind, categories,
    util::{normalize_display, normalize_key, normalize_optional_text},
};

use super::{Engine, with_tx};

const MAX_DESCRIPTION_LEN: usize = 500;

fn validate_description(value: Option<&str>) -> ResultEngine<Option<String>> {
    let description = normalize_optional_text(value);
    if description
        .as_ref()
        .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
    {
        return Err(EngineError::InvalidName(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(description)
}

impl Engine {
    /// Creates a category. Names are unique per `(owner, kind)` after
    /// normalization, archived categories included.
    pub async fn create_category(
        &self,
        owner: Uuid,
        name: &str,
        kind: TransactionKind,
        description: Option<&str>,
    ) -> ResultEngine<Category> {
        let display = normalize_display(name, "category")?;
        let name_norm = normalize_key(&display, "category")?;
        let description = validate_description(description)?;

        with_tx!(self, |db_tx| {
            self.require_merchant(&db_tx, owner).await?;
            Self::ensure_category_name_free(&db_tx, owner, kind, &name_norm, None).await?;

            let model = categories::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                owner_id: ActiveValue::Set(owner),
                name: ActiveValue::Set(display),
                name_norm: ActiveValue::Set(name_norm),
                kind: ActiveValue::Set(kind.as_str().to_string()),
                description: ActiveValue::Set(description),
                archived: ActiveValue::Set(false),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;
            Category::try_from(model)
        })
    }

    pub async fn category(&self, owner: Uuid, id: Uuid) -> ResultEngine<Category> {
        let model = self.require_category(&self.database, owner, id).await?;
        Category::try_from(model)
    }

    /// Lists categories ordered by kind and name.
    pub async fn list_categories(
        &self,
        owner: Uuid,
        kind: Option<TransactionKind>,
        include_archived: bool,
    ) -> ResultEngine<Vec<Category>> {
        let mut query = categories::Entity::find().filter(categories::Column::OwnerId.eq(owner));
        if let Some(kind) = kind {
            query = query.filter(categories::Column::Kind.eq(kind.as_str()));
        }
        if !include_archived {
            query = query.filter(categories::Column::Archived.eq(false));
        }
        query
            .order_by_asc(categories::Column::Kind)
            .order_by_asc(categories::Column::NameNorm)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Category::try_from)
            .collect()
    }

    /// Renames, re-describes or (un)archives a category.
    ///
    /// Categories are never deleted: transactions keep pointing at archived
    /// ones, and archived categories cannot receive new transactions.
    pub async fn update_category(
        &self,
        owner: Uuid,
        id: Uuid,
        update: CategoryUpdate,
    ) -> ResultEngine<Category> {
        let rename = match update.name.as_deref() {
            Some(name) => {
                let display = normalize_display(name, "category")?;
                let key = normalize_key(&display, "category")?;
                Some((display, key))
            }
            None => None,
        };
        let description = update
            .description
            .as_ref()
            .map(|d| validate_description(d.as_deref()))
            .transpose()?;

        with_tx!(self, |db_tx| {
            let model = self.require_category(&db_tx, owner, id).await?;
            let kind = TransactionKind::try_from(model.kind.as_str())?;
            let mut active: categories::ActiveModel = model.into();

            if let Some((display, key)) = rename {
                Self::ensure_category_name_free(&db_tx, owner, kind, &key, Some(id)).await?;
                active.name = ActiveValue::Set(display);
                active.name_norm = ActiveValue::Set(key);
            }
            if let Some(description) = description {
                active.description = ActiveValue::Set(description);
            }
            if let Some(archived) = update.archived {
                active.archived = ActiveValue::Set(archived);
            }

            let model = active.update(&db_tx).await?;
            Category::try_from(model)
        })
    }

    async fn ensure_category_name_free(
        db_tx: &DatabaseTransaction,
        owner: Uuid,
        kind: TransactionKind,
        name_norm: &str,
        except: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query = categories::Entity::find()
            .filter(categories::Column::OwnerId.eq(owner))
            .filter(categories::Column::Kind.eq(kind.as_str()))
            .filter(categories::Column::NameNorm.eq(name_norm));
        if let Some(id) = except {
            query = query.filter(categories::Column::Id.ne(id));
        }
        if let Some(existing) = query.one(db_tx).await? {
            return Err(EngineError::ExistingKey(existing.name));
        }
        Ok(())
    }
}

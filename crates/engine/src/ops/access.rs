use sea_orm::{ConnectionTrait, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, categories, events, merchants, transactions};

use super::Engine;

/// Generates a lookup that loads a row by id and checks it belongs to the
/// requesting owner.
///
/// Missing rows are `KeyNotFound`; rows of another merchant are `Forbidden`.
macro_rules! impl_owned_lookup {
    ($fn_name:ident, $module:ident, $label:literal) => {
        pub(crate) async fn $fn_name<C: ConnectionTrait>(
            &self,
            db: &C,
            owner: Uuid,
            id: Uuid,
        ) -> ResultEngine<$module::Model> {
            let model = $module::Entity::find_by_id(id)
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(concat!($label, " not exists").to_string()))?;
            if model.owner_id != owner {
                return Err(EngineError::Forbidden(
                    concat!($label, " belongs to another merchant").to_string(),
                ));
            }
            Ok(model)
        }
    };
}

impl Engine {
    impl_owned_lookup!(require_category, categories, "category");

    impl_owned_lookup!(require_transaction, transactions, "transaction");

    impl_owned_lookup!(require_event, events, "event");

    pub(crate) async fn require_merchant<C: ConnectionTrait>(
        &self,
        db: &C,
        owner: Uuid,
    ) -> ResultEngine<merchants::Model> {
        merchants::Entity::find_by_id(owner)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("merchant not exists".to_string()))
    }
}

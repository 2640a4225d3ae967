use base64::Engine as _;
use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{Currency, EngineError, Merchant, ResultEngine, merchants};

use super::{Engine, with_tx};

/// A merchant together with its API token.
///
/// Only returned when the token is created or rotated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerchantCredentials {
    pub merchant: Merchant,
    pub api_token: String,
}

fn generate_token() -> String {
    let mut bytes = Vec::with_capacity(32);
    bytes.extend_from_slice(Uuid::new_v4().as_bytes());
    bytes.extend_from_slice(Uuid::new_v4().as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn normalize_username(value: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.len() > 64 {
        return Err(EngineError::InvalidName(
            "username must be between 1 and 64 characters".to_string(),
        ));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(EngineError::InvalidName(
            "username may only contain letters, digits, '_', '-' and '.'".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

impl Engine {
    /// Creates a merchant with a fresh API token.
    pub async fn create_merchant(
        &self,
        username: &str,
        base_currency: Currency,
    ) -> ResultEngine<MerchantCredentials> {
        let username = normalize_username(username)?;
        with_tx!(self, |db_tx| {
            let exists = merchants::Entity::find()
                .filter(merchants::Column::Username.eq(username.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(username));
            }

            let api_token = generate_token();
            let model = merchants::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                username: ActiveValue::Set(username.clone()),
                api_token: ActiveValue::Set(api_token.clone()),
                base_currency: ActiveValue::Set(base_currency.code().to_string()),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;

            tracing::info!(merchant = %model.id, %username, "merchant created");
            Ok(MerchantCredentials {
                merchant: Merchant::try_from(model)?,
                api_token,
            })
        })
    }

    /// Replaces the API token of a merchant; the old token stops working.
    pub async fn rotate_token(&self, username: &str) -> ResultEngine<MerchantCredentials> {
        let username = normalize_username(username)?;
        with_tx!(self, |db_tx| {
            let model = merchants::Entity::find()
                .filter(merchants::Column::Username.eq(username.clone()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("merchant not exists".to_string()))?;

            let api_token = generate_token();
            let mut active: merchants::ActiveModel = model.into();
            active.api_token = ActiveValue::Set(api_token.clone());
            let model = active.update(&db_tx).await?;

            tracing::info!(merchant = %model.id, "api token rotated");
            Ok(MerchantCredentials {
                merchant: Merchant::try_from(model)?,
                api_token,
            })
        })
    }

    /// Resolves the merchant owning an API token.
    pub async fn merchant_by_token(&self, token: &str) -> ResultEngine<Merchant> {
        let token = token.trim();
        if token.is_empty() {
            return Err(EngineError::KeyNotFound("merchant not exists".to_string()));
        }
        merchants::Entity::find()
            .filter(merchants::Column::ApiToken.eq(token))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("merchant not exists".to_string()))
            .and_then(Merchant::try_from)
    }

    pub async fn merchant(&self, owner: Uuid) -> ResultEngine<Merchant> {
        let model = self.require_merchant(&self.database, owner).await?;
        Merchant::try_from(model)
    }

    pub async fn list_merchants(&self) -> ResultEngine<Vec<Merchant>> {
        merchants::Entity::find()
            .order_by_asc(merchants::Column::Username)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Merchant::try_from)
            .collect()
    }
}

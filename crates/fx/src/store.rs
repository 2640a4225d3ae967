//! Rate cache storage.

use std::{collections::HashMap, str::FromStr};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine::Currency;
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, DatabaseConnection, sea_query::OnConflict};
use tokio::sync::RwLock;

use crate::{FxError, ResultFx};

/// Last known rate for a pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CachedRate {
    pub base: Currency,
    pub quote: Currency,
    pub rate: Decimal,
    pub fetched_at: DateTime<Utc>,
}

#[async_trait]
pub trait RateStore: Send + Sync {
    async fn get(&self, base: Currency, quote: Currency) -> ResultFx<Option<CachedRate>>;

    /// Inserts or replaces the rate of the pair.
    async fn put(&self, rate: CachedRate) -> ResultFx<()>;
}

pub(crate) mod currency_rates {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "currency_rates")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub base: String,
        #[sea_orm(primary_key, auto_increment = false)]
        pub quote: String,
        pub rate: String,
        pub fetched_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl TryFrom<currency_rates::Model> for CachedRate {
    type Error = FxError;

    fn try_from(model: currency_rates::Model) -> Result<Self, Self::Error> {
        let currency = |code: &str| {
            Currency::try_from(code).map_err(|_| FxError::UnsupportedCurrency(code.to_string()))
        };
        Ok(Self {
            base: currency(&model.base)?,
            quote: currency(&model.quote)?,
            rate: Decimal::from_str(&model.rate)
                .map_err(|_| FxError::Provider(format!("invalid cached rate: {}", model.rate)))?,
            fetched_at: model.fetched_at,
        })
    }
}

/// Cache persisted in the `currency_rates` table.
#[derive(Clone, Debug)]
pub struct DbRateStore {
    database: DatabaseConnection,
}

impl DbRateStore {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }
}

#[async_trait]
impl RateStore for DbRateStore {
    async fn get(&self, base: Currency, quote: Currency) -> ResultFx<Option<CachedRate>> {
        use sea_orm::EntityTrait;

        currency_rates::Entity::find_by_id((base.code().to_string(), quote.code().to_string()))
            .one(&self.database)
            .await?
            .map(CachedRate::try_from)
            .transpose()
    }

    async fn put(&self, rate: CachedRate) -> ResultFx<()> {
        use sea_orm::EntityTrait;

        let active = currency_rates::ActiveModel {
            base: ActiveValue::Set(rate.base.code().to_string()),
            quote: ActiveValue::Set(rate.quote.code().to_string()),
            rate: ActiveValue::Set(rate.rate.normalize().to_string()),
            fetched_at: ActiveValue::Set(rate.fetched_at),
        };
        currency_rates::Entity::insert(active)
            .on_conflict(
                OnConflict::columns([
                    currency_rates::Column::Base,
                    currency_rates::Column::Quote,
                ])
                .update_columns([
                    currency_rates::Column::Rate,
                    currency_rates::Column::FetchedAt,
                ])
                .to_owned(),
            )
            .exec(&self.database)
            .await?;
        Ok(())
    }
}

/// Process-local cache, used when no database is wanted (tests, tools).
#[derive(Debug, Default)]
pub struct MemoryRateStore {
    rates: RwLock<HashMap<(Currency, Currency), CachedRate>>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn get(&self, base: Currency, quote: Currency) -> ResultFx<Option<CachedRate>> {
        Ok(self.rates.read().await.get(&(base, quote)).copied())
    }

    async fn put(&self, rate: CachedRate) -> ResultFx<()> {
        self.rates
            .write()
            .await
            .insert((rate.base, rate.quote), rate);
        Ok(())
    }
}

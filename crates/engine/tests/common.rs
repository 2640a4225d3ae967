#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sea_orm::{Database, DatabaseConnection};

use engine::{Currency, Engine, NewTransaction, PaymentMethod, Transaction, TransactionKind};
use migration::MigratorTrait;
use uuid::Uuid;

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

pub async fn merchant(engine: &Engine, username: &str) -> Uuid {
    engine
        .create_merchant(username, Currency::EUR)
        .await
        .unwrap()
        .merchant
        .id
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub async fn record(
    engine: &Engine,
    owner: Uuid,
    kind: TransactionKind,
    amount_minor: i64,
    occurred_at: DateTime<Utc>,
    category_id: Option<Uuid>,
) -> Transaction {
    engine
        .record_transaction(
            owner,
            NewTransaction {
                category_id,
                occurred_at: Some(occurred_at),
                payment_method: PaymentMethod::Card,
                ..NewTransaction::new(kind, amount_minor)
            },
        )
        .await
        .unwrap()
}

//! FX rate cache: one row per `(base, quote)` pair, overwritten on refresh.
//!
//! Rates are stored as decimal strings so no precision is lost in SQLite.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum CurrencyRates {
    Table,
    Base,
    Quote,
    Rate,
    FetchedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CurrencyRates::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CurrencyRates::Base).string_len(3).not_null())
                    .col(ColumnDef::new(CurrencyRates::Quote).string_len(3).not_null())
                    .col(ColumnDef::new(CurrencyRates::Rate).string().not_null())
                    .col(
                        ColumnDef::new(CurrencyRates::FetchedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(CurrencyRates::Base)
                            .col(CurrencyRates::Quote),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CurrencyRates::Table).to_owned())
            .await
    }
}

//! Ledger schema.
//!
//! - `merchants`: owners of every record, authenticated by API token
//! - `categories`: income/expense categories per merchant (archived, never deleted)
//! - `transactions`: append-only ledger; triggers reject `UPDATE` and `DELETE`
//! - `events`: tax deadlines, invoices, meetings and reminders
//! - `forecasts`: monthly projections, one per `(merchant, period, kind)`

use sea_orm::ConnectionTrait;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Merchants {
    Table,
    Id,
    Username,
    ApiToken,
    BaseCurrency,
    CreatedAt,
}

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    OwnerId,
    Name,
    NameNorm,
    Kind,
    Description,
    Archived,
    CreatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    OwnerId,
    Kind,
    AmountMinor,
    Currency,
    CategoryId,
    PaymentMethod,
    Description,
    ReferenceId,
    OccurredAt,
    CreatedAt,
    ReversesId,
}

#[derive(Iden)]
enum Events {
    Table,
    Id,
    OwnerId,
    Title,
    Description,
    Kind,
    DueAt,
    Status,
    AmountMinor,
    CalendarRef,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Forecasts {
    Table,
    Id,
    OwnerId,
    Period,
    Kind,
    ProjectedMinor,
    Basis,
    Notes,
    CreatedAt,
    UpdatedAt,
}

const APPEND_ONLY_TRIGGERS: [&str; 2] = [
    "CREATE TRIGGER IF NOT EXISTS transactions_no_update \
     BEFORE UPDATE ON transactions \
     BEGIN SELECT RAISE(ABORT, 'transactions are append-only'); END;",
    "CREATE TRIGGER IF NOT EXISTS transactions_no_delete \
     BEFORE DELETE ON transactions \
     BEGIN SELECT RAISE(ABORT, 'transactions are append-only'); END;",
];

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Merchants
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Merchants::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Merchants::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Merchants::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Merchants::ApiToken)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Merchants::BaseCurrency)
                            .string_len(3)
                            .not_null()
                            .default("USD"),
                    )
                    .col(ColumnDef::new(Merchants::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Categories
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .col(ColumnDef::new(Categories::NameNorm).string().not_null())
                    .col(ColumnDef::new(Categories::Kind).string().not_null())
                    .col(ColumnDef::new(Categories::Description).string())
                    .col(
                        ColumnDef::new(Categories::Archived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Categories::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-categories-owner_id")
                            .from(Categories::Table, Categories::OwnerId)
                            .to(Merchants::Table, Merchants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-categories-owner_id-kind-name_norm-unique")
                    .table(Categories::Table)
                    .col(Categories::OwnerId)
                    .col(Categories::Kind)
                    .col(Categories::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Currency).string_len(3).not_null())
                    .col(ColumnDef::new(Transactions::CategoryId).uuid())
                    .col(
                        ColumnDef::new(Transactions::PaymentMethod)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Description).string())
                    .col(ColumnDef::new(Transactions::ReferenceId).string())
                    .col(
                        ColumnDef::new(Transactions::OccurredAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::ReversesId).uuid())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-owner_id")
                            .from(Transactions::Table, Transactions::OwnerId)
                            .to(Merchants::Table, Merchants::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-category_id")
                            .from(Transactions::Table, Transactions::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-reverses_id")
                            .from(Transactions::Table, Transactions::ReversesId)
                            .to(Transactions::Table, Transactions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-owner_id-occurred_at")
                    .table(Transactions::Table)
                    .col(Transactions::OwnerId)
                    .col(Transactions::OccurredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-reverses_id-unique")
                    .table(Transactions::Table)
                    .col(Transactions::ReversesId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();
        for trigger in APPEND_ONLY_TRIGGERS {
            db.execute_unprepared(trigger).await?;
        }

        // ───────────────────────────────────────────────────────────────────
        // 4. Events
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Events::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Events::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Events::Title).string().not_null())
                    .col(ColumnDef::new(Events::Description).string())
                    .col(ColumnDef::new(Events::Kind).string().not_null())
                    .col(ColumnDef::new(Events::DueAt).timestamp().not_null())
                    .col(ColumnDef::new(Events::Status).string().not_null())
                    .col(ColumnDef::new(Events::AmountMinor).big_integer())
                    .col(ColumnDef::new(Events::CalendarRef).string())
                    .col(ColumnDef::new(Events::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Events::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-events-owner_id")
                            .from(Events::Table, Events::OwnerId)
                            .to(Merchants::Table, Merchants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-events-owner_id-due_at")
                    .table(Events::Table)
                    .col(Events::OwnerId)
                    .col(Events::DueAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Forecasts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Forecasts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Forecasts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Forecasts::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Forecasts::Period).string_len(7).not_null())
                    .col(ColumnDef::new(Forecasts::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Forecasts::ProjectedMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Forecasts::Basis).string().not_null())
                    .col(ColumnDef::new(Forecasts::Notes).string())
                    .col(ColumnDef::new(Forecasts::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Forecasts::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-forecasts-owner_id")
                            .from(Forecasts::Table, Forecasts::OwnerId)
                            .to(Merchants::Table, Merchants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-forecasts-owner_id-period-kind-unique")
                    .table(Forecasts::Table)
                    .col(Forecasts::OwnerId)
                    .col(Forecasts::Period)
                    .col(Forecasts::Kind)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Forecasts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Events::Table).to_owned())
            .await?;
        let db = manager.get_connection();
        db.execute_unprepared("DROP TRIGGER IF EXISTS transactions_no_delete;")
            .await?;
        db.execute_unprepared("DROP TRIGGER IF EXISTS transactions_no_update;")
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Merchants::Table).to_owned())
            .await?;
        Ok(())
    }
}

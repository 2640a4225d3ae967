pub use sea_orm_migration::prelude::*;

mod m20260201_000000_ledger;
mod m20260201_000001_currency_rates;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260201_000000_ledger::Migration),
            Box::new(m20260201_000001_currency_rates::Migration),
        ]
    }
}

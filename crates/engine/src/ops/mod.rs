use sea_orm::DatabaseConnection;

use crate::ResultEngine;

mod access;
mod categories;
mod events;
mod forecasts;
mod merchants;
mod transactions;

pub use merchants::MerchantCredentials;
pub use transactions::TransactionFilter;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Entry point of the ledger: every operation is scoped by the owning
/// merchant id.
#[derive(Debug)]
pub struct Engine {
    pub(crate) database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Checks the database connection is alive.
    pub async fn ping(&self) -> ResultEngine<()> {
        self.database.ping().await.map_err(Into::into)
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}

//! Ledger store and report aggregation for merchants.
//!
//! The [`Engine`] owns the database connection. Every operation takes the
//! id of the requesting merchant and only sees that merchant's rows.

pub use categories::{Category, CategoryUpdate};
pub use currency::Currency;
pub use error::EngineError;
pub use events::{
    EffectiveStatus, Event, EventFilter, EventKind, EventStatus, EventUpdate, NewEvent,
};
pub use forecasts::{Forecast, ForecastBasis, ForecastKind, Period};
pub use merchants::Merchant;
pub use money::Money;
pub use ops::{Engine, EngineBuilder, MerchantCredentials, TransactionFilter};
pub use reports::{
    Bucket, BucketTotal, CashFlowMonth, CashFlowReport, CategoryShare, CategoryTotal, DateRange,
    PaymentMethodTotal, Report, ReportKind, ReportRequest, RevenueTrend, RevenueWindow,
    Timeframe, Totals,
};
pub use transactions::{NewTransaction, PaymentMethod, Transaction, TransactionKind};
pub use util::parse_uuid;

mod categories;
mod currency;
mod error;
mod events;
mod forecasts;
mod merchants;
mod money;
mod ops;
mod reports;
mod transactions;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;

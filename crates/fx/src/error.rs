use sea_orm::DbErr;
use thiserror::Error;

/// Currency service errors.
#[derive(Error, Debug)]
pub enum FxError {
    /// No fresh rate from the provider and no usable cached value.
    #[error("exchange rate unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl FxError {
    /// `true` when the failure comes from the external provider rather than
    /// from the caller input.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Provider(_) | Self::Http(_))
    }
}

pub type ResultFx<T> = Result<T, FxError>;

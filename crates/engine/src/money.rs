use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::{Currency, EngineError, ResultEngine};

/// Signed money amount represented as **integer minor units** of a currency.
///
/// Use this type for **all** ledger values (transaction amounts, report
/// totals, forecasts) to avoid floating-point drift. The currency is carried
/// next to the value (merchant base currency), not inside it.
///
/// The value is signed:
/// - positive = income / increase
/// - negative = expense / decrease
///
/// # Examples
///
/// ```rust
/// use engine::{Currency, Money};
///
/// let amount = Money::new(12_34);
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.format(Currency::EUR), "12.34 EUR");
/// ```
///
/// Converting from decimal input (rejects more decimals than the currency
/// has minor units):
///
/// ```rust
/// use engine::{Currency, Money};
/// use rust_decimal::Decimal;
///
/// let parsed = Money::from_decimal(Decimal::new(105, 1), Currency::EUR).unwrap();
/// assert_eq!(parsed.minor(), 1050);
/// assert!(Money::from_decimal(Decimal::new(12345, 3), Currency::EUR).is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest amount a single ledger entry may carry (10^15 minor units).
    /// Keeps aggregated totals far from `i64` overflow.
    pub const MAX_ENTRY: Money = Money(1_000_000_000_000_000);

    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Converts a major-unit decimal (e.g. `10.5`) into minor units.
    pub fn from_decimal(value: Decimal, currency: Currency) -> ResultEngine<Self> {
        let scale = currency.minor_units();
        let normalized = value.normalize();
        if normalized.scale() > scale {
            return Err(EngineError::InvalidAmount(format!(
                "{currency} supports at most {scale} decimals"
            )));
        }
        let factor = Decimal::from(10i64.pow(scale));
        normalized
            .checked_mul(factor)
            .and_then(|scaled| scaled.to_i64())
            .map(Money)
            .ok_or_else(|| EngineError::InvalidAmount("amount too large".to_string()))
    }

    /// Returns the amount in major units with the currency's scale.
    #[must_use]
    pub fn to_decimal(self, currency: Currency) -> Decimal {
        Decimal::new(self.0, currency.minor_units())
    }

    /// Formats the amount as `"<major>.<minor> <CODE>"`.
    #[must_use]
    pub fn format(self, currency: Currency) -> String {
        format!("{} {}", self.to_decimal(currency), currency.code())
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

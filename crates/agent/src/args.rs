//! Argument validation against a [`FunctionSpec`].

use std::{collections::HashMap, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use engine::Currency;
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    DispatchError,
    registry::{FunctionSpec, ParamKind},
};

/// A checked argument.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgValue {
    Text(String),
    Integer(i64),
    Amount(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Currency(Currency),
    Currencies(Vec<Currency>),
    Id(Uuid),
}

/// Arguments that passed validation, keyed by parameter name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args {
    values: HashMap<&'static str, ArgValue>,
}

fn invalid(message: String) -> DispatchError {
    DispatchError::InvalidArguments(message)
}

impl Args {
    /// Checks `raw` against `spec`: it must be an object (or null, read as
    /// empty), every key must be a declared parameter, required parameters
    /// must be present and every value must match its kind. `null` values
    /// count as absent.
    pub fn validate(spec: &FunctionSpec, raw: &Value) -> Result<Self, DispatchError> {
        let empty = serde_json::Map::new();
        let object = match raw {
            Value::Object(object) => object,
            Value::Null => &empty,
            _ => return Err(invalid("arguments must be a JSON object".to_string())),
        };

        if let Some(unknown) = object.keys().find(|key| spec.param(key).is_none()) {
            return Err(invalid(format!(
                "unknown argument `{unknown}` for {}",
                spec.name
            )));
        }

        let mut values = HashMap::new();
        for param in spec.params {
            match object.get(param.name) {
                None | Some(Value::Null) => {
                    if param.required {
                        return Err(invalid(format!("missing required argument `{}`", param.name)));
                    }
                }
                Some(value) => {
                    let checked = check(param.kind, value)
                        .map_err(|reason| invalid(format!("`{}` {reason}", param.name)))?;
                    values.insert(param.name, checked);
                }
            }
        }
        Ok(Self { values })
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ArgValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn amount(&self, name: &str) -> Option<Decimal> {
        match self.values.get(name) {
            Some(ArgValue::Amount(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ArgValue::Boolean(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        match self.values.get(name) {
            Some(ArgValue::Date(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn datetime(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.values.get(name) {
            Some(ArgValue::DateTime(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn currency(&self, name: &str) -> Option<Currency> {
        match self.values.get(name) {
            Some(ArgValue::Currency(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn currencies(&self, name: &str) -> Option<&[Currency]> {
        match self.values.get(name) {
            Some(ArgValue::Currencies(value)) => Some(value),
            _ => None,
        }
    }

    pub fn id(&self, name: &str) -> Option<Uuid> {
        match self.values.get(name) {
            Some(ArgValue::Id(value)) => Some(*value),
            _ => None,
        }
    }

    /// Like [`Args::text`] for parameters marked required.
    pub fn required_text(&self, name: &str) -> Result<&str, DispatchError> {
        self.text(name).ok_or_else(|| missing(name))
    }

    pub fn required_amount(&self, name: &str) -> Result<Decimal, DispatchError> {
        self.amount(name).ok_or_else(|| missing(name))
    }

    pub fn required_currency(&self, name: &str) -> Result<Currency, DispatchError> {
        self.currency(name).ok_or_else(|| missing(name))
    }

    pub fn required_date(&self, name: &str) -> Result<NaiveDate, DispatchError> {
        self.date(name).ok_or_else(|| missing(name))
    }

    pub fn required_datetime(&self, name: &str) -> Result<DateTime<Utc>, DispatchError> {
        self.datetime(name).ok_or_else(|| missing(name))
    }

    pub fn required_id(&self, name: &str) -> Result<Uuid, DispatchError> {
        self.id(name).ok_or_else(|| missing(name))
    }
}

fn missing(name: &str) -> DispatchError {
    invalid(format!("missing required argument `{name}`"))
}

fn check(kind: ParamKind, value: &Value) -> Result<ArgValue, String> {
    match kind {
        ParamKind::Text { max_len } => {
            let text = value.as_str().ok_or("must be a string")?;
            if text.chars().count() > max_len {
                return Err(format!("must be at most {max_len} characters"));
            }
            Ok(ArgValue::Text(text.to_string()))
        }
        ParamKind::Integer { min, max } => {
            let number = value.as_i64().ok_or("must be an integer")?;
            if !(min..=max).contains(&number) {
                return Err(format!("must be between {min} and {max}"));
            }
            Ok(ArgValue::Integer(number))
        }
        ParamKind::Amount => {
            let Value::Number(number) = value else {
                return Err("must be a number".to_string());
            };
            let amount = Decimal::from_str(&number.to_string())
                .or_else(|_| Decimal::from_scientific(&number.to_string()))
                .map_err(|_| "is not a valid amount".to_string())?;
            if amount.is_sign_negative() && !amount.is_zero() {
                return Err("must not be negative".to_string());
            }
            Ok(ArgValue::Amount(amount))
        }
        ParamKind::Boolean => value
            .as_bool()
            .map(ArgValue::Boolean)
            .ok_or_else(|| "must be a boolean".to_string()),
        ParamKind::Date => {
            let text = value.as_str().ok_or("must be a date string")?;
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(ArgValue::Date)
                .map_err(|_| "must be a date formatted YYYY-MM-DD".to_string())
        }
        ParamKind::DateTime => {
            let text = value.as_str().ok_or("must be a datetime string")?;
            DateTime::parse_from_rfc3339(text)
                .map(|at| ArgValue::DateTime(at.with_timezone(&Utc)))
                .map_err(|_| "must be an RFC 3339 datetime".to_string())
        }
        ParamKind::Currency => currency_code(value).map(ArgValue::Currency),
        ParamKind::Currencies => {
            let items = value.as_array().ok_or("must be an array of currency codes")?;
            if items.is_empty() {
                return Err("must not be empty".to_string());
            }
            items
                .iter()
                .map(currency_code)
                .collect::<Result<Vec<_>, _>>()
                .map(ArgValue::Currencies)
        }
        ParamKind::Id => {
            let text = value.as_str().ok_or("must be an id string")?;
            Uuid::parse_str(text)
                .map(ArgValue::Id)
                .map_err(|_| "must be a valid id".to_string())
        }
        ParamKind::Enum(allowed) => {
            let text = value.as_str().ok_or("must be a string")?;
            if !allowed.contains(&text) {
                return Err(format!("must be one of: {}", allowed.join(", ")));
            }
            Ok(ArgValue::Text(text.to_string()))
        }
    }
}

/// Strict `^[A-Z]{3}$`; lowercase codes are rejected.
fn currency_code(value: &Value) -> Result<Currency, String> {
    let text = value.as_str().ok_or("must be a currency code string")?;
    if text.len() != 3 || !text.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(format!("`{text}` is not a currency code like EUR"));
    }
    Currency::try_from(text).map_err(|err| err.to_string())
}

use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    DateRange, EngineError, Forecast, ForecastBasis, ForecastKind, Period, ResultEngine,
    forecasts, reports::div_round, util::normalize_optional_text,
};

use super::{Engine, with_tx};

const MAX_PROJECTION_MONTHS: u32 = 24;

impl Engine {
    /// Saves the projection for `(owner, period, kind)`, replacing any
    /// previous one.
    pub async fn save_forecast(
        &self,
        owner: Uuid,
        period: Period,
        kind: ForecastKind,
        projected_minor: i64,
        basis: ForecastBasis,
        notes: Option<&str>,
    ) -> ResultEngine<Forecast> {
        if kind != ForecastKind::Profit && projected_minor < 0 {
            return Err(EngineError::InvalidAmount(format!(
                "{} projection must be >= 0",
                kind.as_str()
            )));
        }
        let notes = normalize_optional_text(notes);

        with_tx!(self, |db_tx| {
            self.require_merchant(&db_tx, owner).await?;
            let existing = forecasts::Entity::find()
                .filter(forecasts::Column::OwnerId.eq(owner))
                .filter(forecasts::Column::Period.eq(period.to_string()))
                .filter(forecasts::Column::Kind.eq(kind.as_str()))
                .one(&db_tx)
                .await?;

            let now = Utc::now();
            let model = match existing {
                Some(model) => {
                    let mut active: forecasts::ActiveModel = model.into();
                    active.projected_minor = ActiveValue::Set(projected_minor);
                    active.basis = ActiveValue::Set(basis.as_str().to_string());
                    active.notes = ActiveValue::Set(notes);
                    active.updated_at = ActiveValue::Set(now);
                    active.update(&db_tx).await?
                }
                None => {
                    forecasts::ActiveModel {
                        id: ActiveValue::Set(Uuid::new_v4()),
                        owner_id: ActiveValue::Set(owner),
                        period: ActiveValue::Set(period.to_string()),
                        kind: ActiveValue::Set(kind.as_str().to_string()),
                        projected_minor: ActiveValue::Set(projected_minor),
                        basis: ActiveValue::Set(basis.as_str().to_string()),
                        notes: ActiveValue::Set(notes),
                        created_at: ActiveValue::Set(now),
                        updated_at: ActiveValue::Set(now),
                    }
                    .insert(&db_tx)
                    .await?
                }
            };
            Forecast::try_from(model)
        })
    }

    /// Lists forecasts between two periods (both inclusive), oldest first.
    pub async fn list_forecasts(
        &self,
        owner: Uuid,
        from: Option<Period>,
        to: Option<Period>,
    ) -> ResultEngine<Vec<Forecast>> {
        if let (Some(from), Some(to)) = (from, to)
            && to < from
        {
            return Err(EngineError::InvalidDateRange(format!(
                "period {to} is before {from}"
            )));
        }
        let mut query = forecasts::Entity::find().filter(forecasts::Column::OwnerId.eq(owner));
        if let Some(from) = from {
            query = query.filter(forecasts::Column::Period.gte(from.to_string()));
        }
        if let Some(to) = to {
            query = query.filter(forecasts::Column::Period.lte(to.to_string()));
        }
        query
            .order_by_asc(forecasts::Column::Period)
            .order_by_asc(forecasts::Column::Kind)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Forecast::try_from)
            .collect()
    }

    /// Averages the `months` complete calendar months before the current one
    /// and saves the result for the next month with basis
    /// `historical_average`.
    pub async fn project_forecast(
        &self,
        owner: Uuid,
        kind: ForecastKind,
        months: u32,
        today: NaiveDate,
    ) -> ResultEngine<Forecast> {
        if !(1..=MAX_PROJECTION_MONTHS).contains(&months) {
            return Err(EngineError::InvalidAmount(format!(
                "months must be between 1 and {MAX_PROJECTION_MONTHS}"
            )));
        }
        let current = Period::of(today);
        let last = current.previous();
        let mut first = last;
        for _ in 1..months {
            first = first.previous();
        }
        let range = DateRange::new(first.first_day(), last.last_day())?;

        let totals = self.report_totals(owner, &range, None).await?;
        let total = match kind {
            ForecastKind::Revenue => totals.income_minor,
            ForecastKind::Expense => totals.expense_minor,
            ForecastKind::Profit => totals.profit_minor,
        };
        let projected = div_round(total, i64::from(months)).max(match kind {
            ForecastKind::Profit => i64::MIN,
            _ => 0,
        });
        let notes = format!("average of {first} to {last}");

        tracing::debug!(owner = %owner, kind = kind.as_str(), projected, "forecast projected");
        self.save_forecast(
            owner,
            current.next(),
            kind,
            projected,
            ForecastBasis::HistoricalAverage,
            Some(&notes),
        )
        .await
    }
}

mod common;

use sea_orm::{ConnectionTrait, Statement};

use engine::{
    CategoryUpdate, Currency, EffectiveStatus, EngineError, EventFilter, EventKind, EventStatus,
    EventUpdate, ForecastBasis, ForecastKind, NewEvent, NewTransaction, PaymentMethod, Period,
    TransactionFilter, TransactionKind,
};

use common::{at, engine_with_db, merchant, record};

#[tokio::test]
async fn merchant_tokens_resolve_and_rotate() {
    let (engine, _db) = engine_with_db().await;

    let created = engine.create_merchant("shop", Currency::USD).await.unwrap();
    let found = engine.merchant_by_token(&created.api_token).await.unwrap();
    assert_eq!(found, created.merchant);

    let err = engine
        .create_merchant("shop", Currency::EUR)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    let rotated = engine.rotate_token("shop").await.unwrap();
    assert_ne!(rotated.api_token, created.api_token);
    assert!(matches!(
        engine.merchant_by_token(&created.api_token).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert_eq!(
        engine.merchant_by_token(&rotated.api_token).await.unwrap().id,
        created.merchant.id
    );
}

#[tokio::test]
async fn record_transaction_validates_amount_and_currency() {
    let (engine, _db) = engine_with_db().await;
    let owner = merchant(&engine, "shop").await;

    let err = engine
        .record_transaction(owner, NewTransaction::new(TransactionKind::Income, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .record_transaction(
            owner,
            NewTransaction {
                currency: Some(Currency::USD),
                ..NewTransaction::new(TransactionKind::Income, 100)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CurrencyMismatch(_)));

    let tx = engine
        .record_transaction(owner, NewTransaction::new(TransactionKind::Expense, 2_500))
        .await
        .unwrap();
    assert_eq!(tx.currency, Currency::EUR);
    assert_eq!(tx.signed_amount_minor(), -2_500);
    assert_eq!(engine.transaction(owner, tx.id).await.unwrap(), tx);
}

#[tokio::test]
async fn category_must_match_owner_kind_and_be_active() {
    let (engine, _db) = engine_with_db().await;
    let owner = merchant(&engine, "shop").await;
    let other = merchant(&engine, "other").await;

    let sales = engine
        .create_category(owner, "Sales", TransactionKind::Income, None)
        .await
        .unwrap();
    let foreign = engine
        .create_category(other, "Sales", TransactionKind::Income, None)
        .await
        .unwrap();

    let wrong_kind = engine
        .record_transaction(
            owner,
            NewTransaction {
                category_id: Some(sales.id),
                ..NewTransaction::new(TransactionKind::Expense, 100)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(wrong_kind, EngineError::InvalidKind(_)));

    let cross_owner = engine
        .record_transaction(
            owner,
            NewTransaction {
                category_id: Some(foreign.id),
                ..NewTransaction::new(TransactionKind::Income, 100)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(cross_owner, EngineError::Forbidden(_)));

    engine
        .update_category(
            owner,
            sales.id,
            CategoryUpdate {
                archived: Some(true),
                ..CategoryUpdate::default()
            },
        )
        .await
        .unwrap();
    let archived = engine
        .record_transaction(
            owner,
            NewTransaction {
                category_id: Some(sales.id),
                ..NewTransaction::new(TransactionKind::Income, 100)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(archived, EngineError::InvalidName(_)));
}

#[tokio::test]
async fn category_names_are_unique_after_normalization() {
    let (engine, _db) = engine_with_db().await;
    let owner = merchant(&engine, "shop").await;

    engine
        .create_category(owner, "Café supplies", TransactionKind::Expense, Some("beans"))
        .await
        .unwrap();
    let err = engine
        .create_category(owner, "  cafe   SUPPLIES ", TransactionKind::Expense, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    // Same name with the other kind is a different category.
    engine
        .create_category(owner, "Cafe supplies", TransactionKind::Income, None)
        .await
        .unwrap();

    let expense = engine
        .list_categories(owner, Some(TransactionKind::Expense), false)
        .await
        .unwrap();
    assert_eq!(expense.len(), 1);
    assert_eq!(expense[0].name, "Café supplies");
    assert_eq!(expense[0].description.as_deref(), Some("beans"));
}

#[tokio::test]
async fn transactions_are_append_only() {
    let (engine, db) = engine_with_db().await;
    let owner = merchant(&engine, "shop").await;
    let tx = record(
        &engine,
        owner,
        TransactionKind::Income,
        1_000,
        at(2024, 1, 10, 9, 0, 0),
        None,
    )
    .await;

    let backend = db.get_database_backend();
    let update = db
        .execute(Statement::from_string(
            backend,
            "UPDATE transactions SET amount_minor = 1",
        ))
        .await;
    assert!(update.is_err());
    let delete = db
        .execute(Statement::from_string(backend, "DELETE FROM transactions"))
        .await;
    assert!(delete.is_err());

    assert_eq!(engine.transaction(owner, tx.id).await.unwrap().amount_minor, 1_000);
}

#[tokio::test]
async fn reversal_appends_offsetting_entry_once() {
    let (engine, _db) = engine_with_db().await;
    let owner = merchant(&engine, "shop").await;
    let original = record(
        &engine,
        owner,
        TransactionKind::Expense,
        4_200,
        at(2024, 1, 10, 9, 0, 0),
        None,
    )
    .await;

    let reversal = engine
        .reverse_transaction(owner, original.id, Some("duplicate"), None)
        .await
        .unwrap();
    assert_eq!(reversal.kind, TransactionKind::Expense);
    assert_eq!(reversal.amount_minor, -4_200);
    assert_eq!(reversal.reverses_id, Some(original.id));
    assert_eq!(reversal.description.as_deref(), Some("duplicate"));

    let again = engine
        .reverse_transaction(owner, original.id, None, None)
        .await
        .unwrap_err();
    assert!(matches!(again, EngineError::ExistingKey(_)));

    let of_reversal = engine
        .reverse_transaction(owner, reversal.id, None, None)
        .await
        .unwrap_err();
    assert!(matches!(of_reversal, EngineError::InvalidKind(_)));

    // The original row is untouched.
    assert_eq!(engine.transaction(owner, original.id).await.unwrap(), original);
}

#[tokio::test]
async fn other_merchants_records_are_forbidden() {
    let (engine, _db) = engine_with_db().await;
    let owner = merchant(&engine, "shop").await;
    let intruder = merchant(&engine, "intruder").await;
    let tx = record(
        &engine,
        owner,
        TransactionKind::Income,
        500,
        at(2024, 1, 10, 9, 0, 0),
        None,
    )
    .await;

    assert!(matches!(
        engine.transaction(intruder, tx.id).await,
        Err(EngineError::Forbidden(_))
    ));
    assert!(matches!(
        engine.reverse_transaction(intruder, tx.id, None, None).await,
        Err(EngineError::Forbidden(_))
    ));
    assert!(matches!(
        engine.transaction(owner, uuid::Uuid::new_v4()).await,
        Err(EngineError::KeyNotFound(_))
    ));
    let listed = engine
        .list_transactions(intruder, &TransactionFilter::default())
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn list_transactions_filters_and_orders_newest_first() {
    let (engine, _db) = engine_with_db().await;
    let owner = merchant(&engine, "shop").await;

    let old = record(&engine, owner, TransactionKind::Income, 100, at(2024, 1, 1, 8, 0, 0), None).await;
    let new = record(&engine, owner, TransactionKind::Income, 200, at(2024, 1, 20, 8, 0, 0), None).await;
    engine
        .record_transaction(
            owner,
            NewTransaction {
                occurred_at: Some(at(2024, 1, 15, 8, 0, 0)),
                payment_method: PaymentMethod::Cash,
                ..NewTransaction::new(TransactionKind::Expense, 50)
            },
        )
        .await
        .unwrap();

    let incomes = engine
        .list_transactions(
            owner,
            &TransactionFilter {
                kind: Some(TransactionKind::Income),
                ..TransactionFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        incomes.iter().map(|t| t.id).collect::<Vec<_>>(),
        vec![new.id, old.id]
    );

    let cash = engine
        .list_transactions(
            owner,
            &TransactionFilter {
                payment_method: Some(PaymentMethod::Cash),
                ..TransactionFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cash.len(), 1);
    assert_eq!(cash[0].amount_minor, 50);

    let limited = engine
        .list_transactions(
            owner,
            &TransactionFilter {
                limit: Some(1),
                ..TransactionFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(limited[0].id, new.id);

    assert!(matches!(
        engine
            .list_transactions(
                owner,
                &TransactionFilter {
                    limit: Some(0),
                    ..TransactionFilter::default()
                },
            )
            .await,
        Err(EngineError::InvalidAmount(_))
    ));
}

#[tokio::test]
async fn events_derive_overdue_and_keep_final_states() {
    let (engine, _db) = engine_with_db().await;
    let owner = merchant(&engine, "shop").await;
    let now = at(2024, 3, 1, 12, 0, 0);

    let vat = engine
        .create_event(
            owner,
            NewEvent {
                title: "VAT return".to_string(),
                description: None,
                kind: EventKind::Tax,
                due_at: at(2024, 2, 28, 0, 0, 0),
                amount_minor: Some(120_000),
                calendar_ref: None,
            },
        )
        .await
        .unwrap();
    let meeting = engine
        .create_event(
            owner,
            NewEvent {
                title: "Supplier meeting".to_string(),
                description: Some("bring invoices".to_string()),
                kind: EventKind::Meeting,
                due_at: at(2024, 3, 5, 10, 0, 0),
                amount_minor: None,
                calendar_ref: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(vat.effective_status(now), EffectiveStatus::Overdue);

    let overdue = engine
        .list_events(
            owner,
            &EventFilter {
                status: Some(EffectiveStatus::Overdue),
                ..EventFilter::default()
            },
            now,
        )
        .await
        .unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, vat.id);

    let done = engine
        .update_event(owner, vat.id, EventUpdate::status(EventStatus::Completed))
        .await
        .unwrap();
    assert_eq!(done.status, EventStatus::Completed);
    let reopen = engine
        .update_event(owner, vat.id, EventUpdate::status(EventStatus::Upcoming))
        .await
        .unwrap_err();
    assert!(matches!(reopen, EngineError::InvalidStatus(_)));

    let deleted = engine.delete_event(owner, meeting.id).await.unwrap();
    assert_eq!(deleted.id, meeting.id);
    assert!(matches!(
        engine.event(owner, meeting.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn forecasts_replace_per_period_and_kind() {
    let (engine, _db) = engine_with_db().await;
    let owner = merchant(&engine, "shop").await;
    let march = Period::try_from("2024-03").unwrap();

    let first = engine
        .save_forecast(owner, march, ForecastKind::Revenue, 10_000, ForecastBasis::Manual, None)
        .await
        .unwrap();
    let second = engine
        .save_forecast(
            owner,
            march,
            ForecastKind::Revenue,
            12_000,
            ForecastBasis::Manual,
            Some("new contract"),
        )
        .await
        .unwrap();
    assert_eq!(first.id, second.id);

    engine
        .save_forecast(
            owner,
            Period::try_from("2024-05").unwrap(),
            ForecastKind::Expense,
            3_000,
            ForecastBasis::Manual,
            None,
        )
        .await
        .unwrap();

    let listed = engine
        .list_forecasts(owner, Some(march), Some(Period::try_from("2024-04").unwrap()))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].projected_minor, 12_000);
    assert_eq!(listed[0].notes.as_deref(), Some("new contract"));
}

mod common;

use axum::{
    body::Body,
    http::{Request, header},
};
use serde_json::json;
use tower::ServiceExt;

use common::{app, body_text};

#[tokio::test]
async fn health_is_public() {
    let app = app().await;
    let request = Request::builder()
        .uri("/api/health/")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
    assert_eq!(body["llm_provider"], "offline");
    assert_eq!(body["fx_provider"], "fixed");
    assert_eq!(body["registry_size"], 21);
    assert!(body["calendar_provider"].is_null());
}

#[tokio::test]
async fn requests_without_a_valid_token_are_rejected() {
    let app = app().await;
    let request = Request::builder()
        .uri("/api/transactions/")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), 401);

    let (status, _) = app.send_as("not-a-token", "GET", "/api/tools/", None).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn transactions_are_recorded_listed_and_reversed() {
    let app = app().await;
    let (status, created) = app
        .send(
            "POST",
            "/api/transactions/",
            Some(json!({
                "kind": "income",
                "amount_minor": 12_50,
                "payment_method": "cash",
                "description": "coffee beans",
                "occurred_at": "2024-01-10T10:00:00Z",
            })),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(created["currency"], "EUR");
    assert_eq!(created["signed_amount_minor"], 1250);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, listed) = app
        .send(
            "GET",
            "/api/transactions/?start_date=2024-01-01&end_date=2024-01-31",
            None,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(listed["transactions"].as_array().unwrap().len(), 1);

    let (status, fetched) = app
        .send("GET", &format!("/api/transactions/{id}"), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(fetched["description"], "coffee beans");

    let (status, reversal) = app
        .send(
            "POST",
            &format!("/api/transactions/{id}/reverse"),
            Some(json!({ "note": "refund" })),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(reversal["reverses_id"], id.as_str());
    assert_eq!(reversal["signed_amount_minor"], -1250);

    let (status, body) = app
        .send("POST", &format!("/api/transactions/{id}/reverse"), None)
        .await;
    assert_eq!(status, 409);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn invalid_transactions_map_to_422() {
    let app = app().await;
    let (status, _) = app
        .send(
            "POST",
            "/api/transactions/",
            Some(json!({ "kind": "expense", "amount_minor": 0 })),
        )
        .await;
    assert_eq!(status, 422);

    let (status, body) = app
        .send(
            "POST",
            "/api/transactions/",
            Some(json!({ "kind": "expense", "amount_minor": 100, "currency": "USD" })),
        )
        .await;
    assert_eq!(status, 422);
    assert!(body["error"].as_str().unwrap().contains("EUR"));
}

#[tokio::test]
async fn other_merchants_rows_are_forbidden() {
    let app = app().await;
    let (_, created) = app
        .send(
            "POST",
            "/api/transactions/",
            Some(json!({ "kind": "income", "amount_minor": 500 })),
        )
        .await;
    let id = created["id"].as_str().unwrap();

    let other = app.other_token().await;
    let (status, _) = app
        .send_as(&other, "GET", &format!("/api/transactions/{id}"), None)
        .await;
    assert_eq!(status, 403);

    let (status, listed) = app.send_as(&other, "GET", "/api/transactions/", None).await;
    assert_eq!(status, 200);
    assert!(listed["transactions"].as_array().unwrap().is_empty());

    let (status, _) = app
        .send(
            "GET",
            "/api/transactions/00000000-0000-0000-0000-000000000000",
            None,
        )
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn report_totals_match_the_ledger() {
    let app = app().await;
    for (kind, amount, at) in [
        ("income", 100_00, "2024-01-05T09:00:00Z"),
        ("income", 50_00, "2024-01-20T09:00:00Z"),
        ("expense", 30_00, "2024-01-21T09:00:00Z"),
        ("income", 999_00, "2024-02-01T09:00:00Z"),
    ] {
        let (status, _) = app
            .send(
                "POST",
                "/api/transactions/",
                Some(json!({ "kind": kind, "amount_minor": amount, "occurred_at": at })),
            )
            .await;
        assert_eq!(status, 201);
    }

    let (status, report) = app
        .send(
            "POST",
            "/api/reports/generate/",
            Some(json!({ "start_date": "2024-01-01", "end_date": "2024-01-31" })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(report["totals"]["income_minor"], 150_00);
    assert_eq!(report["totals"]["expense_minor"], 30_00);
    assert_eq!(report["totals"]["profit_minor"], 120_00);
    assert_eq!(report["currency"], "EUR");
}

#[tokio::test]
async fn report_ranges_are_validated() {
    let app = app().await;
    let (status, _) = app
        .send(
            "POST",
            "/api/reports/generate/",
            Some(json!({ "start_date": "2024-02-01", "end_date": "2024-01-01" })),
        )
        .await;
    assert_eq!(status, 422);

    let (status, _) = app
        .send(
            "POST",
            "/api/reports/generate/",
            Some(json!({ "start_date": "2022-01-01", "end_date": "2024-01-01" })),
        )
        .await;
    assert_eq!(status, 422);

    let (status, _) = app
        .send(
            "POST",
            "/api/reports/generate/",
            Some(json!({ "start_date": "2024-01-01", "end_date": "2024-01-31", "kind": "weekly" })),
        )
        .await;
    assert_eq!(status, 422);
}

#[tokio::test]
async fn quick_reports_and_queries_default_to_recent_days() {
    let app = app().await;
    let (_, category) = app
        .send(
            "POST",
            "/api/categories/",
            Some(json!({ "name": "Rent", "kind": "expense" })),
        )
        .await;
    app.send(
        "POST",
        "/api/transactions/",
        Some(json!({
            "kind": "expense",
            "amount_minor": 800_00,
            "category_id": category["id"],
        })),
    )
    .await;

    let (status, report) = app
        .send("POST", "/api/reports/quick/", Some(json!({ "period": "week" })))
        .await;
    assert_eq!(status, 200);
    assert_eq!(report["totals"]["expense_minor"], 800_00);

    let (status, body) = app
        .send(
            "POST",
            "/api/reports/query/",
            Some(json!({ "query_type": "category_breakdown" })),
        )
        .await;
    assert_eq!(status, 200);
    let rows = body["result"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["category_name"], "Rent");
    assert_eq!(rows[0]["percentage"], 100.0);

    let (status, body) = app
        .send(
            "POST",
            "/api/reports/query/",
            Some(json!({ "query_type": "top_transactions", "limit": 5 })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["result"][0]["amount_minor"], 800_00);

    let (status, _) = app
        .send("POST", "/api/reports/quick/", Some(json!({ "period": "custom" })))
        .await;
    assert_eq!(status, 422);
}

#[tokio::test]
async fn exports_serve_csv_and_json() {
    let app = app().await;
    app.send(
        "POST",
        "/api/transactions/",
        Some(json!({
            "kind": "income",
            "amount_minor": 42_10,
            "occurred_at": "2024-03-02T12:00:00Z",
            "description": "market stall",
        })),
    )
    .await;

    let response = app
        .raw(
            &app.token,
            "GET",
            "/api/reports/export/csv?start_date=2024-03-01&end_date=2024-03-31",
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    assert!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("financial_report_2024-03-01_2024-03-31.csv")
    );
    let text = body_text(response).await;
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("id,occurred_at,kind,amount"));
    let row = lines.next().unwrap();
    assert!(row.contains("income,42.10,EUR"));
    assert!(row.contains("market stall"));

    let (status, body) = app
        .send(
            "GET",
            "/api/reports/export/json?start_date=2024-03-01&end_date=2024-03-31",
            None,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["report"]["totals"]["income_minor"], 42_10);
    assert_eq!(body["transactions"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(
            "GET",
            "/api/reports/export/xml?start_date=2024-03-01&end_date=2024-03-31",
            None,
        )
        .await;
    assert_eq!(status, 400);

    let (status, _) = app.send("GET", "/api/reports/export/csv", None).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn categories_are_unique_and_archivable() {
    let app = app().await;
    let (status, created) = app
        .send(
            "POST",
            "/api/categories/",
            Some(json!({ "name": "Office supplies", "kind": "expense" })),
        )
        .await;
    assert_eq!(status, 201);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(
            "POST",
            "/api/categories/",
            Some(json!({ "name": "office   SUPPLIES", "kind": "expense" })),
        )
        .await;
    assert_eq!(status, 409);

    let (status, updated) = app
        .send(
            "PATCH",
            &format!("/api/categories/{id}"),
            Some(json!({ "archived": true })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(updated["archived"], true);

    let (_, listed) = app.send("GET", "/api/categories/", None).await;
    assert!(listed["categories"].as_array().unwrap().is_empty());
    let (_, listed) = app
        .send("GET", "/api/categories/?include_archived=true", None)
        .await;
    assert_eq!(listed["categories"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn event_lifecycle() {
    let app = app().await;
    let (status, event) = app
        .send(
            "POST",
            "/api/events/",
            Some(json!({
                "title": "VAT return",
                "kind": "tax",
                "due_at": "2020-04-15T09:00:00Z",
            })),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(event["status"], "upcoming");
    assert_eq!(event["effective_status"], "overdue");
    let id = event["id"].as_str().unwrap().to_string();

    let (_, listed) = app.send("GET", "/api/events/?status=overdue", None).await;
    assert_eq!(listed["events"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(
            "PATCH",
            &format!("/api/events/{id}"),
            Some(json!({ "status": "overdue" })),
        )
        .await;
    assert_eq!(status, 422);

    let (status, renamed) = app
        .send(
            "PATCH",
            &format!("/api/events/{id}"),
            Some(json!({ "title": "VAT return Q1", "due_at": "2020-04-30T09:00:00Z" })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(renamed["title"], "VAT return Q1");
    assert_eq!(renamed["status"], "upcoming");

    let (status, _) = app
        .send("PATCH", &format!("/api/events/{id}"), Some(json!({ "title": " " })))
        .await;
    assert_eq!(status, 422);

    let (status, done) = app
        .send(
            "PATCH",
            &format!("/api/events/{id}"),
            Some(json!({ "status": "completed" })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(done["effective_status"], "completed");

    let (status, _) = app
        .send(
            "PATCH",
            &format!("/api/events/{id}"),
            Some(json!({ "status": "upcoming" })),
        )
        .await;
    assert_eq!(status, 422);

    let (status, _) = app.send("DELETE", &format!("/api/events/{id}"), None).await;
    assert_eq!(status, 204);
    let (status, _) = app.send("DELETE", &format!("/api/events/{id}"), None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn forecasts_are_saved_and_listed() {
    let app = app().await;
    let (status, saved) = app
        .send(
            "POST",
            "/api/forecasts/",
            Some(json!({ "period": "2024-05", "kind": "revenue", "projected_minor": 1_000_00 })),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(saved["basis"], "manual");

    let (status, _) = app
        .send(
            "POST",
            "/api/forecasts/",
            Some(json!({ "period": "2024-13", "kind": "revenue", "projected_minor": 1 })),
        )
        .await;
    assert_eq!(status, 422);

    let (status, listed) = app
        .send("GET", "/api/forecasts/?from=2024-01&to=2024-12", None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(listed["forecasts"][0]["period"], "2024-05");

    let (status, projected) = app
        .send(
            "POST",
            "/api/forecasts/project",
            Some(json!({ "kind": "expense", "months": 2 })),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(projected["basis"], "historical_average");
    assert_eq!(projected["projected_minor"], 0);
}

#[tokio::test]
async fn currency_endpoints_use_the_rate_cache() {
    let app = app().await;
    let (status, conversion) = app
        .send(
            "POST",
            "/api/currency/convert/",
            Some(json!({ "amount": "100", "from_currency": "USD", "to_currency": "EUR" })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(conversion["converted"], "90.00");

    let (status, quote) = app
        .send("GET", "/api/currency/rate?base=USD&quote=EUR", None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(quote["source"], "cache");
    assert_eq!(quote["stale"], false);

    let (status, _) = app
        .send(
            "POST",
            "/api/currency/convert/",
            Some(json!({ "amount": "-1", "from_currency": "USD", "to_currency": "EUR" })),
        )
        .await;
    assert_eq!(status, 422);
}

#[tokio::test]
async fn function_calls_go_through_the_registry() {
    let app = app().await;
    let (status, body) = app
        .send(
            "POST",
            "/api/function-call/",
            Some(json!({ "function": "financial_db_adapter.drop_tables", "arguments": {} })),
        )
        .await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("unknown function"));

    let (status, body) = app
        .send(
            "POST",
            "/api/function-call/",
            Some(json!({
                "function": "financial_db_adapter.create_category",
                "arguments": { "name": "Stock", "kind": "expense" },
            })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["function"], "financial_db_adapter.create_category");

    let (status, body) = app
        .send(
            "POST",
            "/api/chained-operations/",
            Some(json!({ "operations": [
                { "function": "financial_db_adapter.list_categories", "result_key": "before" },
                { "function": "currency_service.get_rate", "arguments": { "base_currency": "USD" } },
                { "function": "currency_service.supported_currencies" },
            ]})),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["completed"], false);
    assert_eq!(body["results"][0]["status"], "ok");
    assert_eq!(body["results"][0]["result_key"], "before");
    assert_eq!(body["results"][1]["status"], "failed");
    assert_eq!(body["results"][2]["status"], "skipped");

    let (status, tools) = app.send("GET", "/api/tools/", None).await;
    assert_eq!(status, 200);
    assert_eq!(tools.as_array().unwrap().len(), 21);
}

#[tokio::test]
async fn chat_keeps_history_per_merchant() {
    let app = app().await;
    let (status, reply) = app
        .send("POST", "/api/chat/", Some(json!({ "message": "hello" })))
        .await;
    assert_eq!(status, 200);
    assert!(reply["response"].as_str().unwrap().starts_with("(offline)"));
    assert!(reply["tool_results"].as_array().unwrap().is_empty());

    let (_, history) = app.send("GET", "/api/conversation/history/", None).await;
    let messages = history["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");

    let other = app.other_token().await;
    let (_, history) = app
        .send_as(&other, "GET", "/api/conversation/history/", None)
        .await;
    assert!(history["messages"].as_array().unwrap().is_empty());

    let (status, cleared) = app.send("POST", "/api/conversation/clear/", None).await;
    assert_eq!(status, 200);
    assert_eq!(cleared["cleared"], 2);

    let (status, _) = app
        .send("POST", "/api/chat/", Some(json!({ "message": "   " })))
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn unknown_origins_are_rejected() {
    let mut app = app().await;
    app.state = app
        .state
        .clone()
        .with_allowed_origins(vec!["https://shop.example".to_string()]);

    let request = Request::builder()
        .uri("/api/health/")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), 403);

    let request = Request::builder()
        .uri("/api/health/")
        .header(header::ORIGIN, "https://shop.example")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://shop.example"
    );
}

#![allow(dead_code)]

use std::{str::FromStr, sync::Arc};

use agent::{Agent, AgentSettings, CalendarService, Dispatcher, OfflineProvider};
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use engine::{Currency, Engine};
use fx::{CurrencyService, FxSettings, MemoryRateStore, RateProvider, ResultFx};
use http_body_util::BodyExt;
use migration::MigratorTrait;
use rust_decimal::Decimal;
use sea_orm::Database;
use serde_json::Value;
use server::ServerState;
use tower::ServiceExt;

struct FixedRates;

#[async_trait]
impl RateProvider for FixedRates {
    async fn fetch_rate(&self, _base: Currency, _quote: Currency) -> ResultFx<Decimal> {
        Ok(Decimal::from_str("0.90").unwrap())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

pub struct TestApp {
    pub engine: Arc<Engine>,
    pub state: ServerState,
    pub token: String,
}

pub async fn app() -> TestApp {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Arc::new(Engine::builder().database(db).build().await.unwrap());
    let token = engine
        .create_merchant("corner-shop", Currency::EUR)
        .await
        .unwrap()
        .api_token;

    let fx = CurrencyService::new(
        Arc::new(FixedRates),
        Arc::new(MemoryRateStore::new()),
        FxSettings::default(),
    );
    let calendar = CalendarService::new(engine.clone(), None);
    let dispatcher = Dispatcher::new(engine.clone(), fx, calendar);
    let agent = Agent::new(
        Arc::new(OfflineProvider),
        dispatcher,
        AgentSettings::default(),
    );
    let state = ServerState::new(engine.clone(), Arc::new(agent));
    TestApp {
        engine,
        state,
        token,
    }
}

impl TestApp {
    pub fn router(&self) -> Router {
        server::router(self.state.clone())
    }

    /// Token of a second merchant sharing the database.
    pub async fn other_token(&self) -> String {
        self.engine
            .create_merchant("other-shop", Currency::EUR)
            .await
            .unwrap()
            .api_token
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (u16, Value) {
        self.send_as(&self.token, method, uri, body).await
    }

    pub async fn send_as(
        &self,
        token: &str,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (u16, Value) {
        let response = self.raw(token, method, uri, body).await;
        let status = response.status().as_u16();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn raw(
        &self,
        token: &str,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"));
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router().oneshot(request).await.unwrap()
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

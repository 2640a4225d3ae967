use std::{sync::Arc, time::Duration};

use agent::{
    Agent, AgentSettings, CalendarProvider, CalendarService, Dispatcher, GoogleCalendarConfig,
    GoogleCalendarProvider, LlmProvider, OfflineProvider, OpenAiConfig, OpenAiProvider,
};
use fx::{CurrencyService, DbRateStore, FxSettings, HttpProviderConfig, HttpRateProvider};
use migration::{Migrator, MigratorTrait};
use settings::{Database, Settings};

mod settings;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let settings = Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "tally={level},server={level},agent={level},fx={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.server.database).await?;
    let engine = Arc::new(engine::Engine::builder().database(db.clone()).build().await?);

    let provider = HttpRateProvider::new(HttpProviderConfig {
        primary_url: settings.fx.primary_url.clone(),
        secondary_url: settings.fx.secondary_url.clone(),
        history_url: settings.fx.history_url.clone(),
        api_key: settings.fx.api_key.clone(),
    })?;
    let currency = CurrencyService::new(
        Arc::new(provider),
        Arc::new(DbRateStore::new(db)),
        FxSettings {
            cache_ttl: Duration::from_secs(settings.fx.cache_ttl_secs),
            allow_stale: settings.fx.allow_stale,
            max_stale: Duration::from_secs(settings.fx.max_stale_secs),
        },
    );

    let calendar = CalendarService::new(engine.clone(), calendar_provider(&settings)?);
    let dispatcher = Dispatcher::new(engine.clone(), currency, calendar);
    let agent = Agent::new(
        llm_provider(&settings)?,
        dispatcher,
        AgentSettings {
            max_history: settings.llm.max_history,
            max_tool_rounds: settings.llm.max_tool_rounds,
            ..AgentSettings::default()
        },
    );
    tracing::info!(llm = agent.provider_name(), "agent ready");

    let state = server::ServerState::new(engine, Arc::new(agent))
        .with_allowed_origins(settings.server.allowed_origins.clone());
    let addr = format!("{}:{}", settings.server.bind, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    server::run_with_listener(state, listener).await?;

    Ok(())
}

fn llm_provider(settings: &Settings) -> Result<Arc<dyn LlmProvider>, BoxError> {
    match (settings.llm.provider.as_str(), settings.llm.api_key.as_deref()) {
        ("openai", Some(api_key)) => {
            let provider = OpenAiProvider::new(OpenAiConfig {
                base_url: settings.llm.base_url.clone(),
                model: settings.llm.model.clone(),
                ..OpenAiConfig::new(api_key)
            })?;
            Ok(Arc::new(provider))
        }
        ("openai", None) => {
            tracing::warn!("llm.provider is openai but no api_key is set, using offline replies");
            Ok(Arc::new(OfflineProvider))
        }
        ("offline", _) => Ok(Arc::new(OfflineProvider)),
        (other, _) => Err(format!("unknown llm provider: {other}").into()),
    }
}

fn calendar_provider(
    settings: &Settings,
) -> Result<Option<Arc<dyn CalendarProvider>>, BoxError> {
    let Some(calendar) = &settings.calendar else {
        tracing::info!("no calendar configured, events stay local");
        return Ok(None);
    };
    let provider = GoogleCalendarProvider::new(GoogleCalendarConfig {
        base_url: calendar.base_url.clone(),
        calendar_id: calendar.calendar_id.clone(),
        access_token: calendar.access_token.clone(),
    })?;
    Ok(Some(Arc::new(provider)))
}

async fn parse_database(config: &Database) -> Result<sea_orm::DatabaseConnection, BoxError> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
        Database::Url(url) => url.clone(),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

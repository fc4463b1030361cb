use std::{process, sync::Arc};

use oracle::{
    application::{
        artifacts::ArtifactService,
        error::AppError,
        history::UserHistoryService,
        repos::{ArtifactsRepo, ArtifactsWriteRepo, CodingFeedbackRepo, UserHistoryRepo},
    },
    cache::{CacheConfig, CacheTrigger, LruViewStore, ResilientViewCache, ViewCache},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let state = build_api_state(repositories, &settings);
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target: "oracle::serve",
        addr = %settings.server.addr,
        cache_enabled = settings.cache.enabled,
        depth_limit = settings.cache.depth_limit,
        "Listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_pool(&settings).await?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;
    info!(target: "oracle::migrate", "Migrations applied");
    Ok(())
}

async fn connect_pool(settings: &config::Settings) -> Result<sqlx::PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let pool = connect_pool(settings).await?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;
    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_api_state(repositories: Arc<PostgresRepositories>, settings: &config::Settings) -> ApiState {
    let artifacts_repo: Arc<dyn ArtifactsRepo> = repositories.clone();
    let artifacts_write_repo: Arc<dyn ArtifactsWriteRepo> = repositories.clone();
    let history_repo: Arc<dyn UserHistoryRepo> = repositories.clone();
    let feedback_repo: Arc<dyn CodingFeedbackRepo> = repositories.clone();

    let cache_config = CacheConfig::from(&settings.cache);
    let (views, cache_trigger) = if cache_config.is_enabled() {
        let store: Arc<dyn ViewCache> = Arc::new(LruViewStore::new(&cache_config));
        let views = ResilientViewCache::new(store);
        let trigger = Arc::new(CacheTrigger::new(cache_config.clone(), views.clone()));
        (Some(views), Some(trigger))
    } else {
        (None, None)
    };

    let artifacts = Arc::new(
        ArtifactService::new(artifacts_repo, artifacts_write_repo)
            .with_view_cache_opt(views)
            .with_cache_trigger_opt(cache_trigger.clone())
            .with_depth_limit(cache_config.depth_limit),
    );
    let history = Arc::new(
        UserHistoryService::new(history_repo, feedback_repo).with_cache_trigger_opt(cache_trigger),
    );

    ApiState {
        artifacts,
        history,
        db: repositories,
    }
}

use std::{process, sync::Arc};

use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use trittico::{
    application::{error::AppError, repos::StoriesRepo, stories::StoryService},
    compose::CompositeCache,
    config,
    infra::{
        db::SqliteRepositories,
        error::InfraError,
        http::{self, HttpState},
        media::MediaStore,
        telemetry,
    },
    inventory::{AssetIndexer, Inventory},
};

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
        config::Command::Check(_) => run_check(settings),
    }
}

fn build_inventory(settings: &config::Settings) -> Result<Arc<Inventory>, AppError> {
    let inventory = AssetIndexer::new(
        settings.assets.images_dir.clone(),
        settings.assets.videos_dir.clone(),
    )
    .scan()
    .map_err(|err| AppError::validation(format!("asset inventory is not usable: {err}")))?;

    Ok(Arc::new(inventory))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let inventory = build_inventory(&settings)?;

    let pool = SqliteRepositories::connect(
        &settings.database.url,
        settings.database.max_connections.get(),
    )
    .await
    .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    SqliteRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    let repositories = Arc::new(SqliteRepositories::new(pool));
    let stories_repo: Arc<dyn StoriesRepo> = repositories.clone();

    let state = HttpState {
        stories: Arc::new(StoryService::new(stories_repo)),
        composites: Arc::new(CompositeCache::new(
            inventory.clone(),
            settings.assets.cache_dir.clone(),
        )),
        media: Arc::new(MediaStore::new(
            settings.assets.videos_dir.clone(),
            settings.assets.cache_dir.clone(),
        )),
        inventory,
        db: repositories,
    };

    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "trittico::serve",
        addr = %settings.server.public_addr,
        "Listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

fn run_check(settings: config::Settings) -> Result<(), AppError> {
    let inventory = build_inventory(&settings)?;

    println!(
        "{} images in {} categories, {} videos",
        inventory.num_images(),
        inventory.categories().len(),
        inventory.num_videos()
    );

    Ok(())
}

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

use ag_api::{app, bootstrap, ApiConfig, AppState};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ApiConfig::load()?;
    info!("starting AuthGrid");

    let (engine, sync) = bootstrap::start_engine(&config).await?;
    let state = web::Data::new(AppState::new(engine.clone(), sync.clone()));

    let bind_address = config.server.bind_address();
    info!(address = %bind_address, "http adapter listening");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(TracingLogger::default())
            .wrap(cors)
            .configure(app::configure)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    // actix returns once the shutdown signal has drained the workers
    if let Some(sync) = sync {
        sync.stop().await;
    }
    engine.stop().await.ok();
    info!("AuthGrid stopped");
    Ok(())
}

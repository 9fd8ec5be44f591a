use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use login_server::{configure, AppError, AppState, Settings};
use std::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[actix_web::main]
async fn main() -> login_server::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // Load configuration
    let config = Settings::new()?;
    info!("Configuration loaded successfully ({})", config.environment);

    // Token settings are validated here; a weak or missing secret stops startup
    let state = match AppState::new(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            error!("Refusing to start: {}", e);
            return Err(e);
        }
    };
    let state = web::Data::new(state);

    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))?;
    info!("Starting server at {}:{}", config.server.host, config.server.port);

    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .listen(listener)?
        .workers(config.server.workers as usize)
        .run()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok(())
}

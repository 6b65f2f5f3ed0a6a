use axum::extract::Request;
use axum::ServiceExt;
use clap::{Parser, Subcommand};
use fifth_social::api::routes::build_app;
use fifth_social::config::app_config::{initialize_app_state, StartupError};
use fifth_social::config::settings::{ConfigError, Settings};
use fifth_social::db::pool;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fifth-social", version, about = "5thsocial API server")]
struct Cli {
    /// Bind host, overrides SERVER_HOST
    #[arg(long, global = true)]
    host: Option<String>,
    /// Bind port, overrides SERVER_PORT
    #[arg(long, global = true)]
    port: Option<u16>,
    /// SQLite database URL, overrides DATABASE_URL
    #[arg(long, global = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Apply pending migrations and start the HTTP server (default)
    Serve,
    /// Apply pending migrations and exit
    Migrate,
}

#[derive(Debug, derive_more::Display, derive_more::From)]
enum CliError {
    #[display("configuration error: {_0}")]
    Config(ConfigError),
    #[display("{_0}")]
    Startup(StartupError),
    #[display("server error: {_0}")]
    Io(std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            // Logging is not set up yet.
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&settings);
    info!("Loaded settings: {:?}", settings);

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings).await,
        Command::Migrate => migrate(settings).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings, CliError> {
    let mut settings = Settings::from_env()?;
    if let Some(host) = &cli.host {
        settings.server_host = host.clone();
    }
    if let Some(port) = cli.port {
        settings.server_port = port;
    }
    if let Some(database_url) = &cli.database_url {
        settings.database_url = database_url.clone();
    }
    Ok(settings)
}

// RUST_LOG wins; otherwise info in development and error in production.
fn init_tracing(settings: &Settings) {
    let default_level = if settings.environment.is_production() {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

async fn migrate(settings: Settings) -> Result<(), CliError> {
    let db_pool = pool::connect(&settings.database_url)
        .await
        .map_err(StartupError::from)?;
    pool::run_migrations(&db_pool)
        .await
        .map_err(StartupError::from)?;
    info!("Migrations applied to {}", settings.database_url);
    db_pool.close().await;
    Ok(())
}

async fn serve(settings: Settings) -> Result<(), CliError> {
    let server_address = settings.server_address();
    let state = initialize_app_state(settings).await?;
    let app = build_app(state.clone());

    info!("Starting server at {}", server_address);
    info!("API reference at http://{}/docs", server_address);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.db_pool.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use ctm_core::{CoreConfig, data_dir_from_env_value};

/// Main entry point for the CTM application
///
/// Loads the trial and patient collections from the data directory and serves the REST API,
/// with Swagger UI at `/swagger-ui`.
///
/// # Environment Variables
/// - `CTM_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `CTM_DATA_DIR`: Directory holding the JSON collections (default: "trial_data")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the data directory is not usable,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ctm=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("CTM_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir = data_dir_from_env_value(std::env::var("CTM_DATA_DIR").ok());

    let cfg = Arc::new(CoreConfig::new(data_dir)?);
    tracing::info!("++ Using data directory {}", cfg.data_dir().display());

    let state = AppState::open(cfg)?;
    let app = api_rest::router(state);

    tracing::info!("++ Starting CTM REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

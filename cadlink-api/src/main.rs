//! CADLINK API Server Entry Point
//!
//! Loads configuration from the environment, builds the in-memory catalog and
//! starts the Axum HTTP server.

use cadlink_api::{
    create_api_router, init_tracing, ApiConfig, ApiError, ApiResult, AppState, AuthConfig,
};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let api_config = ApiConfig::from_env()?;
    init_tracing(api_config.log_format)?;

    let auth_config = AuthConfig::from_env();
    auth_config.validate_for_production(api_config.is_production())?;

    let state = AppState::in_memory(&api_config)?;
    let app = create_api_router(state, auth_config);

    let addr = api_config.bind_addr()?;
    tracing::info!(
        %addr,
        variant_strategy = %api_config.variant_strategy,
        environment = %api_config.environment,
        "Starting CADLINK API server"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

// Social graph server

use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use social_graph::{
    api::{cors_layer, create_router},
    app_state::AppState,
    config::Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let addr = config.server_address();

    let app_state = AppState::new(config).await?;
    match app_state.config.auth.owner_id {
        Some(owner) => info!("Owner account is {}", owner),
        None => info!("No OWNER_ID configured; account removal is disabled"),
    }

    let cors = cors_layer(&app_state.config.server.cors_origins);
    let app = create_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    info!("Social graph server listening on http://{}", addr);
    info!("  POST   /api/v1/user/register");
    info!("  POST   /api/v1/user/followorunfollow/{{id}}");
    info!("  DELETE /api/v1/user/{{id}}");
    info!("  GET    /api/v1/post/all");
    info!("  GET    /api/v1/ws");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

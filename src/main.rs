use std::sync::Arc;
use tracing::info;

use vtx_mime_stream::config::Settings;
use vtx_mime_stream::web::{self, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vtx_mime_stream=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    info!("[Startup] vtx-mime-stream initializing...");

    let settings = Settings::new()?;
    info!(
        "[Config] Binding at {}:{} (detection threshold {} bytes)",
        settings.server.host, settings.server.port, settings.detection.minimum_bytes
    );

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let app = web::router(Arc::new(AppState::new(settings)));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("[Startup] Service ready at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

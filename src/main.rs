use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use checkin_backend::{
    config::{get_config, init_config},
    routes,
    storage::UserStorage,
    AppState,
};
use chrono::Utc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let storage = if config.use_memory_db {
        info!("Using in-memory user storage");
        UserStorage::memory()
    } else {
        UserStorage::sqlite(&config.database_path).await?
    };

    let app_state = AppState::new(storage);

    {
        let state = app_state.clone();
        let interval = config.sweep_interval_secs;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(interval)).await;
                match state.storage.list_users().await {
                    Ok(users) => {
                        let summary = state.checker.sweep(&users, Utc::now()).await;
                        info!(
                            "Periodic sweep finished: {} evaluated, {} timed out, {} notified, {} failed",
                            summary.evaluated, summary.timed_out, summary.notified, summary.failed
                        );
                    }
                    Err(e) => {
                        tracing::error!("Sweep could not load the user snapshot: {:?}", e);
                    }
                }
            }
        });
    }

    let app = Router::new()
        .route("/health", get(routes::health::health))
        .route("/users", post(routes::users::create_user))
        .route(
            "/users/:user_id",
            get(routes::users::get_user)
                .put(routes::users::update_user)
                .delete(routes::users::delete_user),
        )
        .route("/users/:user_id/checkin", post(routes::users::checkin))
        .route(
            "/users/:user_id/timeout-config",
            get(routes::users::get_timeout_config),
        )
        .route(
            "/trigger-timeout-check",
            post(routes::sweep::trigger_timeout_check),
        )
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

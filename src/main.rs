use std::sync::Arc;
use std::time::Duration;

mod ai;
mod app;
mod config;
mod embeddings;
mod error;
mod ingredients;
mod kv;
mod meal_plans;
mod nutrition;
mod state;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "mealplanner=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;

    if let Some(db) = &app_state.db {
        if let Err(e) = sqlx::migrate!("./migrations").run(db).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }
    }

    kv::spawn_expiry_sweeper(
        Arc::clone(&app_state.kv),
        Duration::from_secs(app_state.config.kv_sweep_interval_secs.max(1)),
    );

    let app = app::build_app(app_state);
    app::serve(app).await
}

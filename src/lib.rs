pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;

use std::sync::Arc;

use crate::core::{config::Settings, state::AppState, telemetry};
use crate::services::content_fetch::HttpContentFetcher;
use crate::services::grade_callback::HttpGradeRecorder;
use crate::services::grading::GradingDispatcher;
use crate::services::oracle_client::HttpGradingOracle;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let oracle = Arc::new(HttpGradingOracle::from_settings(&settings)?);
    let fetcher = Arc::new(HttpContentFetcher::from_settings(&settings)?);
    let recorder = Arc::new(HttpGradeRecorder::from_settings(&settings)?);
    let dispatcher = GradingDispatcher::new(oracle, fetcher);

    let state = AppState::new(settings, db_pool, dispatcher, recorder);

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "Gradeflow API listening"
    );

    axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await?;

    Ok(())
}

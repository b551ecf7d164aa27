//! HTTP route handlers for the monitor API.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use paycheck::core::pipeline::PipelineSnapshot;
use paycheck::core::types::CheckResult;
use paycheck::io::config::load_config;
use paycheck::simulator::{Simulation, SimulationOutcome};
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route(
            "/check",
            get(get_check).post(start_check).delete(cancel_check),
        )
}

async fn health() -> &'static str {
    "ok"
}

/// POST /api/check - start a simulation from the project config, replacing
/// any running one.
async fn start_check(State(state): State<AppState>) -> Result<Json<PipelineSnapshot>, StatusCode> {
    let paths = state.paths();
    let config = load_config(&paths.config_path).map_err(|err| {
        warn!(error = %format!("{:#}", err), "cannot load config");
        StatusCode::UNPROCESSABLE_ENTITY
    })?;
    let pipeline = config.build_pipeline().map_err(|err| {
        warn!(error = %err, "cannot build pipeline");
        StatusCode::UNPROCESSABLE_ENTITY
    })?;

    let (simulation, outcome) = Simulation::spawn_with_events(
        pipeline,
        config.timing(),
        CheckResult::simulated(),
        state.event_tx.as_ref().clone(),
    )
    .map_err(|err| {
        warn!(error = %err, "cannot start simulation");
        StatusCode::UNPROCESSABLE_ENTITY
    })?;
    let snapshot = simulation.snapshot();

    tokio::spawn(async move {
        match outcome.await {
            Ok(SimulationOutcome::Completed(result)) => {
                info!(status = result.status.as_str(), "check completed");
            }
            Ok(SimulationOutcome::Failed(failure)) => {
                info!(stage = %failure.stage, "check failed");
            }
            Err(_) => debug!("check ended without an outcome"),
        }
    });

    let previous = state.current().replace(simulation);
    if previous.is_some() {
        info!("replaced running check");
    }
    Ok(Json(snapshot))
}

/// GET /api/check - snapshot of the current simulation.
async fn get_check(State(state): State<AppState>) -> Result<Json<PipelineSnapshot>, StatusCode> {
    state
        .current()
        .as_ref()
        .map(|simulation| Json(simulation.snapshot()))
        .ok_or(StatusCode::NOT_FOUND)
}

/// DELETE /api/check - cancel and forget the current simulation.
async fn cancel_check(State(state): State<AppState>) -> StatusCode {
    match state.current().take() {
        Some(simulation) => {
            simulation.cancel();
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

//! Elevator Routes

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::{error::ApiError, AppState};
use storage::{Elevator, NewElevator};

/// Get all elevators
pub async fn list_elevators(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Elevator>>, ApiError> {
    let elevators = state.repository.list_elevators().await?;
    Ok(Json(elevators))
}

/// Register an elevator
pub async fn create_elevator(
    State(state): State<Arc<AppState>>,
    Json(elevator): Json<NewElevator>,
) -> Result<Json<Elevator>, ApiError> {
    let created = state.repository.create_elevator(&elevator).await?;
    Ok(Json(created))
}

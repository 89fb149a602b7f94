//! Movement Routes

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{error::ApiError, AppState};
use storage::{Movement, NewMovement};

/// Log a movement. Closes the elevator's open movement, if any.
pub async fn log_movement(
    State(state): State<Arc<AppState>>,
    Json(movement): Json<NewMovement>,
) -> Result<Json<Movement>, ApiError> {
    let created = state.repository.log_movement(&movement).await?;
    Ok(Json(created))
}

/// Get all movements
pub async fn list_movements(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Movement>>, ApiError> {
    let movements = state.repository.list_movements().await?;
    Ok(Json(movements))
}

/// Get movements of one elevator
pub async fn list_movements_for_elevator(
    State(state): State<Arc<AppState>>,
    Path(elevator_id): Path<i64>,
) -> Result<Json<Vec<Movement>>, ApiError> {
    let movements = state
        .repository
        .list_movements_for_elevator(elevator_id)
        .await?;
    Ok(Json(movements))
}

/// Get the open movement of every resting elevator
pub async fn list_resting_elevators(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Movement>>, ApiError> {
    let movements = state.repository.list_resting_elevators().await?;
    Ok(Json(movements))
}

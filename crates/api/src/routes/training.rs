//! Training Data Export

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::{error::ApiError, AppState};
use storage::TrainingData;

/// Get demand counts and elapsed rest times per trip
pub async fn get_ml_data(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TrainingData>, ApiError> {
    let data = state.repository.training_data().await?;
    Ok(Json(data))
}

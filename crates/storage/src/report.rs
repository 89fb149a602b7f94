//! Demand aggregation for model training consumers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// How often a `(start_floor, end_floor)` trip was completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandEntry {
    pub requested_floor: i64,
    pub destination_floor: i64,
    pub count: i64,
}

/// Elapsed rest time of one representative movement of a trip group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElapsedEntry {
    pub start_floor: i64,
    pub end_floor: i64,
    pub elevator_id: i64,
    pub elapsed_time_seconds: f64,
}

/// Response of the training data export.
///
/// `elapsed_data[i]` belongs to the same group as `training_data[i]`. Its elapsed time
/// comes from whichever row SQLite picks for the group, not from an average over the
/// group. Consumers must not read it as a group statistic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingData {
    pub training_data: Vec<DemandEntry>,
    pub elapsed_data: Vec<ElapsedEntry>,
}

/// One row of the grouped demand query
#[derive(Debug, Clone, FromRow)]
pub(crate) struct DemandRow {
    pub start_floor: i64,
    pub end_floor: i64,
    pub count: i64,
    pub elevator_id: i64,
    pub arrival_time: DateTime<Utc>,
    pub departure_time: DateTime<Utc>,
}

impl DemandRow {
    fn elapsed_seconds(&self) -> f64 {
        (self.departure_time - self.arrival_time).num_milliseconds() as f64 / 1000.0
    }
}

impl FromIterator<DemandRow> for TrainingData {
    fn from_iter<I: IntoIterator<Item = DemandRow>>(rows: I) -> Self {
        let mut data = TrainingData::default();
        for row in rows {
            data.elapsed_data.push(ElapsedEntry {
                start_floor: row.start_floor,
                end_floor: row.end_floor,
                elevator_id: row.elevator_id,
                elapsed_time_seconds: row.elapsed_seconds(),
            });
            data.training_data.push(DemandEntry {
                requested_floor: row.start_floor,
                destination_floor: row.end_floor,
                count: row.count,
            });
        }
        data
    }
}

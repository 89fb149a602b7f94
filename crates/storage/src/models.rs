//! Row types

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

/// Registered elevator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Elevator {
    pub id: i64,
    pub name: String,
    pub location: String,
}

/// Fields required to register an elevator
#[derive(Debug, Clone, Deserialize)]
pub struct NewElevator {
    pub name: String,
    pub location: String,
}

/// One elevator transit between two floors.
///
/// A `None` departure time marks the open record: the elevator has been resting at
/// `end_floor` since `arrival_time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Movement {
    pub id: i64,
    pub elevator_id: i64,
    pub start_floor: i64,
    pub end_floor: i64,
    pub arrival_time: DateTime<Utc>,
    pub departure_time: Option<DateTime<Utc>>,
}

impl Movement {
    pub fn is_open(&self) -> bool {
        self.departure_time.is_none()
    }
}

/// Fields accepted when logging a movement
#[derive(Debug, Clone, Deserialize)]
pub struct NewMovement {
    pub elevator_id: i64,
    pub start_floor: i64,
    pub end_floor: i64,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub departure_time: Option<DateTime<Utc>>,
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an ISO 8601 timestamp. Values without an offset are read as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(with_offset) => Ok(with_offset.with_timezone(&Utc)),
        Err(offset_err) => NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| naive.and_utc())
            .ok_or(offset_err),
    }
}

fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| {
            parse_timestamp(&raw)
                .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{}': {}", raw, e)))
        })
        .transpose()
}

/// Row counts reported by the health endpoint
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StoreCounts {
    pub elevators: i64,
    pub movements: i64,
    pub open_movements: i64,
}

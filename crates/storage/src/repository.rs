//! Repository Implementation

use crate::models::{Elevator, Movement, NewElevator, NewMovement, StoreCounts};
use crate::report::{DemandRow, TrainingData};
use crate::schema::init_schema;
use crate::{Result, StorageError};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const MOVEMENT_COLUMNS: &str =
    "id, elevator_id, start_floor, end_floor, arrival_time, departure_time";

/// Repository for elevator and movement records.
///
/// Cloning is cheap: clones share the underlying pool. Every call checks a connection
/// out of the pool for its own duration only.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Open (or create) the SQLite database at `url` and bootstrap the schema
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StorageError::InvalidUrl(format!("{}: {}", url, e)))?
            .create_if_missing(true)
            // Movements may reference elevators that were never registered
            .foreign_keys(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        info!("Opened SQLite database at {}", url);
        Self::from_pool(pool).await
    }

    /// Create a private in-memory repository (for testing)
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(false);

        // Every connection to `:memory:` is a separate database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating missing tables
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        init_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get all elevators
    pub async fn list_elevators(&self) -> Result<Vec<Elevator>> {
        let elevators = sqlx::query_as::<_, Elevator>(
            "SELECT id, name, location FROM elevators ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        debug!("Loaded {} elevators", elevators.len());
        Ok(elevators)
    }

    /// Register an elevator. Duplicate names and locations are allowed.
    pub async fn create_elevator(&self, elevator: &NewElevator) -> Result<Elevator> {
        let created = sqlx::query_as::<_, Elevator>(
            r#"
            INSERT INTO elevators (name, location)
            VALUES (?, ?)
            RETURNING id, name, location
            "#,
        )
        .bind(&elevator.name)
        .bind(&elevator.location)
        .fetch_one(&self.pool)
        .await?;

        info!("Created elevator {} ({} @ {})", created.id, created.name, created.location);
        metrics::counter!("elevator_log_elevators_created_total").increment(1);
        Ok(created)
    }

    /// Log a movement, closing the elevator's open record first.
    ///
    /// The open record (if any) gets the current time as its departure time, and the new
    /// record starts at that same instant. Both writes share one transaction. Neither the
    /// floors nor the elevator reference are validated.
    pub async fn log_movement(&self, movement: &NewMovement) -> Result<Movement> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let closed: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE movements
            SET departure_time = ?
            WHERE id = (
                SELECT id FROM movements
                WHERE elevator_id = ? AND departure_time IS NULL
                ORDER BY id DESC
                LIMIT 1
            )
            RETURNING id
            "#,
        )
        .bind(now)
        .bind(movement.elevator_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some((closed_id,)) = closed {
            info!(
                "Closed open movement {} of elevator {}",
                closed_id, movement.elevator_id
            );
            metrics::counter!("elevator_log_movements_closed_total").increment(1);
        }

        let created = sqlx::query_as::<_, Movement>(&format!(
            r#"
            INSERT INTO movements (elevator_id, start_floor, end_floor, arrival_time, departure_time)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            MOVEMENT_COLUMNS
        ))
        .bind(movement.elevator_id)
        .bind(movement.start_floor)
        .bind(movement.end_floor)
        .bind(now)
        .bind(movement.departure_time)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            "Logged movement {} of elevator {}: {} -> {}",
            created.id, created.elevator_id, created.start_floor, created.end_floor
        );
        metrics::counter!("elevator_log_movements_logged_total").increment(1);
        Ok(created)
    }

    /// Get all movements
    pub async fn list_movements(&self) -> Result<Vec<Movement>> {
        let movements = sqlx::query_as::<_, Movement>(&format!(
            "SELECT {} FROM movements ORDER BY id",
            MOVEMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!("Loaded {} movements", movements.len());
        Ok(movements)
    }

    /// Get movements of one elevator. Unknown elevators yield an empty list.
    pub async fn list_movements_for_elevator(&self, elevator_id: i64) -> Result<Vec<Movement>> {
        let movements = sqlx::query_as::<_, Movement>(&format!(
            "SELECT {} FROM movements WHERE elevator_id = ? ORDER BY id",
            MOVEMENT_COLUMNS
        ))
        .bind(elevator_id)
        .fetch_all(&self.pool)
        .await?;

        debug!("Loaded {} movements for elevator {}", movements.len(), elevator_id);
        Ok(movements)
    }

    /// Get the open movement of every elevator that has one.
    ///
    /// No minimum idle duration is applied: an elevator counts as resting from the
    /// moment it arrives.
    pub async fn list_resting_elevators(&self) -> Result<Vec<Movement>> {
        let movements = sqlx::query_as::<_, Movement>(&format!(
            "SELECT {} FROM movements WHERE departure_time IS NULL ORDER BY id",
            MOVEMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Aggregate closed movements by `(start_floor, end_floor)`.
    ///
    /// `elevator_id` and both timestamps are bare columns of the grouped query, so SQLite
    /// fills them from an arbitrary row of each group.
    pub async fn training_data(&self) -> Result<TrainingData> {
        let rows = sqlx::query_as::<_, DemandRow>(
            r#"
            SELECT start_floor,
                   end_floor,
                   COUNT(elevator_id) AS count,
                   elevator_id,
                   arrival_time,
                   departure_time
            FROM movements
            WHERE departure_time IS NOT NULL
            GROUP BY start_floor, end_floor
            ORDER BY start_floor, end_floor
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!("Aggregated {} demand groups", rows.len());
        Ok(rows.into_iter().collect())
    }

    /// Get row counts
    pub async fn counts(&self) -> Result<StoreCounts> {
        let (elevators, movements, open_movements): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT (SELECT COUNT(*) FROM elevators),
                   (SELECT COUNT(*) FROM movements),
                   (SELECT COUNT(*) FROM movements WHERE departure_time IS NULL)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreCounts {
            elevators,
            movements,
            open_movements,
        })
    }
}

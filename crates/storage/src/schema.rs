//! Table bootstrap
//!
//! Tables are created on startup when missing. There is no migration history.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::Result;

const CREATE_ELEVATORS: &str = r#"
    CREATE TABLE IF NOT EXISTS elevators (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        location TEXT NOT NULL
    )
"#;

const CREATE_MOVEMENTS: &str = r#"
    CREATE TABLE IF NOT EXISTS movements (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        elevator_id INTEGER NOT NULL REFERENCES elevators(id),
        start_floor INTEGER NOT NULL,
        end_floor INTEGER NOT NULL,
        arrival_time DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        departure_time DATETIME
    )
"#;

const CREATE_MOVEMENTS_ELEVATOR_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS ix_movements_elevator_id
    ON movements (elevator_id)
"#;

// Stores written before the unique index existed may hold several open rows for one
// elevator. Only the newest stays open.
const CLOSE_STALE_OPEN_MOVEMENTS: &str = r#"
    UPDATE movements
    SET departure_time = ?
    WHERE departure_time IS NULL
      AND id NOT IN (
          SELECT MAX(id) FROM movements
          WHERE departure_time IS NULL
          GROUP BY elevator_id
      )
"#;

// At most one open record per elevator.
const CREATE_OPEN_MOVEMENT_INDEX: &str = r#"
    CREATE UNIQUE INDEX IF NOT EXISTS ux_movements_open_per_elevator
    ON movements (elevator_id)
    WHERE departure_time IS NULL
"#;

/// Create the `elevators` and `movements` tables and their indexes if they do not exist
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for statement in [
        CREATE_ELEVATORS,
        CREATE_MOVEMENTS,
        CREATE_MOVEMENTS_ELEVATOR_INDEX,
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    let closed = sqlx::query(CLOSE_STALE_OPEN_MOVEMENTS)
        .bind(Utc::now())
        .execute(pool)
        .await?
        .rows_affected();
    if closed > 0 {
        warn!(
            "Closed {} stale open movements so each elevator keeps one open record",
            closed
        );
    }

    sqlx::query(CREATE_OPEN_MOVEMENT_INDEX).execute(pool).await?;

    info!("Schema initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let pool = memory_pool().await;
        init_schema(&pool).await.unwrap();
        init_schema(&pool).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('elevators', 'movements') ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(tables, vec![("elevators".to_string(),), ("movements".to_string(),)]);
    }

    #[tokio::test]
    async fn test_second_open_movement_rejected() {
        let pool = memory_pool().await;
        init_schema(&pool).await.unwrap();
        sqlx::query("INSERT INTO elevators (name, location) VALUES ('A', 'Lobby')")
            .execute(&pool)
            .await
            .unwrap();

        let insert = "INSERT INTO movements (elevator_id, start_floor, end_floor) VALUES (1, 0, 3)";
        sqlx::query(insert).execute(&pool).await.unwrap();
        let second = sqlx::query(insert).execute(&pool).await;
        assert!(second.is_err());

        // Closed rows are not constrained
        sqlx::query(
            "INSERT INTO movements (elevator_id, start_floor, end_floor, departure_time) VALUES (1, 3, 0, CURRENT_TIMESTAMP)",
        )
        .execute(&pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_init_schema_closes_duplicate_open_movements() {
        let pool = memory_pool().await;

        // Table from before the open-record index existed
        sqlx::query(
            r#"
            CREATE TABLE movements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                elevator_id INTEGER NOT NULL,
                start_floor INTEGER NOT NULL,
                end_floor INTEGER NOT NULL,
                arrival_time DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                departure_time DATETIME
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        for (elevator_id, start, end) in [(1, 0, 3), (1, 3, 5), (2, 0, 1), (1, 5, 2)] {
            sqlx::query(
                "INSERT INTO movements (elevator_id, start_floor, end_floor) VALUES (?, ?, ?)",
            )
            .bind(elevator_id)
            .bind(start)
            .bind(end)
            .execute(&pool)
            .await
            .unwrap();
        }

        init_schema(&pool).await.unwrap();

        let open: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT id, elevator_id FROM movements WHERE departure_time IS NULL ORDER BY id",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(open, vec![(3, 2), (4, 1)]);

        let index: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND name = 'ux_movements_open_per_elevator'",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(index.len(), 1);
    }
}

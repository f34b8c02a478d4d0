use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::personas;
use crate::models::{MetricSnapshot, MetricsInput};

pub const DEFAULT_HISTORY_LIMIT: i64 = 30;

const METRIC_COLUMNS: &str =
    "id, persona_id, recorded_at, followers, engagement_rate, avg_likes, notes";

fn metric_from_row(row: &PgRow) -> anyhow::Result<MetricSnapshot> {
    Ok(MetricSnapshot {
        id: row.try_get("id")?,
        persona_id: row.try_get("persona_id")?,
        recorded_at: row.try_get("recorded_at")?,
        followers: row.try_get("followers")?,
        engagement_rate: row.try_get("engagement_rate")?,
        avg_likes: row.try_get("avg_likes")?,
        notes: row.try_get("notes")?,
    })
}

pub async fn record(pool: &PgPool, input: &MetricsInput) -> anyhow::Result<MetricSnapshot> {
    let query = format!(
        "INSERT INTO metrics \
         (id, persona_id, recorded_at, followers, engagement_rate, avg_likes, notes) \
         VALUES ($1, $2, COALESCE($3, NOW()), $4, $5, $6, $7) \
         RETURNING {METRIC_COLUMNS}"
    );

    let row = sqlx::query(&query)
        .bind(Uuid::new_v4())
        .bind(input.persona_id)
        .bind(input.recorded_at)
        .bind(input.followers)
        .bind(input.engagement_rate)
        .bind(input.avg_likes)
        .bind(&input.notes)
        .fetch_one(pool)
        .await?;

    metric_from_row(&row)
}

pub async fn fetch_all_ascending(pool: &PgPool) -> anyhow::Result<Vec<MetricSnapshot>> {
    let query = format!("SELECT {METRIC_COLUMNS} FROM metrics ORDER BY recorded_at ASC");
    let rows = sqlx::query(&query).fetch_all(pool).await?;
    rows.iter().map(metric_from_row).collect()
}

pub async fn fetch_all_descending(pool: &PgPool) -> anyhow::Result<Vec<MetricSnapshot>> {
    let query = format!("SELECT {METRIC_COLUMNS} FROM metrics ORDER BY recorded_at DESC");
    let rows = sqlx::query(&query).fetch_all(pool).await?;
    rows.iter().map(metric_from_row).collect()
}

/// Newest first, at most `limit` rows.
pub async fn fetch_by_persona(
    pool: &PgPool,
    persona_id: Uuid,
    limit: i64,
) -> anyhow::Result<Vec<MetricSnapshot>> {
    let query = format!(
        "SELECT {METRIC_COLUMNS} FROM metrics \
         WHERE persona_id = $1 ORDER BY recorded_at DESC LIMIT $2"
    );
    let rows = sqlx::query(&query)
        .bind(persona_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    rows.iter().map(metric_from_row).collect()
}

pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM metrics WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(Debug, Deserialize)]
pub struct MetricsCsvRow {
    pub handle: String,
    pub recorded_at: DateTime<Utc>,
    pub followers: i64,
    pub engagement_rate: Option<f64>,
    pub avg_likes: Option<f64>,
    pub notes: Option<String>,
}

pub fn read_csv(csv_path: &Path) -> anyhow::Result<Vec<MetricsCsvRow>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;

    let mut rows = Vec::new();
    for (line, result) in reader.deserialize::<MetricsCsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid metrics row {}", line + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Records one snapshot per CSV row, resolving personas by handle. Rows for
/// unknown handles are skipped.
pub async fn import_csv(pool: &PgPool, csv_path: &Path) -> anyhow::Result<usize> {
    let rows = read_csv(csv_path)?;
    let mut handles: HashMap<String, Uuid> = HashMap::new();
    let mut inserted = 0usize;

    for row in rows {
        let persona_id = match handles.get(&row.handle) {
            Some(id) => *id,
            None => match personas::fetch_by_handle(pool, &row.handle).await? {
                Some(persona) => {
                    handles.insert(row.handle.clone(), persona.id);
                    persona.id
                }
                None => {
                    warn!(handle = %row.handle, "skipping metrics row for unknown persona");
                    continue;
                }
            },
        };

        let input = MetricsInput {
            persona_id,
            recorded_at: Some(row.recorded_at),
            followers: row.followers,
            engagement_rate: row.engagement_rate,
            avg_likes: row.avg_likes,
            notes: row.notes.filter(|notes| !notes.trim().is_empty()),
        };
        record(pool, &input).await?;
        inserted += 1;
    }

    debug!(inserted, "metrics import finished");
    Ok(inserted)
}

use anyhow::Context;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

pub mod metrics;
pub mod personas;
pub mod posts;
pub mod sponsorships;

/// Decodes fetched rows, skipping and logging any row that does not decode.
pub(crate) fn decode_rows<R, T, F>(
    table: &str,
    rows: impl IntoIterator<Item = R>,
    decode: F,
) -> Vec<T>
where
    F: Fn(R) -> anyhow::Result<T>,
{
    rows.into_iter()
        .filter_map(|row| match decode(row) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(table, "skipping undecodable row: {err:#}");
                None
            }
        })
        .collect()
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let personas = vec![
        (
            "Nova Reyes",
            "nova.builds",
            "instagram",
            "Home workshop projects",
            r##"{"primary":"#0f172a","accent":"#f97316"}"##,
            vec![1200_i64, 1265, 1340, 1410],
            vec![Some(4.8), Some(5.1), None, Some(5.6)],
        ),
        (
            "Milo Tanaka",
            "milo.eats",
            "tiktok",
            "Late night street food",
            r##"{"primary":"#1e293b","accent":"#22c55e"}"##,
            vec![860, 910, 905, 990],
            vec![Some(7.2), Some(6.9), Some(7.4), Some(8.0)],
        ),
        (
            "Iris Vale",
            "iris.reads",
            "threads",
            "Short reviews of long books",
            r##"{"primary":"#312e81"}"##,
            vec![0, 45, 120],
            vec![None, None, Some(0.0)],
        ),
    ];

    let start = Utc
        .with_ymd_and_hms(2026, 1, 5, 15, 0, 0)
        .single()
        .context("invalid seed start")?;

    for (name, handle, platform, niche, colors, followers, engagement) in personas {
        let colors: serde_json::Value = serde_json::from_str(colors)?;
        let persona_id: Uuid = sqlx::query(
            r#"
            INSERT INTO personas (id, name, handle, platform, niche, colors)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (handle) DO UPDATE
            SET name = EXCLUDED.name, niche = EXCLUDED.niche, colors = EXCLUDED.colors
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(handle)
        .bind(platform)
        .bind(niche)
        .bind(colors)
        .fetch_one(pool)
        .await?
        .get("id");

        for (week, (count, rate)) in followers.into_iter().zip(engagement).enumerate() {
            let recorded_at = start + Duration::weeks(week as i64);
            sqlx::query(
                r#"
                INSERT INTO metrics (id, persona_id, recorded_at, followers, engagement_rate)
                SELECT $1, $2, $3, $4, $5
                WHERE NOT EXISTS (
                    SELECT 1 FROM metrics WHERE persona_id = $2 AND recorded_at = $3
                )
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(persona_id)
            .bind(recorded_at)
            .bind(count)
            .bind(rate)
            .execute(pool)
            .await?;
        }

        if handle == "nova.builds" {
            let inquiry_date = NaiveDate::from_ymd_opt(2026, 1, 20).context("invalid date")?;
            sqlx::query(
                r#"
                INSERT INTO sponsorships
                (id, persona_id, inquiry_date, brand_name, brand_category, contact_method,
                 followers_at_inquiry, engagement_rate_at_inquiry)
                SELECT $1, $2, $3, $4, $5, $6, $7, $8
                WHERE NOT EXISTS (
                    SELECT 1 FROM sponsorships WHERE persona_id = $2 AND brand_name = $4
                )
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(persona_id)
            .bind(inquiry_date)
            .bind("Sawdust & Co")
            .bind("tools")
            .bind("dm")
            .bind(1340_i64)
            .bind(5.1_f64)
            .execute(pool)
            .await?;
        }
    }

    info!("seeded demo roster");
    Ok(())
}

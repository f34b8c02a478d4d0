use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{Persona, PersonaColors, PersonaInput, PersonaStatus};

const PERSONA_COLUMNS: &str = "id, name, handle, platform, bio, niche, tone, status, has_face, \
                               colors, avatar_url, created_at, updated_at";

fn persona_from_row(row: &PgRow) -> anyhow::Result<Persona> {
    let platform: String = row.try_get("platform")?;
    let status: String = row.try_get("status")?;
    // Rows written by other tools may carry colors in any JSON shape.
    let colors: Option<serde_json::Value> = row.try_get("colors")?;

    Ok(Persona {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        handle: row.try_get("handle")?,
        platform: platform.parse()?,
        bio: row.try_get("bio")?,
        niche: row.try_get("niche")?,
        tone: row.try_get("tone")?,
        status: status.parse()?,
        has_face: row.try_get("has_face")?,
        colors: colors.and_then(|value| serde_json::from_value::<PersonaColors>(value).ok()),
        avatar_url: row.try_get("avatar_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn fetch_all(pool: &PgPool) -> anyhow::Result<Vec<Persona>> {
    let query = format!("SELECT {PERSONA_COLUMNS} FROM personas ORDER BY name");
    let rows = sqlx::query(&query).fetch_all(pool).await?;
    Ok(super::decode_rows("personas", &rows, persona_from_row))
}

pub async fn fetch_by_id(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Persona>> {
    let query = format!("SELECT {PERSONA_COLUMNS} FROM personas WHERE id = $1");
    let row = sqlx::query(&query).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(persona_from_row).transpose()
}

pub async fn fetch_by_handle(pool: &PgPool, handle: &str) -> anyhow::Result<Option<Persona>> {
    let query = format!("SELECT {PERSONA_COLUMNS} FROM personas WHERE handle = $1");
    let row = sqlx::query(&query).bind(handle).fetch_optional(pool).await?;
    row.as_ref().map(persona_from_row).transpose()
}

pub async fn create(pool: &PgPool, input: &PersonaInput) -> anyhow::Result<Persona> {
    input.validate()?;
    let colors = input
        .colors
        .as_ref()
        .map(serde_json::to_value)
        .transpose()?;

    let query = format!(
        "INSERT INTO personas \
         (id, name, handle, platform, bio, niche, tone, status, has_face, colors) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING {PERSONA_COLUMNS}"
    );

    let row = sqlx::query(&query)
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.handle)
        .bind(input.platform.as_str())
        .bind(&input.bio)
        .bind(&input.niche)
        .bind(&input.tone)
        .bind(input.status.unwrap_or(PersonaStatus::Active).as_str())
        .bind(input.has_face)
        .bind(colors)
        .fetch_one(pool)
        .await?;

    persona_from_row(&row)
}

/// Returns whether a persona with `id` existed.
pub async fn update_avatar(pool: &PgPool, id: Uuid, avatar_url: &str) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE personas SET avatar_url = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(avatar_url)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{Post, PostChanges, PostEngagement, PostInput, PostStatus};

const POST_COLUMNS: &str = "id, persona_id, content_type, caption, hashtags, scheduled_for, \
                            posted_at, status, likes, comments, shares, saves";

fn post_from_row(row: &PgRow) -> anyhow::Result<Post> {
    let content_type: String = row.try_get("content_type")?;
    let status: String = row.try_get("status")?;

    Ok(Post {
        id: row.try_get("id")?,
        persona_id: row.try_get("persona_id")?,
        content_type: content_type.parse()?,
        caption: row.try_get("caption")?,
        hashtags: row.try_get("hashtags")?,
        scheduled_for: row.try_get("scheduled_for")?,
        posted_at: row.try_get("posted_at")?,
        status: status.parse()?,
        likes: row.try_get("likes")?,
        comments: row.try_get("comments")?,
        shares: row.try_get("shares")?,
        saves: row.try_get("saves")?,
    })
}

pub async fn create(pool: &PgPool, input: &PostInput) -> anyhow::Result<Post> {
    let query = format!(
        "INSERT INTO posts \
         (id, persona_id, content_type, caption, hashtags, scheduled_for, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {POST_COLUMNS}"
    );

    let row = sqlx::query(&query)
        .bind(Uuid::new_v4())
        .bind(input.persona_id)
        .bind(input.content_type.as_str())
        .bind(&input.caption)
        .bind(&input.hashtags)
        .bind(input.scheduled_for)
        .bind(input.status.unwrap_or(PostStatus::Draft).as_str())
        .fetch_one(pool)
        .await?;

    post_from_row(&row)
}

/// Applies the provided fields only. Returns `None` when no post has `id`.
pub async fn update(pool: &PgPool, id: Uuid, changes: &PostChanges) -> anyhow::Result<Option<Post>> {
    let query = format!(
        "UPDATE posts SET \
         content_type = COALESCE($2, content_type), \
         caption = COALESCE($3, caption), \
         hashtags = COALESCE($4, hashtags), \
         scheduled_for = COALESCE($5, scheduled_for), \
         status = COALESCE($6, status) \
         WHERE id = $1 \
         RETURNING {POST_COLUMNS}"
    );

    let row = sqlx::query(&query)
        .bind(id)
        .bind(changes.content_type.map(|c| c.as_str()))
        .bind(&changes.caption)
        .bind(&changes.hashtags)
        .bind(changes.scheduled_for)
        .bind(changes.status.map(|s| s.as_str()))
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(post_from_row).transpose()
}

pub async fn mark_posted(
    pool: &PgPool,
    id: Uuid,
    engagement: PostEngagement,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE posts
        SET status = 'posted',
            posted_at = NOW(),
            likes = COALESCE($2, likes),
            comments = COALESCE($3, comments),
            shares = COALESCE($4, shares),
            saves = COALESCE($5, saves)
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(engagement.likes)
    .bind(engagement.comments)
    .bind(engagement.shares)
    .bind(engagement.saves)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn fetch_by_persona(pool: &PgPool, persona_id: Uuid) -> anyhow::Result<Vec<Post>> {
    let query = format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE persona_id = $1 \
         ORDER BY scheduled_for DESC NULLS LAST"
    );
    let rows = sqlx::query(&query).bind(persona_id).fetch_all(pool).await?;
    Ok(super::decode_rows("posts", &rows, post_from_row))
}

/// Posts scheduled within `[start, end]`, earliest first.
pub async fn fetch_in_range(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> anyhow::Result<Vec<Post>> {
    let query = format!(
        "SELECT {POST_COLUMNS} FROM posts \
         WHERE scheduled_for >= $1 AND scheduled_for <= $2 \
         ORDER BY scheduled_for ASC"
    );
    let rows = sqlx::query(&query)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await?;
    Ok(super::decode_rows("posts", &rows, post_from_row))
}

pub async fn fetch_all(pool: &PgPool) -> anyhow::Result<Vec<Post>> {
    let query = format!("SELECT {POST_COLUMNS} FROM posts ORDER BY scheduled_for ASC NULLS LAST");
    let rows = sqlx::query(&query).fetch_all(pool).await?;
    Ok(super::decode_rows("posts", &rows, post_from_row))
}

pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::analytics;
use crate::models::{
    CompensationType, ContactMethod, Sponsorship, SponsorshipDecision, SponsorshipInput,
    SponsorshipStats, SponsorshipStatus,
};

const SPONSORSHIP_COLUMNS: &str = "id, persona_id, inquiry_date, brand_name, brand_category, \
     contact_method, inquiry_notes, status, decision_date, decline_reason, compensation_type, \
     compensation_value, deliverables, exclusivity_days, post_id, followers_at_inquiry, \
     engagement_rate_at_inquiry, created_at, updated_at";

fn sponsorship_from_row(row: &PgRow) -> anyhow::Result<Sponsorship> {
    let status: String = row.try_get("status")?;
    let contact_method: Option<String> = row.try_get("contact_method")?;
    let compensation_type: Option<String> = row.try_get("compensation_type")?;

    Ok(Sponsorship {
        id: row.try_get("id")?,
        persona_id: row.try_get("persona_id")?,
        inquiry_date: row.try_get("inquiry_date")?,
        brand_name: row.try_get("brand_name")?,
        brand_category: row.try_get("brand_category")?,
        contact_method: contact_method
            .map(|m| m.parse::<ContactMethod>())
            .transpose()?,
        inquiry_notes: row.try_get("inquiry_notes")?,
        status: status.parse()?,
        decision_date: row.try_get("decision_date")?,
        decline_reason: row.try_get("decline_reason")?,
        compensation_type: compensation_type
            .map(|c| c.parse::<CompensationType>())
            .transpose()?,
        compensation_value: row.try_get("compensation_value")?,
        deliverables: row.try_get("deliverables")?,
        exclusivity_days: row.try_get("exclusivity_days")?,
        post_id: row.try_get("post_id")?,
        followers_at_inquiry: row.try_get("followers_at_inquiry")?,
        engagement_rate_at_inquiry: row.try_get("engagement_rate_at_inquiry")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn create(pool: &PgPool, input: &SponsorshipInput) -> anyhow::Result<Sponsorship> {
    let query = format!(
        "INSERT INTO sponsorships \
         (id, persona_id, inquiry_date, brand_name, brand_category, contact_method, \
          inquiry_notes, status, followers_at_inquiry, engagement_rate_at_inquiry) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING {SPONSORSHIP_COLUMNS}"
    );

    let row = sqlx::query(&query)
        .bind(Uuid::new_v4())
        .bind(input.persona_id)
        .bind(input.inquiry_date)
        .bind(&input.brand_name)
        .bind(&input.brand_category)
        .bind(input.contact_method.map(|m| m.as_str()))
        .bind(&input.inquiry_notes)
        .bind(input.status.unwrap_or(SponsorshipStatus::Pending).as_str())
        .bind(input.followers_at_inquiry)
        .bind(input.engagement_rate_at_inquiry)
        .fetch_one(pool)
        .await?;

    sponsorship_from_row(&row)
}

/// Records a decision. Returns `None` when no sponsorship has `id`.
pub async fn decide(
    pool: &PgPool,
    id: Uuid,
    decision: SponsorshipDecision,
) -> anyhow::Result<Option<Sponsorship>> {
    let decision = decision.normalized(Utc::now().date_naive());
    let query = format!(
        "UPDATE sponsorships SET \
         status = $2, decision_date = $3, decline_reason = $4, compensation_type = $5, \
         compensation_value = $6, deliverables = $7, exclusivity_days = $8, \
         updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {SPONSORSHIP_COLUMNS}"
    );

    let row = sqlx::query(&query)
        .bind(id)
        .bind(decision.status.as_str())
        .bind(decision.decision_date)
        .bind(&decision.decline_reason)
        .bind(decision.compensation_type.map(|c| c.as_str()))
        .bind(decision.compensation_value)
        .bind(&decision.deliverables)
        .bind(decision.exclusivity_days)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(sponsorship_from_row).transpose()
}

pub async fn link_post(pool: &PgPool, id: Uuid, post_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE sponsorships SET post_id = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(post_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn fetch_all(pool: &PgPool) -> anyhow::Result<Vec<Sponsorship>> {
    let query = format!("SELECT {SPONSORSHIP_COLUMNS} FROM sponsorships ORDER BY inquiry_date DESC");
    let rows = sqlx::query(&query).fetch_all(pool).await?;
    Ok(super::decode_rows("sponsorships", &rows, sponsorship_from_row))
}

pub async fn fetch_by_persona(pool: &PgPool, persona_id: Uuid) -> anyhow::Result<Vec<Sponsorship>> {
    let query = format!(
        "SELECT {SPONSORSHIP_COLUMNS} FROM sponsorships \
         WHERE persona_id = $1 ORDER BY inquiry_date DESC"
    );
    let rows = sqlx::query(&query).bind(persona_id).fetch_all(pool).await?;
    Ok(super::decode_rows("sponsorships", &rows, sponsorship_from_row))
}

pub async fn fetch_by_status(
    pool: &PgPool,
    status: SponsorshipStatus,
) -> anyhow::Result<Vec<Sponsorship>> {
    let query = format!(
        "SELECT {SPONSORSHIP_COLUMNS} FROM sponsorships \
         WHERE status = $1 ORDER BY inquiry_date DESC"
    );
    let rows = sqlx::query(&query)
        .bind(status.as_str())
        .fetch_all(pool)
        .await?;
    Ok(super::decode_rows("sponsorships", &rows, sponsorship_from_row))
}

pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM sponsorships WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn stats(pool: &PgPool) -> anyhow::Result<SponsorshipStats> {
    let rows = sqlx::query("SELECT status, compensation_value FROM sponsorships")
        .fetch_all(pool)
        .await?;

    let tallied = super::decode_rows("sponsorships", &rows, |row: &PgRow| {
        let status: String = row.try_get("status")?;
        let compensation: Option<f64> = row.try_get("compensation_value")?;
        Ok((status.parse::<SponsorshipStatus>()?, compensation))
    });

    debug!(rows = tallied.len(), "tallying sponsorships");
    Ok(analytics::tally_sponsorships(tallied))
}

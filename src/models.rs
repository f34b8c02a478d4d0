use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// Series color used when a persona has no accent configured.
pub const DEFAULT_SERIES_COLOR: &str = "#6366f1";

/// Key holding the label in a serialized growth point.
pub const GROWTH_DATE_KEY: &str = "date";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct ParseKindError {
    kind: &'static str,
    value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("persona name `{0}` is reserved for the chart date column")]
pub struct ReservedNameError(String);

/// Declares an enum stored as a lowercase text column.
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseKindError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ParseKindError {
                        kind: $kind,
                        value: value.to_string(),
                    }),
                }
            }
        }
    };
}

text_enum!(Platform, "platform", {
    Twitter => "twitter",
    Instagram => "instagram",
    Tiktok => "tiktok",
    Youtube => "youtube",
    Threads => "threads",
    Bluesky => "bluesky",
});

text_enum!(PersonaStatus, "persona status", {
    Active => "active",
    Paused => "paused",
    Revealed => "revealed",
    Archived => "archived",
});

text_enum!(PostStatus, "post status", {
    Draft => "draft",
    Scheduled => "scheduled",
    Posted => "posted",
});

text_enum!(ContentType, "content type", {
    Reel => "reel",
    Carousel => "carousel",
    Static => "static",
    Story => "story",
});

text_enum!(SponsorshipStatus, "sponsorship status", {
    Pending => "pending",
    Accepted => "accepted",
    Declined => "declined",
    Negotiating => "negotiating",
});

text_enum!(ContactMethod, "contact method", {
    Dm => "dm",
    Email => "email",
    Comment => "comment",
    Other => "other",
});

text_enum!(CompensationType, "compensation type", {
    Cash => "cash",
    Product => "product",
    Affiliate => "affiliate",
    Hybrid => "hybrid",
});

/// Display colors stored in the `colors` JSONB column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaColors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Persona {
    pub id: Uuid,
    pub name: String,
    pub handle: String,
    pub platform: Platform,
    pub bio: Option<String>,
    pub niche: Option<String>,
    pub tone: Option<String>,
    pub status: PersonaStatus,
    pub has_face: bool,
    pub colors: Option<PersonaColors>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Persona {
    /// Chart series color: the configured accent, or the default.
    pub fn accent_color(&self) -> &str {
        self.colors
            .as_ref()
            .and_then(|colors| colors.accent.as_deref())
            .unwrap_or(DEFAULT_SERIES_COLOR)
    }
}

#[derive(Debug, Clone)]
pub struct PersonaInput {
    pub name: String,
    pub handle: String,
    pub platform: Platform,
    pub bio: Option<String>,
    pub niche: Option<String>,
    pub tone: Option<String>,
    pub status: Option<PersonaStatus>,
    pub has_face: bool,
    pub colors: Option<PersonaColors>,
}

impl PersonaInput {
    /// Names key the growth series, so one cannot shadow the date label.
    pub fn validate(&self) -> Result<(), ReservedNameError> {
        if self.name.trim().eq_ignore_ascii_case(GROWTH_DATE_KEY) {
            return Err(ReservedNameError(self.name.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSnapshot {
    pub id: Uuid,
    pub persona_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub followers: i64,
    pub engagement_rate: Option<f64>,
    pub avg_likes: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MetricsInput {
    pub persona_id: Uuid,
    /// Defaults to the database clock when absent.
    pub recorded_at: Option<DateTime<Utc>>,
    pub followers: i64,
    pub engagement_rate: Option<f64>,
    pub avg_likes: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonaWithMetrics {
    #[serde(flatten)]
    pub persona: Persona,
    pub latest_metrics: Option<MetricSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub id: Uuid,
    pub persona_id: Uuid,
    pub content_type: ContentType,
    pub caption: Option<String>,
    pub hashtags: Option<Vec<String>>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub posted_at: Option<DateTime<Utc>>,
    pub status: PostStatus,
    pub likes: Option<i32>,
    pub comments: Option<i32>,
    pub shares: Option<i32>,
    pub saves: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct PostInput {
    pub persona_id: Uuid,
    pub content_type: ContentType,
    pub caption: Option<String>,
    pub hashtags: Option<Vec<String>>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub status: Option<PostStatus>,
}

/// Partial update for a post; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub content_type: Option<ContentType>,
    pub caption: Option<String>,
    pub hashtags: Option<Vec<String>>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub status: Option<PostStatus>,
}

impl PostChanges {
    pub fn is_empty(&self) -> bool {
        self.content_type.is_none()
            && self.caption.is_none()
            && self.hashtags.is_none()
            && self.scheduled_for.is_none()
            && self.status.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostEngagement {
    pub likes: Option<i32>,
    pub comments: Option<i32>,
    pub shares: Option<i32>,
    pub saves: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sponsorship {
    pub id: Uuid,
    pub persona_id: Uuid,
    pub inquiry_date: NaiveDate,
    pub brand_name: String,
    pub brand_category: Option<String>,
    pub contact_method: Option<ContactMethod>,
    pub inquiry_notes: Option<String>,
    pub status: SponsorshipStatus,
    pub decision_date: Option<NaiveDate>,
    pub decline_reason: Option<String>,
    pub compensation_type: Option<CompensationType>,
    pub compensation_value: Option<f64>,
    pub deliverables: Option<String>,
    pub exclusivity_days: Option<i32>,
    pub post_id: Option<Uuid>,
    pub followers_at_inquiry: Option<i64>,
    pub engagement_rate_at_inquiry: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SponsorshipInput {
    pub persona_id: Uuid,
    pub inquiry_date: NaiveDate,
    pub brand_name: String,
    pub brand_category: Option<String>,
    pub contact_method: Option<ContactMethod>,
    pub inquiry_notes: Option<String>,
    pub status: Option<SponsorshipStatus>,
    pub followers_at_inquiry: Option<i64>,
    pub engagement_rate_at_inquiry: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SponsorshipDecision {
    pub status: SponsorshipStatus,
    pub decision_date: Option<NaiveDate>,
    pub decline_reason: Option<String>,
    pub compensation_type: Option<CompensationType>,
    pub compensation_value: Option<f64>,
    pub deliverables: Option<String>,
    pub exclusivity_days: Option<i32>,
}

impl SponsorshipDecision {
    /// Keeps only the fields that belong to the chosen outcome. A decline
    /// carries its reason, an acceptance carries the deal terms, and the
    /// decision date falls back to `today`.
    pub fn normalized(self, today: NaiveDate) -> Self {
        let declined = self.status == SponsorshipStatus::Declined;
        let accepted = self.status == SponsorshipStatus::Accepted;

        Self {
            status: self.status,
            decision_date: Some(self.decision_date.unwrap_or(today)),
            decline_reason: self.decline_reason.filter(|_| declined),
            compensation_type: if accepted {
                Some(self.compensation_type.unwrap_or(CompensationType::Cash))
            } else {
                None
            },
            compensation_value: self.compensation_value.filter(|_| accepted),
            deliverables: self.deliverables.filter(|_| accepted),
            exclusivity_days: if accepted {
                Some(self.exclusivity_days.unwrap_or(0))
            } else {
                None
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SponsorshipStats {
    pub total: usize,
    pub pending: usize,
    pub accepted: usize,
    pub declined: usize,
    pub total_revenue: f64,
}

/// One persona with its time-ordered snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonaSeries {
    pub persona: Persona,
    pub metrics: Vec<MetricSnapshot>,
}

/// Follower counts of every persona that has a snapshot on `date`.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthPoint {
    pub date: NaiveDate,
    pub followers: BTreeMap<String, i64>,
}

impl GrowthPoint {
    /// Short chart label such as `Jan 5`.
    pub fn label(&self) -> String {
        self.date.format("%b %-d").to_string()
    }
}

impl Serialize for GrowthPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.followers.len() + 1))?;
        map.serialize_entry(GROWTH_DATE_KEY, &self.label())?;
        for (name, followers) in &self.followers {
            map.serialize_entry(name, followers)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagementEntry {
    pub name: String,
    pub engagement: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonaGrowth {
    pub name: String,
    pub growth_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub growth: Vec<GrowthPoint>,
    pub engagement: Vec<EngagementEntry>,
    pub growth_rates: Vec<PersonaGrowth>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_enums_parse_case_insensitively() {
        assert_eq!("Instagram".parse::<Platform>(), Ok(Platform::Instagram));
        assert_eq!(" posted ".parse::<PostStatus>(), Ok(PostStatus::Posted));
        assert_eq!(ContactMethod::Dm.to_string(), "dm");
        let err = "fax".parse::<ContactMethod>().unwrap_err();
        assert_eq!(err.to_string(), "unknown contact method `fax`");
    }

    #[test]
    fn colors_tolerate_missing_and_extra_fields() {
        let colors: PersonaColors =
            serde_json::from_value(serde_json::json!({ "primary": "#111", "glow": true }))
                .unwrap();
        assert_eq!(colors.primary.as_deref(), Some("#111"));
        assert!(colors.accent.is_none());
    }

    #[test]
    fn growth_point_serializes_label_and_sparse_keys() {
        let point = GrowthPoint {
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            followers: BTreeMap::from([("Alpha".to_string(), 100)]),
        };
        assert_eq!(point.label(), "Jan 5");
        assert_eq!(
            serde_json::to_value(&point).unwrap(),
            serde_json::json!({ "date": "Jan 5", "Alpha": 100 })
        );
    }

    fn persona_input(name: &str) -> PersonaInput {
        PersonaInput {
            name: name.to_string(),
            handle: "handle".to_string(),
            platform: Platform::Bluesky,
            bio: None,
            niche: None,
            tone: None,
            status: None,
            has_face: false,
            colors: None,
        }
    }

    #[test]
    fn persona_named_after_the_date_key_is_rejected() {
        let err = persona_input("Date").validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "persona name `Date` is reserved for the chart date column"
        );
        assert!(persona_input(" date ").validate().is_err());
        assert!(persona_input("Dated Dave").validate().is_ok());
    }

    #[test]
    fn decline_keeps_reason_and_drops_terms() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let decision = SponsorshipDecision {
            status: SponsorshipStatus::Declined,
            decision_date: None,
            decline_reason: Some("off-brand".to_string()),
            compensation_type: Some(CompensationType::Product),
            compensation_value: Some(500.0),
            deliverables: Some("1 reel".to_string()),
            exclusivity_days: Some(30),
        }
        .normalized(today);

        assert_eq!(decision.decision_date, Some(today));
        assert_eq!(decision.decline_reason.as_deref(), Some("off-brand"));
        assert!(decision.compensation_type.is_none());
        assert!(decision.compensation_value.is_none());
        assert!(decision.deliverables.is_none());
        assert!(decision.exclusivity_days.is_none());
    }

    #[test]
    fn acceptance_defaults_terms() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let decided = NaiveDate::from_ymd_opt(2026, 2, 27).unwrap();
        let decision = SponsorshipDecision {
            status: SponsorshipStatus::Accepted,
            decision_date: Some(decided),
            decline_reason: Some("ignored".to_string()),
            compensation_type: None,
            compensation_value: Some(1200.0),
            deliverables: None,
            exclusivity_days: None,
        }
        .normalized(today);

        assert_eq!(decision.decision_date, Some(decided));
        assert!(decision.decline_reason.is_none());
        assert_eq!(decision.compensation_type, Some(CompensationType::Cash));
        assert_eq!(decision.compensation_value, Some(1200.0));
        assert_eq!(decision.exclusivity_days, Some(0));
    }
}

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db;
use crate::models::{
    AnalyticsSummary, EngagementEntry, GrowthPoint, MetricSnapshot, Persona, PersonaGrowth,
    PersonaSeries, PersonaWithMetrics, SponsorshipStats, SponsorshipStatus,
};

/// Fetches the roster and the full ascending metrics history and groups them.
/// Fetch failures are logged and produce an empty list.
pub async fn load_persona_series(pool: &PgPool) -> Vec<PersonaSeries> {
    let personas = match db::personas::fetch_all(pool).await {
        Ok(personas) => personas,
        Err(err) => {
            warn!("failed to fetch personas: {err:#}");
            return Vec::new();
        }
    };

    let metrics = match db::metrics::fetch_all_ascending(pool).await {
        Ok(metrics) => metrics,
        Err(err) => {
            warn!("failed to fetch metrics: {err:#}");
            return Vec::new();
        }
    };

    debug!(
        personas = personas.len(),
        snapshots = metrics.len(),
        "grouping metrics by persona"
    );
    group_by_persona(&personas, &metrics)
}

/// One series per persona, in roster order. Snapshot order is kept as given,
/// so callers pass metrics sorted by `recorded_at` ascending.
pub fn group_by_persona(personas: &[Persona], metrics: &[MetricSnapshot]) -> Vec<PersonaSeries> {
    let mut by_persona: HashMap<Uuid, Vec<MetricSnapshot>> = HashMap::new();
    for metric in metrics {
        by_persona
            .entry(metric.persona_id)
            .or_default()
            .push(metric.clone());
    }

    personas
        .iter()
        .map(|persona| PersonaSeries {
            persona: persona.clone(),
            metrics: by_persona.get(&persona.id).cloned().unwrap_or_default(),
        })
        .collect()
}

/// Calendar day a snapshot is charted under (UTC).
pub fn bucket_day(metric: &MetricSnapshot) -> NaiveDate {
    metric.recorded_at.date_naive()
}

/// Aligns every persona onto one sorted date axis. Each point holds the first
/// snapshot a persona has on that day; personas without one are left out.
pub fn build_growth_points(series: &[PersonaSeries]) -> Vec<GrowthPoint> {
    let days: BTreeSet<NaiveDate> = series
        .iter()
        .flat_map(|s| s.metrics.iter())
        .map(bucket_day)
        .collect();

    days.into_iter()
        .map(|date| {
            let mut followers = BTreeMap::new();
            for s in series {
                if let Some(metric) = s.metrics.iter().find(|m| bucket_day(m) == date) {
                    followers.insert(s.persona.name.clone(), metric.followers);
                }
            }
            GrowthPoint { date, followers }
        })
        .collect()
}

/// Engagement rate of each persona's latest snapshot, skipping personas whose
/// latest rate is missing or zero.
pub fn latest_engagement_rates(series: &[PersonaSeries]) -> Vec<EngagementEntry> {
    series
        .iter()
        .map(|s| EngagementEntry {
            name: s.persona.name.clone(),
            engagement: s
                .metrics
                .last()
                .and_then(|m| m.engagement_rate)
                .unwrap_or(0.0),
            color: s.persona.accent_color().to_string(),
        })
        .filter(|entry| entry.engagement > 0.0)
        .collect()
}

/// Percentage change in followers from the first to the last snapshot.
///
/// `None` when there are fewer than two snapshots or the first one has no
/// followers to grow from.
pub fn growth_rate(metrics: &[MetricSnapshot]) -> Option<f64> {
    if metrics.len() < 2 {
        return None;
    }
    let first = metrics.first()?;
    let last = metrics.last()?;
    if first.followers == 0 {
        return None;
    }

    let first_followers = first.followers as f64;
    Some((last.followers as f64 - first_followers) / first_followers * 100.0)
}

pub fn summarize(series: &[PersonaSeries]) -> AnalyticsSummary {
    AnalyticsSummary {
        growth: build_growth_points(series),
        engagement: latest_engagement_rates(series),
        growth_rates: series
            .iter()
            .map(|s| PersonaGrowth {
                name: s.persona.name.clone(),
                growth_rate: growth_rate(&s.metrics),
            })
            .collect(),
    }
}

/// Most recent snapshot per persona from a newest-first list.
pub fn latest_by_persona(metrics_desc: &[MetricSnapshot]) -> HashMap<Uuid, MetricSnapshot> {
    let mut latest = HashMap::new();
    for metric in metrics_desc {
        latest
            .entry(metric.persona_id)
            .or_insert_with(|| metric.clone());
    }
    latest
}

pub fn attach_latest(
    personas: Vec<Persona>,
    latest: &HashMap<Uuid, MetricSnapshot>,
) -> Vec<PersonaWithMetrics> {
    personas
        .into_iter()
        .map(|persona| {
            let latest_metrics = latest.get(&persona.id).cloned();
            PersonaWithMetrics {
                persona,
                latest_metrics,
            }
        })
        .collect()
}

/// Status counts plus revenue from accepted deals.
pub fn tally_sponsorships<I>(rows: I) -> SponsorshipStats
where
    I: IntoIterator<Item = (SponsorshipStatus, Option<f64>)>,
{
    let mut stats = SponsorshipStats::default();

    for (status, compensation) in rows {
        stats.total += 1;
        match status {
            SponsorshipStatus::Pending => stats.pending += 1,
            SponsorshipStatus::Accepted => {
                stats.accepted += 1;
                stats.total_revenue += compensation.unwrap_or(0.0);
            }
            SponsorshipStatus::Declined => stats.declined += 1,
            SponsorshipStatus::Negotiating => {}
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PersonaColors, PersonaStatus, Platform};
    use chrono::{DateTime, TimeZone, Utc};

    fn persona(name: &str, accent: Option<&str>) -> Persona {
        Persona {
            id: Uuid::new_v4(),
            name: name.to_string(),
            handle: name.to_lowercase(),
            platform: Platform::Instagram,
            bio: None,
            niche: None,
            tone: None,
            status: PersonaStatus::Active,
            has_face: false,
            colors: accent.map(|accent| PersonaColors {
                accent: Some(accent.to_string()),
                ..PersonaColors::default()
            }),
            avatar_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    fn snapshot(
        persona: &Persona,
        recorded_at: DateTime<Utc>,
        followers: i64,
        engagement_rate: Option<f64>,
    ) -> MetricSnapshot {
        MetricSnapshot {
            id: Uuid::new_v4(),
            persona_id: persona.id,
            recorded_at,
            followers,
            engagement_rate,
            avg_likes: None,
            notes: None,
        }
    }

    fn followers(counts: &[i64]) -> Vec<MetricSnapshot> {
        let owner = persona("Solo", None);
        counts
            .iter()
            .enumerate()
            .map(|(i, &count)| snapshot(&owner, at(2026, 1, i as u32 + 1), count, None))
            .collect()
    }

    #[test]
    fn groups_every_snapshot_under_its_persona() {
        let alpha = persona("Alpha", None);
        let beta = persona("Beta", None);
        let idle = persona("Idle", None);
        let metrics = vec![
            snapshot(&alpha, at(2026, 1, 1), 100, None),
            snapshot(&beta, at(2026, 1, 2), 50, None),
            snapshot(&alpha, at(2026, 1, 3), 120, None),
        ];

        let series = group_by_persona(&[alpha.clone(), beta, idle], &metrics);

        assert_eq!(series.len(), 3);
        assert_eq!(series[0].metrics, vec![metrics[0].clone(), metrics[2].clone()]);
        assert_eq!(series[1].metrics, vec![metrics[1].clone()]);
        assert!(series[2].metrics.is_empty());
        let total: usize = series.iter().map(|s| s.metrics.len()).sum();
        assert_eq!(total, metrics.len());
    }

    #[test]
    fn snapshots_without_a_persona_are_dropped() {
        let alpha = persona("Alpha", None);
        let stranger = persona("Stranger", None);
        let metrics = vec![
            snapshot(&alpha, at(2026, 1, 1), 100, None),
            snapshot(&stranger, at(2026, 1, 1), 999, Some(9.0)),
            snapshot(&alpha, at(2026, 1, 2), 110, None),
        ];

        let series = group_by_persona(&[alpha], &metrics);

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].metrics, vec![metrics[0].clone(), metrics[2].clone()]);
        let points = build_growth_points(&series);
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| !p.followers.contains_key("Stranger")));
    }

    #[test]
    fn later_persona_wins_a_shared_name() {
        let first = persona("Twin", None);
        let second = persona("Twin", None);
        let metrics = vec![
            snapshot(&first, at(2026, 1, 1), 100, None),
            snapshot(&second, at(2026, 1, 1), 200, None),
            snapshot(&first, at(2026, 1, 2), 110, None),
        ];

        let points = build_growth_points(&group_by_persona(&[first, second], &metrics));

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].followers.len(), 1);
        assert_eq!(points[0].followers["Twin"], 200);
        assert_eq!(points[1].followers["Twin"], 110);
    }

    #[test]
    fn personas_without_snapshots_flow_through_summary() {
        let alpha = persona("Alpha", None);
        let idle = persona("Idle", Some("#123456"));
        let metrics = vec![
            snapshot(&alpha, at(2026, 1, 1), 100, Some(2.0)),
            snapshot(&alpha, at(2026, 1, 2), 150, Some(3.0)),
        ];

        let summary = summarize(&group_by_persona(&[alpha, idle], &metrics));

        assert_eq!(
            summary.growth_rates,
            vec![
                PersonaGrowth {
                    name: "Alpha".to_string(),
                    growth_rate: Some(50.0),
                },
                PersonaGrowth {
                    name: "Idle".to_string(),
                    growth_rate: None,
                },
            ]
        );
        assert_eq!(summary.engagement.len(), 1);
        assert_eq!(summary.engagement[0].name, "Alpha");
        assert!(summary.growth.iter().all(|p| !p.followers.contains_key("Idle")));

        let empty = summarize(&[]);
        assert!(empty.growth.is_empty());
        assert!(empty.engagement.is_empty());
        assert!(empty.growth_rates.is_empty());
    }

    #[test]
    fn growth_rate_needs_two_snapshots_and_a_nonzero_start() {
        assert_eq!(growth_rate(&[]), None);
        assert_eq!(growth_rate(&followers(&[100])), None);
        assert_eq!(growth_rate(&followers(&[0, 40])), None);
    }

    #[test]
    fn growth_rate_is_signed_percentage() {
        assert_eq!(growth_rate(&followers(&[100, 150])), Some(50.0));
        assert_eq!(growth_rate(&followers(&[100, 50])), Some(-50.0));
        let rate = growth_rate(&followers(&[300, 999, 400])).unwrap();
        assert!((rate - 33.333).abs() < 0.001);
    }

    #[test]
    fn engagement_skips_zero_and_missing_latest_rates() {
        let a = persona("A", Some("#ff0000"));
        let b = persona("B", None);
        let c = persona("C", None);
        let metrics = vec![
            snapshot(&a, at(2026, 1, 1), 10, None),
            snapshot(&b, at(2026, 1, 1), 10, Some(3.0)),
            snapshot(&c, at(2026, 1, 1), 10, Some(4.0)),
            snapshot(&a, at(2026, 1, 2), 12, Some(5.2)),
            snapshot(&b, at(2026, 1, 2), 12, Some(0.0)),
            snapshot(&c, at(2026, 1, 2), 12, None),
        ];
        let series = group_by_persona(&[a, b, c], &metrics);

        let entries = latest_engagement_rates(&series);

        assert_eq!(
            entries,
            vec![EngagementEntry {
                name: "A".to_string(),
                engagement: 5.2,
                color: "#ff0000".to_string(),
            }]
        );
    }

    #[test]
    fn engagement_color_falls_back_to_default() {
        let a = persona("A", None);
        let metrics = vec![snapshot(&a, at(2026, 1, 1), 10, Some(1.5))];
        let entries = latest_engagement_rates(&group_by_persona(&[a], &metrics));
        assert_eq!(entries[0].color, crate::models::DEFAULT_SERIES_COLOR);
    }

    #[test]
    fn growth_points_align_personas_on_sorted_days() {
        let alpha = persona("Alpha", None);
        let beta = persona("Beta", None);
        let metrics = vec![
            snapshot(&alpha, at(2026, 1, 3), 120, None),
            snapshot(&beta, at(2026, 1, 2), 50, None),
            snapshot(&alpha, at(2026, 1, 1), 100, None),
        ];
        let series = group_by_persona(&[alpha, beta], &metrics);

        let points = build_growth_points(&series);

        let rendered: Vec<serde_json::Value> = points
            .iter()
            .map(|p| serde_json::to_value(p).unwrap())
            .collect();
        assert_eq!(
            rendered,
            vec![
                serde_json::json!({ "date": "Jan 1", "Alpha": 100 }),
                serde_json::json!({ "date": "Jan 2", "Beta": 50 }),
                serde_json::json!({ "date": "Jan 3", "Alpha": 120 }),
            ]
        );
    }

    #[test]
    fn growth_points_sort_across_month_boundaries() {
        let alpha = persona("Alpha", None);
        let metrics = vec![
            snapshot(&alpha, at(2026, 1, 31), 10, None),
            snapshot(&alpha, at(2026, 2, 1), 11, None),
            snapshot(&alpha, at(2026, 10, 2), 12, None),
        ];
        let points = build_growth_points(&group_by_persona(&[alpha], &metrics));
        let labels: Vec<String> = points.iter().map(GrowthPoint::label).collect();
        assert_eq!(labels, vec!["Jan 31", "Feb 1", "Oct 2"]);
    }

    #[test]
    fn growth_points_use_first_snapshot_of_the_day() {
        let alpha = persona("Alpha", None);
        let metrics = vec![
            snapshot(&alpha, at(2026, 1, 1), 100, None),
            snapshot(
                &alpha,
                Utc.with_ymd_and_hms(2026, 1, 1, 23, 0, 0).unwrap(),
                140,
                None,
            ),
        ];
        let points = build_growth_points(&group_by_persona(&[alpha], &metrics));
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].followers["Alpha"], 100);
    }

    #[test]
    fn same_month_and_day_in_different_years_stay_separate() {
        let alpha = persona("Alpha", None);
        let metrics = vec![
            snapshot(&alpha, at(2025, 1, 5), 80, None),
            snapshot(&alpha, at(2026, 1, 5), 100, None),
        ];
        let points = build_growth_points(&group_by_persona(&[alpha], &metrics));
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2025, 1, 5).unwrap());
        assert_eq!(points[1].followers["Alpha"], 100);
    }

    #[test]
    fn summary_is_idempotent() {
        let alpha = persona("Alpha", Some("#00ff00"));
        let metrics = vec![
            snapshot(&alpha, at(2026, 1, 1), 100, Some(2.0)),
            snapshot(&alpha, at(2026, 1, 2), 110, Some(2.5)),
        ];
        let series = group_by_persona(&[alpha], &metrics);

        let first = summarize(&series);
        let second = summarize(&series);

        assert_eq!(first, second);
        assert_eq!(first.growth_rates[0].growth_rate, Some(10.0));
    }

    #[test]
    fn latest_by_persona_keeps_newest_first_entry() {
        let alpha = persona("Alpha", None);
        let beta = persona("Beta", None);
        let newest_first = vec![
            snapshot(&alpha, at(2026, 1, 3), 130, None),
            snapshot(&alpha, at(2026, 1, 1), 100, None),
            snapshot(&beta, at(2026, 1, 2), 50, None),
        ];

        let latest = latest_by_persona(&newest_first);
        let roster = attach_latest(vec![alpha.clone(), beta.clone(), persona("Idle", None)], &latest);

        assert_eq!(latest[&alpha.id].followers, 130);
        assert_eq!(latest[&beta.id].followers, 50);
        assert!(roster[2].latest_metrics.is_none());
    }

    #[test]
    fn sponsorship_revenue_counts_only_accepted_deals() {
        let stats = tally_sponsorships(vec![
            (SponsorshipStatus::Pending, None),
            (SponsorshipStatus::Accepted, Some(1500.0)),
            (SponsorshipStatus::Accepted, None),
            (SponsorshipStatus::Declined, Some(900.0)),
            (SponsorshipStatus::Negotiating, Some(400.0)),
        ]);

        assert_eq!(stats.total, 5);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.declined, 1);
        assert_eq!(stats.total_revenue, 1500.0);
    }
}

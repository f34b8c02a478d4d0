use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{AnalyticsSummary, PersonaWithMetrics, SponsorshipStats};

pub fn format_count(value: Option<i64>) -> String {
    match value {
        None => "—".to_string(),
        Some(n) if n >= 1_000_000 => format!("{:.1}M", n as f64 / 1_000_000.0),
        Some(n) if n >= 1_000 => format!("{:.1}K", n as f64 / 1_000.0),
        Some(n) => n.to_string(),
    }
}

pub fn format_engagement(rate: Option<f64>) -> String {
    match rate {
        Some(rate) => format!("{rate:.1}%"),
        None => "—".to_string(),
    }
}

pub fn format_growth(rate: Option<f64>) -> String {
    match rate {
        Some(rate) => format!("{rate:+.1}%"),
        None => "n/a".to_string(),
    }
}

pub fn format_currency(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let whole = (cents / 100).abs();
    let fraction = (cents % 100).abs();

    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if cents < 0 { "-" } else { "" };
    if fraction == 0 {
        format!("{sign}${grouped}")
    } else {
        format!("{sign}${grouped}.{fraction:02}")
    }
}

pub fn build_report(
    generated_on: NaiveDate,
    roster: &[PersonaWithMetrics],
    summary: &AnalyticsSummary,
    stats: &SponsorshipStats,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Persona Performance Report");
    let _ = writeln!(
        output,
        "Generated on {} for {} personas",
        generated_on,
        roster.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Roster");

    if roster.is_empty() {
        let _ = writeln!(output, "No personas tracked yet.");
    } else {
        for entry in roster {
            let latest = entry.latest_metrics.as_ref();
            let _ = writeln!(
                output,
                "- {} (@{}, {}, {}): {} followers, {} engagement",
                entry.persona.name,
                entry.persona.handle,
                entry.persona.platform,
                entry.persona.status,
                format_count(latest.map(|m| m.followers)),
                format_engagement(latest.and_then(|m| m.engagement_rate)),
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Growth Rates");

    if summary.growth_rates.is_empty() {
        let _ = writeln!(output, "No personas tracked yet.");
    } else {
        for growth in summary.growth_rates.iter() {
            let _ = writeln!(
                output,
                "- {}: {}",
                growth.name,
                format_growth(growth.growth_rate)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Engagement Comparison");

    if summary.engagement.is_empty() {
        let _ = writeln!(output, "No engagement recorded on latest snapshots.");
    } else {
        for entry in summary.engagement.iter() {
            let _ = writeln!(
                output,
                "- {}: {} ({})",
                entry.name,
                format_engagement(Some(entry.engagement)),
                entry.color
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Follower Growth");

    if summary.growth.is_empty() {
        let _ = writeln!(output, "No metrics recorded yet.");
    } else {
        let names: Vec<&str> = roster.iter().map(|e| e.persona.name.as_str()).collect();
        let _ = writeln!(output, "| Date | {} |", names.join(" | "));
        let _ = writeln!(output, "|---|{}", "---|".repeat(names.len()));
        for point in summary.growth.iter() {
            let cells: Vec<String> = names
                .iter()
                .map(|name| {
                    point
                        .followers
                        .get(*name)
                        .map(|n| n.to_string())
                        .unwrap_or_default()
                })
                .collect();
            let _ = writeln!(output, "| {} | {} |", point.label(), cells.join(" | "));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Sponsorships");

    if stats.total == 0 {
        let _ = writeln!(output, "No sponsorship inquiries recorded.");
    } else {
        let _ = writeln!(
            output,
            "- {} inquiries: {} pending, {} accepted, {} declined",
            stats.total, stats.pending, stats.accepted, stats.declined
        );
        let _ = writeln!(
            output,
            "- Revenue from accepted deals: {}",
            format_currency(stats.total_revenue)
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics;
    use crate::models::{MetricSnapshot, Persona, PersonaStatus, Platform};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn persona(name: &str) -> Persona {
        Persona {
            id: Uuid::new_v4(),
            name: name.to_string(),
            handle: name.to_lowercase(),
            platform: Platform::Tiktok,
            bio: None,
            niche: None,
            tone: None,
            status: PersonaStatus::Active,
            has_face: true,
            colors: None,
            avatar_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn snapshot(persona: &Persona, day: u32, followers: i64) -> MetricSnapshot {
        MetricSnapshot {
            id: Uuid::new_v4(),
            persona_id: persona.id,
            recorded_at: Utc.with_ymd_and_hms(2026, 1, day, 9, 0, 0).unwrap(),
            followers,
            engagement_rate: Some(3.5),
            avg_likes: None,
            notes: None,
        }
    }

    #[test]
    fn counts_use_compact_suffixes() {
        assert_eq!(format_count(None), "—");
        assert_eq!(format_count(Some(950)), "950");
        assert_eq!(format_count(Some(1_280)), "1.3K");
        assert_eq!(format_count(Some(3_400_000)), "3.4M");
    }

    #[test]
    fn growth_and_currency_formatting() {
        assert_eq!(format_growth(None), "n/a");
        assert_eq!(format_growth(Some(50.0)), "+50.0%");
        assert_eq!(format_growth(Some(-12.34)), "-12.3%");
        assert_eq!(format_currency(1500.0), "$1,500");
        assert_eq!(format_currency(1234567.5), "$1,234,567.50");
        assert_eq!(format_currency(0.0), "$0");
    }

    #[test]
    fn report_renders_series_table_with_gaps() {
        let alpha = persona("Alpha");
        let beta = persona("Beta");
        let metrics = vec![
            snapshot(&alpha, 1, 100),
            snapshot(&beta, 2, 50),
            snapshot(&alpha, 3, 120),
        ];
        let series = analytics::group_by_persona(&[alpha.clone(), beta.clone()], &metrics);
        let summary = analytics::summarize(&series);
        let latest = analytics::latest_by_persona(&[metrics[2].clone(), metrics[1].clone()]);
        let roster = analytics::attach_latest(vec![alpha, beta], &latest);

        let report = build_report(
            NaiveDate::from_ymd_opt(2026, 1, 4).unwrap(),
            &roster,
            &summary,
            &SponsorshipStats::default(),
        );

        assert!(report.contains("- Alpha (@alpha, tiktok, active): 120 followers, 3.5% engagement"));
        assert!(report.contains("- Alpha: +20.0%"));
        assert!(report.contains("- Beta: n/a"));
        assert!(report.contains("| Date | Alpha | Beta |"));
        assert!(report.contains("| Jan 1 | 100 |  |"));
        assert!(report.contains("| Jan 2 |  | 50 |"));
        assert!(report.contains("No sponsorship inquiries recorded."));
    }

    #[test]
    fn empty_report_has_placeholders() {
        let summary = analytics::summarize(&[]);
        let report = build_report(
            NaiveDate::from_ymd_opt(2026, 1, 4).unwrap(),
            &[],
            &summary,
            &SponsorshipStats::default(),
        );

        assert!(report.contains("No personas tracked yet."));
        assert!(report.contains("No metrics recorded yet."));
    }
}

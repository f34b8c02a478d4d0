use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

mod analytics;
mod config;
mod db;
mod models;
mod report;

use config::DatabaseConfig;
use models::{
    CompensationType, ContactMethod, ContentType, MetricsInput, Persona, PersonaColors,
    PersonaInput, PersonaStatus, Platform, Post, PostChanges, PostEngagement, PostInput,
    PostStatus, Sponsorship, SponsorshipDecision, SponsorshipInput, SponsorshipStatus,
};

#[derive(Parser)]
#[command(name = "persona-dashboard")]
#[command(about = "Roster, metrics, content calendar and sponsorship tracker for AI personas", long_about = None)]
struct Cli {
    #[command(flatten)]
    database: DatabaseConfig,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo roster with metrics history
    Seed,
    /// Manage the persona roster
    Personas {
        #[command(subcommand)]
        command: PersonaCommand,
    },
    /// Record and inspect metrics snapshots
    Metrics {
        #[command(subcommand)]
        command: MetricsCommand,
    },
    /// Manage the content calendar
    Posts {
        #[command(subcommand)]
        command: PostCommand,
    },
    /// Track sponsorship inquiries
    Sponsorships {
        #[command(subcommand)]
        command: SponsorshipCommand,
    },
    /// Growth series, engagement comparison and growth rates
    Analytics {
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum PersonaCommand {
    /// List personas with their latest snapshot
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show one persona by handle or id
    Show { persona: String },
    /// Add a persona
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        handle: String,
        #[arg(long)]
        platform: Platform,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        niche: Option<String>,
        #[arg(long)]
        tone: Option<String>,
        #[arg(long)]
        status: Option<PersonaStatus>,
        #[arg(long)]
        has_face: bool,
        /// Chart series color, e.g. #f97316
        #[arg(long)]
        accent: Option<String>,
    },
    /// Point a persona at a new avatar URL
    SetAvatar { persona: String, url: String },
}

#[derive(Subcommand)]
enum MetricsCommand {
    /// Record a snapshot
    Record {
        #[arg(long)]
        persona: String,
        #[arg(long)]
        followers: i64,
        #[arg(long)]
        engagement_rate: Option<f64>,
        #[arg(long)]
        avg_likes: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
        /// RFC 3339 timestamp, defaults to now
        #[arg(long)]
        recorded_at: Option<DateTime<Utc>>,
    },
    /// Most recent snapshots for a persona
    History {
        persona: String,
        #[arg(
            long,
            default_value_t = db::metrics::DEFAULT_HISTORY_LIMIT,
            value_parser = clap::value_parser!(i64).range(1..)
        )]
        limit: i64,
    },
    /// Delete a snapshot recorded by mistake
    Delete { id: Uuid },
    /// Import snapshots from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
}

#[derive(Subcommand)]
enum PostCommand {
    /// Add a post to the calendar
    Add {
        #[arg(long)]
        persona: String,
        #[arg(long)]
        content_type: ContentType,
        #[arg(long)]
        caption: Option<String>,
        #[arg(long, value_delimiter = ',')]
        hashtags: Option<Vec<String>>,
        #[arg(long)]
        scheduled_for: Option<DateTime<Utc>>,
        #[arg(long)]
        status: Option<PostStatus>,
    },
    /// Change fields on a post
    Update {
        id: Uuid,
        #[arg(long)]
        content_type: Option<ContentType>,
        #[arg(long)]
        caption: Option<String>,
        #[arg(long, value_delimiter = ',')]
        hashtags: Option<Vec<String>>,
        #[arg(long)]
        scheduled_for: Option<DateTime<Utc>>,
        #[arg(long)]
        status: Option<PostStatus>,
    },
    /// Mark a post as published, optionally with its engagement
    MarkPosted {
        id: Uuid,
        #[arg(long)]
        likes: Option<i32>,
        #[arg(long)]
        comments: Option<i32>,
        #[arg(long)]
        shares: Option<i32>,
        #[arg(long)]
        saves: Option<i32>,
    },
    /// List posts, optionally for one persona or a scheduling window
    #[command(group(
        ArgGroup::new("scope")
            .args(["persona", "from"])
            .multiple(false)
    ))]
    List {
        #[arg(long)]
        persona: Option<String>,
        #[arg(long, requires = "to")]
        from: Option<DateTime<Utc>>,
        #[arg(long, requires = "from")]
        to: Option<DateTime<Utc>>,
    },
    /// Delete a post
    Delete { id: Uuid },
}

#[derive(Subcommand)]
enum SponsorshipCommand {
    /// Log a new inquiry
    Add {
        #[arg(long)]
        persona: String,
        #[arg(long)]
        brand: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        contact: Option<ContactMethod>,
        #[arg(long)]
        notes: Option<String>,
        /// Defaults to today
        #[arg(long)]
        inquiry_date: Option<NaiveDate>,
        #[arg(long)]
        status: Option<SponsorshipStatus>,
        /// Defaults to the persona's latest snapshot
        #[arg(long)]
        followers: Option<i64>,
        /// Defaults to the persona's latest snapshot
        #[arg(long)]
        engagement_rate: Option<f64>,
    },
    /// Record the outcome of an inquiry
    Decide {
        id: Uuid,
        #[arg(long)]
        status: SponsorshipStatus,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        compensation_type: Option<CompensationType>,
        #[arg(long)]
        compensation_value: Option<f64>,
        #[arg(long)]
        deliverables: Option<String>,
        #[arg(long)]
        exclusivity_days: Option<i32>,
    },
    /// Link a sponsorship to the post that fulfils it
    Link {
        id: Uuid,
        #[arg(long)]
        post: Uuid,
    },
    /// List inquiries, newest first
    #[command(group(
        ArgGroup::new("scope")
            .args(["persona", "status"])
            .multiple(false)
    ))]
    List {
        #[arg(long)]
        persona: Option<String>,
        #[arg(long)]
        status: Option<SponsorshipStatus>,
    },
    /// Delete an inquiry
    Delete { id: Uuid },
    /// Status counts and accepted revenue
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    config::init_logging(cli.verbose);

    let pool = cli.database.connect().await?;
    run(&pool, cli.command).await
}

async fn run(pool: &PgPool, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::InitDb => {
            db::init_db(pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Personas { command } => run_personas(pool, command).await?,
        Commands::Metrics { command } => run_metrics(pool, command).await?,
        Commands::Posts { command } => run_posts(pool, command).await?,
        Commands::Sponsorships { command } => run_sponsorships(pool, command).await?,
        Commands::Analytics { json } => {
            let series = analytics::load_persona_series(pool).await;
            let summary = analytics::summarize(&series);

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            if series.is_empty() {
                println!("No personas found.");
                return Ok(());
            }

            println!("Growth rates:");
            for growth in summary.growth_rates.iter() {
                println!("- {} {}", growth.name, report::format_growth(growth.growth_rate));
            }
            println!("Latest engagement:");
            for entry in summary.engagement.iter() {
                println!("- {} {:.2}% ({})", entry.name, entry.engagement, entry.color);
            }
            println!("Follower series across {} days.", summary.growth.len());
        }
        Commands::Report { out } => {
            let series = analytics::load_persona_series(pool).await;
            let summary = analytics::summarize(&series);
            let roster = load_roster(pool).await?;
            let stats = db::sponsorships::stats(pool).await?;

            let report =
                report::build_report(Utc::now().date_naive(), &roster, &summary, &stats);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

/// Accepts a persona id or handle.
async fn resolve_persona(pool: &PgPool, key: &str) -> anyhow::Result<Persona> {
    let found = match key.parse::<Uuid>() {
        Ok(id) => db::personas::fetch_by_id(pool, id).await?,
        Err(_) => db::personas::fetch_by_handle(pool, key.trim_start_matches('@')).await?,
    };
    found.with_context(|| format!("no persona matches `{key}`"))
}

async fn load_roster(pool: &PgPool) -> anyhow::Result<Vec<models::PersonaWithMetrics>> {
    let personas = db::personas::fetch_all(pool).await?;
    if personas.is_empty() {
        return Ok(Vec::new());
    }

    // Metrics failures leave every `latest_metrics` empty.
    let latest = match db::metrics::fetch_all_descending(pool).await {
        Ok(metrics) => analytics::latest_by_persona(&metrics),
        Err(err) => {
            warn!("failed to fetch metrics: {err:#}");
            Default::default()
        }
    };
    Ok(analytics::attach_latest(personas, &latest))
}

async fn run_personas(pool: &PgPool, command: PersonaCommand) -> anyhow::Result<()> {
    match command {
        PersonaCommand::List { json } => {
            let roster = load_roster(pool).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&roster)?);
            } else if roster.is_empty() {
                println!("No personas found.");
            } else {
                for entry in roster.iter() {
                    let latest = entry.latest_metrics.as_ref();
                    println!(
                        "- {} (@{}, {}) {} followers, {} engagement",
                        entry.persona.name,
                        entry.persona.handle,
                        entry.persona.platform,
                        report::format_count(latest.map(|m| m.followers)),
                        report::format_engagement(latest.and_then(|m| m.engagement_rate)),
                    );
                }
            }
        }
        PersonaCommand::Show { persona } => {
            let persona = resolve_persona(pool, &persona).await?;
            println!("{}", serde_json::to_string_pretty(&persona)?);
        }
        PersonaCommand::Add {
            name,
            handle,
            platform,
            bio,
            niche,
            tone,
            status,
            has_face,
            accent,
        } => {
            let input = PersonaInput {
                name,
                handle: handle.trim_start_matches('@').to_string(),
                platform,
                bio,
                niche,
                tone,
                status,
                has_face,
                colors: accent.map(|accent| PersonaColors {
                    accent: Some(accent),
                    ..PersonaColors::default()
                }),
            };
            let persona = db::personas::create(pool, &input).await?;
            info!(id = %persona.id, "persona created");
            println!("Added {} ({}).", persona.name, persona.id);
        }
        PersonaCommand::SetAvatar { persona, url } => {
            let persona = resolve_persona(pool, &persona).await?;
            if db::personas::update_avatar(pool, persona.id, &url).await? {
                println!("Avatar updated for {}.", persona.name);
            } else {
                bail!("persona {} disappeared before the update", persona.id);
            }
        }
    }

    Ok(())
}

async fn run_metrics(pool: &PgPool, command: MetricsCommand) -> anyhow::Result<()> {
    match command {
        MetricsCommand::Record {
            persona,
            followers,
            engagement_rate,
            avg_likes,
            notes,
            recorded_at,
        } => {
            if followers < 0 {
                bail!("followers cannot be negative");
            }
            let persona = resolve_persona(pool, &persona).await?;
            let snapshot = db::metrics::record(
                pool,
                &MetricsInput {
                    persona_id: persona.id,
                    recorded_at,
                    followers,
                    engagement_rate,
                    avg_likes,
                    notes,
                },
            )
            .await?;
            println!(
                "Recorded {} followers for {} at {}.",
                snapshot.followers, persona.name, snapshot.recorded_at
            );
        }
        MetricsCommand::History { persona, limit } => {
            let persona = resolve_persona(pool, &persona).await?;
            let history = db::metrics::fetch_by_persona(pool, persona.id, limit).await?;
            if history.is_empty() {
                println!("No metrics recorded for {}.", persona.name);
                return Ok(());
            }
            println!("Recent metrics for {}:", persona.name);
            for snapshot in history.iter() {
                println!(
                    "- {} {} followers, {} engagement ({})",
                    snapshot.recorded_at.format("%Y-%m-%d %H:%M"),
                    snapshot.followers,
                    report::format_engagement(snapshot.engagement_rate),
                    snapshot.id
                );
            }
        }
        MetricsCommand::Delete { id } => {
            if db::metrics::delete(pool, id).await? {
                println!("Deleted snapshot {id}.");
            } else {
                println!("No snapshot {id}.");
            }
        }
        MetricsCommand::Import { csv } => {
            let inserted = db::metrics::import_csv(pool, &csv).await?;
            println!("Inserted {inserted} snapshots from {}.", csv.display());
        }
    }

    Ok(())
}

fn print_post(post: &Post) {
    let when = post
        .scheduled_for
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unscheduled".to_string());
    println!(
        "- {} {} [{}] {} ({})",
        when,
        post.content_type,
        post.status,
        post.caption.as_deref().unwrap_or(""),
        post.id
    );
}

async fn run_posts(pool: &PgPool, command: PostCommand) -> anyhow::Result<()> {
    match command {
        PostCommand::Add {
            persona,
            content_type,
            caption,
            hashtags,
            scheduled_for,
            status,
        } => {
            let persona = resolve_persona(pool, &persona).await?;
            let post = db::posts::create(
                pool,
                &PostInput {
                    persona_id: persona.id,
                    content_type,
                    caption,
                    hashtags,
                    scheduled_for,
                    status,
                },
            )
            .await?;
            println!("Added {} for {} ({}).", post.content_type, persona.name, post.id);
        }
        PostCommand::Update {
            id,
            content_type,
            caption,
            hashtags,
            scheduled_for,
            status,
        } => {
            let changes = PostChanges {
                content_type,
                caption,
                hashtags,
                scheduled_for,
                status,
            };
            if changes.is_empty() {
                bail!("nothing to update");
            }
            match db::posts::update(pool, id, &changes).await? {
                Some(post) => print_post(&post),
                None => println!("No post {id}."),
            }
        }
        PostCommand::MarkPosted {
            id,
            likes,
            comments,
            shares,
            saves,
        } => {
            let engagement = PostEngagement {
                likes,
                comments,
                shares,
                saves,
            };
            if db::posts::mark_posted(pool, id, engagement).await? {
                println!("Post {id} marked as posted.");
            } else {
                println!("No post {id}.");
            }
        }
        PostCommand::List { persona, from, to } => {
            let posts = match (persona, from, to) {
                (Some(persona), _, _) => {
                    let persona = resolve_persona(pool, &persona).await?;
                    db::posts::fetch_by_persona(pool, persona.id).await?
                }
                (None, Some(from), Some(to)) => db::posts::fetch_in_range(pool, from, to).await?,
                _ => db::posts::fetch_all(pool).await?,
            };
            if posts.is_empty() {
                println!("No posts found.");
            }
            for post in posts.iter() {
                print_post(post);
            }
        }
        PostCommand::Delete { id } => {
            if db::posts::delete(pool, id).await? {
                println!("Deleted post {id}.");
            } else {
                println!("No post {id}.");
            }
        }
    }

    Ok(())
}

fn print_sponsorship(sponsorship: &Sponsorship) {
    println!(
        "- {} {} [{}] {} ({})",
        sponsorship.inquiry_date,
        sponsorship.brand_name,
        sponsorship.status,
        sponsorship
            .compensation_value
            .map(report::format_currency)
            .unwrap_or_default(),
        sponsorship.id
    );
}

async fn run_sponsorships(pool: &PgPool, command: SponsorshipCommand) -> anyhow::Result<()> {
    match command {
        SponsorshipCommand::Add {
            persona,
            brand,
            category,
            contact,
            notes,
            inquiry_date,
            status,
            followers,
            engagement_rate,
        } => {
            let persona = resolve_persona(pool, &persona).await?;
            let latest = if followers.is_none() || engagement_rate.is_none() {
                db::metrics::fetch_by_persona(pool, persona.id, 1)
                    .await?
                    .into_iter()
                    .next()
            } else {
                None
            };

            let input = SponsorshipInput {
                persona_id: persona.id,
                inquiry_date: inquiry_date.unwrap_or_else(|| Utc::now().date_naive()),
                brand_name: brand,
                brand_category: category,
                contact_method: contact,
                inquiry_notes: notes,
                status,
                followers_at_inquiry: followers.or(latest.as_ref().map(|m| m.followers)),
                engagement_rate_at_inquiry: engagement_rate
                    .or(latest.as_ref().and_then(|m| m.engagement_rate)),
            };
            let sponsorship = db::sponsorships::create(pool, &input).await?;
            println!(
                "Logged inquiry from {} for {} ({}).",
                sponsorship.brand_name, persona.name, sponsorship.id
            );
        }
        SponsorshipCommand::Decide {
            id,
            status,
            date,
            reason,
            compensation_type,
            compensation_value,
            deliverables,
            exclusivity_days,
        } => {
            let decision = SponsorshipDecision {
                status,
                decision_date: date,
                decline_reason: reason,
                compensation_type,
                compensation_value,
                deliverables,
                exclusivity_days,
            };
            match db::sponsorships::decide(pool, id, decision).await? {
                Some(sponsorship) => print_sponsorship(&sponsorship),
                None => println!("No sponsorship {id}."),
            }
        }
        SponsorshipCommand::Link { id, post } => {
            if db::sponsorships::link_post(pool, id, post).await? {
                println!("Linked sponsorship {id} to post {post}.");
            } else {
                println!("No sponsorship {id}.");
            }
        }
        SponsorshipCommand::List { persona, status } => {
            let sponsorships = match (persona, status) {
                (Some(persona), _) => {
                    let persona = resolve_persona(pool, &persona).await?;
                    db::sponsorships::fetch_by_persona(pool, persona.id).await?
                }
                (None, Some(status)) => db::sponsorships::fetch_by_status(pool, status).await?,
                (None, None) => db::sponsorships::fetch_all(pool).await?,
            };
            if sponsorships.is_empty() {
                println!("No sponsorships found.");
            }
            for sponsorship in sponsorships.iter() {
                print_sponsorship(sponsorship);
            }
        }
        SponsorshipCommand::Delete { id } => {
            if db::sponsorships::delete(pool, id).await? {
                println!("Deleted sponsorship {id}.");
            } else {
                println!("No sponsorship {id}.");
            }
        }
        SponsorshipCommand::Stats => {
            let stats = db::sponsorships::stats(pool).await?;
            println!(
                "{} inquiries: {} pending, {} accepted, {} declined",
                stats.total, stats.pending, stats.accepted, stats.declined
            );
            println!(
                "Revenue from accepted deals: {}",
                report::format_currency(stats.total_revenue)
            );
        }
    }

    Ok(())
}

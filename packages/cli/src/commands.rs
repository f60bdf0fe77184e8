//! Subcommand implementations.

use std::sync::Arc;

use chrono::Utc;
use city_pulse_analytics::dashboard::dashboard_stats;
use city_pulse_analytics::fallback::fallback_analytics;
use city_pulse_analytics_models::{AnalyticsSnapshot, DashboardStats};
use city_pulse_geography::Gazetteer;
use city_pulse_incident_models::{Incident, Severity};
use city_pulse_source::backend::Backend;
use city_pulse_source::config::DATABASE_URL_ENV;
use city_pulse_source::fallback::fallback_incidents;
use city_pulse_sync::{FeedSnapshot, FeedSynchronizer};

pub use city_pulse_source::store::{IncidentDraft, IncidentUpdate};

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Runs the HTTP server until it stops.
pub async fn serve(memory: bool) -> CommandResult {
    let backend = if memory {
        log::info!("Serving from an in-process feed");
        Some(Backend::memory())
    } else {
        city_pulse_server::backend_from_env()
    };

    // The server uses actix-web's runtime, so run it in a blocking task to
    // avoid nesting tokio runtimes.
    tokio::task::spawn_blocking(move || {
        actix_web::rt::System::new().block_on(city_pulse_server::run_server(backend))
    })
    .await??;

    Ok(())
}

/// Prints each published snapshot until Ctrl-C.
pub async fn watch(top: usize) -> CommandResult {
    let backend = city_pulse_server::backend_from_env();
    let handle = FeedSynchronizer::new(backend.map(|b| b.feed)).start();
    let mut updates = handle.subscribe();

    loop {
        let snapshot = Arc::clone(&updates.borrow_and_update());
        print_snapshot(&snapshot, top);

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    handle.shutdown();
    Ok(())
}

/// Prints headline stats for the in-city incidents of the first published
/// snapshot.
pub async fn stats(json: bool) -> CommandResult {
    let backend = city_pulse_server::backend_from_env();
    let handle = FeedSynchronizer::new(backend.map(|b| b.feed)).start();
    let mut updates = handle.subscribe();
    let snapshot = Arc::clone(&*updates.wait_for(|s| !s.loading).await?);
    handle.shutdown();

    let stats = dashboard_stats(
        &snapshot.incidents,
        Gazetteer::bengaluru().bounds(),
        Utc::now(),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("=== Stats ({}) ===", snapshot.indicator());
    println!();
    for line in stats_lines(&stats) {
        println!("{line}");
    }
    Ok(())
}

/// Prints the demo data set.
pub fn demo(json: bool) -> CommandResult {
    let incidents = fallback_incidents(Utc::now());
    let analytics = fallback_analytics();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "incidents": incidents,
                "analytics": analytics,
            }))?
        );
        return Ok(());
    }

    println!("=== Demo Incidents ===");
    println!();
    for incident in &incidents {
        println!("{}", incident_line(incident));
    }
    println!();
    print_analytics(&analytics);
    Ok(())
}

/// Writes a new incident to the feed.
pub async fn report(draft: IncidentDraft) -> CommandResult {
    let backend = require_backend()?;
    let event = draft.into_event(Utc::now())?;
    let id = backend.store.create(event).await?;
    println!("Created incident {id}");
    Ok(())
}

/// Updates fields of an existing incident.
pub async fn update(id: &str, update: IncidentUpdate) -> CommandResult {
    if update.is_empty() {
        return Err("nothing to update".into());
    }

    let backend = require_backend()?;
    backend.store.update(id, update.into_patch()).await?;
    println!("Updated incident {id}");
    Ok(())
}

/// Deletes an incident.
pub async fn delete(id: &str) -> CommandResult {
    let backend = require_backend()?;
    backend.store.delete(id).await?;
    println!("Deleted incident {id}");
    Ok(())
}

fn require_backend() -> Result<Backend, Box<dyn std::error::Error>> {
    Backend::from_env()?.ok_or_else(|| format!("{DATABASE_URL_ENV} is not set").into())
}

fn print_snapshot(snapshot: &FeedSnapshot, top: usize) {
    if snapshot.loading {
        println!("[{}] waiting for the feed...", snapshot.state);
        return;
    }

    println!(
        "[{}] {} incidents ({}) at {}",
        snapshot.state,
        snapshot.incidents.len(),
        snapshot.indicator(),
        snapshot.updated_at.format("%H:%M:%S"),
    );
    if let Some(error) = &snapshot.error {
        println!("  {error}");
    }
    for incident in snapshot.incidents.iter().take(top) {
        println!("{}", incident_line(incident));
    }
}

fn print_analytics(analytics: &AnalyticsSnapshot) {
    println!("=== Analytics ===");
    println!();
    println!("Total:    {}", analytics.total);
    println!("Active:   {}", analytics.active);
    println!("Resolved: {}", analytics.resolved);
    println!();
    println!("Trending:");
    for trending in &analytics.trending {
        let change = match (&trending.trend, &trending.change) {
            (Some(trend), Some(change)) => format!(" ({trend} {change})"),
            _ => String::new(),
        };
        println!("  {:<32} {:>4}{change}", trending.category, trending.count);
    }
    println!();
    println!("Recent activity:");
    for activity in &analytics.recent_activity {
        println!(
            "  {:<6} {:<12} {}",
            activity.severity.as_ref().to_uppercase(),
            activity.time,
            activity.event
        );
    }
}

fn stats_lines(stats: &DashboardStats) -> Vec<String> {
    let mut lines = vec![format!("Total:     {}", stats.total)];
    lines.extend(Severity::all().iter().map(|severity| {
        format!(
            "  {:<6}  {}",
            severity.as_ref().to_uppercase(),
            stats.by_severity.get(*severity)
        )
    }));
    lines.push(format!("Last hour: {}", stats.recent));
    lines.push(format!("Categories: {}", stats.categories.join(", ")));
    lines
}

fn incident_line(incident: &Incident) -> String {
    format!(
        "  {:<6} {:<28} {} ({})",
        incident.severity.as_ref().to_uppercase(),
        incident.location_name,
        incident.title(),
        incident.time_ago,
    )
}

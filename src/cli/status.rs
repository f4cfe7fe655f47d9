use crate::core::settings::Settings;
use crate::core::state::StateFile;
use crate::core::tracker::{Decision, Suppression, TrackerSnapshot, VinTracker};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct StatusOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_at: Option<DateTime<Utc>>,
    tracked: usize,
    items: Vec<ItemStatus>,
}

#[derive(Serialize)]
struct ItemStatus {
    vin: String,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
    notification_count: u32,
    eligibility: String,
}

pub fn run(config: Option<&Path>, json: bool) -> Result<()> {
    let settings = Settings::load_read_only(config)?;
    let path = settings
        .state_file
        .as_ref()
        .context("No state_file configured; tracker state only lives in the running process")?;

    let snapshot = StateFile::new(path).load()?;
    let output = build_output(&settings, snapshot, Utc::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text_output(&output);
    }

    Ok(())
}

fn build_output(
    settings: &Settings,
    snapshot: Option<TrackerSnapshot>,
    now: DateTime<Utc>,
) -> StatusOutput {
    let Some(snapshot) = snapshot else {
        return StatusOutput {
            saved_at: None,
            tracked: 0,
            items: Vec::new(),
        };
    };

    let saved_at = Some(snapshot.saved_at);
    let tracker = VinTracker::restore(settings.tracker_config(), snapshot);

    let mut items: Vec<ItemStatus> = tracker
        .items()
        .map(|item| ItemStatus {
            vin: item.id.clone(),
            first_seen: item.first_seen,
            last_seen: item.last_seen,
            notification_count: item.notification_count,
            eligibility: describe(tracker.decide(&item.id, now)),
        })
        .collect();
    items.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then_with(|| a.vin.cmp(&b.vin)));

    StatusOutput {
        saved_at,
        tracked: items.len(),
        items,
    }
}

fn describe(decision: Decision) -> String {
    match decision {
        Decision::First | Decision::Repeat { .. } => "eligible".to_string(),
        Decision::Suppressed(Suppression::CapReached) => "limit reached".to_string(),
        Decision::Suppressed(Suppression::Cooldown { remaining }) => {
            format!("cooldown {}", format_remaining(remaining))
        }
    }
}

fn format_remaining(duration: Duration) -> String {
    if duration.num_seconds() <= 0 {
        return "now".to_string();
    }

    let total_minutes = duration.num_minutes();
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes % (24 * 60)) / 60;
    let minutes = total_minutes % 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

fn print_text_output(output: &StatusOutput) {
    match output.saved_at {
        Some(saved_at) => println!(
            "{} tracked VINs (saved {})",
            output.tracked,
            saved_at.format("%Y-%m-%d %H:%M UTC")
        ),
        None => {
            println!("No saved tracker state yet");
            return;
        }
    }

    for item in &output.items {
        println!(
            "  {:<18} sent {}  last seen {}  {}",
            item.vin,
            item.notification_count,
            item.last_seen.format("%Y-%m-%d %H:%M"),
            item.eligibility
        );
    }
}

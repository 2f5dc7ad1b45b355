//! LaptopCare: laptop maintenance sweep.
//!
//! Thin binary entry point. All logic lives in the `lapcare-core`
//! and `lapcare-app` crates.

use lapcare_app::AppState;
use lapcare_core::config::Config;
use lapcare_core::model::size::{format_count, format_size};
use std::time::Duration;

/// Upper bound on a full sweep before the remaining tasks are abandoned.
const SWEEP_TIMEOUT: Duration = Duration::from_secs(120);

fn main() -> anyhow::Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = Config::resolve()?;
    let mut state = AppState::new(config);

    tracing::info!(
        platform = state.paths().platform.label(),
        elevated = state.is_elevated,
        "LaptopCare starting"
    );
    if !state.is_elevated {
        tracing::warn!("Not running with administrator rights; some items may be missing");
    }

    state.refresh_all();
    state.start_large_file_scan(None);

    if !state.wait_until_idle(SWEEP_TIMEOUT) {
        tracing::warn!(pending = ?state.pending_tasks(), "Sweep timed out");
        state.shutdown();
    }

    report(&state);
    Ok(())
}

fn report(state: &AppState) {
    let temp_bytes: u64 = state.temp_files.iter().map(|f| f.size).sum();
    let trash_bytes: u64 = state.trash_items.iter().map(|f| f.size).sum();
    let large_bytes: u64 = state.large_files.iter().map(|f| f.size).sum();

    tracing::info!(
        files = %format_count(state.temp_files.len() as u64),
        size = %format_size(temp_bytes),
        "Temporary files"
    );
    tracing::info!(
        items = %format_count(state.trash_items.len() as u64),
        size = %format_size(trash_bytes),
        "Trash"
    );
    tracing::info!(
        files = %format_count(state.large_files.len() as u64),
        size = %format_size(large_bytes),
        "Large unused files"
    );
    for file in state.large_files.iter().take(10) {
        tracing::info!(
            path = %file.path.display(),
            size = %file.size_display(),
            days_unused = file.days_unused,
            "Large file"
        );
    }

    tracing::info!(
        listed = state.processes.len(),
        high_resource = state.high_resource.len(),
        "Processes"
    );
    for p in &state.high_resource {
        tracing::info!(
            pid = p.pid,
            name = %p.name,
            cpu = p.cpu_percent,
            memory = %p.memory_display(),
            "High-resource process"
        );
    }

    let enabled = state.startup_items.iter().filter(|i| i.enabled).count();
    tracing::info!(total = state.startup_items.len(), enabled, "Startup items");

    match &state.battery_status {
        Some(status) if status.available => tracing::info!(
            percent = status.percent,
            plugged_in = status.plugged_in,
            time_left = %status.time_left_display(),
            "Battery"
        ),
        _ => tracing::info!("No battery detected"),
    }
    if let Some(health) = state
        .battery_health
        .as_ref()
        .and_then(|h| h.health_percent())
    {
        tracing::info!(health_percent = health, "Battery health");
    }
    if let Some(usage) = state.power_usage.as_ref().filter(|u| u.available) {
        tracing::info!(
            rate = usage.discharge_rate_percent_per_hour,
            hours_left = usage.estimated_hours_remaining,
            "Power usage"
        );
    }
    for advice in &state.recommendations {
        tracing::info!(title = advice.title, "{}", advice.description);
    }

    if state.error_count > 0 {
        for (source, message) in &state.errors {
            tracing::warn!(%source, %message, "Task failed");
        }
    }
}

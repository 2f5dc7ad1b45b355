/// Battery status, health, and derived power statistics.
use super::size::format_hms;

/// Descriptive fields some platforms expose about the battery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatteryDetails {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub technology: Option<String>,
    /// Platform wording for the charge state, e.g. `Discharging`.
    pub status_detail: Option<String>,
}

/// Instantaneous battery reading.
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryStatus {
    /// `false` on machines without a battery; all other fields are then defaults.
    pub available: bool,
    /// Charge level, 0.0–100.0.
    pub percent: f32,
    pub plugged_in: bool,
    /// Estimated runtime on battery. `None` when charging or unknown.
    pub seconds_remaining: Option<u64>,
    pub details: BatteryDetails,
}

impl BatteryStatus {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            percent: 0.0,
            plugged_in: false,
            seconds_remaining: None,
            details: BatteryDetails::default(),
        }
    }

    /// `HH:MM:SS` when a positive estimate exists, otherwise `"Unknown"`.
    pub fn time_left_display(&self) -> String {
        match self.seconds_remaining {
            Some(secs) if secs > 0 => format_hms(secs),
            _ => "Unknown".to_string(),
        }
    }
}

/// Battery wear information. Every field is optional because few platforms
/// report all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatteryHealth {
    /// Capacity when new (mWh or mAh, platform units).
    pub design_capacity: Option<u64>,
    /// Capacity at full charge today, same units as `design_capacity`.
    pub current_capacity: Option<u64>,
    pub cycle_count: Option<u64>,
}

impl BatteryHealth {
    /// Current over design capacity in percent, rounded to two decimals.
    pub fn health_percent(&self) -> Option<f64> {
        match (self.design_capacity, self.current_capacity) {
            (Some(design), Some(current)) if design > 0 => {
                let pct = current as f64 / design as f64 * 100.0;
                Some((pct * 100.0).round() / 100.0)
            }
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.design_capacity.is_none()
            && self.current_capacity.is_none()
            && self.cycle_count.is_none()
    }
}

/// Discharge statistics derived from a [`BatteryStatus`].
#[derive(Debug, Clone, PartialEq)]
pub struct PowerUsage {
    /// `false` when there is no battery or the machine is on mains power.
    pub available: bool,
    pub discharge_rate_percent_per_hour: f64,
    pub estimated_hours_remaining: f64,
    pub current_percent: f32,
}

impl PowerUsage {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            discharge_rate_percent_per_hour: 0.0,
            estimated_hours_remaining: 0.0,
            current_percent: 0.0,
        }
    }
}

/// One piece of battery-life advice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    pub title: &'static str,
    pub description: &'static str,
}

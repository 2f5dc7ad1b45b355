/// Battery telemetry per platform.
///
/// - Linux: `/sys/class/power_supply` (base path injectable for tests).
/// - macOS: `pmset -g batt`. Health data is not exposed there.
/// - Windows: `Win32_Battery` and the `root\wmi` battery classes, exported
///   as JSON through PowerShell.
use crate::command;
use crate::error::ScanError;
use crate::model::{BatteryDetails, BatteryHealth, BatteryStatus};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

pub const SYSFS_POWER_SUPPLY: &str = "/sys/class/power_supply";

/// `EstimatedRunTime` value Windows reports while on AC power.
const WIN32_RUNTIME_ON_AC: u64 = 71_582_788;

const WIN32_BATTERY_QUERY: &str = "Get-CimInstance Win32_Battery | \
     Select-Object EstimatedChargeRemaining, BatteryStatus, EstimatedRunTime, Name | ConvertTo-Json";

const WMI_HEALTH_QUERY: &str = "\
$s = Get-CimInstance -Namespace root\\wmi -ClassName BatteryStaticData -ErrorAction SilentlyContinue | Select-Object -First 1
$f = Get-CimInstance -Namespace root\\wmi -ClassName BatteryFullChargedCapacity -ErrorAction SilentlyContinue | Select-Object -First 1
$c = Get-CimInstance -Namespace root\\wmi -ClassName BatteryCycleCount -ErrorAction SilentlyContinue | Select-Object -First 1
@{ DesignCapacity = $s.DesignedCapacity; FullChargeCapacity = $f.FullChargedCapacity; CycleCount = $c.CycleCount } | ConvertTo-Json";

// ── Linux sysfs ─────────────────────────────────────────────────────

/// Reader over a `power_supply` class directory.
#[derive(Debug, Clone)]
pub struct Sysfs {
    base: PathBuf,
}

impl Default for Sysfs {
    fn default() -> Self {
        Self::new(SYSFS_POWER_SUPPLY)
    }
}

impl Sysfs {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Supply directories whose `type` is `Battery`, sorted by name.
    fn battery_dirs(&self) -> Vec<PathBuf> {
        self.supplies_of_type(&["Battery"])
    }

    fn supplies_of_type(&self, kinds: &[&str]) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.base) else {
            debug!("{} not readable; no power supplies", self.base.display());
            return Vec::new();
        };
        let mut dirs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| read_trimmed(&p.join("type")).is_some_and(|t| kinds.contains(&t.as_str())))
            .collect();
        dirs.sort();
        dirs
    }

    /// `Some(true)` if any mains/USB supply reports `online == 1`, `None`
    /// when there is no such supply at all.
    fn external_power_online(&self) -> Option<bool> {
        let supplies = self.supplies_of_type(&["Mains", "USB"]);
        if supplies.is_empty() {
            return None;
        }
        Some(supplies.iter().any(|s| read_u64(&s.join("online")) == Some(1)))
    }

    pub fn status(&self) -> BatteryStatus {
        let Some(dir) = self.battery_dirs().into_iter().next() else {
            return BatteryStatus::unavailable();
        };

        let state = read_trimmed(&dir.join("status"));
        let discharging = state.as_deref() == Some("Discharging");
        let plugged_in = self.external_power_online().unwrap_or(!discharging);

        let percent = read_u64(&dir.join("capacity"))
            .map(|c| c as f32)
            .or_else(|| ratio_percent(&dir, "energy_now", "energy_full"))
            .or_else(|| ratio_percent(&dir, "charge_now", "charge_full"))
            .unwrap_or(0.0)
            .clamp(0.0, 100.0);

        let seconds_remaining = if discharging && !plugged_in {
            runtime_seconds(&dir, "energy_now", "power_now")
                .or_else(|| runtime_seconds(&dir, "charge_now", "current_now"))
        } else {
            None
        };

        BatteryStatus {
            available: true,
            percent,
            plugged_in,
            seconds_remaining,
            details: BatteryDetails {
                manufacturer: read_trimmed(&dir.join("manufacturer")),
                model: read_trimmed(&dir.join("model_name")),
                technology: read_trimmed(&dir.join("technology")),
                status_detail: state,
            },
        }
    }

    pub fn health(&self) -> BatteryHealth {
        for dir in self.battery_dirs() {
            let design = read_u64(&dir.join("energy_full_design"))
                .or_else(|| read_u64(&dir.join("charge_full_design")));
            let current =
                read_u64(&dir.join("energy_full")).or_else(|| read_u64(&dir.join("charge_full")));

            if let (Some(design), Some(current)) = (design, current) {
                if design > 0 && current > 0 {
                    return BatteryHealth {
                        design_capacity: Some(design),
                        current_capacity: Some(current),
                        cycle_count: read_u64(&dir.join("cycle_count")),
                    };
                }
            }
        }
        BatteryHealth::default()
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn read_u64(path: &Path) -> Option<u64> {
    let value = read_trimmed(path)?;
    match value.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            trace!("Non-numeric value {value:?} in {}", path.display());
            None
        }
    }
}

fn ratio_percent(dir: &Path, now: &str, full: &str) -> Option<f32> {
    let now = read_u64(&dir.join(now))?;
    let full = read_u64(&dir.join(full)).filter(|f| *f > 0)?;
    Some((now as f64 / full as f64 * 100.0) as f32)
}

/// Remaining charge over drain rate, in seconds.
fn runtime_seconds(dir: &Path, remaining: &str, rate: &str) -> Option<u64> {
    let remaining = read_u64(&dir.join(remaining))?;
    let rate = read_u64(&dir.join(rate)).filter(|r| *r > 0)?;
    Some(remaining.saturating_mul(3_600) / rate)
}

// ── macOS pmset ─────────────────────────────────────────────────────

/// Parse `pmset -g batt` output.
pub fn parse_pmset(output: &str) -> BatteryStatus {
    let plugged_in = output
        .lines()
        .next()
        .is_some_and(|l| l.contains("'AC Power'"));
    let Some(line) = output.lines().find(|l| l.contains("InternalBattery")) else {
        return BatteryStatus::unavailable();
    };

    let mut parts = line.split(';');
    let percent = parts
        .next()
        .and_then(|p| p.split_whitespace().last())
        .and_then(|p| p.trim_end_matches('%').parse::<f32>().ok())
        .unwrap_or(0.0);
    let state = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let seconds_remaining = parts
        .next()
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(parse_hours_minutes)
        .filter(|secs| *secs > 0 && !plugged_in);

    BatteryStatus {
        available: true,
        percent,
        plugged_in,
        seconds_remaining,
        details: BatteryDetails {
            status_detail: state,
            ..BatteryDetails::default()
        },
    }
}

fn parse_hours_minutes(text: &str) -> Option<u64> {
    let (h, m) = text.split_once(':')?;
    let hours: u64 = h.parse().ok()?;
    let minutes: u64 = m.parse().ok()?;
    Some(hours * 3_600 + minutes * 60)
}

// ── Windows WMI ─────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_first(self) -> Option<T> {
        match self {
            Self::One(v) => Some(v),
            Self::Many(v) => v.into_iter().next(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Win32Battery {
    estimated_charge_remaining: Option<u64>,
    battery_status: Option<u16>,
    estimated_run_time: Option<u64>,
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WmiHealth {
    design_capacity: Option<i64>,
    full_charge_capacity: Option<i64>,
    cycle_count: Option<i64>,
}

/// Human wording for `Win32_Battery.BatteryStatus`.
pub fn win32_status_detail(code: u16) -> &'static str {
    match code {
        1 => "Discharging",
        2 => "AC connected, charging",
        3 => "AC connected, fully charged",
        4 => "Low",
        5 => "Critical",
        6 => "Charging",
        7 => "Charging, high rate",
        8 => "Charging, low rate",
        9 => "Charging, critical",
        10 => "Undefined",
        11 => "Partially charged",
        _ => "Unknown",
    }
}

/// Parse the JSON export of `Win32_Battery`. Empty output means no battery.
pub fn parse_win32_battery(json: &str) -> Result<BatteryStatus, ScanError> {
    if json.trim().is_empty() {
        return Ok(BatteryStatus::unavailable());
    }
    let parsed: OneOrMany<Win32Battery> = serde_json::from_str(json)
        .map_err(|e| ScanError::Parse(format!("Win32_Battery JSON: {e}")))?;
    let Some(battery) = parsed.into_first() else {
        return Ok(BatteryStatus::unavailable());
    };

    let code = battery.battery_status.unwrap_or(0);
    let plugged_in = matches!(code, 2 | 3 | 6 | 7 | 8 | 9);
    let seconds_remaining = battery
        .estimated_run_time
        .filter(|m| *m > 0 && *m != WIN32_RUNTIME_ON_AC && !plugged_in)
        .map(|m| m * 60);

    Ok(BatteryStatus {
        available: true,
        percent: battery.estimated_charge_remaining.unwrap_or(0).min(100) as f32,
        plugged_in,
        seconds_remaining,
        details: BatteryDetails {
            model: battery.name,
            status_detail: Some(win32_status_detail(code).to_string()),
            ..BatteryDetails::default()
        },
    })
}

/// Parse the JSON emitted by the `root\wmi` health query.
pub fn parse_wmi_health(json: &str) -> Result<BatteryHealth, ScanError> {
    if json.trim().is_empty() {
        return Ok(BatteryHealth::default());
    }
    let raw: WmiHealth =
        serde_json::from_str(json).map_err(|e| ScanError::Parse(format!("battery health JSON: {e}")))?;
    let positive = |v: Option<i64>| v.and_then(|n| u64::try_from(n).ok()).filter(|n| *n > 0);

    let design = positive(raw.design_capacity);
    let current = positive(raw.full_charge_capacity);
    if design.is_none() || current.is_none() {
        return Ok(BatteryHealth::default());
    }
    Ok(BatteryHealth {
        design_capacity: design,
        current_capacity: current,
        cycle_count: raw.cycle_count.and_then(|n| u64::try_from(n).ok()),
    })
}

pub fn windows_status() -> Result<BatteryStatus, ScanError> {
    parse_win32_battery(&command::powershell(WIN32_BATTERY_QUERY)?)
}

pub fn windows_health() -> Result<BatteryHealth, ScanError> {
    parse_wmi_health(&command::powershell(WMI_HEALTH_QUERY)?)
}

pub fn macos_status() -> Result<BatteryStatus, ScanError> {
    Ok(parse_pmset(&command::run("pmset", &["-g", "batt"])?))
}

/// Power statistics and battery-saving advice derived from a battery reading.
use crate::model::{BatteryStatus, PowerUsage, Recommendation};
use crate::platform::Platform;

/// Discharge rate assumed when the platform gives no runtime estimate.
pub const DEFAULT_DISCHARGE_RATE: f64 = 10.0;

/// Charge level below which the critical warning is emitted.
pub const CRITICAL_PERCENT: f32 = 20.0;

const GENERAL_ADVICE: [Recommendation; 5] = [
    Recommendation {
        title: "Reduce Screen Brightness",
        description: "Lowering screen brightness can significantly extend battery life.",
    },
    Recommendation {
        title: "Enable Battery Saver Mode",
        description: "Use your operating system's battery saver mode to extend battery life.",
    },
    Recommendation {
        title: "Close High Power Applications",
        description: "Applications that use 3D graphics or perform intensive calculations consume more power.",
    },
    Recommendation {
        title: "Disable Unused Connections",
        description: "Turn off Wi-Fi, Bluetooth and other connections when not in use.",
    },
    Recommendation {
        title: "Optimize Power Settings",
        description: "Adjust sleep times and power plans in your system settings.",
    },
];

/// Estimate discharge rate and remaining runtime.
///
/// Unavailable without a battery or while on mains power.
pub fn power_usage(status: &BatteryStatus) -> PowerUsage {
    if !status.available || status.plugged_in {
        return PowerUsage::unavailable();
    }
    let percent = f64::from(status.percent);

    match status.seconds_remaining {
        Some(secs) if secs > 0 => {
            let hours = secs as f64 / 3_600.0;
            PowerUsage {
                available: true,
                discharge_rate_percent_per_hour: round2(percent / hours),
                estimated_hours_remaining: round2(hours),
                current_percent: status.percent,
            }
        }
        _ => PowerUsage {
            available: true,
            discharge_rate_percent_per_hour: DEFAULT_DISCHARGE_RATE,
            estimated_hours_remaining: round2(percent / DEFAULT_DISCHARGE_RATE),
            current_percent: status.percent,
        },
    }
}

/// Advice list for the current battery state.
pub fn recommendations(status: &BatteryStatus, platform: Platform) -> Vec<Recommendation> {
    if !status.available || status.plugged_in {
        return vec![Recommendation {
            title: "Check Battery Status",
            description: "Battery information is unavailable or your device is currently charging.",
        }];
    }

    let mut advice = Vec::with_capacity(GENERAL_ADVICE.len() + 2);
    if status.percent < CRITICAL_PERCENT {
        advice.push(Recommendation {
            title: "Critical Battery Level",
            description: "Battery is below 20%. Connect to power source soon or enable battery saver mode.",
        });
    }
    advice.extend(GENERAL_ADVICE.iter().cloned());

    match platform {
        Platform::Windows => advice.push(Recommendation {
            title: "Run Windows Power Troubleshooter",
            description: "Use the built-in Windows power troubleshooter to identify issues.",
        }),
        Platform::Linux => advice.push(Recommendation {
            title: "Install TLP or PowerTop",
            description: "These utilities can help optimize Linux power consumption.",
        }),
        Platform::MacOs | Platform::Unknown => {}
    }
    advice
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Plain records produced by the scanners.
///
/// Everything here is owned data (`Clone`) so results can be cached by the
/// executor and copied into coordinator state without borrowing scanner
/// internals.
pub mod file_entry;
pub mod power;
pub mod process;
pub mod size;

pub use file_entry::{FileEntry, LargeFile};
pub use power::{BatteryDetails, BatteryHealth, BatteryStatus, PowerUsage, Recommendation};
pub use process::{ProcessInfo, StartupItem};

/// LaptopCare Core: background task execution, scanners, and cleanup actions.
///
/// This crate contains all business logic with zero UI dependencies.
/// Any coordinator (GUI, TUI, headless sweep) drives it through the
/// [`executor::TaskExecutor`] and the scanner traits.
///
/// # Modules
///
/// - [`executor`]: named background tasks with cancellation and result hand-off.
/// - [`scanner`]: file/trash, process/startup, and battery/power collaborators.
/// - [`analysis`]: bounded top-K accumulation and power recommendations.
/// - [`actions`]: destructive operations (delete, empty trash, terminate, disable).
/// - [`platform`]: OS detection, platform paths, and privilege checks.
/// - [`model`]: plain records returned by the scanners.
/// - [`config`]: JSON configuration with defaults.
pub mod actions;
pub mod analysis;
mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod model;
pub mod platform;
pub mod scanner;

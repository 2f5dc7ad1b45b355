/// User-initiated, state-changing operations.
///
/// Unlike the scanners these are quick and synchronous; the coordinator calls
/// them directly. Every action refuses protected targets before touching
/// anything.

pub mod cleanup;
pub mod process;
pub mod startup;

pub use cleanup::{delete_files, empty_trash, DeleteReport};
pub use process::terminate_process;
pub use startup::disable_startup_item;

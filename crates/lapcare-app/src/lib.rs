/// LaptopCare coordinator: the single-threaded consumer of the task executor.
///
/// Business logic lives in `lapcare-core`; this crate only owns consumer
/// state and decides what to run when.
pub mod state;

pub use state::{AppState, Collaborators, Report};

/// Analysis modules: bounded top-K accumulation and power advice.

pub mod recommendations;
pub mod top_k;

pub use recommendations::{power_usage, recommendations};
pub use top_k::TopK;

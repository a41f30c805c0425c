pub mod analyze;
pub mod health;
pub mod plan;
pub mod usage;

pub use analyze::analyze_image;
pub use health::health_check;
pub use plan::{downgrade_plan, upgrade_plan};
pub use usage::get_usage;

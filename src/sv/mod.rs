pub mod performance;
pub mod stats;
pub mod user;

pub use performance::Performance;
pub use stats::Stats;
pub use user::User;

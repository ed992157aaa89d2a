pub mod assignment;
pub mod fleet;
pub mod history;
pub mod schedule;

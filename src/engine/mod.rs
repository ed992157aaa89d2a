pub mod dispatch;
pub mod eta;
pub mod queue;
pub mod report;

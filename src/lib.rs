pub mod feed;
pub mod geo;
pub mod planner;
pub mod schedule;
pub mod tables;

pub use feed::Feed;
pub use planner::Planner;
pub use schedule::{DayRange, Time};
pub use tables::Source;

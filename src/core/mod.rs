// Core algorithm exports
pub mod distance;
pub mod ranking;
pub mod schedule;
pub mod scoring;
pub mod selector;
pub mod trend;

pub use distance::{haversine_distance, calculate_bounding_box, is_within_bounding_box};
pub use ranking::{build_rankings, rank_index};
pub use schedule::{tonight_schedule, FixedWindow, OpenNowPolicy, ScheduledHours, TimeWindow, TonightSchedule};
pub use scoring::{calculate_power_score, ScoreEngine};
pub use selector::{NearbySort, Selection, SelectionMode, SelectionRequest, Selector};
pub use trend::determine_trend;

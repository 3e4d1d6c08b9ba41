//! Library layout planning.
//!
//! Finished downloads have no predictable internal structure. The planner
//! walks a download, probes each video file's duration, and lets the
//! configured `LayoutStrategy` route it to `Movies`, `Season 00` (specials)
//! or `Season NN` under the title's library folder. Original file names are
//! preserved.

mod patterns;
mod planner;
mod strategy;
mod types;

pub use patterns::{classify_name, is_specials, sanitize_title, season_number};
pub use planner::LibraryLayoutPlanner;
pub use strategy::{FlatStrategy, JellyfinStrategy, LayoutStrategy, StrategyRegistry};
pub use types::*;

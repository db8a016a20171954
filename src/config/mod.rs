pub mod tracker;

pub use tracker::{parse_guild_list, TrackerConfig};

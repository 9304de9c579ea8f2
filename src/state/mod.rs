mod episode;
mod frame;
mod stats;

pub use episode::{Episode, FeatureTable};
pub use frame::{
    ControllerState, FeatureRow, Frame, PLAYER_FEATURES, PhysicalButton, PlayerFrame, RawButtons,
    StickPosition,
};
pub use stats::{EpisodeStats, StatsSummary};

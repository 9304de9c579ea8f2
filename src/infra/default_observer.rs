use std::time::Duration;

use tracing::{debug, error, info};

use crate::runner::{EpisodeOutcome, MenuAction};
use crate::state::Frame;

use super::episode_observer::EpisodeObserver;
use super::types::{Menu, Player};

pub struct DefaultObserver;

impl EpisodeObserver for DefaultObserver {
    fn on_connected(&mut self, ego: Player) {
        info!("Emulator and controllers connected, playing as {}", ego);
    }

    fn on_menu_action(&mut self, menu: Menu, action: &MenuAction) {
        debug!("{:?}: {:?} -> {:?}", menu, action.side, action.command);
    }

    fn on_match_started(&mut self, frame: &Frame) {
        info!("Match started on frame {}", frame.index);
        info!("- stage: {}", frame.stage);
        for player in [Player::P1, Player::P2] {
            info!("- {}: {}", player, frame.player(player).character);
        }
    }

    fn on_slow_step(&mut self, frame_index: i64, latency: Duration) {
        debug!(
            "Frame {} took {:.2}ms to process",
            frame_index,
            latency.as_secs_f64() * 1000.0
        );
    }

    fn on_missing_decision(&mut self, frame_index: i64) {
        error!("No decision for frame {}", frame_index);
    }

    fn on_episode_finished(&mut self, outcome: &EpisodeOutcome) {
        info!("Episode finished: {:?}", outcome.reason);
        info!("{}", outcome.stats);
    }
}

use std::time::Duration;

use crate::encoding::ControllerDecision;
use crate::runner::{EpisodeOutcome, MenuAction};
use crate::state::Frame;

use super::types::{Menu, Player};

/// Trait for observing episode events during execution
pub trait EpisodeObserver {
    /// Called once the emulator and both controllers are connected
    fn on_connected(&mut self, ego: Player);

    /// Called for every menu action the navigator issues
    fn on_menu_action(&mut self, _menu: Menu, _action: &MenuAction) {
        // Default implementation does nothing
    }

    /// Called on the first in-match frame
    fn on_match_started(&mut self, frame: &Frame);

    /// Called for every in-match frame after its decision was sent
    fn on_frame(&mut self, _frame: &Frame, _decision: Option<&ControllerDecision>) {
        // Default implementation does nothing
    }

    /// Called when a step took longer than the latency budget
    fn on_slow_step(&mut self, frame_index: i64, latency: Duration);

    /// Called when no decision came back for an in-match frame
    fn on_missing_decision(&mut self, frame_index: i64);

    /// Called after teardown
    fn on_episode_finished(&mut self, outcome: &EpisodeOutcome);
}

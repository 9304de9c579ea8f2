use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use crate::infra::Player;

use super::frame::Frame;

/// Counters accumulated over one or more episodes.
///
/// Only in-match frames update the counters. Merging sums every counter, so aggregates can be
/// built from episodes in any order.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeStats {
    pub p1_damage: f64,
    pub p2_damage: f64,
    pub p1_stocks_lost: u32,
    pub p2_stocks_lost: u32,
    pub frames: u64,
    pub episodes: u32,
    prev_percent: [f32; 2],
    prev_stock: [u32; 2],
}

impl EpisodeStats {
    /// Stats for a single episode that has not seen any frames yet.
    pub fn new() -> Self {
        Self {
            episodes: 1,
            ..Self::empty()
        }
    }

    /// The identity for merging.
    pub fn empty() -> Self {
        Self {
            p1_damage: 0.0,
            p2_damage: 0.0,
            p1_stocks_lost: 0,
            p2_stocks_lost: 0,
            frames: 0,
            episodes: 0,
            prev_percent: [0.0; 2],
            prev_stock: [0; 2],
        }
    }

    pub fn update(&mut self, frame: &Frame) {
        if !frame.menu.is_match() {
            return;
        }

        for player in [Player::P1, Player::P2] {
            let state = frame.player(player);
            let i = player.index();
            let damage = f64::from((state.percent - self.prev_percent[i]).max(0.0));
            let lost_stock = state.stock < 4 && state.stock < self.prev_stock[i];

            match player {
                Player::P1 => {
                    self.p1_damage += damage;
                    self.p1_stocks_lost += u32::from(lost_stock);
                }
                Player::P2 => {
                    self.p2_damage += damage;
                    self.p2_stocks_lost += u32::from(lost_stock);
                }
            }

            self.prev_percent[i] = state.percent;
            self.prev_stock[i] = state.stock;
        }
        self.frames += 1;
    }

    /// Results from `player`'s point of view.
    pub fn summary(&self, player: Player) -> StatsSummary {
        let (inflicted, received, taken, lost) = match player {
            Player::P1 => (
                self.p2_damage,
                self.p1_damage,
                self.p2_stocks_lost,
                self.p1_stocks_lost,
            ),
            Player::P2 => (
                self.p1_damage,
                self.p2_damage,
                self.p1_stocks_lost,
                self.p2_stocks_lost,
            ),
        };
        let episodes = f64::from(self.episodes.max(1));
        let ratio = |a: f64, b: f64| if a + b > 0.0 { a / (a + b) } else { 0.0 };

        StatsSummary {
            episodes: self.episodes,
            damage_inflicted: inflicted,
            damage_received: received,
            damage_inflicted_per_episode: inflicted / episodes,
            damage_received_per_episode: received / episodes,
            damage_win_rate: ratio(inflicted, received),
            stocks_taken: taken,
            stocks_lost: lost,
            stocks_taken_per_episode: f64::from(taken) / episodes,
            stocks_lost_per_episode: f64::from(lost) / episodes,
            stock_win_rate: ratio(f64::from(taken), f64::from(lost)),
            frames: self.frames,
        }
    }
}

impl Default for EpisodeStats {
    fn default() -> Self {
        Self::new()
    }
}

impl Add for EpisodeStats {
    type Output = EpisodeStats;

    fn add(self, other: EpisodeStats) -> EpisodeStats {
        EpisodeStats {
            p1_damage: self.p1_damage + other.p1_damage,
            p2_damage: self.p2_damage + other.p2_damage,
            p1_stocks_lost: self.p1_stocks_lost + other.p1_stocks_lost,
            p2_stocks_lost: self.p2_stocks_lost + other.p2_stocks_lost,
            frames: self.frames + other.frames,
            episodes: self.episodes + other.episodes,
            ..EpisodeStats::empty()
        }
    }
}

impl AddAssign for EpisodeStats {
    fn add_assign(&mut self, other: EpisodeStats) {
        *self = self.clone() + other;
    }
}

impl Sum for EpisodeStats {
    fn sum<I: Iterator<Item = EpisodeStats>>(iter: I) -> EpisodeStats {
        iter.fold(EpisodeStats::empty(), Add::add)
    }
}

impl fmt::Display for EpisodeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "episodes: {}, p1 damage: {:.1}, p2 damage: {:.1}, p1 stocks lost: {}, p2 stocks lost: {}, frames: {}",
            self.episodes,
            self.p1_damage,
            self.p2_damage,
            self.p1_stocks_lost,
            self.p2_stocks_lost,
            self.frames
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsSummary {
    pub episodes: u32,
    pub damage_inflicted: f64,
    pub damage_received: f64,
    pub damage_inflicted_per_episode: f64,
    pub damage_received_per_episode: f64,
    pub damage_win_rate: f64,
    pub stocks_taken: u32,
    pub stocks_lost: u32,
    pub stocks_taken_per_episode: f64,
    pub stocks_lost_per_episode: f64,
    pub stock_win_rate: f64,
    pub frames: u64,
}

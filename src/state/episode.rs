use std::collections::BTreeMap;

use crate::errors::EpisodeDataError;
use crate::infra::Player;

use super::frame::{FeatureRow, Frame};

/// Per-feature columns of equal length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    len: usize,
    columns: BTreeMap<String, Vec<f32>>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: &[FeatureRow]) -> Self {
        let mut columns: BTreeMap<String, Vec<f32>> = BTreeMap::new();
        for (i, row) in rows.iter().enumerate() {
            for (name, &value) in row {
                let column = columns
                    .entry(name.clone())
                    .or_insert_with(|| vec![0.0; i]);
                column.push(value);
            }
            for column in columns.values_mut() {
                column.resize(i + 1, 0.0);
            }
        }

        Self {
            len: rows.len(),
            columns,
        }
    }

    /// Add a column; the first column fixes the table length.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        values: Vec<f32>,
    ) -> Result<(), EpisodeDataError> {
        let name = name.into();
        if self.columns.is_empty() {
            self.len = values.len();
        } else if values.len() != self.len {
            return Err(EpisodeDataError::ColumnLength {
                name,
                expected: self.len,
                found: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn column(&self, name: &str) -> Option<&[f32]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

/// Contiguous run of frames from match start to match end.
#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    frames: Vec<Frame>,
}

impl Episode {
    /// Frames must have strictly consecutive indices.
    pub fn new(frames: Vec<Frame>) -> Result<Self, EpisodeDataError> {
        let Some(first) = frames.first() else {
            return Err(EpisodeDataError::Empty);
        };

        let mut expected = first.index;
        for frame in &frames {
            if frame.index != expected {
                return Err(EpisodeDataError::Gap {
                    expected,
                    found: frame.index,
                });
            }
            expected += 1;
        }

        Ok(Self { frames })
    }

    /// Build an episode from raw observed states.
    ///
    /// The controller state observed on state `t + 1` is the input that produced it, so it is
    /// recorded on frame `t`. The final state has no successor and is dropped.
    pub fn from_observed(states: Vec<Frame>) -> Result<Self, EpisodeDataError> {
        let mut frames = Vec::with_capacity(states.len().saturating_sub(1));
        for pair in states.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            let mut frame = current.clone();
            for player in [Player::P1, Player::P2] {
                frame.player_mut(player).controller = next.player(player).controller;
            }
            frames.push(frame);
        }
        Self::new(frames)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn feature_table(&self) -> FeatureTable {
        let rows: Vec<FeatureRow> = self.frames.iter().map(Frame::feature_row).collect();
        FeatureTable::from_rows(&rows)
    }

    /// Long enough to sample from, and both sides took damage at some point.
    pub fn is_trainable(&self, min_frames: usize) -> bool {
        if self.frames.len() < min_frames {
            return false;
        }
        [Player::P1, Player::P2].iter().all(|&player| {
            self.frames
                .iter()
                .any(|frame| frame.player(player).percent > 0.0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::Menu;
    use crate::state::{PhysicalButton, RawButtons};

    fn frames(indices: &[i64]) -> Vec<Frame> {
        indices
            .iter()
            .map(|&i| Frame::new(i, Menu::InGame))
            .collect()
    }

    #[test]
    fn test_episode_rejects_gaps_and_empty() {
        assert_eq!(Episode::new(Vec::new()), Err(EpisodeDataError::Empty));
        assert_eq!(
            Episode::new(frames(&[-123, -122, -120])),
            Err(EpisodeDataError::Gap {
                expected: -121,
                found: -120
            })
        );
        assert!(Episode::new(frames(&[-123, -122, -121])).is_ok());
    }

    #[test]
    fn test_from_observed_shifts_controller_back_one_frame() {
        let mut states = frames(&[0, 1, 2]);
        states[1].player_mut(Player::P1).controller.buttons =
            RawButtons::default().with(PhysicalButton::A);
        states[2].player_mut(Player::P1).controller.shoulder = 1.0;

        let episode = Episode::from_observed(states).unwrap();
        assert_eq!(episode.len(), 2);
        let first = episode.frames()[0].player(Player::P1);
        assert!(first.controller.buttons.is_pressed(PhysicalButton::A));
        let second = episode.frames()[1].player(Player::P1);
        assert!(!second.controller.buttons.is_pressed(PhysicalButton::A));
        assert_eq!(second.controller.shoulder, 1.0);
    }

    #[test]
    fn test_feature_table_columns_match_frame_count() {
        let episode = Episode::new(frames(&[5, 6, 7, 8])).unwrap();
        let table = episode.feature_table();
        assert_eq!(table.len(), 4);
        assert_eq!(table.column("frame"), Some(&[5.0, 6.0, 7.0, 8.0][..]));
        assert!(table.column("p2_button_z").is_some());
    }

    #[test]
    fn test_insert_rejects_mismatched_column() {
        let mut table = FeatureTable::new();
        table.insert("a", vec![1.0, 2.0]).unwrap();
        assert!(table.insert("b", vec![1.0]).is_err());
    }

    #[test]
    fn test_trainable_requires_damage_on_both_sides() {
        let mut states = frames(&[0, 1, 2]);
        states[2].player_mut(Player::P1).percent = 12.0;
        let episode = Episode::new(states.clone()).unwrap();
        assert!(!episode.is_trainable(2));

        states[1].player_mut(Player::P2).percent = 3.0;
        let episode = Episode::new(states).unwrap();
        assert!(episode.is_trainable(2));
        assert!(!episode.is_trainable(4));
    }
}

//! Button edge encoding
//!
//! Raw controller frames can have any number of digital buttons pressed at once. Training targets
//! and decoded decisions use exactly one button category per frame. This module resolves the
//! overlap by preferring buttons that were not held on the previous frame.
//!
//! Buttons are compared in the fixed priority order of [`Button::ALL`]: A, B, Jump, Z, Shoulder.
//! Whenever more than one button qualifies, the earliest one in that order wins.

use std::fmt;

use crate::state::{PhysicalButton, RawButtons};

/// Canonical buttons. X and Y merge into `Jump`, L and R into `Shoulder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    A,
    B,
    Jump,
    Z,
    Shoulder,
}

impl Button {
    /// Canonical buttons in tie-break priority order.
    pub const ALL: [Button; 5] = [
        Button::A,
        Button::B,
        Button::Jump,
        Button::Z,
        Button::Shoulder,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    fn bit(self) -> u8 {
        1 << self.index()
    }

    /// Physical button pressed when this category is sent to a controller.
    pub fn physical(self) -> PhysicalButton {
        match self {
            Button::A => PhysicalButton::A,
            Button::B => PhysicalButton::B,
            Button::Jump => PhysicalButton::X,
            Button::Z => PhysicalButton::Z,
            Button::Shoulder => PhysicalButton::L,
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Button::A => "A",
            Button::B => "B",
            Button::Jump => "JUMP",
            Button::Z => "Z",
            Button::Shoulder => "SHOULDER",
        };
        f.write_str(name)
    }
}

/// A set of canonical buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ButtonSet(u8);

impl ButtonSet {
    pub const EMPTY: ButtonSet = ButtonSet(0);

    pub fn from_buttons(buttons: &[Button]) -> Self {
        buttons.iter().fold(Self::EMPTY, |set, &b| set.with(b))
    }

    /// Merge physical buttons into canonical ones.
    pub fn from_raw(raw: RawButtons) -> Self {
        let mut set = Self::EMPTY;
        for physical in PhysicalButton::ALL {
            if raw.is_pressed(physical) {
                set = set.with(match physical {
                    PhysicalButton::A => Button::A,
                    PhysicalButton::B => Button::B,
                    PhysicalButton::X | PhysicalButton::Y => Button::Jump,
                    PhysicalButton::Z => Button::Z,
                    PhysicalButton::L | PhysicalButton::R => Button::Shoulder,
                });
            }
        }
        set
    }

    pub fn with(self, button: Button) -> Self {
        Self(self.0 | button.bit())
    }

    pub fn contains(self, button: Button) -> bool {
        self.0 & button.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Buttons in `self` that are not in `other`.
    pub fn difference(self, other: ButtonSet) -> ButtonSet {
        Self(self.0 & !other.0)
    }

    /// Highest-priority member.
    pub fn first(self) -> Option<Button> {
        Button::ALL.into_iter().find(|&b| self.contains(b))
    }

    pub fn iter(self) -> impl Iterator<Item = Button> {
        Button::ALL.into_iter().filter(move |&b| self.contains(b))
    }
}

/// Number of button categories, including `NoButton`.
pub const BUTTON_CATEGORIES: usize = 6;

/// Exactly one of the canonical buttons, or none of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ButtonCategory {
    Pressed(Button),
    #[default]
    NoButton,
}

impl ButtonCategory {
    pub const COUNT: usize = BUTTON_CATEGORIES;

    /// `NoButton` is the last column.
    pub fn index(self) -> usize {
        match self {
            ButtonCategory::Pressed(button) => button.index(),
            ButtonCategory::NoButton => Button::ALL.len(),
        }
    }

    pub fn from_index(index: usize) -> Option<ButtonCategory> {
        match index {
            i if i < Button::ALL.len() => Some(ButtonCategory::Pressed(Button::ALL[i])),
            i if i == Button::ALL.len() => Some(ButtonCategory::NoButton),
            _ => None,
        }
    }

    pub fn one_hot(self) -> [f32; BUTTON_CATEGORIES] {
        let mut row = [0.0; BUTTON_CATEGORIES];
        row[self.index()] = 1.0;
        row
    }

    pub fn button(self) -> Option<Button> {
        match self {
            ButtonCategory::Pressed(button) => Some(button),
            ButtonCategory::NoButton => None,
        }
    }
}

impl fmt::Display for ButtonCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonCategory::Pressed(button) => button.fmt(f),
            ButtonCategory::NoButton => f.write_str("NO_BUTTON"),
        }
    }
}

/// Stateful encoder turning pressed sets into one category per frame.
///
/// The held set is what was physically pressed on the previous frame, not what was emitted.
/// When a combination stays held without any new press, the category chosen when it became
/// active is emitted again as long as that button is still down. If it was let go, the
/// highest-priority remaining button is emitted.
#[derive(Debug, Clone, Default)]
pub struct ButtonEdgeEncoder {
    held: ButtonSet,
    last: ButtonCategory,
}

impl ButtonEdgeEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(&mut self, pressed: ButtonSet) -> ButtonCategory {
        let category = match pressed.first() {
            None => ButtonCategory::NoButton,
            Some(only) if pressed.len() == 1 => ButtonCategory::Pressed(only),
            Some(first) => {
                let newly_pressed = pressed.difference(self.held);
                match (newly_pressed.first(), self.last) {
                    (Some(button), _) => ButtonCategory::Pressed(button),
                    (None, ButtonCategory::Pressed(last)) if pressed.contains(last) => self.last,
                    (None, _) => ButtonCategory::Pressed(first),
                }
            }
        };

        self.held = pressed;
        self.last = category;
        category
    }
}

/// Encode a whole sequence of pressed sets with a fresh encoder.
pub fn encode_buttons(frames: &[ButtonSet]) -> Vec<ButtonCategory> {
    let mut encoder = ButtonEdgeEncoder::new();
    frames.iter().map(|&pressed| encoder.encode(pressed)).collect()
}

/// Label only the first frame of every run of identical non-empty pressed sets.
///
/// The label uses the same newly-pressed preference as [`ButtonEdgeEncoder`]. Every other frame
/// in a run, and every frame with nothing pressed, is `NoButton`.
pub fn encode_rising_edges(frames: &[ButtonSet]) -> Vec<ButtonCategory> {
    let mut previous = ButtonSet::EMPTY;
    frames
        .iter()
        .map(|&pressed| {
            let category = if pressed.is_empty() || pressed == previous {
                ButtonCategory::NoButton
            } else {
                pressed
                    .difference(previous)
                    .first()
                    .or_else(|| pressed.first())
                    .map_or(ButtonCategory::NoButton, ButtonCategory::Pressed)
            };
            previous = pressed;
            category
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use Button::*;

    fn sets(frames: &[&[Button]]) -> Vec<ButtonSet> {
        frames.iter().map(|b| ButtonSet::from_buttons(b)).collect()
    }

    fn pressed(buttons: &[Button]) -> Vec<ButtonCategory> {
        buttons.iter().map(|&b| ButtonCategory::Pressed(b)).collect()
    }

    #[test]
    fn test_held_shoulder_then_z() {
        // Columns [A, B, JUMP, Z, SHOULDER, NONE]
        let frames = sets(&[
            &[Shoulder],
            &[Shoulder],
            &[Z, Shoulder],
            &[Z, Shoulder],
            &[Z, Shoulder],
            &[],
            &[],
        ]);
        let one_hot: Vec<[f32; 6]> = encode_buttons(&frames)
            .into_iter()
            .map(ButtonCategory::one_hot)
            .collect();

        assert_eq!(
            one_hot,
            vec![
                [0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 0.0, 0.0, 0.0, 1.0],
                [0.0, 0.0, 0.0, 0.0, 0.0, 1.0],
            ]
        );
    }

    #[test]
    fn test_new_press_wins_over_held_buttons() {
        let frames = sets(&[&[A], &[A, B], &[A, B], &[A], &[], &[], &[Z]]);
        let mut expected = pressed(&[A, B, B, A]);
        expected.extend([ButtonCategory::NoButton, ButtonCategory::NoButton]);
        expected.push(ButtonCategory::Pressed(Z));

        assert_eq!(encode_buttons(&frames), expected);
    }

    #[test]
    fn test_releasing_chosen_button_falls_back_to_priority() {
        let frames = sets(&[&[Jump], &[Jump, Z], &[Jump, Z, Shoulder], &[Jump, Z]]);
        assert_eq!(encode_buttons(&frames), pressed(&[Jump, Z, Shoulder, Jump]));
    }

    #[test]
    fn test_simultaneous_new_presses_use_priority_order() {
        let frames = sets(&[&[Shoulder, B, Z], &[]]);
        assert_eq!(
            encode_buttons(&frames),
            vec![ButtonCategory::Pressed(B), ButtonCategory::NoButton]
        );

        let frames = sets(&[&[Z], &[Z, Shoulder, Jump]]);
        assert_eq!(encode_buttons(&frames), pressed(&[Z, Jump]));
    }

    #[test]
    fn test_exactly_one_category_per_frame() {
        let frames = sets(&[
            &[A, B, Jump, Z, Shoulder],
            &[B, Jump],
            &[],
            &[Shoulder],
            &[A, Shoulder],
            &[A, Shoulder],
            &[Jump],
        ]);
        for encoded in [encode_buttons(&frames), encode_rising_edges(&frames)] {
            assert_eq!(encoded.len(), frames.len());
            for category in encoded {
                let sum: f32 = category.one_hot().iter().sum();
                assert_eq!(sum, 1.0);
            }
        }
    }

    #[test]
    fn test_rising_edges_label_first_frame_of_each_run() {
        let frames = sets(&[
            &[Shoulder],
            &[Shoulder],
            &[Z, Shoulder],
            &[Z, Shoulder],
            &[],
            &[A],
            &[A],
        ]);
        let none = ButtonCategory::NoButton;
        assert_eq!(
            encode_rising_edges(&frames),
            vec![
                ButtonCategory::Pressed(Shoulder),
                none,
                ButtonCategory::Pressed(Z),
                none,
                none,
                ButtonCategory::Pressed(A),
                none,
            ]
        );
    }

    #[test]
    fn test_raw_buttons_merge_into_canonical_set() {
        let raw = RawButtons::default()
            .with(PhysicalButton::Y)
            .with(PhysicalButton::R)
            .with(PhysicalButton::L);
        let set = ButtonSet::from_raw(raw);
        assert_eq!(set, ButtonSet::from_buttons(&[Jump, Shoulder]));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_category_index_round_trip() {
        for i in 0..ButtonCategory::COUNT {
            assert_eq!(ButtonCategory::from_index(i).map(|c| c.index()), Some(i));
        }
        assert_eq!(ButtonCategory::from_index(ButtonCategory::COUNT), None);
    }
}

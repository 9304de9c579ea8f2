use std::collections::BTreeMap;

use crate::infra::{Character, Menu, Player, Stage};

/// One frame flattened into named scalars, keyed like `p1_percent` or `stage`.
pub type FeatureRow = BTreeMap<String, f32>;

/// Per-player columns emitted by [`Frame::feature_row`], without the player prefix.
pub const PLAYER_FEATURES: [&str; 24] = [
    "character",
    "action",
    "action_frame",
    "percent",
    "stock",
    "facing",
    "invulnerable",
    "jumps_left",
    "on_ground",
    "shield_strength",
    "position_x",
    "position_y",
    "main_stick_x",
    "main_stick_y",
    "c_stick_x",
    "c_stick_y",
    "shoulder",
    "button_a",
    "button_b",
    "button_x",
    "button_y",
    "button_z",
    "button_l",
    "button_r",
];

/// Physical digital buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalButton {
    A,
    B,
    X,
    Y,
    Z,
    L,
    R,
}

impl PhysicalButton {
    pub const ALL: [PhysicalButton; 7] = [
        PhysicalButton::A,
        PhysicalButton::B,
        PhysicalButton::X,
        PhysicalButton::Y,
        PhysicalButton::Z,
        PhysicalButton::L,
        PhysicalButton::R,
    ];

    fn bit(self) -> u32 {
        1 << (self as u32)
    }

    pub fn feature_name(self) -> &'static str {
        match self {
            PhysicalButton::A => "button_a",
            PhysicalButton::B => "button_b",
            PhysicalButton::X => "button_x",
            PhysicalButton::Y => "button_y",
            PhysicalButton::Z => "button_z",
            PhysicalButton::L => "button_l",
            PhysicalButton::R => "button_r",
        }
    }
}

/// Raw digital button bits as read from the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawButtons(u32);

impl RawButtons {
    pub fn from_bits(bits: u32) -> Self {
        Self(bits & 0x7F)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn with(mut self, button: PhysicalButton) -> Self {
        self.0 |= button.bit();
        self
    }

    pub fn without(mut self, button: PhysicalButton) -> Self {
        self.0 &= !button.bit();
        self
    }

    pub fn is_pressed(self, button: PhysicalButton) -> bool {
        self.0 & button.bit() != 0
    }
}

/// Analog stick coordinates in `[0, 1]^2`, neutral at `(0.5, 0.5)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StickPosition {
    pub x: f32,
    pub y: f32,
}

impl StickPosition {
    pub const NEUTRAL: StickPosition = StickPosition { x: 0.5, y: 0.5 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Default for StickPosition {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Controller signal recorded alongside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerState {
    pub main_stick: StickPosition,
    pub c_stick: StickPosition,
    pub shoulder: f32,
    pub buttons: RawButtons,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerFrame {
    pub character: Character,
    pub action: u32,
    pub action_frame: f32,
    pub percent: f32,
    pub stock: u32,
    pub facing: bool,
    pub invulnerable: bool,
    pub jumps_left: u32,
    pub on_ground: bool,
    pub shield_strength: f32,
    pub position_x: f32,
    pub position_y: f32,
    /// Input that produced the following frame, not this one.
    pub controller: ControllerState,
}

impl PlayerFrame {
    fn push_features(&self, prefix: &str, row: &mut FeatureRow) {
        let controller = &self.controller;
        let flag = |value: bool| if value { 1.0 } else { 0.0 };

        let mut put = |name: &str, value: f32| {
            row.insert(format!("{prefix}_{name}"), value);
        };
        put("character", self.character.embedding_index() as f32);
        put("action", self.action as f32);
        put("action_frame", self.action_frame);
        put("percent", self.percent);
        put("stock", self.stock as f32);
        put("facing", flag(self.facing));
        put("invulnerable", flag(self.invulnerable));
        put("jumps_left", self.jumps_left as f32);
        put("on_ground", flag(self.on_ground));
        put("shield_strength", self.shield_strength);
        put("position_x", self.position_x);
        put("position_y", self.position_y);
        put("main_stick_x", controller.main_stick.x);
        put("main_stick_y", controller.main_stick.y);
        put("c_stick_x", controller.c_stick.x);
        put("c_stick_y", controller.c_stick.y);
        put("shoulder", controller.shoulder);
        for button in PhysicalButton::ALL {
            put(
                button.feature_name(),
                flag(controller.buttons.is_pressed(button)),
            );
        }
    }
}

/// One observation of match state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub index: i64,
    pub menu: Menu,
    pub stage: Stage,
    pub players: [PlayerFrame; 2],
}

impl Frame {
    pub fn new(index: i64, menu: Menu) -> Self {
        Self {
            index,
            menu,
            ..Default::default()
        }
    }

    pub fn player(&self, player: Player) -> &PlayerFrame {
        &self.players[player.index()]
    }

    pub fn player_mut(&mut self, player: Player) -> &mut PlayerFrame {
        &mut self.players[player.index()]
    }

    /// Flatten into the named scalars used for observations and feature tables.
    pub fn feature_row(&self) -> FeatureRow {
        let mut row = FeatureRow::new();
        row.insert("frame".to_string(), self.index as f32);
        row.insert("stage".to_string(), self.stage.embedding_index() as f32);
        for player in [Player::P1, Player::P2] {
            self.player(player).push_features(player.prefix(), &mut row);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_row_covers_every_player_feature() {
        let frame = Frame::new(12, Menu::InGame);
        let row = frame.feature_row();

        assert_eq!(row.len(), 2 + 2 * PLAYER_FEATURES.len());
        for name in PLAYER_FEATURES {
            assert!(row.contains_key(&format!("p1_{name}")), "missing p1_{name}");
            assert!(row.contains_key(&format!("p2_{name}")), "missing p2_{name}");
        }
        assert_eq!(row["frame"], 12.0);
    }

    #[test]
    fn test_feature_row_reports_buttons_and_sticks() {
        let mut frame = Frame::new(0, Menu::InGame);
        let p2 = frame.player_mut(Player::P2);
        p2.controller.buttons = RawButtons::default()
            .with(PhysicalButton::Y)
            .with(PhysicalButton::R);
        p2.controller.main_stick = StickPosition::new(1.0, 0.5);
        p2.percent = 42.0;

        let row = frame.feature_row();
        assert_eq!(row["p2_button_y"], 1.0);
        assert_eq!(row["p2_button_r"], 1.0);
        assert_eq!(row["p2_button_x"], 0.0);
        assert_eq!(row["p2_main_stick_x"], 1.0);
        assert_eq!(row["p2_percent"], 42.0);
        assert_eq!(row["p1_main_stick_x"], 0.5);
    }
}

//! Input feature preprocessing
//!
//! An [`InputConfig`] names the per-player features a model consumes, how each one is
//! normalized, and which frame offset it is read at. [`InputPipeline`] turns an aligned window
//! of raw `p1_*`/`p2_*` columns into per-head rows from the ego player's perspective.
//!
//! Heads:
//! - `stage`, `ego_character`, `opponent_character`, `ego_action`, `opponent_action`: one
//!   categorical value per frame, fed to embeddings.
//! - `gamestate`: every other player feature, ego first, then opponent.
//! - `controller`: the ego player's controller features, when the config has any.

use std::collections::BTreeMap;

use crate::alignment::{AlignedWindow, FeatureOffsetSpec};
use crate::errors::FeatureError;
use crate::infra::Player;

/// Summary statistics of one feature over a dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureStats {
    pub mean: f32,
    pub std: f32,
    pub min: f32,
    pub max: f32,
}

impl FeatureStats {
    pub const fn new(mean: f32, std: f32, min: f32, max: f32) -> Self {
        Self {
            mean,
            std,
            min,
            max,
        }
    }
}

/// Feature statistics keyed by base feature name (`percent`, not `p1_percent`).
#[derive(Debug, Clone, Default)]
pub struct StatsTable {
    stats: BTreeMap<String, FeatureStats>,
}

impl StatsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics of ranked netplay replays.
    pub fn melee_defaults() -> Self {
        let unit = FeatureStats::new(0.5, 0.5, 0.0, 1.0);
        let mut table = Self::new();
        table.insert("percent", FeatureStats::new(48.6, 40.2, 0.0, 362.0));
        table.insert("stock", FeatureStats::new(2.7, 1.1, 0.0, 4.0));
        table.insert("facing", FeatureStats::new(0.5, 0.5, 0.0, 1.0));
        table.insert("action_frame", FeatureStats::new(11.3, 15.8, -1.0, 200.0));
        table.insert("invulnerable", FeatureStats::new(0.04, 0.2, 0.0, 1.0));
        table.insert("jumps_left", FeatureStats::new(1.6, 0.6, 0.0, 6.0));
        table.insert("on_ground", FeatureStats::new(0.63, 0.48, 0.0, 1.0));
        table.insert("shield_strength", FeatureStats::new(58.1, 6.3, 0.0, 60.0));
        table.insert("position_x", FeatureStats::new(0.2, 52.4, -246.0, 246.0));
        table.insert("position_y", FeatureStats::new(12.5, 29.7, -150.0, 220.0));
        for name in ["main_stick_x", "main_stick_y", "c_stick_x", "c_stick_y"] {
            table.insert(name, FeatureStats::new(0.5, 0.25, 0.0, 1.0));
        }
        table.insert("shoulder", FeatureStats::new(0.05, 0.2, 0.0, 1.0));
        for name in [
            "button_a", "button_b", "button_x", "button_y", "button_z", "button_l", "button_r",
        ] {
            table.insert(name, unit);
        }
        table
    }

    pub fn insert(&mut self, feature: impl Into<String>, stats: FeatureStats) {
        self.stats.insert(feature.into(), stats);
    }

    pub fn get(&self, feature: &str) -> Result<&FeatureStats, FeatureError> {
        self.stats
            .get(feature)
            .ok_or_else(|| FeatureError::MissingStats(feature.to_string()))
    }
}

/// Per-feature normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Passed through as an embedding index.
    Categorical,
    /// Scaled to `[0, 1]`.
    Normalize,
    /// Scaled to `[0, 1]` with the maximum at 0.
    InvertAndNormalize,
    /// Zero mean, unit variance.
    Standardize,
}

impl Transform {
    pub fn needs_stats(self) -> bool {
        self != Transform::Categorical
    }

    /// Degenerate ranges and deviations map to 0.
    pub fn apply(self, value: f32, stats: &FeatureStats) -> f32 {
        let range = stats.max - stats.min;
        match self {
            Transform::Categorical => value,
            Transform::Normalize if range != 0.0 => (value - stats.min) / range,
            Transform::InvertAndNormalize if range != 0.0 => (stats.max - value) / range,
            Transform::Standardize if stats.std != 0.0 => (value - stats.mean) / stats.std,
            _ => 0.0,
        }
    }
}

/// Features that get their own embedding head per player.
const EMBEDDED_PLAYER_FEATURES: [&str; 2] = ["character", "action"];

pub const CONTROLLER_FEATURES: [&str; 12] = [
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

#[derive(Debug, Clone, PartialEq)]
pub struct InputConfig {
    pub name: &'static str,
    pub player_features: Vec<&'static str>,
    /// Read for the ego player only.
    pub controller_features: Vec<&'static str>,
    pub transforms: BTreeMap<&'static str, Transform>,
    /// Frame offsets by base feature, applied to both players' columns.
    pub offsets: BTreeMap<&'static str, i32>,
}

impl InputConfig {
    /// Stage, characters, actions, and physical state. No controller.
    pub fn inputs_v0() -> Self {
        let player_features = vec![
            "character",
            "action",
            "percent",
            "stock",
            "facing",
            "invulnerable",
            "jumps_left",
            "on_ground",
            "shield_strength",
            "position_x",
            "position_y",
        ];

        let transforms = BTreeMap::from([
            ("stage", Transform::Categorical),
            ("character", Transform::Categorical),
            ("action", Transform::Categorical),
            ("percent", Transform::Normalize),
            ("stock", Transform::Normalize),
            ("facing", Transform::Normalize),
            ("invulnerable", Transform::Normalize),
            ("jumps_left", Transform::Normalize),
            ("on_ground", Transform::Normalize),
            ("shield_strength", Transform::InvertAndNormalize),
            ("position_x", Transform::Standardize),
            ("position_y", Transform::Standardize),
        ]);

        Self {
            name: "inputs_v0",
            player_features,
            controller_features: Vec::new(),
            transforms,
            offsets: BTreeMap::new(),
        }
    }

    /// `inputs_v0` plus the ego controller state of the previous frame.
    pub fn inputs_v1() -> Self {
        let mut config = Self::inputs_v0();
        config.name = "inputs_v1";
        config.controller_features = CONTROLLER_FEATURES.to_vec();
        for feature in CONTROLLER_FEATURES {
            config.transforms.insert(feature, Transform::Normalize);
            config.offsets.insert(feature, -1);
        }
        config
    }

    /// Expand base-feature offsets into per-column offsets for both players.
    pub fn offset_spec(&self) -> FeatureOffsetSpec {
        let mut spec = FeatureOffsetSpec::new();
        for (feature, &offset) in &self.offsets {
            for player in [Player::P1, Player::P2] {
                spec.insert(format!("{}_{}", player.prefix(), feature), offset);
            }
        }
        spec
    }

    fn gamestate_features(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.player_features
            .iter()
            .copied()
            .filter(|feature| !EMBEDDED_PLAYER_FEATURES.contains(feature))
    }

    /// Row width of every head.
    pub fn head_widths(&self) -> BTreeMap<&'static str, usize> {
        let mut widths = BTreeMap::from([
            ("stage", 1),
            ("ego_character", 1),
            ("opponent_character", 1),
            ("ego_action", 1),
            ("opponent_action", 1),
            ("gamestate", 2 * self.gamestate_features().count()),
        ]);
        if !self.controller_features.is_empty() {
            widths.insert("controller", self.controller_features.len());
        }
        widths
    }

    fn transform(&self, feature: &str) -> Transform {
        self.transforms
            .get(feature)
            .copied()
            .unwrap_or(Transform::Categorical)
    }
}

/// Per-head `T x D` rows handed to a policy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelInputs {
    pub seq_len: usize,
    pub heads: BTreeMap<String, Vec<Vec<f32>>>,
}

impl ModelInputs {
    pub fn head(&self, name: &str) -> Option<&[Vec<f32>]> {
        self.heads.get(name).map(Vec::as_slice)
    }

    pub fn width(&self, name: &str) -> Option<usize> {
        self.heads.get(name)?.first().map(Vec::len)
    }
}

#[derive(Debug, Clone)]
pub struct InputPipeline {
    config: InputConfig,
    stats: StatsTable,
}

impl InputPipeline {
    pub fn new(config: InputConfig, stats: StatsTable) -> Self {
        Self { config, stats }
    }

    pub fn config(&self) -> &InputConfig {
        &self.config
    }

    pub fn preprocess(
        &self,
        window: &AlignedWindow,
        ego: Player,
    ) -> Result<ModelInputs, FeatureError> {
        let opponent = ego.opponent();
        let seq_len = window.len();
        let mut heads: BTreeMap<String, Vec<Vec<f32>>> = BTreeMap::new();

        heads.insert("stage".to_string(), self.single_column(window, "stage", "stage")?);
        for (perspective, player) in [("ego", ego), ("opponent", opponent)] {
            for feature in EMBEDDED_PLAYER_FEATURES {
                let column = format!("{}_{}", player.prefix(), feature);
                heads.insert(
                    format!("{perspective}_{feature}"),
                    self.single_column(window, &column, feature)?,
                );
            }
        }

        let mut gamestate = vec![Vec::new(); seq_len];
        for player in [ego, opponent] {
            for feature in self.config.gamestate_features() {
                self.append_column(window, player, feature, &mut gamestate)?;
            }
        }
        heads.insert("gamestate".to_string(), gamestate);

        if !self.config.controller_features.is_empty() {
            let mut controller = vec![Vec::new(); seq_len];
            for feature in &self.config.controller_features {
                self.append_column(window, ego, feature, &mut controller)?;
            }
            heads.insert("controller".to_string(), controller);
        }

        Ok(ModelInputs { seq_len, heads })
    }

    fn transformed(
        &self,
        window: &AlignedWindow,
        column: &str,
        feature: &str,
    ) -> Result<Vec<f32>, FeatureError> {
        let values = window
            .column(column)
            .ok_or_else(|| FeatureError::MissingFeature(column.to_string()))?;
        let transform = self.config.transform(feature);
        if !transform.needs_stats() {
            return Ok(values.to_vec());
        }
        let stats = self.stats.get(feature)?;
        Ok(values.iter().map(|&v| transform.apply(v, stats)).collect())
    }

    fn single_column(
        &self,
        window: &AlignedWindow,
        column: &str,
        feature: &str,
    ) -> Result<Vec<Vec<f32>>, FeatureError> {
        Ok(self
            .transformed(window, column, feature)?
            .into_iter()
            .map(|v| vec![v])
            .collect())
    }

    fn append_column(
        &self,
        window: &AlignedWindow,
        player: Player,
        feature: &str,
        rows: &mut [Vec<f32>],
    ) -> Result<(), FeatureError> {
        let column = format!("{}_{}", player.prefix(), feature);
        let values = self.transformed(window, &column, feature)?;
        for (row, value) in rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }
}

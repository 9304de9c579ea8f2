use crate::alignment::AlignedWindow;
use crate::errors::FeatureError;
use crate::infra::Player;
use crate::state::{PhysicalButton, RawButtons, StickPosition};

use super::buttons::{ButtonCategory, ButtonSet, encode_buttons, encode_rising_edges};
use super::sticks::{
    SHOULDER_CLUSTER_CENTERS, STICK_CLUSTER_CENTERS, nearest_shoulder_cluster,
    nearest_stick_cluster,
};

/// How button targets are labeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStrategy {
    /// Every frame labeled by [`super::ButtonEdgeEncoder`].
    EdgeButtons,
    /// Only the first frame of each held combination is labeled.
    SparseButtons,
}

impl TargetStrategy {
    pub fn name(self) -> &'static str {
        match self {
            TargetStrategy::EdgeButtons => "targets_v0",
            TargetStrategy::SparseButtons => "targets_sparse",
        }
    }

    /// Quantize `player`'s controller columns into class labels.
    pub fn encode(self, window: &AlignedWindow, player: Player) -> Result<Targets, FeatureError> {
        let column = move |feature: &str| {
            let name = format!("{}_{}", player.prefix(), feature);
            window
                .column(&name)
                .ok_or(FeatureError::MissingFeature(name))
        };

        let sticks = |x_name: &str, y_name: &str| -> Result<Vec<usize>, FeatureError> {
            Ok(column(x_name)?
                .iter()
                .zip(column(y_name)?)
                .map(|(&x, &y)| nearest_stick_cluster(StickPosition::new(x, y)))
                .collect())
        };
        let main_stick = sticks("main_stick_x", "main_stick_y")?;
        let c_stick = sticks("c_stick_x", "c_stick_y")?;
        let shoulder = column("shoulder")?
            .iter()
            .map(|&value| nearest_shoulder_cluster(value))
            .collect();

        let mut pressed = vec![RawButtons::default(); window.len()];
        for button in PhysicalButton::ALL {
            for (raw, &value) in pressed.iter_mut().zip(column(button.feature_name())?) {
                if value > 0.5 {
                    *raw = raw.with(button);
                }
            }
        }
        let sets: Vec<ButtonSet> = pressed.into_iter().map(ButtonSet::from_raw).collect();
        let buttons = match self {
            TargetStrategy::EdgeButtons => encode_buttons(&sets),
            TargetStrategy::SparseButtons => encode_rising_edges(&sets),
        };

        Ok(Targets {
            main_stick,
            c_stick,
            shoulder,
            buttons,
        })
    }
}

/// Per-frame class labels for every controller head.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Targets {
    pub main_stick: Vec<usize>,
    pub c_stick: Vec<usize>,
    pub shoulder: Vec<usize>,
    pub buttons: Vec<ButtonCategory>,
}

impl Targets {
    pub fn len(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }

    pub fn main_stick_one_hot(&self) -> Vec<Vec<f32>> {
        one_hot(&self.main_stick, STICK_CLUSTER_CENTERS.len())
    }

    pub fn c_stick_one_hot(&self) -> Vec<Vec<f32>> {
        one_hot(&self.c_stick, STICK_CLUSTER_CENTERS.len())
    }

    pub fn shoulder_one_hot(&self) -> Vec<Vec<f32>> {
        one_hot(&self.shoulder, SHOULDER_CLUSTER_CENTERS.len())
    }

    pub fn buttons_one_hot(&self) -> Vec<Vec<f32>> {
        self.buttons.iter().map(|b| b.one_hot().to_vec()).collect()
    }
}

fn one_hot(indices: &[usize], width: usize) -> Vec<Vec<f32>> {
    indices
        .iter()
        .map(|&i| {
            let mut row = vec![0.0; width];
            row[i] = 1.0;
            row
        })
        .collect()
}

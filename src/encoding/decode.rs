use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

use crate::errors::DecodeError;
use crate::state::StickPosition;

use super::buttons::{BUTTON_CATEGORIES, ButtonCategory};
use super::sticks::{SHOULDER_CLUSTER_CENTERS, STICK_CLUSTER_CENTERS, stick_cluster_center};

/// Unnormalized per-class scores for the newest frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolicyOutput {
    pub main_stick: Vec<f32>,
    pub c_stick: Vec<f32>,
    pub buttons: Vec<f32>,
    pub shoulder: Option<Vec<f32>>,
}

/// A physical control signal for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerDecision {
    pub main_stick: StickPosition,
    pub c_stick: StickPosition,
    pub shoulder: Option<f32>,
    pub button: ButtonCategory,
}

impl ControllerDecision {
    pub fn neutral() -> Self {
        Self {
            main_stick: StickPosition::NEUTRAL,
            c_stick: StickPosition::NEUTRAL,
            shoulder: None,
            button: ButtonCategory::NoButton,
        }
    }
}

impl Default for ControllerDecision {
    fn default() -> Self {
        Self::neutral()
    }
}

/// How class scores become a single class per head.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodeStrategy {
    Argmax,
    /// Sample from `softmax(logits / temperature)`.
    Sample { temperature: f32 },
}

impl DecodeStrategy {
    pub const DEFAULT_TEMPERATURE: f32 = 1.5;

    pub fn decode<R: Rng + ?Sized>(
        &self,
        output: &PolicyOutput,
        rng: &mut R,
    ) -> Result<ControllerDecision, DecodeError> {
        check_shape("main_stick", &output.main_stick, STICK_CLUSTER_CENTERS.len())?;
        check_shape("c_stick", &output.c_stick, STICK_CLUSTER_CENTERS.len())?;
        check_shape("buttons", &output.buttons, BUTTON_CATEGORIES)?;
        if let Some(shoulder) = &output.shoulder {
            check_shape("shoulder", shoulder, SHOULDER_CLUSTER_CENTERS.len())?;
        }

        let main = self.pick("main_stick", &output.main_stick, rng)?;
        let c = self.pick("c_stick", &output.c_stick, rng)?;
        let button = self.pick("buttons", &output.buttons, rng)?;
        let shoulder = match &output.shoulder {
            Some(logits) => Some(SHOULDER_CLUSTER_CENTERS[self.pick("shoulder", logits, rng)?]),
            None => None,
        };

        Ok(ControllerDecision {
            main_stick: stick_cluster_center(main).unwrap_or_default(),
            c_stick: stick_cluster_center(c).unwrap_or_default(),
            shoulder,
            button: ButtonCategory::from_index(button).unwrap_or_default(),
        })
    }

    fn pick<R: Rng + ?Sized>(
        &self,
        head: &'static str,
        logits: &[f32],
        rng: &mut R,
    ) -> Result<usize, DecodeError> {
        match *self {
            DecodeStrategy::Argmax => argmax(logits).ok_or(DecodeError::Degenerate(head)),
            DecodeStrategy::Sample { temperature } => {
                let probs = softmax(logits, temperature).ok_or(DecodeError::Degenerate(head))?;
                let classes =
                    WeightedIndex::new(&probs).map_err(|_| DecodeError::Degenerate(head))?;
                Ok(classes.sample(rng))
            }
        }
    }
}

fn check_shape(head: &'static str, logits: &[f32], expected: usize) -> Result<(), DecodeError> {
    if logits.len() != expected {
        return Err(DecodeError::LogitShape {
            head,
            expected,
            found: logits.len(),
        });
    }
    Ok(())
}

/// First index of the maximum; `None` if any score is NaN.
fn argmax(logits: &[f32]) -> Option<usize> {
    if logits.iter().any(|v| v.is_nan()) {
        return None;
    }
    let mut best = 0;
    for (i, &value) in logits.iter().enumerate() {
        if value > logits[best] {
            best = i;
        }
    }
    (!logits.is_empty()).then_some(best)
}

fn softmax(logits: &[f32], temperature: f32) -> Option<Vec<f32>> {
    if temperature <= 0.0 || !temperature.is_finite() {
        return None;
    }
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return None;
    }
    let exps: Vec<f32> = logits
        .iter()
        .map(|&v| ((v - max) / temperature).exp())
        .collect();
    let total: f32 = exps.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }
    Some(exps.into_iter().map(|v| v / total).collect())
}

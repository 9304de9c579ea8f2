use crate::encoding::{
    BUTTON_CATEGORIES, ButtonCategory, ModelInputs, PolicyOutput, STICK_CLUSTER_CENTERS,
    nearest_stick_cluster,
};
use crate::errors::PolicyError;
use crate::state::StickPosition;

/// Maps one preprocessed window to class scores for its newest frame.
pub trait Policy: Send + 'static {
    fn predict(&mut self, inputs: &ModelInputs) -> Result<PolicyOutput, PolicyError>;
}

const PEAK: f32 = 50.0;

fn peaked(len: usize, hot: usize) -> Vec<f32> {
    (0..len).map(|i| if i == hot { PEAK } else { 0.0 }).collect()
}

/// Scores that decode to neutral sticks and no button, whatever the input.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralPolicy;

impl Policy for NeutralPolicy {
    fn predict(&mut self, inputs: &ModelInputs) -> Result<PolicyOutput, PolicyError> {
        if inputs.seq_len == 0 {
            return Err(PolicyError::Failed("empty input window".to_string()));
        }
        let neutral = nearest_stick_cluster(StickPosition::NEUTRAL);
        Ok(PolicyOutput {
            main_stick: peaked(STICK_CLUSTER_CENTERS.len(), neutral),
            c_stick: peaked(STICK_CLUSTER_CENTERS.len(), neutral),
            buttons: peaked(BUTTON_CATEGORIES, ButtonCategory::NoButton.index()),
            shoulder: None,
        })
    }
}

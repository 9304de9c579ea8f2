use rand::Rng;

use crate::encoding::{InputPipeline, ModelInputs, TargetStrategy, Targets};
use crate::errors::SampleError;
use crate::infra::Player;
use crate::state::FeatureTable;

use super::aligner::{FrameOffsetAligner, SampleStart};
use super::offsets::FeatureOffsetSpec;

/// One supervised example cut from a recorded episode.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    /// Raw index of the first backing frame.
    pub start: usize,
    pub inputs: ModelInputs,
    pub targets: Targets,
}

/// Slices episodes into training samples of `seq_len` frames.
///
/// Inputs are read at their configured offsets. Targets are the unshifted controller state at
/// the same positions, so a `-1` controller input pairs the previous frame's input with the
/// current frame's label.
#[derive(Debug, Clone)]
pub struct SampleBuilder {
    inputs: FrameOffsetAligner,
    targets: FrameOffsetAligner,
    pipeline: InputPipeline,
    strategy: TargetStrategy,
}

impl SampleBuilder {
    pub fn new(pipeline: InputPipeline, strategy: TargetStrategy, seq_len: usize) -> Self {
        let offsets = pipeline.config().offset_spec();
        Self {
            inputs: FrameOffsetAligner::new(offsets, seq_len),
            targets: FrameOffsetAligner::new(FeatureOffsetSpec::new(), seq_len),
            pipeline,
            strategy,
        }
    }

    pub fn seq_len(&self) -> usize {
        self.inputs.output_len()
    }

    /// Episode frames consumed by one sample.
    pub fn trajectory_len(&self) -> usize {
        self.inputs.required_len()
    }

    pub fn build<R: Rng + ?Sized>(
        &self,
        episode: &FeatureTable,
        ego: Player,
        start: SampleStart,
        rng: &mut R,
    ) -> Result<TrainingSample, SampleError> {
        let start = self.inputs.sample_start(episode.len(), start, rng)?;

        let window = self.inputs.align(episode, start)?;
        let inputs = self.pipeline.preprocess(&window, ego)?;

        let reference = self.inputs.offsets().reference();
        let target_window = self.targets.align(episode, start + reference)?;
        let targets = self.strategy.encode(&target_window, ego)?;

        Ok(TrainingSample {
            start,
            inputs,
            targets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{Button, ButtonCategory, InputConfig, StatsTable};
    use crate::infra::Menu;
    use crate::state::{Episode, Frame, PhysicalButton, RawButtons};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn episode(len: usize) -> FeatureTable {
        let frames = (0..len as i64)
            .map(|i| {
                let mut frame = Frame::new(i, Menu::InGame);
                let p1 = frame.player_mut(Player::P1);
                p1.percent = i as f32;
                if i % 2 == 1 {
                    p1.controller.buttons = RawButtons::default().with(PhysicalButton::B);
                }
                frame
            })
            .collect();
        Episode::new(frames).unwrap().feature_table()
    }

    fn builder(config: InputConfig, seq_len: usize) -> SampleBuilder {
        let pipeline = InputPipeline::new(config, StatsTable::melee_defaults());
        SampleBuilder::new(pipeline, TargetStrategy::EdgeButtons, seq_len)
    }

    #[test]
    fn test_trajectory_len() {
        assert_eq!(builder(InputConfig::inputs_v0(), 8).trajectory_len(), 8);
        assert_eq!(builder(InputConfig::inputs_v1(), 8).trajectory_len(), 9);
    }

    #[test]
    fn test_fixed_start_pairs_inputs_with_current_targets() {
        let builder = builder(InputConfig::inputs_v1(), 4);
        let mut rng = StdRng::seed_from_u64(0);
        let sample = builder
            .build(&episode(10), Player::P1, SampleStart::Fixed(2), &mut rng)
            .unwrap();

        assert_eq!(sample.start, 2);
        assert_eq!(sample.inputs.seq_len, 4);
        assert_eq!(sample.targets.len(), 4);

        // Position 0 labels frame 3 (B held) and reads the controller of frame 2 (released)
        let controller = sample.inputs.head("controller").unwrap();
        assert_eq!(controller[0][6], 0.0);
        assert_eq!(sample.targets.buttons[0], ButtonCategory::Pressed(Button::B));
        assert_eq!(sample.targets.buttons[1], ButtonCategory::NoButton);
        assert_eq!(controller[1][6], 1.0);
    }

    #[test]
    fn test_random_start_and_short_episode() {
        let builder = builder(InputConfig::inputs_v0(), 6);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..10 {
            let sample = builder
                .build(&episode(10), Player::P2, SampleStart::Random, &mut rng)
                .unwrap();
            assert!(sample.start <= 4);
        }
        assert!(matches!(
            builder.build(&episode(5), Player::P1, SampleStart::Random, &mut rng),
            Err(SampleError::Align(_))
        ));
    }
}

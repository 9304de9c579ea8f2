use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, error, warn};

use crate::alignment::{FrameOffsetAligner, SlidingWindowBuffer};
use crate::encoding::{CONTROLLER_FEATURES, ControllerDecision, DecodeStrategy, InputPipeline};
use crate::errors::{DecisionError, PolicyError};
use crate::infra::Player;
use crate::runner::DecisionSource;
use crate::state::{FeatureRow, Frame};

use super::policy::Policy;

/// Observation channel messages. `Stop` ends the worker.
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    Observation { frame_index: i64, row: FeatureRow },
    Stop,
}

#[derive(Debug, Clone)]
pub struct WorkerReply {
    pub frame_index: i64,
    /// `None` when the cycle failed; the failure is logged by the worker.
    pub decision: Option<ControllerDecision>,
}

/// Turns observations into decisions, one cycle per message.
///
/// Owns the frame history, so a policy that panics or hangs takes down only this worker.
///
/// History rows are laid out like recorded episodes: the controller stored on a frame is the
/// one read on the following state. The first `warmup_frames` observations get a neutral
/// decision without calling the policy.
pub struct InferenceWorker<P: Policy> {
    ego: Player,
    buffer: SlidingWindowBuffer,
    aligner: FrameOffsetAligner,
    pipeline: InputPipeline,
    decoder: DecodeStrategy,
    policy: P,
    rng: StdRng,
    warmup: usize,
    observed: usize,
}

impl<P: Policy> InferenceWorker<P> {
    pub fn new(
        ego: Player,
        pipeline: InputPipeline,
        decoder: DecodeStrategy,
        policy: P,
        seq_len: usize,
    ) -> Self {
        let aligner = FrameOffsetAligner::new(pipeline.config().offset_spec(), seq_len);
        Self {
            ego,
            buffer: SlidingWindowBuffer::new(aligner.required_len()),
            warmup: aligner.offsets().warmup_frames(),
            aligner,
            pipeline,
            decoder,
            policy,
            rng: StdRng::from_rng(&mut rand::rng()),
            observed: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Append one frame and produce the decision for it.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn cycle(&mut self, row: &FeatureRow) -> Result<ControllerDecision, PolicyError> {
        // The controller read now is the input applied on the previous frame
        self.buffer.amend_newest(&controller_columns(row));
        self.buffer.push(row);

        self.observed += 1;
        if self.observed <= self.warmup {
            return Ok(ControllerDecision::neutral());
        }

        let window = self.aligner.align_streaming(&self.buffer);
        let inputs = self.pipeline.preprocess(&window, self.ego)?;
        let output = self.policy.predict(&inputs)?;
        Ok(self.decoder.decode(&output, &mut self.rng)?)
    }

    pub fn spawn(self, join_timeout: Duration) -> io::Result<InferenceHandle> {
        let (observations, observation_rx) = unbounded_channel();
        let (reply_tx, replies) = unbounded_channel();

        let handle = thread::Builder::new()
            .name("inference-worker".to_string())
            .spawn(move || self.serve(observation_rx, reply_tx))?;

        Ok(InferenceHandle {
            observations,
            replies,
            handle: Some(handle),
            join_timeout,
        })
    }

    fn serve(
        mut self,
        mut observations: UnboundedReceiver<WorkerMessage>,
        replies: UnboundedSender<WorkerReply>,
    ) {
        while let Some(message) = observations.blocking_recv() {
            let WorkerMessage::Observation { frame_index, row } = message else {
                break;
            };
            let decision = match self.cycle(&row) {
                Ok(decision) => Some(decision),
                Err(err) => {
                    error!("Inference failed on frame {}: {}", frame_index, err);
                    None
                }
            };
            if replies.send(WorkerReply { frame_index, decision }).is_err() {
                break;
            }
        }
        debug!("Inference worker exiting");
    }
}

fn controller_columns(row: &FeatureRow) -> FeatureRow {
    row.iter()
        .filter(|(name, _)| {
            name.split_once('_')
                .is_some_and(|(_, feature)| CONTROLLER_FEATURES.contains(&feature))
        })
        .map(|(name, &value)| (name.clone(), value))
        .collect()
}

/// The control loop's end of a running worker.
pub struct InferenceHandle {
    observations: UnboundedSender<WorkerMessage>,
    replies: UnboundedReceiver<WorkerReply>,
    handle: Option<JoinHandle<()>>,
    join_timeout: Duration,
}

impl DecisionSource for InferenceHandle {
    async fn decide(
        &mut self,
        frame: &Frame,
    ) -> Result<Option<ControllerDecision>, DecisionError> {
        let message = WorkerMessage::Observation {
            frame_index: frame.index,
            row: frame.feature_row(),
        };
        self.observations
            .send(message)
            .map_err(|_| DecisionError::WorkerCrashed)?;

        let reply = self
            .replies
            .recv()
            .await
            .ok_or(DecisionError::WorkerCrashed)?;
        if reply.frame_index != frame.index {
            return Err(DecisionError::OutOfOrder {
                expected: frame.index,
                received: reply.frame_index,
            });
        }
        Ok(reply.decision)
    }

    async fn shutdown(&mut self) {
        let _ = self.observations.send(WorkerMessage::Stop);
        let Some(handle) = self.handle.take() else {
            return;
        };

        let deadline = Instant::now() + self.join_timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!(
                    "Inference worker still running after {:?}, detaching it",
                    self.join_timeout
                );
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        if handle.join().is_err() {
            warn!("Inference worker panicked");
        }
    }
}

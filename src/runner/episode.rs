use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::encoding::ControllerDecision;
use crate::errors::{BridgeError, DecisionError, EpisodeError};
use crate::infra::{EpisodeObserver, FrameLog};
use crate::state::{EpisodeStats, Frame};

use super::emulator::{Controller, DecisionSource, Emulator, Shutdown};
use super::menu::{MatchSetup, MenuNavigator, Side};
use super::step::StepThread;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Hard ceiling on in-match frames; reaching it ends the episode normally.
    pub max_steps: u64,
    /// Deadline for one emulator step and for one decision.
    pub step_timeout: Duration,
    pub latency_warning: Duration,
    pub setup: MatchSetup,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_steps: 99_999,
            step_timeout: Duration::from_secs(2),
            latency_warning: Duration::from_millis(14),
            setup: MatchSetup::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    MatchEnded,
    StepLimit,
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct EpisodeOutcome {
    pub stats: EpisodeStats,
    pub reason: EndReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Connecting,
    AwaitingMatch,
    InMatch,
    Ended,
    Failed,
}

/// Plays one episode: connects, navigates the menus, feeds in-match frames to a decision source
/// and applies its decisions until the match ends.
///
/// Whatever way `run` exits, the controllers are released, the emulator is stopped once and the
/// decision source is shut down before it returns.
pub struct EpisodeRunner<E: Emulator, C: Controller> {
    emulator: Option<E>,
    ego: C,
    opponent: C,
    config: RunnerConfig,
    navigator: MenuNavigator,
    observer: Box<dyn EpisodeObserver>,
    frame_log: Option<FrameLog>,
    shutdown: Arc<dyn Shutdown>,
    stopped: bool,
    steps: Option<StepThread>,
    stats: EpisodeStats,
    state: LoopState,
}

impl<E: Emulator, C: Controller> EpisodeRunner<E, C> {
    pub fn new(
        emulator: E,
        ego: C,
        opponent: C,
        config: RunnerConfig,
        observer: impl EpisodeObserver + 'static,
    ) -> Self {
        let shutdown = emulator.shutdown_handle();
        let navigator = MenuNavigator::new(config.setup.clone());
        Self {
            emulator: Some(emulator),
            ego,
            opponent,
            config,
            navigator,
            observer: Box::new(observer),
            frame_log: None,
            shutdown,
            stopped: false,
            steps: None,
            stats: EpisodeStats::new(),
            state: LoopState::Connecting,
        }
    }

    pub fn with_frame_log(mut self, frame_log: FrameLog) -> Self {
        self.frame_log = Some(frame_log);
        self
    }

    /// Play until the match ends or Ctrl-C is pressed.
    pub async fn run<D: DecisionSource>(
        self,
        decisions: &mut D,
    ) -> Result<EpisodeOutcome, EpisodeError> {
        let ctrl_c = async {
            if tokio::signal::ctrl_c().await.is_err() {
                warn!("Cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };
        self.run_until(decisions, ctrl_c).await
    }

    /// Play until the match ends or `interrupt` completes. An interrupt is a normal end.
    pub async fn run_until<D, I>(
        mut self,
        decisions: &mut D,
        interrupt: I,
    ) -> Result<EpisodeOutcome, EpisodeError>
    where
        D: DecisionSource,
        I: Future<Output = ()>,
    {
        let result = tokio::select! {
            result = self.play(decisions) => result,
            () = interrupt => {
                info!("Interrupted, shutting down");
                Ok(EndReason::Interrupted)
            }
        };

        if result.is_err() {
            self.transition(LoopState::Failed);
        }
        self.teardown(decisions).await;

        let reason = result?;
        let outcome = EpisodeOutcome {
            stats: self.stats.clone(),
            reason,
        };
        self.observer.on_episode_finished(&outcome);
        Ok(outcome)
    }

    async fn play<D: DecisionSource>(
        &mut self,
        decisions: &mut D,
    ) -> Result<EndReason, EpisodeError> {
        let mut emulator = self.emulator.take().ok_or(BridgeError::NotRunning)?;
        if !emulator.connect() {
            return Err(EpisodeError::EmulatorConnect);
        }
        if !self.ego.connect() {
            return Err(EpisodeError::ControllerConnect("ego"));
        }
        if !self.opponent.connect() {
            return Err(EpisodeError::ControllerConnect("opponent"));
        }
        self.steps = Some(StepThread::spawn(emulator).map_err(BridgeError::from)?);
        self.observer.on_connected(self.config.setup.ego);
        self.transition(LoopState::AwaitingMatch);

        let mut match_steps: u64 = 0;
        loop {
            if match_steps >= self.config.max_steps {
                info!("Reached the limit of {} steps", self.config.max_steps);
                return Ok(EndReason::StepLimit);
            }

            let started = Instant::now();
            let steps = self.steps.as_mut().ok_or(BridgeError::NotRunning)?;
            let Some(frame) = steps.step(self.config.step_timeout).await? else {
                debug!("No frame available yet");
                continue;
            };

            if !frame.menu.is_match() {
                if self.state == LoopState::InMatch {
                    self.transition(LoopState::Ended);
                    return Ok(EndReason::MatchEnded);
                }
                self.navigate(&frame)?;
                continue;
            }

            if self.state != LoopState::InMatch {
                self.transition(LoopState::InMatch);
                self.observer.on_match_started(&frame);
            }
            self.stats.update(&frame);

            let decision = self.decide(decisions, &frame).await?;
            match &decision {
                Some(decision) => self.ego.send_decision(decision)?,
                None => self.observer.on_missing_decision(frame.index),
            }

            let latency = started.elapsed();
            if latency > self.config.latency_warning {
                self.observer.on_slow_step(frame.index, latency);
            }
            if let Some(frame_log) = self.frame_log.as_mut() {
                if let Err(err) = frame_log.append(&frame, decision.as_ref(), latency) {
                    warn!("Failed to write frame log: {}", err);
                }
            }
            self.observer.on_frame(&frame, decision.as_ref());
            match_steps += 1;
        }
    }

    fn navigate(&mut self, frame: &Frame) -> Result<(), EpisodeError> {
        let Some(action) = self.navigator.step(frame) else {
            return Ok(());
        };
        self.observer.on_menu_action(frame.menu, &action);
        let controller = match action.side {
            Side::Ego => &mut self.ego,
            Side::Opponent => &mut self.opponent,
        };
        controller.menu(&action.command)?;
        Ok(())
    }

    async fn decide<D: DecisionSource>(
        &self,
        decisions: &mut D,
        frame: &Frame,
    ) -> Result<Option<ControllerDecision>, EpisodeError> {
        let timeout = self.config.step_timeout;
        match tokio::time::timeout(timeout, decisions.decide(frame)).await {
            Ok(decision) => Ok(decision?),
            Err(_) => Err(DecisionError::WorkerTimeout(timeout).into()),
        }
    }

    fn transition(&mut self, state: LoopState) {
        debug!("Loop state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    async fn teardown<D: DecisionSource>(&mut self, decisions: &mut D) {
        for (name, controller) in [("ego", &mut self.ego), ("opponent", &mut self.opponent)] {
            if let Err(err) = controller.release_all() {
                warn!("Failed to release {} controller: {}", name, err);
            }
        }

        if !self.stopped {
            self.shutdown.stop();
            self.stopped = true;
        }
        if let Some(steps) = self.steps.take() {
            steps.finish();
        }

        if let Some(frame_log) = self.frame_log.as_mut() {
            if let Err(err) = frame_log.flush() {
                warn!("Failed to flush frame log: {}", err);
            }
        }

        decisions.shutdown().await;
        debug!("Teardown complete in state {:?}", self.state);
    }
}

mod emulator;
mod episode;
mod menu;
mod step;

pub use emulator::{Controller, DecisionSource, Emulator, Shutdown};
pub use episode::{EndReason, EpisodeOutcome, EpisodeRunner, LoopState, RunnerConfig};
pub use menu::{MatchSetup, MenuAction, MenuCommand, MenuNavigator, Side};
pub use step::StepThread;

use std::future::Future;
use std::sync::Arc;

use crate::encoding::{Button, ControllerDecision};
use crate::errors::{BridgeError, DecisionError};
use crate::state::{Frame, StickPosition};

use super::menu::MenuCommand;

/// Driver for the external simulation process.
pub trait Emulator: Send + 'static {
    fn connect(&mut self) -> bool;

    /// Block until the next frame. `Ok(None)` means no frame was ready yet.
    fn step(&mut self) -> Result<Option<Frame>, BridgeError>;

    /// A handle that can stop the process while `step` is blocked on another thread.
    fn shutdown_handle(&self) -> Arc<dyn Shutdown>;
}

pub trait Shutdown: Send + Sync {
    fn stop(&self);
}

/// One virtual controller plugged into the emulator.
pub trait Controller {
    fn connect(&mut self) -> bool;

    fn tilt_main(&mut self, position: StickPosition);

    fn tilt_c(&mut self, position: StickPosition);

    fn press_shoulder(&mut self, amount: f32);

    fn press(&mut self, button: Button);

    fn release(&mut self, button: Button);

    /// Drive one step of menu navigation.
    fn menu(&mut self, command: &MenuCommand) -> Result<(), BridgeError>;

    /// Send the accumulated state for this frame.
    fn flush(&mut self) -> Result<(), BridgeError>;

    /// Neutral sticks, nothing pressed.
    fn release_all(&mut self) -> Result<(), BridgeError>;

    /// Apply a decision: analog axes, the chosen button pressed and every other one released.
    fn send_decision(&mut self, decision: &ControllerDecision) -> Result<(), BridgeError> {
        self.tilt_main(decision.main_stick);
        self.tilt_c(decision.c_stick);
        if let Some(amount) = decision.shoulder {
            self.press_shoulder(amount);
        }
        for button in Button::ALL {
            if decision.button.button() == Some(button) {
                self.press(button);
            } else {
                self.release(button);
            }
        }
        self.flush()
    }
}

/// Produces one decision per in-match frame.
pub trait DecisionSource {
    /// `Ok(None)` is a missing decision; the previous controller state stays in effect.
    fn decide(
        &mut self,
        frame: &Frame,
    ) -> impl Future<Output = Result<Option<ControllerDecision>, DecisionError>>;

    /// Release whatever produces the decisions. Called exactly once, during teardown.
    fn shutdown(&mut self) -> impl Future<Output = ()>;
}

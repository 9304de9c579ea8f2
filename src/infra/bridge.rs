//! Emulator driver backed by an external bridge process
//!
//! The bridge owns the emulator. It streams frame records on its stdout and accepts controller
//! commands on its stdin, both length-delimited.

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use crate::encoding::Button;
use crate::errors::BridgeError;
use crate::runner::{Controller, Emulator, MenuCommand, Shutdown};
use crate::state::{ControllerState, Frame, StickPosition};

use super::records::{
    CommandKind, CommandRecord, ControllerRecord, FrameRecord, MenuActionKind, MenuRecord,
    read_delimited, write_delimited,
};
use super::types::Player;

type SharedInput = Arc<Mutex<Option<Box<dyn Write + Send>>>>;
type SharedChild = Arc<Mutex<Option<Child>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
pub struct BridgeCommand {
    pub program: String,
    pub args: Vec<String>,
    pub udp_port: u32,
    pub replay_dir: PathBuf,
}

pub struct BridgeProcess {
    command: BridgeCommand,
    child: SharedChild,
    input: SharedInput,
    output: Option<Box<dyn BufRead + Send>>,
}

impl BridgeProcess {
    /// Prepare the bridge. The process is launched by `connect`.
    pub fn new(command: BridgeCommand) -> Self {
        Self {
            command,
            child: Arc::new(Mutex::new(None)),
            input: Arc::new(Mutex::new(None)),
            output: None,
        }
    }

    /// A controller on `player`'s port, sharing this bridge's command stream.
    pub fn controller(&self, player: Player) -> BridgeController {
        BridgeController {
            port: player.port(),
            input: self.input.clone(),
            state: ControllerState::default(),
        }
    }

    fn launch(&mut self) -> Result<(), BridgeError> {
        let command = &self.command;
        info!(
            "Launching {} (udp port {}, replays in {})",
            command.program,
            command.udp_port,
            command.replay_dir.display()
        );

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .arg("--udp-port")
            .arg(command.udp_port.to_string())
            .arg("--replay-dir")
            .arg(&command.replay_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(BridgeError::NotRunning);
        };
        *lock(&self.input) = Some(Box::new(stdin));
        self.output = Some(Box::new(BufReader::new(stdout)));
        *lock(&self.child) = Some(child);
        Ok(())
    }

    #[cfg(test)]
    fn with_streams(input: SharedInput, output: Box<dyn BufRead + Send>) -> Self {
        let mut bridge = Self::new(BridgeCommand {
            program: String::new(),
            args: Vec::new(),
            udp_port: 0,
            replay_dir: PathBuf::new(),
        });
        bridge.input = input;
        bridge.output = Some(output);
        bridge
    }
}

impl Emulator for BridgeProcess {
    fn connect(&mut self) -> bool {
        match self.launch() {
            Ok(()) => true,
            Err(err) => {
                error!("Failed to launch {}: {}", self.command.program, err);
                false
            }
        }
    }

    fn step(&mut self) -> Result<Option<Frame>, BridgeError> {
        let output = self.output.as_mut().ok_or(BridgeError::NotRunning)?;
        let Some(record) = read_delimited::<FrameRecord, _>(output)? else {
            return Err(BridgeError::Disconnected);
        };
        if record.pending {
            return Ok(None);
        }
        Frame::try_from(record).map(Some)
    }

    fn shutdown_handle(&self) -> Arc<dyn Shutdown> {
        Arc::new(BridgeShutdown {
            child: self.child.clone(),
            input: self.input.clone(),
        })
    }
}

/// Kills the bridge and closes the command stream, which unblocks any pending step or write.
pub struct BridgeShutdown {
    child: SharedChild,
    input: SharedInput,
}

impl Shutdown for BridgeShutdown {
    fn stop(&self) {
        // Kill before touching stdin: a write stuck on a full pipe holds the input lock
        if let Some(mut child) = lock(&self.child).take() {
            if let Err(err) = child.kill() {
                warn!("Failed to kill bridge process: {}", err);
            }
            match child.wait() {
                Ok(status) => debug!("Bridge process exited with {}", status),
                Err(err) => warn!("Failed to reap bridge process: {}", err),
            }
        }
        lock(&self.input).take();
    }
}

/// Virtual controller on one port. Input accumulates until `flush`.
///
/// Commands are written synchronously with no deadline of their own.
pub struct BridgeController {
    port: u32,
    input: SharedInput,
    state: ControllerState,
}

impl BridgeController {
    fn send(&self, command: CommandRecord) -> Result<(), BridgeError> {
        let mut input = lock(&self.input);
        let writer = input.as_mut().ok_or(BridgeError::NotRunning)?;
        write_delimited(writer, &command)?;
        writer.flush()?;
        Ok(())
    }

    fn command(&self, kind: CommandKind) -> CommandRecord {
        CommandRecord {
            port: self.port,
            kind: kind as i32,
            ..Default::default()
        }
    }
}

impl Controller for BridgeController {
    fn connect(&mut self) -> bool {
        match self.send(self.command(CommandKind::Plug)) {
            Ok(()) => true,
            Err(err) => {
                error!("Failed to plug controller into port {}: {}", self.port, err);
                false
            }
        }
    }

    fn tilt_main(&mut self, position: StickPosition) {
        self.state.main_stick = position;
    }

    fn tilt_c(&mut self, position: StickPosition) {
        self.state.c_stick = position;
    }

    fn press_shoulder(&mut self, amount: f32) {
        self.state.shoulder = amount.clamp(0.0, 1.0);
    }

    fn press(&mut self, button: Button) {
        self.state.buttons = self.state.buttons.with(button.physical());
    }

    fn release(&mut self, button: Button) {
        self.state.buttons = self.state.buttons.without(button.physical());
    }

    fn menu(&mut self, command: &MenuCommand) -> Result<(), BridgeError> {
        let record = CommandRecord {
            menu: Some(menu_record(command)),
            ..self.command(CommandKind::Menu)
        };
        self.send(record)
    }

    fn flush(&mut self) -> Result<(), BridgeError> {
        let record = CommandRecord {
            controller: Some(ControllerRecord::from(&self.state)),
            ..self.command(CommandKind::Input)
        };
        self.send(record)
    }

    fn release_all(&mut self) -> Result<(), BridgeError> {
        self.state = ControllerState::default();
        self.send(self.command(CommandKind::Release))
    }
}

fn menu_record(command: &MenuCommand) -> MenuRecord {
    match *command {
        MenuCommand::EnterVersus => MenuRecord {
            action: MenuActionKind::EnterVersus as i32,
            ..Default::default()
        },
        MenuCommand::ChooseCharacter {
            character,
            cpu_level,
            costume,
            start,
        } => MenuRecord {
            action: MenuActionKind::ChooseCharacter as i32,
            character: character.id(),
            cpu_level,
            costume,
            start,
            ..Default::default()
        },
        MenuCommand::ChooseStage { stage, character } => MenuRecord {
            action: MenuActionKind::ChooseStage as i32,
            character: character.id(),
            stage: stage.id(),
            ..Default::default()
        },
        MenuCommand::SkipPostgame => MenuRecord {
            action: MenuActionKind::SkipPostgame as i32,
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{ButtonCategory, ControllerDecision};
    use crate::infra::{Character, Menu, Stage};
    use crate::state::PhysicalButton;
    use std::io::{self, Cursor};

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn shared(sink: &Sink) -> SharedInput {
        Arc::new(Mutex::new(Some(Box::new(sink.clone()))))
    }

    fn sent(sink: &Sink) -> Vec<CommandRecord> {
        let bytes = sink.0.lock().unwrap().clone();
        let mut reader = Cursor::new(bytes);
        let mut records = Vec::new();
        while let Some(record) = read_delimited(&mut reader).unwrap() {
            records.push(record);
        }
        records
    }

    #[test]
    fn test_step_reads_frames_and_pending_records() {
        let mut stream = Vec::new();
        write_delimited(
            &mut stream,
            &FrameRecord {
                pending: true,
                ..Default::default()
            },
        )
        .unwrap();
        let mut frame = Frame::new(42, Menu::InGame);
        frame.stage = Stage::Battlefield;
        write_delimited(&mut stream, &FrameRecord::from(&frame)).unwrap();

        let mut bridge =
            BridgeProcess::with_streams(shared(&Sink::default()), Box::new(Cursor::new(stream)));

        assert_eq!(bridge.step().unwrap(), None);
        assert_eq!(bridge.step().unwrap(), Some(frame));
        assert!(matches!(bridge.step(), Err(BridgeError::Disconnected)));
    }

    #[test]
    fn test_garbage_on_stdout_is_an_io_error() {
        let garbage = vec![0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f, 0x00];
        let mut bridge =
            BridgeProcess::with_streams(shared(&Sink::default()), Box::new(Cursor::new(garbage)));

        match bridge.step() {
            Err(BridgeError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::InvalidData),
            other => panic!("expected an I/O error, got {other:?}"),
        }
    }

    #[test]
    fn test_decision_is_sent_as_one_input_command() {
        let sink = Sink::default();
        let bridge = BridgeProcess::with_streams(shared(&sink), Box::new(Cursor::new(Vec::new())));
        let mut controller = bridge.controller(Player::P2);

        assert!(controller.connect());
        controller.press(Button::B);
        controller
            .send_decision(&ControllerDecision {
                main_stick: StickPosition::new(1.0, 0.5),
                shoulder: Some(0.4),
                button: ButtonCategory::Pressed(Button::Jump),
                ..ControllerDecision::neutral()
            })
            .unwrap();

        let records = sent(&sink);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, CommandKind::Plug as i32);
        assert_eq!(records[0].port, 2);

        let input = records[1].controller.as_ref().unwrap();
        assert_eq!(records[1].kind, CommandKind::Input as i32);
        assert_eq!(input.main_x, 1.0);
        assert_eq!(input.shoulder, 0.4);
        let buttons = ControllerState::from(input).buttons;
        assert!(buttons.is_pressed(PhysicalButton::X));
        assert!(!buttons.is_pressed(PhysicalButton::B));
    }

    #[test]
    fn test_menu_and_release_commands() {
        let sink = Sink::default();
        let bridge = BridgeProcess::with_streams(shared(&sink), Box::new(Cursor::new(Vec::new())));
        let mut controller = bridge.controller(Player::P1);

        controller
            .menu(&MenuCommand::ChooseCharacter {
                character: Character::Falco,
                cpu_level: 9,
                costume: 1,
                start: true,
            })
            .unwrap();
        controller.release_all().unwrap();

        let records = sent(&sink);
        let menu = records[0].menu.as_ref().unwrap();
        assert_eq!(menu.action, MenuActionKind::ChooseCharacter as i32);
        assert_eq!(menu.character, Character::Falco.id());
        assert_eq!(menu.cpu_level, 9);
        assert!(menu.start);
        assert_eq!(records[1].kind, CommandKind::Release as i32);
    }

    #[test]
    fn test_stop_closes_the_command_stream() {
        let sink = Sink::default();
        let bridge = BridgeProcess::with_streams(shared(&sink), Box::new(Cursor::new(Vec::new())));
        let mut controller = bridge.controller(Player::P1);

        bridge.shutdown_handle().stop();

        assert!(!controller.connect());
        assert!(matches!(controller.flush(), Err(BridgeError::NotRunning)));
    }

    #[cfg(unix)]
    #[test]
    fn test_stop_unblocks_a_write_to_a_stalled_bridge() {
        use std::sync::mpsc;
        use std::time::Duration;

        let mut bridge = BridgeProcess::new(BridgeCommand {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "exec sleep 30".to_string()],
            udp_port: 51441,
            replay_dir: PathBuf::from("replays"),
        });
        assert!(bridge.connect());
        let mut controller = bridge.controller(Player::P1);

        // Nothing drains stdin, so this fills the pipe and then blocks
        let (done_tx, done) = mpsc::channel();
        std::thread::spawn(move || {
            let result = loop {
                if let Err(err) = controller.flush() {
                    break err;
                }
            };
            let _ = done_tx.send(result);
        });
        assert!(done.recv_timeout(Duration::from_millis(200)).is_err());

        bridge.shutdown_handle().stop();
        let err = done.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(err, BridgeError::Io(_) | BridgeError::NotRunning));
    }

    #[test]
    fn test_missing_program_fails_to_connect() {
        let mut bridge = BridgeProcess::new(BridgeCommand {
            program: "/nonexistent/halbot-bridge".to_string(),
            args: Vec::new(),
            udp_port: 51441,
            replay_dir: PathBuf::from("replays"),
        });
        assert!(!bridge.connect());
        assert!(matches!(bridge.step(), Err(BridgeError::NotRunning)));
    }
}

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} environment variable is required")]
    Missing(&'static str),
}

#[derive(Error, Debug)]
pub enum PortError {
    #[error("Port discovery is not supported on {0}")]
    UnsupportedPlatform(String),

    #[error("Failed to list UDP sockets: {0}")]
    Listing(#[from] std::io::Error),

    #[error("netstat exited with {status}: {stderr}")]
    ListingFailed { status: String, stderr: String },

    #[error("Not enough available ports (requested {requested}, available {available})")]
    NotEnoughPorts { requested: usize, available: usize },
}

#[derive(Error, Debug, PartialEq)]
pub enum EpisodeDataError {
    #[error("Episode has no frames")]
    Empty,

    #[error("Frame index gap: expected {expected}, found {found}")]
    Gap { expected: i64, found: i64 },

    #[error("Column {name} has {found} rows, expected {expected}")]
    ColumnLength {
        name: String,
        expected: usize,
        found: usize,
    },
}

#[derive(Error, Debug, PartialEq)]
pub enum AlignError {
    #[error("Insufficient history: {required} frames required, {available} available")]
    InsufficientHistory { required: usize, available: usize },
}

#[derive(Error, Debug, PartialEq)]
pub enum FeatureError {
    #[error("Feature {0} is missing from the window")]
    MissingFeature(String),

    #[error("No statistics for feature {0}")]
    MissingStats(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum RegistryError {
    #[error("{kind} {name} not found. Valid names: {valid:?}")]
    Unknown {
        kind: &'static str,
        name: String,
        valid: Vec<String>,
    },
}

#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
    #[error("Head {head} has {found} logits, expected {expected}")]
    LogitShape {
        head: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Head {0} produced a degenerate distribution")]
    Degenerate(&'static str),
}

#[derive(Error, Debug)]
pub enum SampleError {
    #[error(transparent)]
    Align(#[from] AlignError),

    #[error(transparent)]
    Feature(#[from] FeatureError),
}

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Policy failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Error, Debug)]
pub enum DecisionError {
    #[error("No decision within {0:?}")]
    WorkerTimeout(Duration),

    #[error("Inference worker exited unexpectedly")]
    WorkerCrashed,

    #[error("Decision for frame {received} arrived while waiting for frame {expected}")]
    OutOfOrder { expected: i64, received: i64 },
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bridge process is not running")]
    NotRunning,

    #[error("Bridge closed its output stream")]
    Disconnected,

    #[error("Malformed frame record: {0}")]
    MalformedFrame(String),
}

#[derive(Error, Debug)]
pub enum EpisodeError {
    #[error("Failed to connect to the emulator")]
    EmulatorConnect,

    #[error("Failed to connect the {0} controller")]
    ControllerConnect(&'static str),

    #[error("Emulator step timed out after {0:?}")]
    StepTimeout(Duration),

    #[error("Emulator step failed: {0}")]
    Emulator(#[from] BridgeError),

    #[error(transparent)]
    Decision(#[from] DecisionError),
}

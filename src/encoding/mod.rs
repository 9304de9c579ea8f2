mod buttons;
mod decode;
mod features;
mod registry;
mod sticks;
mod targets;

pub use buttons::{
    BUTTON_CATEGORIES, Button, ButtonCategory, ButtonEdgeEncoder, ButtonSet, encode_buttons,
    encode_rising_edges,
};
pub use decode::{ControllerDecision, DecodeStrategy, PolicyOutput};
pub use features::{
    CONTROLLER_FEATURES, FeatureStats, InputConfig, InputPipeline, ModelInputs, StatsTable,
    Transform,
};
pub use registry::Registry;
pub use sticks::{
    SHOULDER_CLUSTER_CENTERS, STICK_CLUSTER_CENTERS, nearest_shoulder_cluster,
    nearest_stick_cluster, stick_cluster_center,
};
pub use targets::{TargetStrategy, Targets};

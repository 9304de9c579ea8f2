mod bridge;
mod default_observer;
mod episode_observer;
mod frame_log;
mod ports;
pub mod records;
mod types;

pub use bridge::{BridgeCommand, BridgeController, BridgeProcess, BridgeShutdown};
pub use default_observer::DefaultObserver;
pub use episode_observer::EpisodeObserver;
pub use frame_log::FrameLog;
pub use ports::{PORT_RANGE, Platform, find_open_udp_ports, parse_used_ports, sample_open_ports};
pub use types::{Character, Menu, Player, Stage};

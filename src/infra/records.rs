//! Wire records exchanged with the emulator bridge and written to diagnostic logs
//!
//! Every record is framed by a varint length prefix.

use std::io::{self, Read, Write};

use prost::Message;
use prost::bytes::BytesMut;

use crate::encoding::ControllerDecision;
use crate::errors::BridgeError;
use crate::state::{ControllerState, Frame, PlayerFrame, RawButtons, StickPosition};

use super::types::{Character, Menu, Player, Stage};

#[derive(Clone, PartialEq, Message)]
pub struct FrameRecord {
    #[prost(int64, tag = "1")]
    pub index: i64,
    #[prost(int32, tag = "2")]
    pub menu: i32,
    #[prost(uint32, tag = "3")]
    pub stage: u32,
    #[prost(message, repeated, tag = "4")]
    pub players: Vec<PlayerRecord>,
    /// Set when the emulator has no new frame yet.
    #[prost(bool, tag = "5")]
    pub pending: bool,
}

#[derive(Clone, PartialEq, Message)]
pub struct PlayerRecord {
    #[prost(uint32, tag = "1")]
    pub port: u32,
    #[prost(uint32, tag = "2")]
    pub character: u32,
    #[prost(uint32, tag = "3")]
    pub action: u32,
    #[prost(float, tag = "4")]
    pub action_frame: f32,
    #[prost(float, tag = "5")]
    pub percent: f32,
    #[prost(uint32, tag = "6")]
    pub stock: u32,
    #[prost(bool, tag = "7")]
    pub facing: bool,
    #[prost(bool, tag = "8")]
    pub invulnerable: bool,
    #[prost(uint32, tag = "9")]
    pub jumps_left: u32,
    #[prost(bool, tag = "10")]
    pub on_ground: bool,
    #[prost(float, tag = "11")]
    pub shield_strength: f32,
    #[prost(float, tag = "12")]
    pub position_x: f32,
    #[prost(float, tag = "13")]
    pub position_y: f32,
    #[prost(message, optional, tag = "14")]
    pub controller: Option<ControllerRecord>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ControllerRecord {
    #[prost(float, tag = "1")]
    pub main_x: f32,
    #[prost(float, tag = "2")]
    pub main_y: f32,
    #[prost(float, tag = "3")]
    pub c_x: f32,
    #[prost(float, tag = "4")]
    pub c_y: f32,
    #[prost(float, tag = "5")]
    pub shoulder: f32,
    #[prost(uint32, tag = "6")]
    pub buttons: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum CommandKind {
    Plug = 0,
    Input = 1,
    Menu = 2,
    Release = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum MenuActionKind {
    EnterVersus = 0,
    ChooseCharacter = 1,
    ChooseStage = 2,
    SkipPostgame = 3,
}

#[derive(Clone, PartialEq, Message)]
pub struct CommandRecord {
    #[prost(uint32, tag = "1")]
    pub port: u32,
    #[prost(enumeration = "CommandKind", tag = "2")]
    pub kind: i32,
    #[prost(message, optional, tag = "3")]
    pub controller: Option<ControllerRecord>,
    #[prost(message, optional, tag = "4")]
    pub menu: Option<MenuRecord>,
}

#[derive(Clone, PartialEq, Message)]
pub struct MenuRecord {
    #[prost(enumeration = "MenuActionKind", tag = "1")]
    pub action: i32,
    #[prost(uint32, tag = "2")]
    pub character: u32,
    #[prost(uint32, tag = "3")]
    pub stage: u32,
    #[prost(uint32, tag = "4")]
    pub cpu_level: u32,
    #[prost(uint32, tag = "5")]
    pub costume: u32,
    #[prost(bool, tag = "6")]
    pub start: bool,
}

/// One line of the per-frame diagnostic log.
#[derive(Clone, PartialEq, Message)]
pub struct LogRecord {
    #[prost(message, optional, tag = "1")]
    pub frame: Option<FrameRecord>,
    #[prost(message, optional, tag = "2")]
    pub decision: Option<DecisionRecord>,
    #[prost(uint64, tag = "3")]
    pub step_latency_us: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct DecisionRecord {
    #[prost(float, tag = "1")]
    pub main_x: f32,
    #[prost(float, tag = "2")]
    pub main_y: f32,
    #[prost(float, tag = "3")]
    pub c_x: f32,
    #[prost(float, tag = "4")]
    pub c_y: f32,
    #[prost(float, optional, tag = "5")]
    pub shoulder: Option<f32>,
    /// Button category index, `NoButton` last.
    #[prost(uint32, tag = "6")]
    pub button: u32,
}

impl From<&ControllerState> for ControllerRecord {
    fn from(state: &ControllerState) -> Self {
        Self {
            main_x: state.main_stick.x,
            main_y: state.main_stick.y,
            c_x: state.c_stick.x,
            c_y: state.c_stick.y,
            shoulder: state.shoulder,
            buttons: state.buttons.bits(),
        }
    }
}

impl From<&ControllerRecord> for ControllerState {
    fn from(record: &ControllerRecord) -> Self {
        Self {
            main_stick: StickPosition::new(record.main_x, record.main_y),
            c_stick: StickPosition::new(record.c_x, record.c_y),
            shoulder: record.shoulder,
            buttons: RawButtons::from_bits(record.buttons),
        }
    }
}

impl From<&ControllerDecision> for DecisionRecord {
    fn from(decision: &ControllerDecision) -> Self {
        Self {
            main_x: decision.main_stick.x,
            main_y: decision.main_stick.y,
            c_x: decision.c_stick.x,
            c_y: decision.c_stick.y,
            shoulder: decision.shoulder,
            button: decision.button.index() as u32,
        }
    }
}

impl From<&Frame> for FrameRecord {
    fn from(frame: &Frame) -> Self {
        let players = [Player::P1, Player::P2]
            .into_iter()
            .map(|player| {
                let state = frame.player(player);
                PlayerRecord {
                    port: player.port(),
                    character: state.character.id(),
                    action: state.action,
                    action_frame: state.action_frame,
                    percent: state.percent,
                    stock: state.stock,
                    facing: state.facing,
                    invulnerable: state.invulnerable,
                    jumps_left: state.jumps_left,
                    on_ground: state.on_ground,
                    shield_strength: state.shield_strength,
                    position_x: state.position_x,
                    position_y: state.position_y,
                    controller: Some(ControllerRecord::from(&state.controller)),
                }
            })
            .collect();

        Self {
            index: frame.index,
            menu: frame.menu.id(),
            stage: frame.stage.id(),
            players,
            pending: false,
        }
    }
}

impl TryFrom<FrameRecord> for Frame {
    type Error = BridgeError;

    fn try_from(record: FrameRecord) -> Result<Self, Self::Error> {
        let mut frame = Frame::new(record.index, Menu::from_id(record.menu));
        frame.stage = Stage::from_id(record.stage);

        for player in record.players {
            let Some(slot) = Player::from_port(player.port) else {
                return Err(BridgeError::MalformedFrame(format!(
                    "unexpected port {}",
                    player.port
                )));
            };
            *frame.player_mut(slot) = PlayerFrame {
                character: Character::from_id(player.character),
                action: player.action,
                action_frame: player.action_frame,
                percent: player.percent,
                stock: player.stock,
                facing: player.facing,
                invulnerable: player.invulnerable,
                jumps_left: player.jumps_left,
                on_ground: player.on_ground,
                shield_strength: player.shield_strength,
                position_x: player.position_x,
                position_y: player.position_y,
                controller: player
                    .controller
                    .as_ref()
                    .map(ControllerState::from)
                    .unwrap_or_default(),
            };
        }

        Ok(frame)
    }
}

/// Write `message` with a varint length prefix.
pub fn write_delimited<T: Message, W: Write>(writer: &mut W, message: &T) -> io::Result<()> {
    let mut buf = Vec::new();
    message.encode(&mut buf)?;

    let mut varint_buf = BytesMut::new();
    prost::encode_length_delimiter(buf.len(), &mut varint_buf)?;

    writer.write_all(&varint_buf)?;
    writer.write_all(&buf)?;
    Ok(())
}

/// Largest record `read_delimited` accepts. Anything bigger is a corrupt prefix.
pub const MAX_RECORD_LEN: u64 = 4 * 1024 * 1024;

/// Read one length-prefixed message. A clean end of stream before the prefix gives `None`.
pub fn read_delimited<T: Message + Default, R: Read>(reader: &mut R) -> io::Result<Option<T>> {
    let mut len: u64 = 0;
    let mut shift = 0;
    let mut byte = [0u8; 1];

    loop {
        if reader.read(&mut byte)? == 0 {
            if shift == 0 {
                return Ok(None);
            }
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        len |= u64::from(byte[0] & 0x7F) << shift;
        if byte[0] & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift >= 64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "length prefix too long",
            ));
        }
    }

    if len > MAX_RECORD_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("record of {} bytes exceeds the {} byte limit", len, MAX_RECORD_LEN),
        ));
    }

    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    T::decode(buf.as_slice())
        .map(Some)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{Button, ButtonCategory};
    use crate::state::PhysicalButton;

    #[test]
    fn test_frame_survives_the_wire() {
        let mut frame = Frame::new(-123, Menu::InGame);
        frame.stage = Stage::Dreamland;
        let p2 = frame.player_mut(Player::P2);
        p2.character = Character::Sheik;
        p2.percent = 37.5;
        p2.controller.buttons = RawButtons::default().with(PhysicalButton::Z);

        let mut wire = Vec::new();
        write_delimited(&mut wire, &FrameRecord::from(&frame)).unwrap();
        write_delimited(&mut wire, &FrameRecord::from(&frame)).unwrap();

        let mut reader = wire.as_slice();
        for _ in 0..2 {
            let record: FrameRecord = read_delimited(&mut reader).unwrap().unwrap();
            assert_eq!(Frame::try_from(record).unwrap(), frame);
        }
        assert!(read_delimited::<FrameRecord, _>(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_truncated_record_is_an_error() {
        let mut wire = Vec::new();
        let record = DecisionRecord::from(&ControllerDecision {
            button: ButtonCategory::Pressed(Button::Z),
            ..ControllerDecision::neutral()
        });
        write_delimited(&mut wire, &record).unwrap();
        wire.pop();

        let mut reader = wire.as_slice();
        assert!(read_delimited::<DecisionRecord, _>(&mut reader).is_err());
    }

    #[test]
    fn test_oversized_length_prefix_is_rejected() {
        let garbage = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f, 0x00];
        let mut reader = garbage.as_slice();
        let err = read_delimited::<FrameRecord, _>(&mut reader).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let mut wire = Vec::new();
        prost::encode_length_delimiter(MAX_RECORD_LEN as usize + 1, &mut wire).unwrap();
        let mut reader = wire.as_slice();
        let err = read_delimited::<FrameRecord, _>(&mut reader).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_unknown_port_is_malformed() {
        let record = FrameRecord {
            players: vec![PlayerRecord {
                port: 4,
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(matches!(
            Frame::try_from(record),
            Err(BridgeError::MalformedFrame(_))
        ));
    }
}

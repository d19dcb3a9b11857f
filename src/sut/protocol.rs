use crate::error::{Result, XrayError};
use crate::state::{Breakpoint, BreakpointKind, Registers, SutContext};
use serde::Deserialize;
use std::fmt;

pub const ACTION_PREFIX: &str = "action/";

/// Outbound control commands. Encoded as `action/<name>[/<arg>...]` text
/// frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Step,
    Continue,
    Stop,
    SoftReset,
    HardReset,
    Refresh,
    InjectDemo,
    GetMemory { start: u16, length: u32 },
    ForceMemoryUpdate,
    SetMemory { address: u16, value: u8 },
    KeyEvent { pressed: bool, shift: bool, key: String },
    AddBreakpoint { kind: BreakpointKind, address: u16 },
    RemoveBreakpoint { id: i64 },
    ClearBreakpoints,
}

impl Command {
    pub fn encode(&self) -> String {
        format!("{}{}", ACTION_PREFIX, self)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Step => write!(f, "step"),
            Command::Continue => write!(f, "continue"),
            Command::Stop => write!(f, "stop"),
            Command::SoftReset => write!(f, "soft_reset"),
            Command::HardReset => write!(f, "hard_reset"),
            Command::Refresh => write!(f, "refresh"),
            Command::InjectDemo => write!(f, "inject_demo"),
            Command::GetMemory { start, length } => write!(f, "get_memory/{}/{}", start, length),
            Command::ForceMemoryUpdate => write!(f, "get_memory/force_update"),
            Command::SetMemory { address, value } => {
                write!(f, "set_memory/{}/{}", address, value)
            }
            Command::KeyEvent {
                pressed,
                shift,
                key,
            } => write!(
                f,
                "key_event/{}/{}/{}",
                u8::from(*pressed),
                u8::from(*shift),
                key
            ),
            Command::AddBreakpoint { kind, address } => {
                write!(f, "add_breakpoint/{}/{}", kind.command_name(), address)
            }
            Command::RemoveBreakpoint { id } => write!(f, "remove_breakpoint/{}", id),
            Command::ClearBreakpoints => write!(f, "clear_breakpoints"),
        }
    }
}

/// The structured part of an inbound frame. Any subset of the three keys may
/// be present.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct StateUpdate {
    #[serde(default)]
    pub context: Option<SutContext>,
    #[serde(default)]
    pub breakpoints: Option<Vec<Breakpoint>>,
    #[serde(default)]
    pub registers: Option<Registers>,
}

impl StateUpdate {
    pub fn is_empty(&self) -> bool {
        self.context.is_none() && self.breakpoints.is_none() && self.registers.is_none()
    }
}

/// One inbound frame, classified once at the channel boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Text frame: context, breakpoints and/or registers.
    Update(StateUpdate),
    /// Binary frame: `[start_hi, start_lo, byte...]`.
    MemoryBlock(Vec<u8>),
}

impl InboundFrame {
    pub fn from_text(text: &str) -> Result<Self> {
        let update = serde_json::from_str::<StateUpdate>(text).map_err(XrayError::MalformedFrame)?;
        Ok(InboundFrame::Update(update))
    }

    pub fn from_binary(bytes: Vec<u8>) -> Self {
        InboundFrame::MemoryBlock(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_encoding() {
        let cases = [
            (Command::Step, "action/step"),
            (Command::Continue, "action/continue"),
            (Command::Stop, "action/stop"),
            (Command::SoftReset, "action/soft_reset"),
            (Command::HardReset, "action/hard_reset"),
            (Command::Refresh, "action/refresh"),
            (Command::InjectDemo, "action/inject_demo"),
            (
                Command::GetMemory {
                    start: 0,
                    length: 65536,
                },
                "action/get_memory/0/65536",
            ),
            (Command::ForceMemoryUpdate, "action/get_memory/force_update"),
            (
                Command::SetMemory {
                    address: 0x3C00,
                    value: 0x41,
                },
                "action/set_memory/15360/65",
            ),
            (
                Command::KeyEvent {
                    pressed: true,
                    shift: false,
                    key: "a".to_string(),
                },
                "action/key_event/1/0/a",
            ),
            (
                Command::AddBreakpoint {
                    kind: BreakpointKind::IoWatch,
                    address: 255,
                },
                "action/add_breakpoint/io/255",
            ),
            (
                Command::RemoveBreakpoint { id: 3 },
                "action/remove_breakpoint/3",
            ),
            (Command::ClearBreakpoints, "action/clear_breakpoints"),
        ];
        for (cmd, expected) in cases {
            assert_eq!(cmd.encode(), expected);
        }
    }

    #[test]
    fn test_frame_with_all_keys() {
        let text = r#"{"context":{"system_name":"sdlTRS","model":3,"running":true,"alt_single_step_mode":false},
            "breakpoints":[{"id":0,"address":4656,"type":0}],
            "registers":{"pc":2,"sp":65535,"af":68}}"#;
        let InboundFrame::Update(update) = InboundFrame::from_text(text).unwrap() else {
            panic!("expected structured frame");
        };
        assert!(update.context.unwrap().running);
        assert_eq!(update.breakpoints.unwrap().len(), 1);
        assert_eq!(update.registers.unwrap().pc, 2);
    }

    #[test]
    fn test_frame_with_subset_of_keys() {
        let InboundFrame::Update(update) =
            InboundFrame::from_text(r#"{"breakpoints":[]}"#).unwrap()
        else {
            panic!("expected structured frame");
        };
        assert!(update.context.is_none());
        assert!(update.registers.is_none());
        assert_eq!(update.breakpoints, Some(vec![]));
    }

    #[test]
    fn test_malformed_frame_fails_decode() {
        assert!(matches!(
            InboundFrame::from_text("{not json"),
            Err(XrayError::MalformedFrame(_))
        ));
        assert!(matches!(
            InboundFrame::from_text(r#"{"breakpoints":[{"id":0,"address":1,"type":9}]}"#),
            Err(XrayError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_binary_frame_is_memory_block() {
        assert_eq!(
            InboundFrame::from_binary(vec![0, 0, 1]),
            InboundFrame::MemoryBlock(vec![0, 0, 1])
        );
    }
}

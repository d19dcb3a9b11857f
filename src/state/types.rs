use serde::{Deserialize, Serialize};

/// Context about the system under test (SUT). Replaced wholesale on every
/// context message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SutContext {
    pub system_name: String,
    pub model: i64,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub alt_single_step_mode: bool,
}

/// Breakpoint type codes. The ordinals are the SUT's encoding and must not
/// be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BreakpointKind {
    ProgramCounter,
    MemoryWatch,
    IoWatch,
}

impl BreakpointKind {
    pub fn all() -> &'static [BreakpointKind] {
        &[
            BreakpointKind::ProgramCounter,
            BreakpointKind::MemoryWatch,
            BreakpointKind::IoWatch,
        ]
    }

    /// Path segment used by `add_breakpoint/<kind>/<address>`.
    pub fn command_name(self) -> &'static str {
        match self {
            BreakpointKind::ProgramCounter => "pc",
            BreakpointKind::MemoryWatch => "memory",
            BreakpointKind::IoWatch => "io",
        }
    }
}

impl TryFrom<u8> for BreakpointKind {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(BreakpointKind::ProgramCounter),
            1 => Ok(BreakpointKind::MemoryWatch),
            2 => Ok(BreakpointKind::IoWatch),
            other => Err(format!("unknown breakpoint type code {}", other)),
        }
    }
}

impl From<BreakpointKind> for u8 {
    fn from(kind: BreakpointKind) -> u8 {
        match kind {
            BreakpointKind::ProgramCounter => 0,
            BreakpointKind::MemoryWatch => 1,
            BreakpointKind::IoWatch => 2,
        }
    }
}

impl std::fmt::Display for BreakpointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakpointKind::ProgramCounter => write!(f, "Program Counter"),
            BreakpointKind::MemoryWatch => write!(f, "Memory Watch"),
            BreakpointKind::IoWatch => write!(f, "IO Watch"),
        }
    }
}

/// A breakpoint as reported by the SUT. `id` is assigned by the SUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub id: i64,
    pub address: u16,
    #[serde(rename = "type")]
    pub kind: BreakpointKind,
}

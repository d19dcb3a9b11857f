//! Line-oriented front end. Each stdin line is parsed with clap as if it
//! were a command line of its own.

use crate::cpu::Instruction;
use crate::disassembler::Disassembler;
use crate::session::{Notification, Session};
use crate::state::{BreakpointKind, BreakpointRegistry, MemoryImage, Registers};
use crate::sut::connection::{Connector, LinkHealth};
use crate::utils::{hexdump_line, parse_address_fields};
use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(no_binary_name = true, name = "", disable_version_flag = true)]
struct ConsoleLine {
    #[command(subcommand)]
    command: ConsoleCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Execute one instruction.
    Step,
    /// Resume execution.
    Continue,
    /// Halt execution.
    Stop,
    /// Reset the SUT.
    Reset {
        #[arg(long)]
        hard: bool,
    },
    /// Re-request all state from the SUT.
    Refresh,
    /// Load the SUT's demo program.
    Demo,
    /// Feed a canned state frame through the session.
    Testdata,
    /// Select the byte at HI LO (two hex digits each).
    Select { hi: String, lo: String },
    /// Write VALUE (hex) to the selected byte.
    Poke { value: String },
    /// Add a breakpoint at HI LO.
    Break {
        #[arg(value_enum)]
        kind: BreakKind,
        hi: String,
        lo: String,
    },
    /// Remove breakpoint ID.
    Remove { id: i64 },
    /// Send a key event to the SUT.
    Key {
        #[arg(value_enum)]
        direction: KeyDirection,
        #[arg(long)]
        shift: bool,
        key: String,
    },
    /// Toggle between full memory and video RAM refreshes.
    MemoryPolicy,
    /// Widen the memory view grouping.
    Wider,
    /// Narrow the memory view grouping.
    Narrower,
    /// Import a trs80gp dump.
    Import { path: PathBuf },
    Regs,
    Bps,
    Dis,
    /// Dump COUNT bytes from HI LO.
    Peek {
        hi: String,
        lo: String,
        #[arg(default_value_t = 64)]
        count: usize,
    },
    Quit,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakKind {
    Pc,
    Memory,
    Io,
}

impl From<BreakKind> for BreakpointKind {
    fn from(kind: BreakKind) -> Self {
        match kind {
            BreakKind::Pc => BreakpointKind::ProgramCounter,
            BreakKind::Memory => BreakpointKind::MemoryWatch,
            BreakKind::Io => BreakpointKind::IoWatch,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Down,
    Up,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Done,
    Print(String),
    Quit,
}

/// Parses one input line. Blank lines give `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, clap::Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }
    ConsoleLine::try_parse_from(words).map(|parsed| Some(parsed.command))
}

pub fn execute<C: Connector, D: Disassembler>(
    session: &mut Session<C, D>,
    command: ConsoleCommand,
) -> anyhow::Result<Reply> {
    match command {
        ConsoleCommand::Step => session.step(),
        ConsoleCommand::Continue => session.continue_execution(),
        ConsoleCommand::Stop => session.stop(),
        ConsoleCommand::Reset { hard: true } => session.hard_reset(),
        ConsoleCommand::Reset { hard: false } => session.soft_reset(),
        ConsoleCommand::Refresh => session.force_refresh(),
        ConsoleCommand::Demo => session.inject_demo(),
        ConsoleCommand::Testdata => session.insert_test_data()?,
        ConsoleCommand::Select { hi, lo } => {
            let address = session.select_from_fields(&hi, &lo)?;
            let value = session.memory().read(address);
            return Ok(Reply::Print(format!("${:04X} = ${:02X}", address, value)));
        }
        ConsoleCommand::Poke { value } => session.write_selected(&value)?,
        ConsoleCommand::Break { kind, hi, lo } => {
            session.add_breakpoint_from_fields(kind.into(), &hi, &lo)?;
        }
        ConsoleCommand::Remove { id } => session.remove_breakpoint(id),
        ConsoleCommand::Key {
            direction,
            shift,
            key,
        } => session.send_key(direction == KeyDirection::Down, shift, &key),
        ConsoleCommand::MemoryPolicy => {
            let full = session.toggle_full_memory_update();
            return Ok(Reply::Print(
                if full {
                    "Memory refresh: full address space"
                } else {
                    "Memory refresh: video RAM only"
                }
                .to_string(),
            ));
        }
        ConsoleCommand::Wider => session.increase_byte_size(),
        ConsoleCommand::Narrower => session.decrease_byte_size(),
        ConsoleCommand::Import { path } => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Unable to read {}", path.display()))?;
            session.import_trs80gp(&content)?;
            return Ok(Reply::Print(format!("Imported {}", path.display())));
        }
        ConsoleCommand::Regs => return Ok(Reply::Print(format_registers(session.registers()))),
        ConsoleCommand::Bps => {
            return Ok(Reply::Print(format_breakpoints(session.breakpoints())));
        }
        ConsoleCommand::Dis => {
            return Ok(Reply::Print(format_disassembly(
                session.disassembly(),
                session.registers().pc,
            )));
        }
        ConsoleCommand::Peek { hi, lo, count } => {
            let start = parse_address_fields(&hi, &lo)?;
            return Ok(Reply::Print(format_memory(session.memory(), start, count)));
        }
        ConsoleCommand::Quit => return Ok(Reply::Quit),
    }
    Ok(Reply::Done)
}

pub fn format_registers(regs: &Registers) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "PC={:04X} SP={:04X} IX={:04X} IY={:04X}\n",
        regs.pc, regs.sp, regs.ix, regs.iy
    ));
    out.push_str(&format!(
        "AF={:04X} BC={:04X} DE={:04X} HL={:04X}  {}\n",
        regs.af,
        regs.bc,
        regs.de,
        regs.hl,
        regs.flags().to_letters()
    ));
    out.push_str(&format!(
        "AF'={:04X} BC'={:04X} DE'={:04X} HL'={:04X} {}\n",
        regs.af_alt,
        regs.bc_alt,
        regs.de_alt,
        regs.hl_alt,
        regs.alt_flags().to_letters()
    ));
    out.push_str(&format!(
        "I={:02X} R={:02X}{:02X} IFF1={} IFF2={} IM={} T={} {:.2}MHz",
        regs.i,
        regs.r2,
        regs.r1,
        regs.iff1,
        regs.iff2,
        regs.interrupt_mode,
        regs.t_states,
        regs.clock_speed
    ));
    out
}

pub fn format_breakpoints(registry: &BreakpointRegistry) -> String {
    if registry.entries().is_empty() {
        return "No breakpoints".to_string();
    }
    registry
        .entries()
        .iter()
        .map(|entry| {
            let bp = entry.breakpoint;
            format!(
                "#{:<3} ${:04X}  {}{}",
                bp.id,
                bp.address,
                bp.kind,
                if entry.synthetic { "  (step)" } else { "" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_disassembly(listing: &[Instruction], pc: u16) -> String {
    listing
        .iter()
        .map(|insn| {
            let bytes = insn
                .bytes
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" ");
            let marker = if insn.address == pc { '>' } else { ' ' };
            format!("{} ${:04X}  {:<12} {}", marker, insn.address, bytes, insn.flow)
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Hexdump rows of 16 bytes, grouped by the view's byte size. Changed bytes
/// are starred.
pub fn format_memory(memory: &MemoryImage, start: u16, count: usize) -> String {
    let group = memory.byte_size();
    let bytes = memory.window(start, count);
    let changed = &memory.changed_map()[start as usize..start as usize + bytes.len()];
    bytes
        .chunks(16)
        .zip(changed.chunks(16))
        .enumerate()
        .map(|(row, (chunk, marks))| {
            hexdump_line(start.wrapping_add((row * 16) as u16), chunk, marks, group)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One status line per notification, or nothing for the noisy ones.
pub fn describe(notification: &Notification) -> Option<String> {
    match notification {
        Notification::HealthChanged(LinkHealth::Healthy) => Some("[connected]".to_string()),
        Notification::HealthChanged(LinkHealth::Degraded) => {
            Some("[disconnected, retrying]".to_string())
        }
        Notification::BreakpointsChanged => Some("[breakpoints updated]".to_string()),
        Notification::MemoryUpdated { start, len, changed } => Some(format!(
            "[memory ${:04X}+{}: {} byte(s) changed]",
            start, len, changed
        )),
        Notification::SelectionChanged(None) => Some("[selection cleared]".to_string()),
        Notification::ContextChanged
        | Notification::RegistersChanged
        | Notification::DisassemblyUpdated
        | Notification::SelectionChanged(Some(_)) => None,
    }
}

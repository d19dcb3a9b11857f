//! Static Z80 instruction decoding: lengths and control flow.
//!
//! Only what is needed to walk instruction boundaries and enumerate the
//! possible successors of an instruction. Nothing here executes code.

use crate::state::{MemoryImage, Registers};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    NZ,
    Z,
    NC,
    C,
    PO,
    PE,
    P,
    M,
}

impl Condition {
    /// Condition encoded in bits 5-3 of the opcode.
    pub fn from_opcode(op: u8) -> Self {
        match (op >> 3) & 0x07 {
            0 => Condition::NZ,
            1 => Condition::Z,
            2 => Condition::NC,
            3 => Condition::C,
            4 => Condition::PO,
            5 => Condition::PE,
            6 => Condition::P,
            _ => Condition::M,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Condition::NZ => "NZ",
            Condition::Z => "Z",
            Condition::NC => "NC",
            Condition::C => "C",
            Condition::PO => "PO",
            Condition::PE => "PE",
            Condition::P => "P",
            Condition::M => "M",
        };
        write!(f, "{}", s)
    }
}

/// 16-bit register used by `JP (rr)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pointer {
    HL,
    IX,
    IY,
}

impl Pointer {
    fn value(self, registers: &Registers) -> u16 {
        match self {
            Pointer::HL => registers.hl,
            Pointer::IX => registers.ix,
            Pointer::IY => registers.iy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Falls through to the next instruction.
    Next,
    Jump(u16),
    JumpIf(Condition, u16),
    /// DJNZ: taken while B != 0 after decrement.
    Djnz(u16),
    Call(u16),
    CallIf(Condition, u16),
    /// RET, RETI, RETN: target is popped from the stack.
    Return,
    ReturnIf(Condition),
    Restart(u16),
    JumpIndirect(Pointer),
    /// LDIR and friends: re-executes itself until the counter runs out.
    Repeat,
    Halt,
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Next => Ok(()),
            Flow::Jump(t) => write!(f, "JP ${:04X}", t),
            Flow::JumpIf(cc, t) => write!(f, "JP {},${:04X}", cc, t),
            Flow::Djnz(t) => write!(f, "DJNZ ${:04X}", t),
            Flow::Call(t) => write!(f, "CALL ${:04X}", t),
            Flow::CallIf(cc, t) => write!(f, "CALL {},${:04X}", cc, t),
            Flow::Return => write!(f, "RET"),
            Flow::ReturnIf(cc) => write!(f, "RET {}", cc),
            Flow::Restart(t) => write!(f, "RST ${:02X}", t),
            Flow::JumpIndirect(p) => write!(f, "JP ({:?})", p),
            Flow::Repeat => write!(f, "(repeat)"),
            Flow::Halt => write!(f, "HALT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub address: u16,
    pub bytes: Vec<u8>,
    pub flow: Flow,
}

impl Instruction {
    pub fn len(&self) -> u16 {
        self.bytes.len() as u16
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Address right after this instruction.
    pub fn next_address(&self) -> u16 {
        self.address.wrapping_add(self.len())
    }

    /// Every address execution can continue at after this instruction,
    /// fall-through first, without duplicates. Interrupts are not
    /// considered.
    pub fn successors(&self, registers: &Registers, memory: &MemoryImage) -> Vec<u16> {
        let next = self.next_address();
        let pop = || memory.read_word(registers.sp);
        let candidates = match self.flow {
            Flow::Next | Flow::Halt => vec![next],
            Flow::Jump(t) | Flow::Call(t) | Flow::Restart(t) => vec![t],
            Flow::JumpIf(_, t) | Flow::CallIf(_, t) | Flow::Djnz(t) => vec![next, t],
            Flow::Return => vec![pop()],
            Flow::ReturnIf(_) => vec![next, pop()],
            Flow::JumpIndirect(p) => vec![p.value(registers)],
            Flow::Repeat => vec![self.address, next],
        };

        let mut unique = Vec::with_capacity(candidates.len());
        for addr in candidates {
            if !unique.contains(&addr) {
                unique.push(addr);
            }
        }
        unique
    }
}

/// Decodes the instruction at `address`. Every byte sequence decodes to
/// something; undefined opcodes behave as NOPs of their prefix length.
pub fn decode(memory: &MemoryImage, address: u16) -> Instruction {
    let read = |offset: u16| memory.read(address.wrapping_add(offset));
    let op = read(0);

    let (length, flow) = match op {
        0xCB => (2, Flow::Next),
        0xED => decode_ed(read(1)),
        0xDD | 0xFD => {
            let pointer = if op == 0xDD { Pointer::IX } else { Pointer::IY };
            decode_indexed(address, pointer, &read)
        }
        _ => decode_base(op, address, 0, Pointer::HL, &read),
    };

    let bytes = (0..length as u16).map(read).collect();
    Instruction {
        address,
        bytes,
        flow,
    }
}

/// Unprefixed opcode `op` located `prefix` bytes after `address`.
fn decode_base(
    op: u8,
    address: u16,
    prefix: u8,
    pointer: Pointer,
    read: &dyn Fn(u16) -> u8,
) -> (u8, Flow) {
    let at = prefix as u16;
    let length = prefix + base_length(op);
    let end = address.wrapping_add(length as u16);
    let word = || u16::from_le_bytes([read(at + 1), read(at + 2)]);
    let relative = || end.wrapping_add_signed(read(at + 1) as i8 as i16);

    let flow = match op {
        0xC3 => Flow::Jump(word()),
        0x18 => Flow::Jump(relative()),
        0x10 => Flow::Djnz(relative()),
        0xCD => Flow::Call(word()),
        0xC9 => Flow::Return,
        0xE9 => Flow::JumpIndirect(pointer),
        0x76 => Flow::Halt,
        // JR cc,e: only NZ/Z/NC/C
        op if op & 0xE7 == 0x20 => Flow::JumpIf(Condition::from_opcode(op & 0x1F), relative()),
        op if op & 0xC7 == 0xC2 => Flow::JumpIf(Condition::from_opcode(op), word()),
        op if op & 0xC7 == 0xC4 => Flow::CallIf(Condition::from_opcode(op), word()),
        op if op & 0xC7 == 0xC0 => Flow::ReturnIf(Condition::from_opcode(op)),
        op if op & 0xC7 == 0xC7 => Flow::Restart((op & 0x38) as u16),
        _ => Flow::Next,
    };
    (length, flow)
}

fn base_length(op: u8) -> u8 {
    match op {
        0xCB => 2,
        0x10 | 0x18 | 0x20 | 0x28 | 0x30 | 0x38 => 2,
        0xD3 | 0xDB => 2,
        0x22 | 0x2A | 0x32 | 0x3A => 3,
        0xC3 | 0xCD => 3,
        // LD r,n and LD (HL),n
        op if op & 0xC7 == 0x06 => 2,
        // ALU A,n
        op if op & 0xC7 == 0xC6 => 2,
        // LD rr,nn
        op if op & 0xCF == 0x01 => 3,
        // JP cc,nn / CALL cc,nn
        op if op & 0xC7 == 0xC2 || op & 0xC7 == 0xC4 => 3,
        _ => 1,
    }
}

fn decode_ed(op: u8) -> (u8, Flow) {
    match op {
        // LD (nn),rr / LD rr,(nn)
        op if op & 0xC7 == 0x43 => (4, Flow::Next),
        // RETN / RETI
        op if op & 0xC7 == 0x45 => (2, Flow::Return),
        // LDIR CPIR INIR OTIR / LDDR CPDR INDR OTDR
        0xB0..=0xB3 | 0xB8..=0xBB => (2, Flow::Repeat),
        _ => (2, Flow::Next),
    }
}

fn decode_indexed(address: u16, pointer: Pointer, read: &dyn Fn(u16) -> u8) -> (u8, Flow) {
    let op = read(1);
    match op {
        // Another prefix follows: this one acts as a NOP.
        0xDD | 0xFD | 0xED => (1, Flow::Next),
        // DD CB d op
        0xCB => (4, Flow::Next),
        op if uses_displacement(op) => (2 + base_length(op), Flow::Next),
        op => decode_base(op, address, 1, pointer, read),
    }
}

/// Opcodes whose `(HL)` operand becomes `(IX+d)` / `(IY+d)` under a prefix.
fn uses_displacement(op: u8) -> bool {
    match op {
        0x34..=0x36 => true,
        0x76 => false,
        0x40..=0x7F => op & 0x07 == 0x06 || op & 0x38 == 0x30,
        0x80..=0xBF => op & 0x07 == 0x06,
        _ => false,
    }
}

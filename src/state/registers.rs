use serde::{Deserialize, Serialize};

pub const CARRY_MASK: u16 = 0x01;
pub const SUBTRACT_MASK: u16 = 0x02;
pub const OVERFLOW_MASK: u16 = 0x04;
pub const UNDOC3_MASK: u16 = 0x08;
pub const HALF_CARRY_MASK: u16 = 0x10;
pub const UNDOC5_MASK: u16 = 0x20;
pub const ZERO_MASK: u16 = 0x40;
pub const SIGN_MASK: u16 = 0x80;

/// Last known Z80 register file of the SUT. Field names follow the wire
/// format; the whole set is replaced on every register message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Registers {
    pub af: u16,
    pub bc: u16,
    pub de: u16,
    pub hl: u16,
    #[serde(rename = "af_prime")]
    pub af_alt: u16,
    #[serde(rename = "bc_prime")]
    pub bc_alt: u16,
    #[serde(rename = "de_prime")]
    pub de_alt: u16,
    #[serde(rename = "hl_prime")]
    pub hl_alt: u16,
    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,
    pub i: u8,
    /// Refresh register, low half (bits 0-6 as counted by the CPU).
    #[serde(rename = "r_1")]
    pub r1: u8,
    /// Refresh register, high half (bit 7 as last loaded).
    #[serde(rename = "r_2")]
    pub r2: u8,
    #[serde(rename = "z80_iff1")]
    pub iff1: u8,
    #[serde(rename = "z80_iff2")]
    pub iff2: u8,
    #[serde(rename = "z80_interrupt_mode")]
    pub interrupt_mode: u8,
    #[serde(rename = "z80_t_state_counter")]
    pub t_states: u64,
    #[serde(rename = "z80_clockspeed")]
    pub clock_speed: f32,
}

/// Flag bits of the F register. Always derived from `af`, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
    pub sign: bool,
    pub zero: bool,
    pub undoc5: bool,
    pub half_carry: bool,
    pub undoc3: bool,
    pub overflow: bool,
    pub subtract: bool,
    pub carry: bool,
}

impl Flags {
    pub fn from_af(af: u16) -> Self {
        Self {
            sign: af & SIGN_MASK != 0,
            zero: af & ZERO_MASK != 0,
            undoc5: af & UNDOC5_MASK != 0,
            half_carry: af & HALF_CARRY_MASK != 0,
            undoc3: af & UNDOC3_MASK != 0,
            overflow: af & OVERFLOW_MASK != 0,
            subtract: af & SUBTRACT_MASK != 0,
            carry: af & CARRY_MASK != 0,
        }
    }

    /// `SZ5H3PNC`, with '.' for clear bits.
    pub fn to_letters(self) -> String {
        let bits = [
            (self.sign, 'S'),
            (self.zero, 'Z'),
            (self.undoc5, '5'),
            (self.half_carry, 'H'),
            (self.undoc3, '3'),
            (self.overflow, 'P'),
            (self.subtract, 'N'),
            (self.carry, 'C'),
        ];
        bits.iter()
            .map(|&(set, c)| if set { c } else { '.' })
            .collect()
    }
}

impl Registers {
    pub fn flags(&self) -> Flags {
        Flags::from_af(self.af)
    }

    pub fn alt_flags(&self) -> Flags {
        Flags::from_af(self.af_alt)
    }

    pub fn a(&self) -> u8 {
        hi(self.af)
    }

    pub fn f(&self) -> u8 {
        lo(self.af)
    }

    pub fn b(&self) -> u8 {
        hi(self.bc)
    }

    pub fn c(&self) -> u8 {
        lo(self.bc)
    }

    pub fn d(&self) -> u8 {
        hi(self.de)
    }

    pub fn e(&self) -> u8 {
        lo(self.de)
    }

    pub fn h(&self) -> u8 {
        hi(self.hl)
    }

    pub fn l(&self) -> u8 {
        lo(self.hl)
    }
}

pub fn hi(word: u16) -> u8 {
    (word >> 8) as u8
}

pub fn lo(word: u16) -> u8 {
    (word & 0x00FF) as u8
}

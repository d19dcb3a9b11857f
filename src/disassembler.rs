use crate::cpu::{Instruction, decode};
use crate::state::{MemoryImage, Registers};

/// Static disassembly over the mirrored memory image. The session only
/// talks to this trait, so a richer decoder can be plugged in.
pub trait Disassembler {
    /// Up to `count` consecutive instructions starting at `start`.
    fn disassemble(&self, memory: &MemoryImage, start: u16, count: usize) -> Vec<Instruction>;

    /// Every PC the instruction at `registers.pc` can continue at. Never
    /// empty.
    fn predict_next_pc(&self, memory: &MemoryImage, registers: &Registers) -> Vec<u16>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Z80Disassembler;

impl Z80Disassembler {
    pub fn new() -> Self {
        Self
    }
}

impl Disassembler for Z80Disassembler {
    fn disassemble(&self, memory: &MemoryImage, start: u16, count: usize) -> Vec<Instruction> {
        let mut lines = Vec::with_capacity(count);
        let mut pc = start;
        for _ in 0..count {
            let insn = decode(memory, pc);
            pc = insn.next_address();
            let wrapped = pc <= insn.address;
            lines.push(insn);
            if wrapped {
                break;
            }
        }
        lines
    }

    fn predict_next_pc(&self, memory: &MemoryImage, registers: &Registers) -> Vec<u16> {
        decode(memory, registers.pc).successors(registers, memory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::make_block;

    #[test]
    fn test_disassemble_walks_instruction_boundaries() {
        let mut mem = MemoryImage::new();
        // LD A,5 / LD HL,$3C00 / LD (HL),A / JR -7
        mem.apply_update(&make_block(
            0x4000,
            &[0x3E, 0x05, 0x21, 0x00, 0x3C, 0x77, 0x18, 0xF9],
        ));
        let lines = Z80Disassembler::new().disassemble(&mem, 0x4000, 4);
        let addrs: Vec<u16> = lines.iter().map(|l| l.address).collect();
        assert_eq!(addrs, vec![0x4000, 0x4002, 0x4005, 0x4006]);
        assert_eq!(lines[3].flow, crate::cpu::Flow::Jump(0x4001));
    }

    #[test]
    fn test_disassemble_stops_at_wrap() {
        let mem = MemoryImage::new();
        let lines = Z80Disassembler::new().disassemble(&mem, 0xFFFE, 10);
        let addrs: Vec<u16> = lines.iter().map(|l| l.address).collect();
        assert_eq!(addrs, vec![0xFFFE, 0xFFFF]);
    }

    #[test]
    fn test_predict_from_pc() {
        let mut mem = MemoryImage::new();
        mem.apply_update(&make_block(0x0002, &[0x20, 0x03]));
        let regs = Registers {
            pc: 0x0002,
            ..Default::default()
        };
        assert_eq!(
            Z80Disassembler::new().predict_next_pc(&mem, &regs),
            vec![0x0004, 0x0007]
        );
    }
}

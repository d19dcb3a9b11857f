use trs_xray::cpu::{Condition, Flow, decode};
use trs_xray::disassembler::{Disassembler, Z80Disassembler};
use trs_xray::state::{MemoryImage, Registers, make_block};

fn memory_with(at: u16, code: &[u8]) -> MemoryImage {
    let mut mem = MemoryImage::new();
    mem.apply_update(&make_block(at, code));
    mem
}

// =============================================================================
// CONDITION ENCODING
// =============================================================================

#[test]
fn test_all_absolute_conditions() {
    let expected = [
        (0xC2, Condition::NZ),
        (0xCA, Condition::Z),
        (0xD2, Condition::NC),
        (0xDA, Condition::C),
        (0xE2, Condition::PO),
        (0xEA, Condition::PE),
        (0xF2, Condition::P),
        (0xFA, Condition::M),
    ];
    for (op, cc) in expected {
        let mem = memory_with(0x8000, &[op, 0x00, 0x90]);
        assert_eq!(
            decode(&mem, 0x8000).flow,
            Flow::JumpIf(cc, 0x9000),
            "opcode {:02X}",
            op
        );
    }
}

#[test]
fn test_conditional_returns_and_calls_share_encoding() {
    for (i, cc) in [
        Condition::NZ,
        Condition::Z,
        Condition::NC,
        Condition::C,
        Condition::PO,
        Condition::PE,
        Condition::P,
        Condition::M,
    ]
    .into_iter()
    .enumerate()
    {
        let ret = 0xC0 | ((i as u8) << 3);
        let call = 0xC4 | ((i as u8) << 3);
        let mem = memory_with(0, &[ret, call, 0x34, 0x12]);
        assert_eq!(decode(&mem, 0).flow, Flow::ReturnIf(cc));
        assert_eq!(decode(&mem, 1).flow, Flow::CallIf(cc, 0x1234));
    }
}

// =============================================================================
// RESTARTS
// =============================================================================

#[test]
fn test_every_restart_vector() {
    for vector in (0x00..=0x38).step_by(8) {
        let op = 0xC7 | vector as u8;
        let mem = memory_with(0x4000, &[op]);
        let insn = decode(&mem, 0x4000);
        assert_eq!(insn.len(), 1);
        assert_eq!(insn.flow, Flow::Restart(vector));
        assert_eq!(
            insn.successors(&Registers::default(), &mem),
            vec![vector]
        );
    }
}

// =============================================================================
// PREDICTION OVER REAL CODE
// =============================================================================

// A typical ROM entry: DI / XOR A / JP $0674
const ROM_START: [u8; 5] = [0xF3, 0xAF, 0xC3, 0x74, 0x06];

#[test]
fn test_predict_walks_rom_entry() {
    let mem = memory_with(0, &ROM_START);
    let dis = Z80Disassembler::new();
    let mut regs = Registers::default();

    regs.pc = 0;
    assert_eq!(dis.predict_next_pc(&mem, &regs), vec![1]);
    regs.pc = 1;
    assert_eq!(dis.predict_next_pc(&mem, &regs), vec![2]);
    regs.pc = 2;
    assert_eq!(dis.predict_next_pc(&mem, &regs), vec![0x0674]);
}

#[test]
fn test_prediction_is_never_empty() {
    let mut mem = MemoryImage::new();
    let block: Vec<u8> = (0..=255).collect();
    mem.apply_update(&make_block(0x1000, &block));
    let dis = Z80Disassembler::new();
    for pc in 0x1000..0x1100u16 {
        let regs = Registers {
            pc,
            ..Default::default()
        };
        assert!(
            !dis.predict_next_pc(&mem, &regs).is_empty(),
            "no successor at {:04X}",
            pc
        );
    }
}

#[test]
fn test_disassembly_listing_has_no_gaps() {
    let mut mem = MemoryImage::new();
    let block: Vec<u8> = (0..=255).rev().collect();
    mem.apply_update(&make_block(0x2000, &block));
    let listing = Z80Disassembler::new().disassemble(&mem, 0x2000, 64);
    for pair in listing.windows(2) {
        assert_eq!(pair[0].next_address(), pair[1].address);
    }
}

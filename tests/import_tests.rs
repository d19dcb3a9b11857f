use std::cell::RefCell;
use std::rc::Rc;

use trs_xray::disassembler::Z80Disassembler;
use trs_xray::error::XrayError;
use trs_xray::parser::trs80gp::{IMPORT_SYSTEM_NAME, parse_trs80gp};
use trs_xray::session::{Notification, Session, SessionSettings};
use trs_xray::state::make_block;
use trs_xray::sut::{Channel, ChannelState, ConnectionManager, Connector, LivenessPolicy};

struct NullChannel;

impl Channel for NullChannel {
    fn state(&self) -> ChannelState {
        ChannelState::Closed
    }

    fn send_text(&self, _text: String) {}
}

struct NullConnector;

impl Connector for NullConnector {
    type Channel = NullChannel;

    fn open(&mut self) -> NullChannel {
        NullChannel
    }
}

const DUMP: &str = "{AF: 17408, AFp: 65535, BC: 1, BCp: 2, DE: 3, DEp: 4, HL: 15360, HLp: 5, \
    IX: 16384, IY: 16385, PC: 1, SP: 32768, I: 0, R: 7, IFF1: 0, IFF2: 0, \
    mem: [243, 175, 195, 21, 48]}";

fn session() -> Session<NullConnector, Z80Disassembler> {
    let connection = ConnectionManager::new(NullConnector, LivenessPolicy::default()).offline();
    Session::new(
        connection,
        Z80Disassembler::new(),
        SessionSettings::default(),
    )
}

#[test]
fn test_import_populates_session() {
    let mut s = session();
    s.import_trs80gp(DUMP).unwrap();

    assert_eq!(s.context().system_name, IMPORT_SYSTEM_NAME);
    assert!(!s.context().running);
    assert_eq!(s.registers().af, 0x4400);
    assert_eq!(s.registers().af_alt, 0xFFFF);
    assert_eq!(s.registers().hl, 0x3C00);
    assert_eq!(s.registers().pc, 1);
    assert_eq!(s.registers().sp, 0x8000);
    assert_eq!(s.memory().window(0, 5), &[243, 175, 195, 21, 48]);
    assert_eq!(s.memory().changed_count(), 0);
    assert_eq!(s.disassembly()[0].address, 1);
}

#[test]
fn test_import_failure_leaves_session_untouched() {
    let mut s = session();
    s.handle_binary_frame(make_block(0x3C00, &[0x48, 0x49]));
    s.handle_binary_frame(make_block(0x3C01, &[0x49, 0x4A, 0x4B]));
    s.handle_text_frame(
        r#"{"registers":{"pc":4660,"sp":65280,"af":17476,"bc":1,"de":2,"hl":15360,
            "af_prime":3,"bc_prime":4,"de_prime":5,"hl_prime":6,"ix":7,"iy":8,"i":9,
            "r_1":10,"r_2":11,"z80_iff1":1,"z80_iff2":1,"z80_interrupt_mode":2,
            "z80_t_state_counter":123456,"z80_clockspeed":2.03}}"#,
    )
    .unwrap();

    let registers = *s.registers();
    let bytes = s.memory().bytes().to_vec();
    let changed = s.memory().changed_map().to_vec();
    assert!(changed.iter().any(|c| *c));

    let notes = Rc::new(RefCell::new(Vec::<Notification>::new()));
    let sink = notes.clone();
    s.subscribe(move |n| sink.borrow_mut().push(n.clone()));

    let truncated = &DUMP[..DUMP.len() / 2];
    assert!(matches!(
        s.import_trs80gp(truncated),
        Err(XrayError::MalformedImport(_))
    ));
    assert_eq!(*s.registers(), registers);
    assert_eq!(s.memory().bytes(), bytes.as_slice());
    assert_eq!(s.memory().changed_map(), changed.as_slice());
    assert_eq!(s.context().system_name, "");
    assert!(notes.borrow().is_empty());
}

#[test]
fn test_import_accepts_quoted_keys() {
    let quoted = DUMP.replace("AF:", "\"AF\":").replace("mem:", "'mem':");
    let snap = parse_trs80gp(&quoted).unwrap();
    assert_eq!(snap.registers.af, 0x4400);
    assert_eq!(snap.registers.r1, 7);
}

#[test]
fn test_import_disassembles_from_imported_pc() {
    let mut s = session();
    s.import_trs80gp(DUMP).unwrap();
    // PC=1 is XOR A; the JP $3015 follows it.
    let listing = s.disassembly();
    assert_eq!(listing[1].address, 2);
    assert_eq!(listing[1].flow.to_string(), "JP $3015");
}

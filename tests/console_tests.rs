use std::sync::mpsc;

use trs_xray::disassembler::Z80Disassembler;
use trs_xray::events::{AppEvent, run_session};
use trs_xray::session::{Session, SessionSettings};
use trs_xray::sut::{
    Channel, ChannelState, ConnectionManager, Connector, LivenessPolicy, SutEvent,
};

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

fn offline_session() -> Session<NullConnector, Z80Disassembler> {
    let connection = ConnectionManager::new(NullConnector, LivenessPolicy::default()).offline();
    Session::new(
        connection,
        Z80Disassembler::new(),
        SessionSettings::default(),
    )
}

fn run(events: Vec<AppEvent>) -> (Session<NullConnector, Z80Disassembler>, String) {
    let mut session = offline_session();
    let (tx, rx) = mpsc::channel();
    for event in events {
        tx.send(event).unwrap();
    }
    drop(tx);
    let mut out = Vec::new();
    run_session(&mut session, &rx, &mut out).unwrap();
    (session, String::from_utf8(out).unwrap())
}

fn input(line: &str) -> AppEvent {
    AppEvent::Input(line.to_string())
}

#[test]
fn test_console_select_and_peek() {
    let (session, out) = run(vec![
        AppEvent::Sut(SutEvent::Binary(vec![0x3C, 0x00, 0x48, 0x49])),
        input("select 3C 01"),
        input("peek 3C 00 16"),
    ]);
    assert_eq!(session.selection(), Some(0x3C01));
    assert!(out.contains("$3C01 = $49"));
    assert!(out.contains("3C00  48*49*00 "));
}

#[test]
fn test_console_reports_errors_and_keeps_going() {
    let (session, out) = run(vec![
        input("select 3C"),
        input("poke 41"),
        input("select zz 00"),
        input("testdata"),
    ]);
    assert!(out.contains("Error: no byte selected"));
    assert!(out.contains("Error: invalid address input"));
    assert_eq!(session.context().system_name, "sdlTRS");
}

#[test]
fn test_console_quit_stops_processing() {
    let (session, _out) = run(vec![input("quit"), input("testdata")]);
    assert_eq!(session.context().system_name, "");
}

#[test]
fn test_text_frames_are_applied_in_order() {
    let (session, _out) = run(vec![
        AppEvent::Sut(SutEvent::Text(r#"{"registers":{"pc":256}}"#.to_string())),
        AppEvent::Sut(SutEvent::Text("garbage".to_string())),
        AppEvent::Sut(SutEvent::Text(r#"{"registers":{"pc":512}}"#.to_string())),
    ]);
    assert_eq!(session.registers().pc, 512);
}

#[test]
fn test_console_listings() {
    let (_session, out) = run(vec![
        input("testdata"),
        input("regs"),
        input("bps"),
        input("dis"),
    ]);
    assert!(out.contains("PC=0002 SP=FFFF"));
    assert!(out.contains("$1230  Program Counter"));
    assert!(out.contains("> $0002  00"));
}

#[test]
fn test_memory_policy_toggle_output() {
    let (session, out) = run(vec![input("memory-policy")]);
    assert!(!session.settings().full_memory_update);
    assert!(out.contains("video RAM only"));
}

#[test]
fn test_peek_with_oversized_count_is_clamped() {
    let (_session, out) = run(vec![
        input("peek 00 01 18446744073709551615"),
        input("testdata"),
        input("regs"),
    ]);
    assert!(out.starts_with("0001  "));
    assert!(out.contains("FFF1  "));
    assert!(out.contains("PC=0002"));
}

#[test]
fn test_wider_groups_peek_output() {
    let (session, out) = run(vec![
        AppEvent::Sut(SutEvent::Binary(vec![0x3C, 0x00, 0x48, 0x49, 0x4A, 0x4B])),
        input("wider"),
        input("peek 3C 00 4"),
    ]);
    assert_eq!(session.memory().byte_size(), 2);
    assert!(out.contains("3C00  48*49* 4A*4B* HIJK"));
}

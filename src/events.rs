use crate::console::{self, Reply};
use crate::disassembler::Disassembler;
use crate::session::Session;
use crate::sut::client::SutEvent;
use crate::sut::connection::Connector;
use std::io::Write;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Instant;

/// Everything the session thread reacts to. Socket threads and the stdin
/// reader all feed the same queue, so frames and commands are handled one
/// at a time and in arrival order.
pub enum AppEvent {
    Sut(SutEvent),
    Input(String),
    Quit,
}

/// Drives `session` until a quit command or until every sender is gone.
///
/// The liveness check runs on its own schedule: the wait for the next event
/// times out when the check is due.
pub fn run_session<C: Connector, D: Disassembler, W: Write>(
    session: &mut Session<C, D>,
    rx: &Receiver<AppEvent>,
    out: &mut W,
) -> anyhow::Result<()> {
    let mut next_check = Some(Instant::now());

    loop {
        if let Some(due) = next_check
            && Instant::now() >= due
        {
            next_check = session.tick().map(|tick| Instant::now() + tick.next_check);
        }

        let event = match next_check {
            Some(due) => match rx.recv_timeout(due.saturating_duration_since(Instant::now())) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(event) => event,
                Err(_) => break,
            },
        };

        match event {
            AppEvent::Sut(SutEvent::Connected) => session.on_channel_open(),
            AppEvent::Sut(SutEvent::Disconnected(reason)) => {
                log::warn!("Channel to SUT closed: {}", reason);
            }
            AppEvent::Sut(SutEvent::Text(text)) => {
                if let Err(e) = session.handle_text_frame(&text) {
                    log::warn!("{}", e);
                }
            }
            AppEvent::Sut(SutEvent::Binary(bytes)) => session.handle_binary_frame(bytes),
            AppEvent::Input(line) => {
                if handle_input(session, &line, out)? == Reply::Quit {
                    break;
                }
            }
            AppEvent::Quit => break,
        }
    }

    log::info!("Session ended");
    Ok(())
}

fn handle_input<C: Connector, D: Disassembler, W: Write>(
    session: &mut Session<C, D>,
    line: &str,
    out: &mut W,
) -> anyhow::Result<Reply> {
    let command = match console::parse_line(line) {
        Ok(Some(command)) => command,
        Ok(None) => return Ok(Reply::Done),
        Err(e) => {
            // clap renders its own usage text
            write!(out, "{}", e.render())?;
            return Ok(Reply::Done);
        }
    };

    let reply = match console::execute(session, command) {
        Ok(reply) => reply,
        Err(e) => {
            writeln!(out, "Error: {:#}", e)?;
            Reply::Done
        }
    };
    if let Reply::Print(text) = &reply {
        writeln!(out, "{}", text)?;
    }
    out.flush()?;
    Ok(reply)
}

use super::connection::{Channel, ChannelState, Connector};
use crate::events::AppEvent;
use std::io;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

/// How long a read may block before the I/O thread goes back to draining
/// outbound commands.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub enum SutEvent {
    Connected,
    Disconnected(String),
    Text(String),
    Binary(Vec<u8>),
}

/// Opens WebSocket channels to `ws://<host>/channel`.
pub struct WsConnector {
    url: String,
    app_tx: Sender<AppEvent>,
}

impl WsConnector {
    pub fn new(host: &str, app_tx: Sender<AppEvent>) -> Self {
        Self {
            url: format!("ws://{}/channel", host),
            app_tx,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Connector for WsConnector {
    type Channel = WsChannel;

    fn open(&mut self) -> WsChannel {
        WsChannel::spawn(self.url.clone(), self.app_tx.clone())
    }
}

/// Handle to one WebSocket connection. All socket I/O happens on a
/// background thread; dropping the handle closes the socket.
pub struct WsChannel {
    state: Arc<AtomicU8>,
    cmd_tx: Sender<String>,
}

impl WsChannel {
    fn spawn(url: String, app_tx: Sender<AppEvent>) -> Self {
        let state = Arc::new(AtomicU8::new(encode_state(ChannelState::Connecting)));
        let (cmd_tx, cmd_rx) = mpsc::channel::<String>();

        let thread_state = state.clone();
        thread::spawn(move || {
            let reason = run_channel(&url, &thread_state, cmd_rx, &app_tx);
            thread_state.store(encode_state(ChannelState::Closed), Ordering::SeqCst);
            let _ = app_tx.send(AppEvent::Sut(SutEvent::Disconnected(reason)));
        });

        Self { state, cmd_tx }
    }
}

impl Channel for WsChannel {
    fn state(&self) -> ChannelState {
        decode_state(self.state.load(Ordering::SeqCst))
    }

    fn send_text(&self, text: String) {
        let _ = self.cmd_tx.send(text);
    }
}

fn run_channel(
    url: &str,
    state: &AtomicU8,
    cmd_rx: Receiver<String>,
    app_tx: &Sender<AppEvent>,
) -> String {
    log::info!("Creating new WebSocket to {}", url);
    let mut socket = match tungstenite::connect(url) {
        Ok((socket, _response)) => socket,
        Err(e) => return format!("Unable to connect to {}: {}", url, e),
    };

    if let MaybeTlsStream::Plain(stream) = socket.get_mut()
        && let Err(e) = stream.set_read_timeout(Some(POLL_INTERVAL))
    {
        return format!("Unable to configure socket: {}", e);
    }

    state.store(encode_state(ChannelState::Open), Ordering::SeqCst);
    if app_tx.send(AppEvent::Sut(SutEvent::Connected)).is_err() {
        return "Session ended".to_string();
    }

    loop {
        // Outbound commands go first and in order.
        loop {
            match cmd_rx.try_recv() {
                Ok(text) => {
                    if let Err(e) = socket.send(Message::text(text)) {
                        return format!("Send failed: {}", e);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    state.store(encode_state(ChannelState::Closing), Ordering::SeqCst);
                    close(&mut socket);
                    return "Channel closed".to_string();
                }
            }
        }

        let event = match socket.read() {
            Ok(Message::Text(text)) => SutEvent::Text(text.as_str().to_owned()),
            Ok(Message::Binary(bytes)) => SutEvent::Binary(bytes.to_vec()),
            Ok(Message::Close(_)) => return "Connection closed by SUT".to_string(),
            Ok(_) => continue,
            Err(tungstenite::Error::Io(ref e)) if is_timeout(e) => continue,
            Err(e) => return e.to_string(),
        };

        if app_tx.send(AppEvent::Sut(event)).is_err() {
            close(&mut socket);
            return "Session ended".to_string();
        }
    }
}

fn close(socket: &mut WebSocket<MaybeTlsStream<TcpStream>>) {
    let _ = socket.close(None);
    let _ = socket.flush();
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn encode_state(state: ChannelState) -> u8 {
    match state {
        ChannelState::Connecting => 0,
        ChannelState::Open => 1,
        ChannelState::Closing => 2,
        ChannelState::Closed => 3,
    }
}

fn decode_state(value: u8) -> ChannelState {
    match value {
        0 => ChannelState::Connecting,
        1 => ChannelState::Open,
        2 => ChannelState::Closing,
        _ => ChannelState::Closed,
    }
}

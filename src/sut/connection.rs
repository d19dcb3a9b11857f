use super::protocol::Command;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// One bidirectional link to the SUT. Sending on a channel that is not open
/// is allowed and silently lost.
pub trait Channel {
    fn state(&self) -> ChannelState;
    fn send_text(&self, text: String);
}

/// Creates channels. `open` must not block: the returned channel starts in
/// `Connecting` (or `Closed` on immediate failure) and reports the outcome
/// through its state.
pub trait Connector {
    type Channel: Channel;
    fn open(&mut self) -> Self::Channel;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkHealth {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessPolicy {
    /// Re-check delay while degraded.
    pub fast_retry: Duration,
    /// Re-check delay while healthy.
    pub healthy_recheck: Duration,
}

impl Default for LivenessPolicy {
    fn default() -> Self {
        Self {
            fast_retry: Duration::from_millis(200),
            healthy_recheck: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub next_check: Duration,
    pub health: LinkHealth,
    pub health_changed: bool,
    /// A new channel was opened on this tick.
    pub reopened: bool,
}

/// Owns the channel to the SUT and keeps it alive.
///
/// The liveness loop is an explicit poll: the caller invokes [`tick`] and
/// schedules the next call after the returned delay.
///
/// [`tick`]: ConnectionManager::tick
pub struct ConnectionManager<C: Connector> {
    connector: C,
    channel: Option<C::Channel>,
    health: LinkHealth,
    policy: LivenessPolicy,
    offline: bool,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, policy: LivenessPolicy) -> Self {
        Self {
            connector,
            channel: None,
            health: LinkHealth::Degraded,
            policy,
            offline: false,
        }
    }

    /// Diagnostic mode: no channel is ever opened and `tick` is a no-op.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn health(&self) -> LinkHealth {
        self.health
    }

    pub fn policy(&self) -> LivenessPolicy {
        self.policy
    }

    pub fn channel_state(&self) -> Option<ChannelState> {
        self.channel.as_ref().map(|c| c.state())
    }

    pub fn is_open(&self) -> bool {
        self.channel_state() == Some(ChannelState::Open)
    }

    /// Sends `command` if a channel is open, otherwise drops it. Callers
    /// never need to check the connection first; the liveness loop recovers
    /// the channel on its own.
    pub fn send_command(&self, command: &Command) {
        match &self.channel {
            Some(channel) if channel.state() == ChannelState::Open => {
                log::debug!("-> {}", command);
                channel.send_text(command.encode());
            }
            _ => log::debug!("No open channel, dropping '{}'", command),
        }
    }

    /// One pass of the liveness loop. Returns `None` in offline mode.
    pub fn tick(&mut self) -> Option<Tick> {
        if self.offline {
            return None;
        }

        let state = self.channel_state();
        let previous = self.health;
        let mut reopened = false;

        let next_check = if state == Some(ChannelState::Open) {
            self.health = LinkHealth::Healthy;
            self.policy.healthy_recheck
        } else {
            self.health = LinkHealth::Degraded;
            if matches!(
                state,
                None | Some(ChannelState::Closed) | Some(ChannelState::Closing)
            ) {
                log::debug!("Opening new channel to SUT");
                self.channel = Some(self.connector.open());
                reopened = true;
            }
            self.policy.fast_retry
        };

        if self.health != previous {
            match self.health {
                LinkHealth::Healthy => log::info!("Connection to SUT is up"),
                LinkHealth::Degraded => log::warn!("Connection to SUT lost, reconnecting"),
            }
        }

        Some(Tick {
            next_check,
            health: self.health,
            health_changed: self.health != previous,
            reopened,
        })
    }

    /// Closes the current channel, if any. The next tick reconnects.
    pub fn disconnect(&mut self) {
        self.channel = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone)]
    struct FakeChannel {
        state: Rc<RefCell<ChannelState>>,
        sent: Rc<RefCell<Vec<String>>>,
    }

    impl Channel for FakeChannel {
        fn state(&self) -> ChannelState {
            *self.state.borrow()
        }
        fn send_text(&self, text: String) {
            self.sent.borrow_mut().push(text);
        }
    }

    struct FakeConnector {
        opened: usize,
        next_state: ChannelState,
        last: Option<FakeChannel>,
    }

    impl FakeConnector {
        fn new(next_state: ChannelState) -> Self {
            Self {
                opened: 0,
                next_state,
                last: None,
            }
        }
    }

    impl Connector for FakeConnector {
        type Channel = FakeChannel;
        fn open(&mut self) -> FakeChannel {
            self.opened += 1;
            let channel = FakeChannel {
                state: Rc::new(RefCell::new(self.next_state)),
                sent: Rc::new(RefCell::new(Vec::new())),
            };
            self.last = Some(channel.clone());
            channel
        }
    }

    #[test]
    fn test_send_without_channel_is_silent() {
        let conn = ConnectionManager::new(
            FakeConnector::new(ChannelState::Open),
            LivenessPolicy::default(),
        );
        conn.send_command(&Command::Step);
        assert_eq!(conn.connector.opened, 0);
    }

    #[test]
    fn test_first_tick_opens_and_retries_fast() {
        let mut conn = ConnectionManager::new(
            FakeConnector::new(ChannelState::Connecting),
            LivenessPolicy::default(),
        );
        let tick = conn.tick().unwrap();
        assert!(tick.reopened);
        assert_eq!(tick.health, LinkHealth::Degraded);
        assert_eq!(tick.next_check, Duration::from_millis(200));

        // Still connecting: degraded, but no second channel.
        let tick = conn.tick().unwrap();
        assert!(!tick.reopened);
        assert_eq!(conn.connector.opened, 1);

        // Commands are dropped until the channel is open.
        conn.send_command(&Command::Stop);
        let last = conn.connector.last.clone().unwrap();
        assert!(last.sent.borrow().is_empty());
    }

    #[test]
    fn test_open_channel_is_healthy_with_slow_recheck() {
        let mut conn = ConnectionManager::new(
            FakeConnector::new(ChannelState::Open),
            LivenessPolicy::default(),
        );
        conn.tick();
        let tick = conn.tick().unwrap();
        assert_eq!(tick.health, LinkHealth::Healthy);
        assert!(tick.health_changed);
        assert_eq!(tick.next_check, Duration::from_millis(500));

        conn.send_command(&Command::Continue);
        let last = conn.connector.last.clone().unwrap();
        assert_eq!(*last.sent.borrow(), vec!["action/continue".to_string()]);
    }

    #[test]
    fn test_closing_channel_is_replaced() {
        let mut conn = ConnectionManager::new(
            FakeConnector::new(ChannelState::Open),
            LivenessPolicy::default(),
        );
        conn.tick();
        conn.tick();
        let last = conn.connector.last.clone().unwrap();
        *last.state.borrow_mut() = ChannelState::Closing;

        let tick = conn.tick().unwrap();
        assert!(tick.reopened);
        assert!(tick.health_changed);
        assert_eq!(tick.health, LinkHealth::Degraded);
        assert_eq!(conn.connector.opened, 2);
    }

    #[test]
    fn test_offline_mode_never_connects() {
        let mut conn = ConnectionManager::new(
            FakeConnector::new(ChannelState::Open),
            LivenessPolicy::default(),
        )
        .offline();
        assert!(conn.tick().is_none());
        assert_eq!(conn.connector.opened, 0);
        assert_eq!(conn.health(), LinkHealth::Degraded);
    }
}

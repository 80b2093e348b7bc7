//! Connection lifecycle: one logical socket, re-established with backoff.
//!
//! The manager never touches the network. Every transition returns the
//! effects the runtime must perform, and every socket event comes back tagged
//! with the `ConnId` it belongs to so late events from abandoned sockets can
//! be ignored.

use std::time::Duration;

use agentwatch_logging::{sync_debug, sync_info, sync_warn};

use crate::{Effect, Outbound, Timer};

/// Identifies one connection attempt. Monotonically increasing.
pub type ConnId = u64;

/// Close code a server uses for a normal, intentional closure.
pub const NORMAL_CLOSURE: u16 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    #[default]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(3_000),
            backoff_factor: 1.5,
            max_delay: Duration::from_millis(30_000),
        }
    }
}

impl ReconnectPolicy {
    /// `min(base * factor^attempt, max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_secs_f64() * 1_000.0;
        let max_ms = self.max_delay.as_secs_f64() * 1_000.0;
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let raw_ms = base_ms * self.backoff_factor.powi(exponent);
        let capped_ms = if raw_ms.is_finite() {
            raw_ms.min(max_ms)
        } else {
            max_ms
        };
        Duration::from_secs_f64(capped_ms / 1_000.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionSettings {
    pub connect_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionManager {
    settings: ConnectionSettings,
    state: ConnectionState,
    current: Option<ConnId>,
    next_id: ConnId,
    attempt: u32,
    reconnect_pending: bool,
    last_delay: Option<Duration>,
    /// Set by a `server_shutdown` envelope or a user disconnect; the next
    /// close of the current connection will not be retried.
    shutdown_signaled: bool,
    opens: u64,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(ConnectionSettings::default())
    }
}

impl ConnectionManager {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self {
            settings,
            state: ConnectionState::Closed,
            current: None,
            next_id: 0,
            attempt: 0,
            reconnect_pending: false,
            last_delay: None,
            shutdown_signaled: false,
            opens: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn current(&self) -> Option<ConnId> {
        self.current
    }

    pub fn is_current(&self, conn: ConnId) -> bool {
        self.current == Some(conn)
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Delay of the most recently scheduled reconnection, cleared on Open.
    pub fn last_delay(&self) -> Option<Duration> {
        self.last_delay
    }

    /// Number of times a connection reached Open.
    pub fn opens(&self) -> u64 {
        self.opens
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn connect(&mut self) -> Vec<Effect> {
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Open
        ) {
            sync_debug!("connect ignored: connection is {:?}", self.state);
            return Vec::new();
        }

        let mut effects = Vec::with_capacity(3);
        if self.reconnect_pending {
            self.reconnect_pending = false;
            effects.push(Effect::CancelTimer {
                timer: Timer::Reconnect,
            });
        }

        self.next_id += 1;
        let conn = self.next_id;
        self.current = Some(conn);
        self.state = ConnectionState::Connecting;
        self.shutdown_signaled = false;
        sync_info!("opening connection #{} (attempt {})", conn, self.attempt);

        effects.push(Effect::OpenSocket { conn });
        effects.push(Effect::StartTimer {
            timer: Timer::ConnectTimeout(conn),
            after: self.settings.connect_timeout,
        });
        effects
    }

    /// Produces a send effect when Open; otherwise the frame is dropped.
    pub fn send(&self, frame: Outbound) -> Option<Effect> {
        match (self.state, self.current) {
            (ConnectionState::Open, Some(conn)) => Some(Effect::SendFrame { conn, frame }),
            _ => {
                sync_warn!(
                    "dropping outbound {:?}: connection is {:?}",
                    frame,
                    self.state
                );
                None
            }
        }
    }

    pub fn on_open(&mut self, conn: ConnId) -> Vec<Effect> {
        if !self.is_current(conn) {
            sync_warn!("closing stale connection #{} that opened late", conn);
            return vec![Effect::CloseSocket { conn }];
        }
        if self.state != ConnectionState::Connecting {
            sync_debug!("open for #{} ignored while {:?}", conn, self.state);
            return Vec::new();
        }

        self.state = ConnectionState::Open;
        self.attempt = 0;
        self.last_delay = None;
        self.opens += 1;
        sync_info!("connection #{} open", conn);

        vec![
            Effect::CancelTimer {
                timer: Timer::ConnectTimeout(conn),
            },
            Effect::SendFrame {
                conn,
                frame: Outbound::Ping,
            },
            Effect::StartTimer {
                timer: Timer::Heartbeat,
                after: self.settings.heartbeat_interval,
            },
        ]
    }

    /// Server greeting. Confirms the handshake succeeded.
    pub fn on_established(&mut self) {
        self.attempt = 0;
    }

    pub fn on_close(&mut self, conn: ConnId, code: Option<u16>) -> Vec<Effect> {
        if !self.is_current(conn) {
            sync_debug!("ignoring close of stale connection #{}", conn);
            return Vec::new();
        }
        if self.state == ConnectionState::Closed {
            return Vec::new();
        }

        // Closing without a shutdown signal is a forced close after a connect
        // timeout. It is retried whatever code the peer echoes.
        let forced = self.state == ConnectionState::Closing && !self.shutdown_signaled;
        self.state = ConnectionState::Closed;
        let mut effects = vec![
            Effect::CancelTimer {
                timer: Timer::ConnectTimeout(conn),
            },
            Effect::CancelTimer {
                timer: Timer::Heartbeat,
            },
        ];

        if !forced && (code == Some(NORMAL_CLOSURE) || self.shutdown_signaled) {
            sync_info!(
                "connection #{} closed cleanly (code {:?}); not reconnecting",
                conn,
                code
            );
            return effects;
        }

        sync_warn!("connection #{} lost (code {:?})", conn, code);
        effects.extend(self.schedule_reconnect());
        effects
    }

    /// Transport errors take the same path as an abnormal close.
    pub fn on_error(&mut self, conn: ConnId, message: &str) -> Vec<Effect> {
        sync_warn!("transport error on connection #{}: {}", conn, message);
        if !self.is_current(conn) || self.state == ConnectionState::Closed {
            return Vec::new();
        }
        let mut effects = vec![Effect::CloseSocket { conn }];
        effects.extend(self.on_close(conn, None));
        effects
    }

    pub fn on_connect_timeout(&mut self, conn: ConnId) -> Vec<Effect> {
        if !self.is_current(conn) || self.state != ConnectionState::Connecting {
            return Vec::new();
        }
        sync_warn!(
            "connection #{} not open after {:?}; forcing close",
            conn,
            self.settings.connect_timeout
        );
        self.state = ConnectionState::Closing;
        vec![Effect::CloseSocket { conn }]
    }

    pub fn on_reconnect_due(&mut self) -> Vec<Effect> {
        if !self.reconnect_pending {
            return Vec::new();
        }
        self.reconnect_pending = false;
        self.attempt = self.attempt.saturating_add(1);
        self.connect()
    }

    pub fn on_heartbeat_due(&mut self) -> Vec<Effect> {
        if self.state != ConnectionState::Open {
            return Vec::new();
        }
        let mut effects = Vec::with_capacity(2);
        effects.extend(self.send(Outbound::Ping));
        effects.push(Effect::StartTimer {
            timer: Timer::Heartbeat,
            after: self.settings.heartbeat_interval,
        });
        effects
    }

    /// The server announced it is going away; its close must not be retried.
    pub fn note_server_shutdown(&mut self) -> Vec<Effect> {
        self.shutdown_signaled = true;
        self.cancel_reconnect()
    }

    /// User-requested shutdown of the connection.
    pub fn disconnect(&mut self) -> Vec<Effect> {
        self.shutdown_signaled = true;
        let mut effects = self.cancel_reconnect();
        if let (
            ConnectionState::Connecting | ConnectionState::Open,
            Some(conn),
        ) = (self.state, self.current)
        {
            self.state = ConnectionState::Closing;
            effects.push(Effect::CloseSocket { conn });
        }
        effects
    }

    fn cancel_reconnect(&mut self) -> Vec<Effect> {
        if !self.reconnect_pending {
            return Vec::new();
        }
        self.reconnect_pending = false;
        vec![Effect::CancelTimer {
            timer: Timer::Reconnect,
        }]
    }

    fn schedule_reconnect(&mut self) -> Vec<Effect> {
        if self.reconnect_pending {
            sync_debug!("reconnect already scheduled");
            return Vec::new();
        }
        let delay = self.settings.reconnect.delay_for(self.attempt);
        self.reconnect_pending = true;
        self.last_delay = Some(delay);
        sync_info!(
            "reconnecting in {} ms (attempt {})",
            delay.as_millis(),
            self.attempt + 1
        );
        vec![Effect::StartTimer {
            timer: Timer::Reconnect,
            after: delay,
        }]
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ReconnectPolicy;

    #[test]
    fn backoff_grows_by_half_and_caps_at_thirty_seconds() {
        let policy = ReconnectPolicy::default();
        let expected_ms = [3_000.0, 4_500.0, 6_750.0, 10_125.0, 15_187.5, 22_781.25];
        for (attempt, expected) in expected_ms.iter().enumerate() {
            let delay = policy.delay_for(attempt as u32);
            assert!(
                (delay.as_secs_f64() * 1_000.0 - expected).abs() < 0.001,
                "attempt {attempt}: {delay:?}"
            );
        }
        for attempt in 6..40 {
            assert_eq!(policy.delay_for(attempt), Duration::from_millis(30_000));
        }
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_millis(30_000));
    }

    #[test]
    fn backoff_is_monotonic() {
        let policy = ReconnectPolicy::default();
        let mut previous = Duration::ZERO;
        for attempt in 0..64 {
            let delay = policy.delay_for(attempt);
            assert!(delay >= previous);
            assert!(delay <= policy.max_delay);
            previous = delay;
        }
    }
}

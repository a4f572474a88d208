use log::*;
use std::time::Duration;

/// Default number of events buffered per subscriber before it counts as a slow consumer.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;
/// Default depth of the queue between publishers and the dispatch loop.
pub const DEFAULT_PUBLISH_BUFFER: usize = 256;
pub const DEFAULT_PING_PERIOD: Duration = Duration::from_secs(54);
pub const DEFAULT_PONG_WAIT: Duration = Duration::from_secs(60);
pub const DEFAULT_WRITE_WAIT: Duration = Duration::from_secs(10);

/// Tuning knobs for a [`crate::Hub`] and the pumps of its clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Capacity of each client's outbound mailbox.
    pub mailbox_capacity: usize,
    /// Capacity of the hub-internal publish queue.
    pub publish_buffer: usize,
    /// How often the write pump sends a keepalive ping.
    pub ping_period: Duration,
    /// How long the read pump waits for a pong before giving up on the peer.
    pub pong_wait: Duration,
    /// Upper bound on any single write to the connection.
    pub write_wait: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            publish_buffer: DEFAULT_PUBLISH_BUFFER,
            ping_period: DEFAULT_PING_PERIOD,
            pong_wait: DEFAULT_PONG_WAIT,
            write_wait: DEFAULT_WRITE_WAIT,
        }
    }
}

impl HubConfig {
    /// Returns a config that is safe to run with.
    ///
    /// Channel capacities must be non-zero, and a healthy peer must always be
    /// pinged before its read deadline expires, so a ping period that is not
    /// shorter than the pong wait is clamped to 9/10 of it.
    pub fn validated(mut self) -> Self {
        if self.mailbox_capacity == 0 {
            warn!("Hub mailbox capacity of 0 is not usable, using 1");
            self.mailbox_capacity = 1;
        }
        if self.publish_buffer == 0 {
            warn!("Hub publish buffer of 0 is not usable, using 1");
            self.publish_buffer = 1;
        }
        if self.pong_wait.is_zero() {
            warn!("Hub pong wait of 0 is not usable, using {DEFAULT_PONG_WAIT:?}");
            self.pong_wait = DEFAULT_PONG_WAIT;
        }
        if self.ping_period.is_zero() || self.ping_period >= self.pong_wait {
            let clamped = self.pong_wait * 9 / 10;
            warn!(
                "Hub ping period {:?} must be shorter than pong wait {:?}, using {:?}",
                self.ping_period, self.pong_wait, clamped
            );
            self.ping_period = clamped;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_already_valid() {
        assert_eq!(HubConfig::default().validated(), HubConfig::default());
    }

    #[test]
    fn test_ping_period_not_shorter_than_pong_wait_is_clamped() {
        let config = HubConfig {
            ping_period: Duration::from_secs(60),
            pong_wait: Duration::from_secs(60),
            ..Default::default()
        }
        .validated();

        assert_eq!(config.ping_period, Duration::from_secs(54));
    }

    #[test]
    fn test_zero_capacities_are_raised_to_one() {
        let config = HubConfig {
            mailbox_capacity: 0,
            publish_buffer: 0,
            ..Default::default()
        }
        .validated();

        assert_eq!(config.mailbox_capacity, 1);
        assert_eq!(config.publish_buffer, 1);
    }
}

//! Server tuning knobs.
//!
//! The liveness thresholds are policy: a seat silent for longer than
//! `short_threshold` is marked away, and one silent for longer than
//! `long_threshold` forfeits its match.

use shared::MAX_DATAGRAM_SIZE;
use std::time::Duration;

pub const DEFAULT_SHORT_THRESHOLD: Duration = Duration::from_secs(10);
pub const DEFAULT_LONG_THRESHOLD: Duration = Duration::from_secs(60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_HAND_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Silence after which a seat is marked disconnected.
    pub short_threshold: Duration,
    /// Silence after which a disconnected seat forfeits.
    pub long_threshold: Duration,
    /// Period of the liveness sweep.
    pub sweep_interval: Duration,
    /// Cards dealt to each player at game start.
    pub hand_size: usize,
    pub recv_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            short_threshold: DEFAULT_SHORT_THRESHOLD,
            long_threshold: DEFAULT_LONG_THRESHOLD,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            hand_size: DEFAULT_HAND_SIZE,
            recv_buffer_size: MAX_DATAGRAM_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("short threshold ({short:?}) must be below long threshold ({long:?})")]
    ThresholdOrder { short: Duration, long: Duration },
    #[error("hand size {0} leaves no card for the discard pile")]
    HandTooLarge(usize),
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.short_threshold.is_zero() {
            return Err(ConfigError::Zero("short threshold"));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::Zero("sweep interval"));
        }
        if self.hand_size == 0 {
            return Err(ConfigError::Zero("hand size"));
        }
        if self.short_threshold >= self.long_threshold {
            return Err(ConfigError::ThresholdOrder {
                short: self.short_threshold,
                long: self.long_threshold,
            });
        }
        if self.hand_size * 2 >= shared::DECK_SIZE {
            return Err(ConfigError::HandTooLarge(self.hand_size));
        }
        Ok(())
    }
}

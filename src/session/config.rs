//! Session configuration.

use std::time::Duration;

use crate::core::{DEFAULT_MAX_ENTITY_SIZE, DEFAULT_RECEIVE_TIMEOUT};

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Our connection id; picked at random in `1..=254` when `None`.
    pub local_id: Option<u8>,

    /// How long to wait for any incoming FPDU.
    pub receive_timeout: Duration,

    /// Largest entity to send; data is chunked to fit.
    pub max_entity_size: u16,

    /// Keep a copy of every FPDU sent and received.
    pub record_traffic: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            local_id: None,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            max_entity_size: DEFAULT_MAX_ENTITY_SIZE,
            record_traffic: false,
        }
    }
}

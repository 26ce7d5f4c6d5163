//! Control channel errors

use std::time::Duration;
use thiserror::Error;

/// Failure of a single control channel round trip
#[derive(Error, Debug)]
pub enum EslError {
    /// Connection could not be established or authenticated
    #[error("ESL connection failed: {0}")]
    Connection(String),

    /// No reply within the command timeout
    #[error("ESL command timed out after {0:?}")]
    Timeout(Duration),

    /// Peer sent something that is not a valid ESL frame
    #[error("ESL protocol error: {0}")]
    Protocol(String),

    #[error("ESL I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer closed the socket or sent a disconnect notice
    #[error("ESL connection closed by peer")]
    Closed,

    /// Switch rejected the command (`-ERR ...`)
    #[error("ESL error: {0}")]
    Remote(String),
}

impl EslError {
    /// True for an explicit rejection by the switch; the connection stays usable
    pub fn is_remote(&self) -> bool {
        matches!(self, EslError::Remote(_))
    }

    /// True when the connection can no longer be trusted and must be dropped
    pub fn is_transport(&self) -> bool {
        !self.is_remote()
    }
}

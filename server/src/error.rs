//! Error types for the game server.
//!
//! [`GameError`] covers everything a single inbound message can be rejected
//! for. Its `Display` text is what the offending client receives, and a
//! rejected message never mutates server state.

use crate::config::ConfigError;
use shared::{CodecError, ServerPacket};
use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Not your turn yet.")]
    NotYourTurn,

    #[error("You do not have this card in your hand.")]
    CardNotInHand,

    #[error("Invalid move. Card must match suit or value of the top card.")]
    InvalidMove,

    #[error("Player name already in use. Choose a different name.")]
    NameTaken,

    #[error("Player name is empty, too long or reserved.")]
    InvalidName,

    #[error("Invalid reconnection attempt.")]
    InvalidReconnection,

    #[error("Not enough cards in discard pile to refill deck.")]
    DeckExhausted,

    #[error("No active session for player {0}.")]
    SessionNotFound(String),

    #[error("Waiting for another player to join.")]
    GameNotStarted,

    #[error("You are disconnected. Reconnect before playing.")]
    NotConnected,
}

impl GameError {
    /// The packet that reports this error back to the sender.
    pub fn to_packet(&self) -> ServerPacket {
        let message = self.to_string();
        match self {
            GameError::NameTaken => ServerPacket::NameTaken { message },
            _ => ServerPacket::Error { message },
        }
    }
}

/// Failures of the transport layer and of server startup.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

//! Wire protocol between the card server and its clients.
//!
//! Every datagram carries exactly one JSON object whose `type` field names
//! the message kind. Internally both sides work with the typed enums below;
//! the flat key/value shape exists only at this boundary.

use crate::card::Card;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Practical upper bound on a single datagram.
pub const MAX_DATAGRAM_SIZE: usize = 4096;

/// Top-level field names used by outbound packets. Player hands are sent as
/// top-level fields named after the player, so no player may take one of
/// these names.
pub const RESERVED_FIELDS: &[&str] = &[
    "type",
    "message",
    "players",
    "current_player",
    "deck_size",
    "discard_pile",
    "top_card",
    "paused",
    "player_id",
    "waiting_for_player",
];

/// Messages sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientPacket {
    Connect { name: String },
    Heartbeat { name: String },
    PlayCard { player_name: String, card: String },
    DrawCard { player_name: String },
    Disconnect { name: String },
}

impl ClientPacket {
    /// The player name this packet speaks for.
    pub fn player_name(&self) -> &str {
        match self {
            ClientPacket::Connect { name }
            | ClientPacket::Heartbeat { name }
            | ClientPacket::Disconnect { name } => name,
            ClientPacket::PlayCard { player_name, .. }
            | ClientPacket::DrawCard { player_name } => player_name,
        }
    }
}

/// Full view of one running game, sent to both occupants after every
/// state-changing action and to a player on reconnection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSnapshot {
    /// Player names in seat order.
    pub players: Vec<String>,
    pub current_player: String,
    pub deck_size: usize,
    /// Number of cards in the discard pile.
    pub discard_pile: usize,
    pub top_card: Card,
    pub paused: bool,
    /// One field per player name holding that player's hand.
    #[serde(flatten)]
    pub hands: BTreeMap<String, Vec<Card>>,
}

/// Messages sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerPacket {
    ConnectAck {
        player_id: String,
        waiting_for_player: bool,
        #[serde(flatten)]
        state: Option<GameSnapshot>,
    },
    GameStateUpdate {
        #[serde(flatten)]
        state: GameSnapshot,
    },
    PlayerPlayedCard { player_name: String, message: String },
    PlayerDrawnCard { player_name: String, message: String },
    PlayerDisconnected { player: String, message: String },
    PlayerReconnected { player: String, message: String },
    GameOver { winner: String, message: String },
    Error { message: String },
    NameTaken { message: String },
    /// Reply to a datagram that could not be decoded at all.
    Unknown { message: String },
}

impl ServerPacket {
    /// Wire name of this packet's `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerPacket::ConnectAck { .. } => "connect_ack",
            ServerPacket::GameStateUpdate { .. } => "game_state_update",
            ServerPacket::PlayerPlayedCard { .. } => "player_played_card",
            ServerPacket::PlayerDrawnCard { .. } => "player_drawn_card",
            ServerPacket::PlayerDisconnected { .. } => "player_disconnected",
            ServerPacket::PlayerReconnected { .. } => "player_reconnected",
            ServerPacket::GameOver { .. } => "game_over",
            ServerPacket::Error { .. } => "error",
            ServerPacket::NameTaken { .. } => "name_taken",
            ServerPacket::Unknown { .. } => "unknown",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("datagram of {0} bytes exceeds the {MAX_DATAGRAM_SIZE} byte limit")]
    TooLarge(usize),
}

/// Decodes one inbound datagram.
pub fn decode_client_packet(data: &[u8]) -> Result<ClientPacket, CodecError> {
    Ok(serde_json::from_slice(data)?)
}

/// Encodes a packet into a single datagram.
pub fn encode<T: Serialize>(packet: &T) -> Result<Vec<u8>, CodecError> {
    let data = serde_json::to_vec(packet)?;
    if data.len() > MAX_DATAGRAM_SIZE {
        return Err(CodecError::TooLarge(data.len()));
    }
    Ok(data)
}

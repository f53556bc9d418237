//! # Prší Game Server Library
//!
//! This library provides the authoritative server for two-player Prší, a
//! shedding card game played over UDP. It matches arriving players into
//! two-seat lobbies, enforces the rules of every match, and keeps each
//! match alive through short network outages.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Rules
//! The server holds the only copy of every deck, hand and discard pile.
//! Clients send intents (play this card, draw a card) and receive the
//! resulting state; nothing a client claims about the table is trusted.
//!
//! ### Session Management
//! Handles the complete lifecycle of a player identity:
//! - Name registration and uniqueness
//! - Liveness tracking through heartbeats and any other traffic
//! - Disconnection, reconnection from a new endpoint, and cleanup
//!
//! ### Matchmaking
//! Each arriving player takes a free seat in the oldest open lobby, or
//! opens a new one. The game is dealt the moment the second seat fills.
//!
//! ## Architecture Design
//!
//! ### Single Writer
//! All mutable state lives in one [`world::World`] behind one async mutex.
//! The intake loop and the liveness supervisor take turns holding it, and
//! every handler runs synchronously to completion while it does. A handler
//! never performs I/O: it returns the packets to send, and those are queued
//! for the sender task before the lock is released.
//!
//! ### UDP-Based Communication
//! Each datagram carries exactly one JSON object with a `type` field. There
//! is no delivery guarantee; clients send heartbeats, and every state change
//! is followed by a full state snapshot so a lost update heals itself.
//!
//! ### Arena of Names
//! Lobbies store player names rather than references to sessions, and a
//! session stores the id of its lobby. Every cross-reference is looked up
//! again when used, so a match torn down by a forfeit simply disappears for
//! whoever comes looking afterwards.
//!
//! ## Module Organization
//!
//! ### Session Module (`session`)
//! The registry of player identities, their endpoints and liveness.
//!
//! ### Lobby Module (`lobby`)
//! Two-seat lobbies and the matchmaker that fills them.
//!
//! ### Table and Deck Modules (`table`, `deck`)
//! The rules engine: dealing, legal moves, sevens and aces, drawing with
//! discard recycling, and win detection.
//!
//! ### Dispatcher Module (`dispatcher`)
//! Routes each inbound message to its handler and builds the notifications
//! for both players, including the reconnection protocol.
//!
//! ### Liveness Module (`liveness`)
//! The periodic sweep that pauses matches of silent players and forfeits
//! matches whose player stays away too long.
//!
//! ### Network Module (`network`)
//! UDP socket management, the receiver and sender tasks, and the intake
//! loop tying them to the world.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind("127.0.0.1:10000".parse()?, ServerConfig::default()).await?;
//!
//!     // Stop the server from elsewhere by cancelling this token.
//!     let _shutdown = server.cancel_token();
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod deck;
pub mod dispatcher;
pub mod error;
pub mod liveness;
pub mod lobby;
pub mod network;
pub mod session;
pub mod table;
pub mod world;

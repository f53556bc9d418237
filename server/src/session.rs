//! Player session tracking for the card server
//!
//! This module owns every player identity known to the server, including:
//! - Session lifecycle (register, touch, disconnect, remove)
//! - Liveness bookkeeping (last packet seen, time of disconnection)
//! - Name uniqueness among active sessions
//!
//! Lobbies refer to sessions by player name only. A name that is no longer
//! in the registry is a dead reference and must be treated as such.

use crate::error::GameError;
use crate::lobby::LobbyId;
use log::info;
use shared::RESERVED_FIELDS;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

const MAX_NAME_LEN: usize = 32;

/// Connection status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Connected,
    /// Marked away by the liveness sweep or an explicit disconnect.
    Disconnected { since: Instant },
}

/// A tracked player identity
///
/// Each session maintains:
/// - Network endpoint for outbound packets
/// - Liveness timestamp refreshed by every packet the player sends
/// - The lobby the player was matched into
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique player name
    pub name: String,
    /// Network address for sending packets
    pub addr: SocketAddr,
    /// Last time we received any packet from this player
    pub last_seen: Instant,
    pub status: Status,
    /// Lobby holding this player's seat
    pub lobby: Option<LobbyId>,
}

impl Session {
    pub fn new(name: String, addr: SocketAddr, now: Instant) -> Self {
        Self {
            name,
            addr,
            last_seen: now,
            status: Status::Connected,
            lobby: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == Status::Connected
    }

    /// Time since the last packet from this player.
    pub fn silence(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen)
    }

    /// How long the session has been marked away, if it is.
    pub fn away_for(&self, now: Instant) -> Option<Duration> {
        match self.status {
            Status::Connected => None,
            Status::Disconnected { since } => Some(now.saturating_duration_since(since)),
        }
    }

    /// Checks if the player has been silent for longer than `threshold`
    pub fn is_timed_out(&self, threshold: Duration, now: Instant) -> bool {
        self.silence(now) > threshold
    }
}

/// Normalizes a requested player name.
///
/// Hands travel as top-level wire fields named after their owner, so names
/// must be non-empty and must not collide with a protocol field.
pub fn validate_name(name: &str) -> Result<String, GameError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN || RESERVED_FIELDS.contains(&name) {
        return Err(GameError::InvalidName);
    }
    Ok(name.to_string())
}

/// Registry of all sessions, keyed by player name
///
/// The registry is the single owner of every [`Session`]. It is only ever
/// reached through the server's world lock, so no update is observable
/// half-done.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a connected session for `name`.
    ///
    /// Fails with [`GameError::NameTaken`] if any session of that name
    /// exists; callers route a disconnected name to reconnection first.
    pub fn register(
        &mut self,
        name: &str,
        addr: SocketAddr,
        now: Instant,
    ) -> Result<&mut Session, GameError> {
        if self.sessions.contains_key(name) {
            return Err(GameError::NameTaken);
        }

        info!("Player {} connected from {}", name, addr);
        let session = self
            .sessions
            .entry(name.to_string())
            .or_insert_with(|| Session::new(name.to_string(), addr, now));
        Ok(session)
    }

    /// Refreshes liveness and endpoint of a connected session.
    ///
    /// Returns false if there is no such connected session.
    pub fn touch(&mut self, name: &str, addr: SocketAddr, now: Instant) -> bool {
        match self.sessions.get_mut(name) {
            Some(session) if session.is_connected() => {
                session.last_seen = now;
                session.addr = addr;
                true
            }
            _ => false,
        }
    }

    /// Marks a session as away. Returns false if it was not connected.
    pub fn mark_disconnected(&mut self, name: &str, now: Instant) -> bool {
        match self.sessions.get_mut(name) {
            Some(session) if session.is_connected() => {
                session.status = Status::Disconnected { since: now };
                info!("Player {} disconnected", name);
                true
            }
            _ => false,
        }
    }

    /// Brings a disconnected session back on a (possibly new) endpoint.
    /// Returns false if the session is unknown or already connected.
    pub fn reconnect(&mut self, name: &str, addr: SocketAddr, now: Instant) -> bool {
        match self.sessions.get_mut(name) {
            Some(session) if !session.is_connected() => {
                session.status = Status::Connected;
                session.addr = addr;
                session.last_seen = now;
                info!("Player {} reconnected from {}", name, addr);
                true
            }
            _ => false,
        }
    }

    /// Deletes a session. Only match-end cleanup and forfeits call this.
    pub fn remove(&mut self, name: &str) -> Option<Session> {
        let removed = self.sessions.remove(name);
        if removed.is_some() {
            info!("Session for {} removed", name);
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<&Session> {
        self.sessions.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Session> {
        self.sessions.get_mut(name)
    }

    /// Endpoint of a connected session, if any.
    pub fn connected_addr(&self, name: &str) -> Option<SocketAddr> {
        self.get(name)
            .filter(|session| session.is_connected())
            .map(|session| session.addr)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_session_creation() {
        let now = Instant::now();
        let session = Session::new("Ana".to_string(), test_addr(), now);

        assert_eq!(session.name, "Ana");
        assert_eq!(session.addr, test_addr());
        assert!(session.is_connected());
        assert!(session.lobby.is_none());
    }

    #[test]
    fn test_session_timeout() {
        let now = Instant::now();
        let session = Session::new("Ana".to_string(), test_addr(), now);

        assert!(!session.is_timed_out(Duration::from_secs(1), now));
        assert!(session.is_timed_out(Duration::from_secs(1), now + Duration::from_secs(2)));
    }

    #[test]
    fn test_away_for_counts_from_disconnect() {
        let now = Instant::now();
        let mut session = Session::new("Ana".to_string(), test_addr(), now);
        assert_eq!(session.away_for(now), None);

        let dropped = now + Duration::from_secs(11);
        session.status = Status::Disconnected { since: dropped };
        assert_eq!(
            session.away_for(dropped + Duration::from_secs(50)),
            Some(Duration::from_secs(50))
        );
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = SessionRegistry::new();
        let now = Instant::now();

        registry.register("Ana", test_addr(), now).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
        assert_eq!(registry.connected_addr("Ana"), Some(test_addr()));
        assert!(registry.get("Bo").is_none());
    }

    #[test]
    fn test_register_duplicate_name_is_taken() {
        let mut registry = SessionRegistry::new();
        let now = Instant::now();

        registry.register("Ana", test_addr(), now).unwrap();
        let result = registry.register("Ana", test_addr2(), now);

        assert!(matches!(result, Err(GameError::NameTaken)));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.connected_addr("Ana"), Some(test_addr()));
    }

    #[test]
    fn test_touch_only_refreshes_liveness_and_endpoint() {
        let mut registry = SessionRegistry::new();
        let now = Instant::now();
        registry.register("Ana", test_addr(), now).unwrap();

        let later = now + Duration::from_secs(3);
        assert!(registry.touch("Ana", test_addr2(), later));
        assert!(registry.touch("Ana", test_addr2(), later));

        let session = registry.get("Ana").unwrap();
        assert_eq!(session.last_seen, later);
        assert_eq!(session.addr, test_addr2());
        assert!(session.is_connected());
        assert!(session.lobby.is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_touch_ignores_disconnected_and_unknown() {
        let mut registry = SessionRegistry::new();
        let now = Instant::now();
        registry.register("Ana", test_addr(), now).unwrap();
        registry.mark_disconnected("Ana", now);

        assert!(!registry.touch("Ana", test_addr2(), now));
        assert!(!registry.touch("Bo", test_addr2(), now));
        assert_eq!(registry.get("Ana").unwrap().addr, test_addr());
    }

    #[test]
    fn test_mark_disconnected_records_time() {
        let mut registry = SessionRegistry::new();
        let now = Instant::now();
        registry.register("Ana", test_addr(), now).unwrap();

        let later = now + Duration::from_secs(11);
        assert!(registry.mark_disconnected("Ana", later));
        assert!(!registry.mark_disconnected("Ana", later));

        assert_eq!(
            registry.get("Ana").unwrap().status,
            Status::Disconnected { since: later }
        );
        assert_eq!(registry.connected_addr("Ana"), None);
    }

    #[test]
    fn test_reconnect_restores_disconnected_session() {
        let mut registry = SessionRegistry::new();
        let now = Instant::now();
        registry.register("Ana", test_addr(), now).unwrap();

        assert!(!registry.reconnect("Ana", test_addr2(), now));
        registry.mark_disconnected("Ana", now);

        let later = now + Duration::from_secs(20);
        assert!(registry.reconnect("Ana", test_addr2(), later));

        let session = registry.get("Ana").unwrap();
        assert!(session.is_connected());
        assert_eq!(session.addr, test_addr2());
        assert_eq!(session.last_seen, later);
        assert!(!registry.reconnect("Bo", test_addr(), later));
    }

    #[test]
    fn test_remove_session() {
        let mut registry = SessionRegistry::new();
        registry.register("Ana", test_addr(), Instant::now()).unwrap();

        assert!(registry.remove("Ana").is_some());
        assert!(registry.remove("Ana").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Ana "), Ok("Ana".to_string()));
        assert_eq!(validate_name(""), Err(GameError::InvalidName));
        assert_eq!(validate_name("   "), Err(GameError::InvalidName));
        assert_eq!(validate_name("deck_size"), Err(GameError::InvalidName));
        assert_eq!(validate_name(&"x".repeat(33)), Err(GameError::InvalidName));
    }
}

//! The complete mutable state of the server.
//!
//! Every session, lobby and table lives inside one [`World`]. The network
//! layer keeps it behind a single mutex and hands `&mut World` to exactly
//! one handler or liveness sweep at a time, so every transition is applied
//! whole or not at all.

use crate::config::ServerConfig;
use crate::dispatcher::{Outbox, Outgoing};
use crate::lobby::{Lobby, LobbyId, Matchmaker};
use crate::session::SessionRegistry;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::ServerPacket;
use std::time::Instant;

pub struct World {
    pub(crate) config: ServerConfig,
    pub(crate) sessions: SessionRegistry,
    pub(crate) lobbies: Matchmaker,
    pub(crate) rng: StdRng,
}

impl World {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// A world whose shuffles are reproducible.
    pub fn with_seed(config: ServerConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: ServerConfig, rng: StdRng) -> Self {
        Self {
            config,
            sessions: SessionRegistry::new(),
            lobbies: Matchmaker::new(),
            rng,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn lobbies(&self) -> &Matchmaker {
        &self.lobbies
    }

    /// The lobby `name` is seated in, looked up afresh.
    pub fn lobby_of(&self, name: &str) -> Option<&Lobby> {
        self.sessions
            .get(name)
            .and_then(|session| session.lobby)
            .and_then(|id| self.lobbies.get(id))
            .filter(|lobby| lobby.seat_of(name).is_some())
    }

    /// Sends the full game state to every occupant of a running lobby.
    pub(crate) fn push_state(&self, id: LobbyId, outbox: &mut Outbox) {
        let Some(lobby) = self.lobbies.get(id) else {
            return;
        };
        let Some(state) = lobby.snapshot() else {
            return;
        };

        for name in lobby.occupants() {
            if let Some(session) = self.sessions.get(name) {
                outbox.push(Outgoing::new(
                    session.addr,
                    ServerPacket::GameStateUpdate {
                        state: state.clone(),
                    },
                ));
            }
        }
    }

    /// Marks `name` as away.
    ///
    /// In a running match the lobby is paused and the opponent told. A
    /// player waiting alone has nobody to wait for them, so their lobby and
    /// session are torn down on the spot.
    pub(crate) fn demote(&mut self, name: &str, now: Instant, outbox: &mut Outbox) {
        let lobby_id = self.sessions.get(name).and_then(|session| session.lobby);
        if !self.sessions.mark_disconnected(name, now) {
            return;
        }

        match lobby_id.and_then(|id| self.lobbies.get_mut(id)) {
            Some(lobby) if lobby.is_full() => {
                lobby.paused = true;
                if let Some(addr) = lobby
                    .opponent_of(name)
                    .and_then(|opponent| self.sessions.connected_addr(opponent))
                {
                    outbox.push(Outgoing::new(
                        addr,
                        ServerPacket::PlayerDisconnected {
                            player: name.to_string(),
                            message: format!("Player {} has disconnected.", name),
                        },
                    ));
                }
            }
            _ => {
                info!("Player {} left while waiting, closing their lobby", name);
                if let Some(id) = lobby_id {
                    self.lobbies.remove(id);
                }
                self.sessions.remove(name);
            }
        }
    }

    /// Destroys a lobby together with the sessions of its occupants.
    pub(crate) fn end_match(&mut self, id: LobbyId) {
        if let Some(lobby) = self.lobbies.remove(id) {
            for name in lobby.occupants() {
                self.sessions.remove(name);
            }
        }
    }
}

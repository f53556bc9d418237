//! Inbound message routing and the notifications each transition produces.
//!
//! Handlers run synchronously against `&mut World` and never touch the
//! socket. Everything a transition wants to send is collected into an
//! [`Outbox`] that the caller forwards to the sender task, still in the
//! order the handler produced it.

use crate::error::GameError;
use crate::lobby::LobbyId;
use crate::session::validate_name;
use crate::table::{Effect, Seat};
use crate::world::World;
use log::{debug, info, warn};
use shared::{Card, ClientPacket, ServerPacket};
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;

/// A packet addressed to one client endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub addr: SocketAddr,
    pub packet: ServerPacket,
}

impl Outgoing {
    pub fn new(addr: SocketAddr, packet: ServerPacket) -> Self {
        Self { addr, packet }
    }
}

pub type Outbox = Vec<Outgoing>;

/// Hands an outbox to the sender task. Returns false once the sender is gone.
pub fn forward(outbox: Outbox, outbound: &mpsc::UnboundedSender<Outgoing>) -> bool {
    for outgoing in outbox {
        if let Err(e) = outbound.send(outgoing) {
            warn!("Sender task is gone, dropping packet for {}", e.0.addr);
            return false;
        }
    }
    true
}

impl World {
    /// Applies one inbound message and returns the packets it produces.
    ///
    /// A rejected message leaves the world untouched and yields a single
    /// error reply to `addr`.
    pub fn dispatch(&mut self, packet: ClientPacket, addr: SocketAddr, now: Instant) -> Outbox {
        debug!("Handling {:?} from {}", packet, addr);
        let speaker = packet.player_name().to_string();
        let mut outbox = Outbox::new();

        let result = match packet {
            ClientPacket::Connect { name } => self.handle_connect(&name, addr, now, &mut outbox),
            ClientPacket::Heartbeat { name } => {
                self.handle_heartbeat(&name, addr, now, &mut outbox)
            }
            ClientPacket::PlayCard { player_name, card } => {
                self.handle_play_card(&player_name, &card, now, &mut outbox)
            }
            ClientPacket::DrawCard { player_name } => {
                self.handle_draw_card(&player_name, now, &mut outbox)
            }
            ClientPacket::Disconnect { name } => {
                self.handle_disconnect(&name, addr, now, &mut outbox)
            }
        };

        if let Err(error) = result {
            warn!("Rejected message from {} at {}: {}", speaker, addr, error);
            outbox.push(Outgoing::new(addr, error.to_packet()));
        }
        outbox
    }

    fn handle_connect(
        &mut self,
        name: &str,
        addr: SocketAddr,
        now: Instant,
        outbox: &mut Outbox,
    ) -> Result<(), GameError> {
        let name = validate_name(name)?;
        if let Some(session) = self.sessions.get(&name) {
            if session.is_connected() {
                return Err(GameError::NameTaken);
            }
            return self.reconnect(&name, addr, now, outbox);
        }

        let lobby_id = self
            .lobbies
            .join(&name, &mut self.rng, self.config.hand_size)?;
        let session = self.sessions.register(&name, addr, now)?;
        session.lobby = Some(lobby_id);

        let state = self.lobbies.get(lobby_id).and_then(|lobby| lobby.snapshot());
        let started = state.is_some();
        outbox.push(Outgoing::new(
            addr,
            ServerPacket::ConnectAck {
                player_id: name,
                waiting_for_player: !started,
                state,
            },
        ));

        if started {
            self.push_state(lobby_id, outbox);
        }
        Ok(())
    }

    fn handle_heartbeat(
        &mut self,
        name: &str,
        addr: SocketAddr,
        now: Instant,
        outbox: &mut Outbox,
    ) -> Result<(), GameError> {
        let name = name.trim();
        match self.sessions.get(name) {
            None => Err(GameError::SessionNotFound(name.to_string())),
            Some(session) if session.is_connected() => {
                self.sessions.touch(name, addr, now);
                Ok(())
            }
            Some(_) => self.reconnect(name, addr, now, outbox),
        }
    }

    fn handle_play_card(
        &mut self,
        player_name: &str,
        card: &str,
        now: Instant,
        outbox: &mut Outbox,
    ) -> Result<(), GameError> {
        let name = player_name.trim();
        let (lobby_id, seat) = self.seat_for_action(name)?;

        let lobby = self
            .lobbies
            .get_mut(lobby_id)
            .ok_or(GameError::GameNotStarted)?;
        let table = lobby.table_mut().ok_or(GameError::GameNotStarted)?;
        if table.turn() != seat {
            return Err(GameError::NotYourTurn);
        }
        let card: Card = card.parse().map_err(|_| GameError::CardNotInHand)?;
        let outcome = table.play_card(seat, card, &mut self.rng)?;

        let opponent = lobby.opponent_of(name).map(str::to_string);
        self.refresh(name, now);
        info!("Player {} played {} in {}", name, outcome.card, lobby_id);

        if outcome.won {
            self.finish_with_winner(lobby_id, name, outbox);
            return Ok(());
        }

        let message = match outcome.effect {
            Effect::OpponentDraws(_) => format!(
                "Player {} played a seven, you take two cards and skip a turn.",
                name
            ),
            Effect::SkipOpponent => format!("Player {} played an ace you skip a turn.", name),
            Effect::None => format!("Player {} played a card.", name),
        };
        if let Some(addr) = opponent.and_then(|opponent| self.sessions.connected_addr(&opponent)) {
            outbox.push(Outgoing::new(
                addr,
                ServerPacket::PlayerPlayedCard {
                    player_name: name.to_string(),
                    message,
                },
            ));
        }

        self.push_state(lobby_id, outbox);
        Ok(())
    }

    fn handle_draw_card(
        &mut self,
        player_name: &str,
        now: Instant,
        outbox: &mut Outbox,
    ) -> Result<(), GameError> {
        let name = player_name.trim();
        let (lobby_id, seat) = self.seat_for_action(name)?;

        let lobby = self
            .lobbies
            .get_mut(lobby_id)
            .ok_or(GameError::GameNotStarted)?;
        let table = lobby.table_mut().ok_or(GameError::GameNotStarted)?;
        let drawn = table.draw_card(seat, &mut self.rng)?;

        let opponent = lobby.opponent_of(name).map(str::to_string);
        self.refresh(name, now);
        debug!("Player {} drew {} in {}", name, drawn, lobby_id);

        if let Some(addr) = opponent.and_then(|opponent| self.sessions.connected_addr(&opponent)) {
            outbox.push(Outgoing::new(
                addr,
                ServerPacket::PlayerDrawnCard {
                    player_name: name.to_string(),
                    message: format!("Player {} draw a card.", name),
                },
            ));
        }

        self.push_state(lobby_id, outbox);
        Ok(())
    }

    fn handle_disconnect(
        &mut self,
        name: &str,
        addr: SocketAddr,
        now: Instant,
        outbox: &mut Outbox,
    ) -> Result<(), GameError> {
        let name = name.trim();
        let session = self
            .sessions
            .get(name)
            .ok_or_else(|| GameError::SessionNotFound(name.to_string()))?;

        if !session.is_connected() {
            return Ok(());
        }
        if session.addr != addr {
            warn!(
                "Ignoring disconnect for {} from {}, session is bound to {}",
                name, addr, session.addr
            );
            return Ok(());
        }

        info!("Player {} asked to disconnect", name);
        self.demote(name, now, outbox);
        Ok(())
    }

    /// Restores a disconnected session and resumes its match.
    ///
    /// The session and its lobby are looked up again here, so a player whose
    /// match was forfeited in the meantime finds nothing to return to.
    fn reconnect(
        &mut self,
        name: &str,
        addr: SocketAddr,
        now: Instant,
        outbox: &mut Outbox,
    ) -> Result<(), GameError> {
        let lobby_id = match self.sessions.get(name) {
            Some(session) if !session.is_connected() => session.lobby,
            _ => return Err(GameError::InvalidReconnection),
        };
        let Some(lobby_id) = lobby_id.filter(|id| {
            self.lobbies
                .get(*id)
                .is_some_and(|lobby| lobby.is_full() && lobby.seat_of(name).is_some())
        }) else {
            warn!("Player {} has no match to return to, dropping session", name);
            self.sessions.remove(name);
            return Err(GameError::InvalidReconnection);
        };

        self.sessions.reconnect(name, addr, now);

        let Some(lobby) = self.lobbies.get_mut(lobby_id) else {
            return Err(GameError::InvalidReconnection);
        };
        let everyone_back = lobby
            .occupants()
            .all(|occupant| self.sessions.get(occupant).is_some_and(|s| s.is_connected()));
        if everyone_back {
            lobby.paused = false;
            info!("{} resumed", lobby_id);
        }

        if let Some(state) = lobby.snapshot() {
            outbox.push(Outgoing::new(addr, ServerPacket::GameStateUpdate { state }));
        }
        if let Some(opponent_addr) = lobby
            .opponent_of(name)
            .and_then(|opponent| self.sessions.connected_addr(opponent))
        {
            outbox.push(Outgoing::new(
                opponent_addr,
                ServerPacket::PlayerReconnected {
                    player: name.to_string(),
                    message: format!("Player {} has reconnected.", name),
                },
            ));
        }
        Ok(())
    }

    /// Resolves the seat of a player who wants to act on their table.
    fn seat_for_action(&self, name: &str) -> Result<(LobbyId, Seat), GameError> {
        let session = self
            .sessions
            .get(name)
            .ok_or_else(|| GameError::SessionNotFound(name.to_string()))?;
        if !session.is_connected() {
            return Err(GameError::NotConnected);
        }

        let lobby = session
            .lobby
            .and_then(|id| self.lobbies.get(id))
            .ok_or_else(|| GameError::SessionNotFound(name.to_string()))?;
        if !lobby.is_full() {
            return Err(GameError::GameNotStarted);
        }
        let seat = lobby
            .seat_of(name)
            .ok_or_else(|| GameError::SessionNotFound(name.to_string()))?;
        Ok((lobby.id, seat))
    }

    fn refresh(&mut self, name: &str, now: Instant) {
        if let Some(session) = self.sessions.get_mut(name) {
            session.last_seen = now;
        }
    }

    fn finish_with_winner(&mut self, lobby_id: LobbyId, winner: &str, outbox: &mut Outbox) {
        info!("Player {} won {}", winner, lobby_id);
        let message = format!("Game Over! winner: {}", winner);

        if let Some(lobby) = self.lobbies.get(lobby_id) {
            for occupant in lobby.occupants() {
                if let Some(session) = self.sessions.get(occupant) {
                    outbox.push(Outgoing::new(
                        session.addr,
                        ServerPacket::GameOver {
                            winner: winner.to_string(),
                            message: message.clone(),
                        },
                    ));
                }
            }
        }
        self.end_match(lobby_id);
    }
}

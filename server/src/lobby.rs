//! Two-seat lobbies and the matchmaker that fills them.

use crate::error::GameError;
use crate::table::{GameTable, Seat};
use log::info;
use rand::Rng;
use shared::GameSnapshot;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LobbyId(pub u64);

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lobby-{}", self.0)
    }
}

/// A match container. Seats hold player names, which are keys into the
/// session registry; the table exists once both seats are taken.
#[derive(Debug, Clone)]
pub struct Lobby {
    pub id: LobbyId,
    seats: [Option<String>; 2],
    table: Option<GameTable>,
    /// Set while any occupant is disconnected.
    pub paused: bool,
}

impl Lobby {
    fn new(id: LobbyId) -> Self {
        Self {
            id,
            seats: [None, None],
            table: None,
            paused: false,
        }
    }

    pub fn is_full(&self) -> bool {
        self.seats.iter().all(Option::is_some)
    }

    fn free_seat(&self) -> Option<Seat> {
        Seat::BOTH
            .into_iter()
            .find(|seat| self.seats[seat.index()].is_none())
    }

    pub fn occupant(&self, seat: Seat) -> Option<&str> {
        self.seats[seat.index()].as_deref()
    }

    pub fn seat_of(&self, name: &str) -> Option<Seat> {
        Seat::BOTH
            .into_iter()
            .find(|seat| self.occupant(*seat) == Some(name))
    }

    /// The other occupant, if there is one.
    pub fn opponent_of(&self, name: &str) -> Option<&str> {
        self.seat_of(name)
            .and_then(|seat| self.occupant(seat.other()))
    }

    pub fn occupants(&self) -> impl Iterator<Item = &str> {
        self.seats.iter().filter_map(|seat| seat.as_deref())
    }

    /// Both names in seat order, once the lobby is full.
    pub fn names(&self) -> Option<[&str; 2]> {
        match (self.occupant(Seat::First), self.occupant(Seat::Second)) {
            (Some(first), Some(second)) => Some([first, second]),
            _ => None,
        }
    }

    pub fn table(&self) -> Option<&GameTable> {
        self.table.as_ref()
    }

    pub fn table_mut(&mut self) -> Option<&mut GameTable> {
        self.table.as_mut()
    }

    pub fn snapshot(&self) -> Option<GameSnapshot> {
        let names = self.names()?;
        let table = self.table.as_ref()?;
        Some(table.snapshot(names, self.paused))
    }

    #[cfg(test)]
    pub(crate) fn set_table(&mut self, table: GameTable) {
        self.table = Some(table);
    }
}

/// Owns every lobby and assigns arriving players to seats.
#[derive(Debug, Default)]
pub struct Matchmaker {
    lobbies: BTreeMap<LobbyId, Lobby>,
    next_id: u64,
}

impl Matchmaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seats `name` in the oldest lobby with a free seat, or in a new lobby.
    ///
    /// Taking the last free seat deals the game before returning, so a full
    /// lobby is never observed without its table.
    pub fn join<R: Rng + ?Sized>(
        &mut self,
        name: &str,
        rng: &mut R,
        hand_size: usize,
    ) -> Result<LobbyId, GameError> {
        let open = self
            .lobbies
            .values()
            .find_map(|lobby| lobby.free_seat().map(|seat| (lobby.id, seat)));

        let (id, seat) = match open {
            Some(found) => found,
            None => {
                self.next_id += 1;
                (LobbyId(self.next_id), Seat::First)
            }
        };

        let lobby = self.lobbies.entry(id).or_insert_with(|| {
            info!("Created {} for player {}", id, name);
            Lobby::new(id)
        });

        let fills_lobby = lobby.seats[seat.other().index()].is_some();
        if fills_lobby {
            lobby.table = Some(GameTable::deal(rng, hand_size)?);
        }
        lobby.seats[seat.index()] = Some(name.to_string());
        info!("Player {} joined {} as {:?} player", name, id, seat);

        if let Some([first, second]) = lobby.names() {
            info!("{} is full, starting game: {} vs {}", id, first, second);
        }
        Ok(id)
    }

    pub fn get(&self, id: LobbyId) -> Option<&Lobby> {
        self.lobbies.get(&id)
    }

    pub fn get_mut(&mut self, id: LobbyId) -> Option<&mut Lobby> {
        self.lobbies.get_mut(&id)
    }

    pub fn remove(&mut self, id: LobbyId) -> Option<Lobby> {
        let removed = self.lobbies.remove(&id);
        if removed.is_some() {
            info!("Deleted {}", id);
        }
        removed
    }

    pub fn ids(&self) -> Vec<LobbyId> {
        self.lobbies.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lobbies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lobbies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_first_player_waits_in_new_lobby() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut matchmaker = Matchmaker::new();

        let id = matchmaker.join("Ana", &mut rng, 4).unwrap();
        let lobby = matchmaker.get(id).unwrap();

        assert!(!lobby.is_full());
        assert!(lobby.table().is_none());
        assert!(lobby.snapshot().is_none());
        assert_eq!(lobby.occupant(Seat::First), Some("Ana"));
        assert_eq!(lobby.opponent_of("Ana"), None);
    }

    #[test]
    fn test_second_player_fills_lobby_and_deals() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut matchmaker = Matchmaker::new();

        let first = matchmaker.join("Ana", &mut rng, 4).unwrap();
        let second = matchmaker.join("Bo", &mut rng, 4).unwrap();
        assert_eq!(first, second);

        let lobby = matchmaker.get(first).unwrap();
        assert!(lobby.is_full());
        assert_eq!(lobby.names(), Some(["Ana", "Bo"]));
        assert_eq!(lobby.opponent_of("Bo"), Some("Ana"));
        assert_eq!(lobby.seat_of("Bo"), Some(Seat::Second));

        let snapshot = lobby.snapshot().unwrap();
        assert_eq!(snapshot.current_player, "Ana");
        assert_eq!(snapshot.hands["Ana"].len(), 4);
        assert_eq!(snapshot.hands["Bo"].len(), 4);
    }

    #[test]
    fn test_third_player_opens_new_lobby() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut matchmaker = Matchmaker::new();

        let first = matchmaker.join("Ana", &mut rng, 4).unwrap();
        matchmaker.join("Bo", &mut rng, 4).unwrap();
        let third = matchmaker.join("Cy", &mut rng, 4).unwrap();

        assert_ne!(first, third);
        assert_eq!(matchmaker.len(), 2);
        assert_eq!(matchmaker.get(third).unwrap().occupants().count(), 1);
    }

    #[test]
    fn test_oldest_open_lobby_is_filled_first() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut matchmaker = Matchmaker::new();

        let a = matchmaker.join("Ana", &mut rng, 4).unwrap();
        matchmaker.join("Bo", &mut rng, 4).unwrap();
        let c = matchmaker.join("Cy", &mut rng, 4).unwrap();
        matchmaker.remove(a);

        let d = matchmaker.join("Di", &mut rng, 4).unwrap();
        assert_eq!(c, d);
        assert!(matchmaker.get(c).unwrap().is_full());
    }

    #[test]
    fn test_failed_deal_leaves_seat_free() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut matchmaker = Matchmaker::new();

        let id = matchmaker.join("Ana", &mut rng, 20).unwrap();
        assert_eq!(
            matchmaker.join("Bo", &mut rng, 20),
            Err(GameError::DeckExhausted)
        );

        let lobby = matchmaker.get(id).unwrap();
        assert!(!lobby.is_full());
        assert_eq!(lobby.seat_of("Bo"), None);
    }
}

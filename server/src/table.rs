//! The Prší rules engine for a single two-player match.
//!
//! A [`GameTable`] owns every card of its match: the draw deck, the discard
//! pile (whose top card is kept apart so it always exists) and both hands.
//! Every operation validates first and mutates second, so a rejected move
//! leaves the table exactly as it was.

use crate::deck::{Deck, DrawOutcome};
use crate::error::GameError;
use rand::Rng;
use shared::{Card, GameSnapshot, Rank};
use std::collections::BTreeMap;

/// One of the two places at a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    pub const BOTH: [Seat; 2] = [Seat::First, Seat::Second];

    pub fn other(self) -> Seat {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }
}

/// Side effect triggered by the rank of a played card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// A seven: the opponent drew this many cards (two unless the deck ran
    /// out) and the player keeps the turn.
    OpponentDraws(usize),
    /// An ace: the opponent loses their turn.
    SkipOpponent,
}

impl Effect {
    pub fn keeps_turn(self) -> bool {
        !matches!(self, Effect::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayOutcome {
    pub card: Card,
    pub effect: Effect,
    /// The player emptied their hand with this card.
    pub won: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameTable {
    deck: Deck,
    /// Discard pile below the top card, oldest first.
    discard: Vec<Card>,
    top: Card,
    hands: [Vec<Card>; 2],
    turn: Seat,
}

impl GameTable {
    /// Shuffles a fresh deck, deals `hand_size` cards to each seat, turns up
    /// the first discard and gives the first seat the turn.
    pub fn deal<R: Rng + ?Sized>(rng: &mut R, hand_size: usize) -> Result<Self, GameError> {
        let mut deck = Deck::shuffled(rng);
        let mut hands = [Vec::with_capacity(hand_size), Vec::with_capacity(hand_size)];

        for seat in Seat::BOTH {
            for _ in 0..hand_size {
                match deck.draw() {
                    DrawOutcome::Drawn(card) => hands[seat.index()].push(card),
                    DrawOutcome::Exhausted => return Err(GameError::DeckExhausted),
                }
            }
        }

        let top = match deck.draw() {
            DrawOutcome::Drawn(card) => card,
            DrawOutcome::Exhausted => return Err(GameError::DeckExhausted),
        };

        Ok(Self {
            deck,
            discard: Vec::new(),
            top,
            hands,
            turn: Seat::First,
        })
    }

    pub fn turn(&self) -> Seat {
        self.turn
    }

    pub fn top_card(&self) -> Card {
        self.top
    }

    pub fn hand(&self, seat: Seat) -> &[Card] {
        &self.hands[seat.index()]
    }

    pub fn deck_size(&self) -> usize {
        self.deck.len()
    }

    /// Size of the discard pile including its top card.
    pub fn discard_size(&self) -> usize {
        self.discard.len() + 1
    }

    /// Cards across every container. Always [`shared::DECK_SIZE`].
    pub fn total_cards(&self) -> usize {
        self.deck_size() + self.discard_size() + self.hands.iter().map(Vec::len).sum::<usize>()
    }

    /// Plays `card` from `seat`'s hand onto the discard pile.
    pub fn play_card<R: Rng + ?Sized>(
        &mut self,
        seat: Seat,
        card: Card,
        rng: &mut R,
    ) -> Result<PlayOutcome, GameError> {
        if seat != self.turn {
            return Err(GameError::NotYourTurn);
        }
        let position = self.hands[seat.index()]
            .iter()
            .position(|held| *held == card)
            .ok_or(GameError::CardNotInHand)?;
        if !card.matches(&self.top) {
            return Err(GameError::InvalidMove);
        }

        let effect = match card.rank {
            Rank::Seven => {
                let drawn = (0..2)
                    .filter_map(|_| self.draw_into(seat.other(), rng))
                    .count();
                Effect::OpponentDraws(drawn)
            }
            Rank::Ace => Effect::SkipOpponent,
            _ => Effect::None,
        };

        self.hands[seat.index()].remove(position);
        self.discard.push(std::mem::replace(&mut self.top, card));

        let won = self.hands[seat.index()].is_empty();
        if !won && !effect.keeps_turn() {
            self.turn = seat.other();
        }

        Ok(PlayOutcome { card, effect, won })
    }

    /// Draws one card for `seat` and passes the turn.
    pub fn draw_card<R: Rng + ?Sized>(&mut self, seat: Seat, rng: &mut R) -> Result<Card, GameError> {
        if seat != self.turn {
            return Err(GameError::NotYourTurn);
        }
        let card = self
            .draw_into(seat, rng)
            .ok_or(GameError::DeckExhausted)?;
        self.turn = seat.other();
        Ok(card)
    }

    /// Moves the deck's top card into `seat`'s hand, first recycling the
    /// discard pile (minus its top card) if the deck is empty. Returns
    /// `None` without touching anything when there is nothing to recycle.
    fn draw_into<R: Rng + ?Sized>(&mut self, seat: Seat, rng: &mut R) -> Option<Card> {
        if self.deck.is_empty() {
            if self.discard.is_empty() {
                return None;
            }
            let recycled = std::mem::take(&mut self.discard);
            self.deck.refill(recycled, rng);
        }

        match self.deck.draw() {
            DrawOutcome::Drawn(card) => {
                self.hands[seat.index()].push(card);
                Some(card)
            }
            DrawOutcome::Exhausted => None,
        }
    }

    /// Wire view of the table. `names` are the occupants in seat order.
    pub fn snapshot(&self, names: [&str; 2], paused: bool) -> GameSnapshot {
        let hands: BTreeMap<String, Vec<Card>> = Seat::BOTH
            .into_iter()
            .map(|seat| (names[seat.index()].to_string(), self.hand(seat).to_vec()))
            .collect();

        GameSnapshot {
            players: names.iter().map(|name| name.to_string()).collect(),
            current_player: names[self.turn.index()].to_string(),
            deck_size: self.deck_size(),
            discard_pile: self.discard_size(),
            top_card: self.top,
            paused,
            hands,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        deck: Vec<Card>,
        discard: Vec<Card>,
        top: Card,
        hands: [Vec<Card>; 2],
        turn: Seat,
    ) -> Self {
        Self {
            deck: Deck::from_cards(deck),
            discard,
            top,
            hands,
            turn,
        }
    }

    #[cfg(test)]
    pub(crate) fn all_cards(&self) -> Vec<Card> {
        let mut cards = self.deck.cards().to_vec();
        cards.extend_from_slice(&self.discard);
        cards.push(self.top);
        for hand in &self.hands {
            cards.extend_from_slice(hand);
        }
        cards
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::{Suit, DECK_SIZE};
    use std::collections::HashSet;

    pub(crate) fn card(text: &str) -> Card {
        text.parse().unwrap()
    }

    /// Splits the 32 cards into the given hands and top card; everything
    /// else goes into the deck, in full-deck order.
    pub(crate) fn table_with(first: &[&str], second: &[&str], top: &str, turn: Seat) -> GameTable {
        let first: Vec<Card> = first.iter().map(|c| card(c)).collect();
        let second: Vec<Card> = second.iter().map(|c| card(c)).collect();
        let top = card(top);
        let deck = Card::full_deck()
            .into_iter()
            .filter(|c| *c != top && !first.contains(c) && !second.contains(c))
            .collect();
        GameTable::from_parts(deck, Vec::new(), top, [first, second], turn)
    }

    fn assert_conserved(table: &GameTable) {
        let cards = table.all_cards();
        assert_eq!(cards.len(), DECK_SIZE);
        assert_eq!(table.total_cards(), DECK_SIZE);
        let unique: HashSet<Card> = cards.into_iter().collect();
        assert_eq!(unique.len(), DECK_SIZE);
    }

    #[test]
    fn test_deal_initial_layout() {
        let mut rng = StdRng::seed_from_u64(42);
        let table = GameTable::deal(&mut rng, 4).unwrap();

        assert_eq!(table.hand(Seat::First).len(), 4);
        assert_eq!(table.hand(Seat::Second).len(), 4);
        assert_eq!(table.deck_size(), 23);
        assert_eq!(table.discard_size(), 1);
        assert_eq!(table.turn(), Seat::First);
        assert_conserved(&table);
    }

    #[test]
    fn test_play_rejects_wrong_turn() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut table = table_with(&["8♥", "9♣"], &["8♠", "9♦"], "K♥", Seat::First);
        let before = table.clone();

        let result = table.play_card(Seat::Second, card("8♠"), &mut rng);
        assert_eq!(result, Err(GameError::NotYourTurn));
        assert_eq!(table, before);
    }

    #[test]
    fn test_play_rejects_card_not_in_hand() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut table = table_with(&["8♥", "9♣"], &["8♠", "9♦"], "K♥", Seat::First);
        let before = table.clone();

        let result = table.play_card(Seat::First, card("8♠"), &mut rng);
        assert_eq!(result, Err(GameError::CardNotInHand));
        assert_eq!(table, before);
    }

    #[test]
    fn test_play_rejects_unmatched_card_without_mutation() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut table = table_with(&["8♥", "9♣"], &["8♠", "9♦"], "K♥", Seat::First);
        let before = table.clone();

        let result = table.play_card(Seat::First, card("9♣"), &mut rng);
        assert_eq!(result, Err(GameError::InvalidMove));
        assert_eq!(table, before);
    }

    #[test]
    fn test_plain_card_passes_turn() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut table = table_with(&["8♥", "9♣"], &["8♠", "9♦"], "K♥", Seat::First);

        let outcome = table.play_card(Seat::First, card("8♥"), &mut rng).unwrap();

        assert_eq!(outcome.effect, Effect::None);
        assert!(!outcome.won);
        assert_eq!(table.turn(), Seat::Second);
        assert_eq!(table.top_card(), card("8♥"));
        assert_eq!(table.discard_size(), 2);
        assert_eq!(table.hand(Seat::First), &[card("9♣")]);
        assert_conserved(&table);
    }

    #[test]
    fn test_rank_match_is_legal() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut table = table_with(&["K♣", "9♣"], &["8♠"], "K♥", Seat::First);

        assert!(table.play_card(Seat::First, card("K♣"), &mut rng).is_ok());
    }

    #[test]
    fn test_seven_makes_opponent_draw_two_and_keeps_turn() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut table = table_with(&["7♥", "9♣"], &["8♠", "9♦"], "K♥", Seat::First);
        let deck_before = table.deck_size();

        let outcome = table.play_card(Seat::First, card("7♥"), &mut rng).unwrap();

        assert_eq!(outcome.effect, Effect::OpponentDraws(2));
        assert_eq!(table.turn(), Seat::First);
        assert_eq!(table.hand(Seat::Second).len(), 4);
        assert_eq!(table.deck_size(), deck_before - 2);
        assert_eq!(table.discard_size(), 2);
        assert_conserved(&table);
    }

    #[test]
    fn test_ace_keeps_turn_without_draw() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut table = table_with(&["A♥", "9♣"], &["8♠", "9♦"], "K♥", Seat::First);

        let outcome = table.play_card(Seat::First, card("A♥"), &mut rng).unwrap();

        assert_eq!(outcome.effect, Effect::SkipOpponent);
        assert_eq!(table.turn(), Seat::First);
        assert_eq!(table.hand(Seat::Second).len(), 2);
    }

    #[test]
    fn test_last_card_wins() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut table = table_with(&["Q♥"], &["8♠", "9♦"], "K♥", Seat::First);

        let outcome = table.play_card(Seat::First, card("Q♥"), &mut rng).unwrap();

        assert!(outcome.won);
        assert!(table.hand(Seat::First).is_empty());
    }

    #[test]
    fn test_seven_as_last_card_still_wins() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut table = table_with(&["7♥"], &["8♠"], "K♥", Seat::First);

        let outcome = table.play_card(Seat::First, card("7♥"), &mut rng).unwrap();

        assert!(outcome.won);
        assert_eq!(table.hand(Seat::Second).len(), 3);
    }

    #[test]
    fn test_draw_passes_turn() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut table = table_with(&["8♥"], &["8♠"], "K♥", Seat::First);
        let deck_before = table.deck_size();

        let drawn = table.draw_card(Seat::First, &mut rng).unwrap();

        assert!(table.hand(Seat::First).contains(&drawn));
        assert_eq!(table.deck_size(), deck_before - 1);
        assert_eq!(table.turn(), Seat::Second);
        assert_eq!(
            table.draw_card(Seat::First, &mut rng),
            Err(GameError::NotYourTurn)
        );
    }

    #[test]
    fn test_draw_recycles_discard_except_top() {
        let mut rng = StdRng::seed_from_u64(3);
        let top = card("K♥");
        let buried = vec![card("8♥"), card("9♥"), card("10♥")];
        let hands = [Vec::new(), Vec::new()];
        let mut table = GameTable::from_parts(Vec::new(), buried.clone(), top, hands, Seat::First);

        let drawn = table.draw_card(Seat::First, &mut rng).unwrap();

        assert!(buried.contains(&drawn));
        assert_eq!(table.top_card(), top);
        assert_eq!(table.discard_size(), 1);
        assert_eq!(table.deck_size(), 2);
    }

    #[test]
    fn test_draw_fails_when_nothing_to_recycle() {
        let mut rng = StdRng::seed_from_u64(0);
        let hands = [vec![card("8♠")], vec![card("9♠")]];
        let mut table = GameTable::from_parts(Vec::new(), Vec::new(), card("K♥"), hands, Seat::First);
        let before = table.clone();

        assert_eq!(
            table.draw_card(Seat::First, &mut rng),
            Err(GameError::DeckExhausted)
        );
        assert_eq!(table, before);
    }

    #[test]
    fn test_seven_with_short_deck_draws_what_is_left() {
        let mut rng = StdRng::seed_from_u64(0);
        let deck = vec![card("8♦")];
        let hands = [vec![card("7♥"), card("9♣")], vec![card("8♠")]];
        let mut table = GameTable::from_parts(deck, Vec::new(), card("K♥"), hands, Seat::First);

        let outcome = table.play_card(Seat::First, card("7♥"), &mut rng).unwrap();

        assert_eq!(outcome.effect, Effect::OpponentDraws(1));
        assert_eq!(table.hand(Seat::Second).len(), 2);
        assert_eq!(table.turn(), Seat::First);
    }

    #[test]
    fn test_random_games_conserve_cards() {
        let mut rng = StdRng::seed_from_u64(2024);

        for _ in 0..50 {
            let mut table = GameTable::deal(&mut rng, 4).unwrap();

            for _ in 0..200 {
                let seat = table.turn();
                let top = table.top_card();
                let playable = table.hand(seat).iter().copied().find(|c| c.matches(&top));

                let result = match playable {
                    Some(card) => table.play_card(seat, card, &mut rng).map(|o| o.won),
                    None => table.draw_card(seat, &mut rng).map(|_| false),
                };
                assert_conserved(&table);

                match result {
                    Ok(true) | Err(GameError::DeckExhausted) => break,
                    Ok(false) => {}
                    Err(e) => panic!("Unexpected error {:?}", e),
                }
            }
        }
    }

    #[test]
    fn test_snapshot_names_hands_by_player() {
        let table = table_with(&["8♥"], &["8♠", "9♠"], "K♥", Seat::Second);
        let snapshot = table.snapshot(["Ana", "Bo"], true);

        assert_eq!(snapshot.players, vec!["Ana", "Bo"]);
        assert_eq!(snapshot.current_player, "Bo");
        assert_eq!(snapshot.deck_size, 28);
        assert_eq!(snapshot.discard_pile, 1);
        assert_eq!(snapshot.top_card, Card::new(Suit::Hearts, Rank::King));
        assert!(snapshot.paused);
        assert_eq!(snapshot.hands["Ana"].len(), 1);
        assert_eq!(snapshot.hands["Bo"].len(), 2);
    }
}

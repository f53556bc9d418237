use rand::seq::SliceRandom;
use rand::Rng;
use shared::Card;

/// Result of drawing from a [`Deck`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    Drawn(Card),
    Exhausted,
}

/// Ordered draw pile. The top of the deck is the end of the vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// A full 32-card deck in random order.
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut cards = Card::full_deck();
        cards.shuffle(rng);
        Self { cards }
    }

    /// A deck with the given cards, last element on top.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn draw(&mut self) -> DrawOutcome {
        match self.cards.pop() {
            Some(card) => DrawOutcome::Drawn(card),
            None => DrawOutcome::Exhausted,
        }
    }

    /// Shuffles `cards` and puts them underneath whatever is left.
    pub fn refill<R: Rng + ?Sized>(&mut self, mut cards: Vec<Card>, rng: &mut R) {
        cards.shuffle(rng);
        cards.append(&mut self.cards);
        self.cards = cards;
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, card: &Card) -> bool {
        self.cards.contains(card)
    }

    #[cfg(test)]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

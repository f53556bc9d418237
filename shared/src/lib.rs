//! Types shared between the Prší server and its clients: the card values
//! and the JSON wire protocol.

pub mod card;
pub mod protocol;

pub use card::{Card, ParseCardError, Rank, Suit, DECK_SIZE};
pub use protocol::{
    decode_client_packet, encode, ClientPacket, CodecError, GameSnapshot, ServerPacket,
    MAX_DATAGRAM_SIZE, RESERVED_FIELDS,
};

//! Stream Framing
//!
//! The protocol has no outer length prefix: a message's extent is only known
//! by decoding it. `MessageAssembler` buffers bytes from a reliable stream
//! and extracts whole messages as the codec recognizes them, keeping partial
//! tails around until the next read completes them.
//!
//! A `MAX_BUFFERED_BYTES` guard protects against unbounded allocation from a
//! hostile length prefix: if the accumulator outgrows the cap while the
//! front message is still incomplete, the stream is treated as broken. No
//! legal message in this protocol comes near the cap.

use std::marker::PhantomData;

use thiserror::Error;

use crate::codec::{decode_prefix, Decode, DecodeError};

/// Upper bound on bytes buffered for a single in-flight message (4 MiB).
pub const MAX_BUFFERED_BYTES: usize = 4 * 1024 * 1024;

/// Fatal framing failures. Either one means the stream must be closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FramingError {
    /// The stream carries bytes that can never form a valid message.
    #[error("malformed message on stream")]
    Malformed,

    /// A message stayed incomplete past [`MAX_BUFFERED_BYTES`].
    #[error("message exceeds {MAX_BUFFERED_BYTES} buffered bytes")]
    Oversized,
}

/// Reassembles messages of type `T` from arbitrarily chunked stream reads.
#[derive(Debug)]
pub struct MessageAssembler<T> {
    buffer: Vec<u8>,
    _message: PhantomData<T>,
}

impl<T: Decode> MessageAssembler<T> {
    /// Create an assembler with an empty accumulator.
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            _message: PhantomData,
        }
    }

    /// Append freshly read bytes and extract every message they complete.
    ///
    /// Returns all fully decoded messages in stream order. An empty vector
    /// means the buffered bytes form only a prefix of the next message.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<T>, FramingError> {
        self.buffer.extend_from_slice(chunk);

        let mut messages = Vec::new();
        loop {
            match decode_prefix::<T>(&self.buffer) {
                Ok((message, consumed)) => {
                    self.buffer.drain(..consumed);
                    messages.push(message);
                }
                Err(DecodeError::Incomplete) => {
                    if self.buffer.len() > MAX_BUFFERED_BYTES {
                        return Err(FramingError::Oversized);
                    }
                    break;
                }
                Err(DecodeError::Invalid) => return Err(FramingError::Malformed),
            }
        }
        Ok(messages)
    }

    /// Number of bytes waiting for the rest of a message.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

impl<T: Decode> Default for MessageAssembler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_to_vec;
    use crate::message::{ClientMessage, ServerMessage};
    use crate::types::{Direction, GameSettings};

    fn hello_bytes() -> Vec<u8> {
        encode_to_vec(&ServerMessage::Hello(GameSettings {
            server_name: "abc".into(),
            players_count: 2,
            size_x: 16,
            size_y: 16,
            game_length: 10,
            explosion_radius: 3,
            bomb_timer: 5,
        }))
    }

    #[test]
    fn test_split_feed_completes_on_second_chunk() {
        let bytes = hello_bytes();
        let mut assembler = MessageAssembler::<ServerMessage>::new();

        let first = assembler.feed(&bytes[..5]).unwrap();
        assert!(first.is_empty());
        assert_eq!(assembler.buffered(), 5);

        let second = assembler.feed(&bytes[5..]).unwrap();
        assert_eq!(second.len(), 1);
        assert!(matches!(second[0], ServerMessage::Hello(_)));
        assert_eq!(assembler.buffered(), 0);
    }

    #[test]
    fn test_byte_at_a_time_feed() {
        let bytes = hello_bytes();
        let mut assembler = MessageAssembler::<ServerMessage>::new();
        let mut decoded = Vec::new();
        for byte in &bytes {
            decoded.extend(assembler.feed(std::slice::from_ref(byte)).unwrap());
        }
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn test_multiple_messages_in_one_chunk() {
        let mut bytes = encode_to_vec(&ClientMessage::Join { name: "bot".into() });
        bytes.extend(encode_to_vec(&ClientMessage::PlaceBomb));
        bytes.extend(encode_to_vec(&ClientMessage::Move {
            direction: Direction::Right,
        }));

        let mut assembler = MessageAssembler::<ClientMessage>::new();
        let messages = assembler.feed(&bytes).unwrap();
        assert_eq!(
            messages,
            vec![
                ClientMessage::Join { name: "bot".into() },
                ClientMessage::PlaceBomb,
                ClientMessage::Move {
                    direction: Direction::Right
                },
            ]
        );
    }

    #[test]
    fn test_partial_tail_is_kept_after_full_message() {
        let full = encode_to_vec(&ClientMessage::PlaceBlock);
        let next = encode_to_vec(&ClientMessage::Join { name: "late".into() });

        let mut chunk = full.clone();
        chunk.extend_from_slice(&next[..2]);

        let mut assembler = MessageAssembler::<ClientMessage>::new();
        let messages = assembler.feed(&chunk).unwrap();
        assert_eq!(messages, vec![ClientMessage::PlaceBlock]);
        assert_eq!(assembler.buffered(), 2);

        let rest = assembler.feed(&next[2..]).unwrap();
        assert_eq!(rest, vec![ClientMessage::Join { name: "late".into() }]);
    }

    #[test]
    fn test_malformed_stream_is_fatal() {
        let mut assembler = MessageAssembler::<ClientMessage>::new();
        assert_eq!(assembler.feed(&[0xFF]), Err(FramingError::Malformed));
    }

    #[test]
    fn test_oversized_incomplete_message_is_fatal() {
        // A sequence claiming u32::MAX events never completes; the guard
        // must trip once the accumulator outgrows the cap.
        let mut assembler = MessageAssembler::<ServerMessage>::new();
        let header = [3u8, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF];
        assert!(assembler.feed(&header).unwrap().is_empty());

        let filler = vec![0u8; MAX_BUFFERED_BYTES];
        assert_eq!(assembler.feed(&filler), Err(FramingError::Oversized));
    }
}

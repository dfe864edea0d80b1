//! Document payloads can outgrow what a single SCTP message may carry, so every
//! payload crosses the channel as one or more frames:
//!
//! ```text
//! | message id: u32 | index: u32 | flags: u8 | body ... |
//! ```
//!
//! The channel is ordered and reliable, so frames of one message arrive back
//! to back and a receiver only ever holds one partial message.

use crate::error::FrameError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Largest frame handed to the data channel, header included.
pub const MAX_FRAME_SIZE: usize = 16 * 1024;

/// Reassembled messages past this size are dropped.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

const HEADER_LEN: usize = 9;
const LAST_FRAME: u8 = 0x01;

/// Splits `payload` into frames tagged with `message_id`. An empty payload
/// still yields one frame so the receiver sees the message.
pub fn split_frames(message_id: u32, payload: &[u8]) -> Vec<Bytes> {
    let body_len = MAX_FRAME_SIZE - HEADER_LEN;
    let count = payload.len().div_ceil(body_len).max(1);

    (0..count)
        .map(|index| {
            let start = index * body_len;
            let end = (start + body_len).min(payload.len());

            let mut frame = BytesMut::with_capacity(HEADER_LEN + end - start);
            frame.put_u32(message_id);
            frame.put_u32(index as u32);
            frame.put_u8(if index + 1 == count { LAST_FRAME } else { 0 });
            frame.put_slice(&payload[start..end]);
            frame.freeze()
        })
        .collect()
}

struct Partial {
    message_id: u32,
    next_index: u32,
    buffer: BytesMut,
}

/// Joins frames back into whole messages.
#[derive(Default)]
pub struct Reassembler {
    partial: Option<Partial>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one frame. Returns the whole message once its last frame lands.
    ///
    /// A frame with index 0 always starts a new message, discarding whatever
    /// was pending. Any other error also discards the pending message.
    pub fn push(&mut self, mut frame: Bytes) -> Result<Option<Bytes>, FrameError> {
        if frame.len() < HEADER_LEN {
            self.partial = None;
            return Err(FrameError::Truncated(frame.len()));
        }

        let message_id = frame.get_u32();
        let index = frame.get_u32();
        let last = frame.get_u8() & LAST_FRAME != 0;

        if index == 0 {
            self.partial = None;
            if last {
                return Ok(Some(frame));
            }
            self.check_size(frame.len())?;
            self.partial = Some(Partial {
                message_id,
                next_index: 1,
                buffer: BytesMut::from(&frame[..]),
            });
            return Ok(None);
        }

        let in_sequence = self
            .partial
            .as_ref()
            .is_some_and(|p| p.message_id == message_id && p.next_index == index);
        if !in_sequence {
            self.partial = None;
            return Err(FrameError::OutOfSequence { message_id, index });
        }

        let pending = self.partial.as_ref().map_or(0, |p| p.buffer.len());
        self.check_size(pending + frame.len())?;

        let Some(partial) = self.partial.as_mut() else {
            return Err(FrameError::OutOfSequence { message_id, index });
        };
        partial.buffer.extend_from_slice(&frame);
        partial.next_index += 1;

        if last {
            Ok(self.partial.take().map(|p| p.buffer.freeze()))
        } else {
            Ok(None)
        }
    }

    pub fn has_partial(&self) -> bool {
        self.partial.is_some()
    }

    pub fn reset(&mut self) {
        self.partial = None;
    }

    fn check_size(&mut self, size: usize) -> Result<(), FrameError> {
        if size > MAX_MESSAGE_SIZE {
            self.partial = None;
            return Err(FrameError::TooLarge(size));
        }
        Ok(())
    }
}

//! Byte-stream framing
//!
//! Stream transports deliver arbitrary chunks; framers turn those chunks into
//! discrete messages and back. Three strategies are provided:
//!
//! - [`RawFramer`]: every chunk is one message (the transport already frames)
//! - [`ByteSeparatorFramer`]: messages end with a 1-2 byte separator (CR, LF, CRLF)
//! - [`SlipFramer`]: RFC 1055 style END/ESC byte stuffing
//!
//! Decoders carry incomplete tails across calls, so feeding the same bytes in
//! one call or in any number of fragments yields the same messages. Stateful
//! decoders refuse to buffer more than their maximum message size: the
//! partial frame is discarded and `decode` fails with
//! [`TransportError::MessageTooLarge`].

use bytes::{Buf, BufMut, Bytes, BytesMut};
use parking_lot::Mutex;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Result, TransportError};

/// SLIP frame delimiter
pub const SLIP_END: u8 = 0xC0;
/// SLIP escape introducer
pub const SLIP_ESC: u8 = 0xDB;
/// Escaped END
pub const SLIP_ESC_END: u8 = 0xDC;
/// Escaped ESC
pub const SLIP_ESC_ESC: u8 = 0xDD;

/// Default upper bound on a single decoded message
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Incremental message segmenter
pub trait Framer: Send {
    /// Feed a chunk of input and return every message it completes.
    ///
    /// On error the decoder has already been cleared; messages completed by
    /// the same chunk are discarded with it.
    fn decode(&mut self, data: &[u8]) -> Result<Vec<Bytes>>;

    /// Frame one outgoing message. Does not touch decode state.
    fn encode(&self, message: &[u8]) -> Bytes;

    /// Drop any partially decoded message
    fn clear(&mut self);
}

/// A framer shared between a connection task and its owner, so the owner can
/// keep (and clear) the same decode state across reconnects
pub type SharedFramer = Arc<Mutex<Box<dyn Framer>>>;

/// Pass-through framing
#[derive(Debug, Default, Clone, Copy)]
pub struct RawFramer;

impl Framer for RawFramer {
    fn decode(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        Ok(vec![Bytes::copy_from_slice(data)])
    }

    fn encode(&self, message: &[u8]) -> Bytes {
        Bytes::copy_from_slice(message)
    }

    fn clear(&mut self) {}
}

/// Separator-terminated framing
#[derive(Debug, Clone)]
pub struct ByteSeparatorFramer {
    separator: Vec<u8>,
    buffer: BytesMut,
    /// Offset in `buffer` where the next separator search starts
    scanned: usize,
    max_message_size: usize,
}

impl ByteSeparatorFramer {
    /// Separators must be one or two bytes long
    pub fn new(separator: &[u8]) -> Result<Self> {
        if separator.is_empty() || separator.len() > 2 {
            return Err(TransportError::InvalidFraming(format!(
                "separator must be 1 or 2 bytes, got {}",
                separator.len()
            )));
        }

        Ok(Self {
            separator: separator.to_vec(),
            buffer: BytesMut::new(),
            scanned: 0,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        })
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    pub fn separator(&self) -> &[u8] {
        &self.separator
    }

    /// Bytes held back waiting for a separator
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    fn find_separator(&self) -> Option<usize> {
        self.buffer[self.scanned..]
            .windows(self.separator.len())
            .position(|window| window == self.separator.as_slice())
            .map(|pos| self.scanned + pos)
    }

    fn too_large(&mut self, size: usize) -> TransportError {
        self.clear();
        TransportError::MessageTooLarge {
            size,
            max: self.max_message_size,
        }
    }
}

impl Framer for ByteSeparatorFramer {
    fn decode(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.buffer.extend_from_slice(data);

        let mut messages = Vec::new();
        while let Some(pos) = self.find_separator() {
            if pos > self.max_message_size {
                return Err(self.too_large(pos));
            }
            let message = self.buffer.split_to(pos).freeze();
            self.buffer.advance(self.separator.len());
            self.scanned = 0;
            messages.push(message);
        }

        // A separator may start in the last len - 1 bytes and finish in the next chunk
        self.scanned = self
            .buffer
            .len()
            .saturating_sub(self.separator.len() - 1);

        // Everything before `scanned` belongs to the pending message
        if self.scanned > self.max_message_size {
            let size = self.scanned;
            return Err(self.too_large(size));
        }
        Ok(messages)
    }

    fn encode(&self, message: &[u8]) -> Bytes {
        let mut framed = BytesMut::with_capacity(message.len() + self.separator.len());
        framed.extend_from_slice(message);
        framed.extend_from_slice(&self.separator);
        framed.freeze()
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }
}

/// SLIP framing
///
/// A byte other than ESC_END or ESC_ESC following ESC is dropped together with
/// the escape, and decoding continues with the current frame.
#[derive(Debug, Clone)]
pub struct SlipFramer {
    buffer: BytesMut,
    escape_pending: bool,
    max_message_size: usize,
}

impl Default for SlipFramer {
    fn default() -> Self {
        Self {
            buffer: BytesMut::new(),
            escape_pending: false,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl SlipFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    pub fn is_escape_pending(&self) -> bool {
        self.escape_pending
    }

    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }
}

impl Framer for SlipFramer {
    fn decode(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        let mut messages = Vec::new();

        for &byte in data {
            if self.escape_pending {
                match byte {
                    SLIP_ESC_END => self.buffer.put_u8(SLIP_END),
                    SLIP_ESC_ESC => self.buffer.put_u8(SLIP_ESC),
                    _ => {}
                }
                self.escape_pending = false;
            } else {
                match byte {
                    SLIP_ESC => self.escape_pending = true,
                    SLIP_END => {
                        // END with nothing buffered is an opening delimiter
                        if !self.buffer.is_empty() {
                            messages.push(self.buffer.split().freeze());
                        }
                    }
                    _ => self.buffer.put_u8(byte),
                }
            }

            if self.buffer.len() > self.max_message_size {
                let size = self.buffer.len();
                self.clear();
                return Err(TransportError::MessageTooLarge {
                    size,
                    max: self.max_message_size,
                });
            }
        }

        Ok(messages)
    }

    fn encode(&self, message: &[u8]) -> Bytes {
        let mut framed = BytesMut::with_capacity(message.len() + 2);
        framed.put_u8(SLIP_END);
        for &byte in message {
            match byte {
                SLIP_END => {
                    framed.put_u8(SLIP_ESC);
                    framed.put_u8(SLIP_ESC_END);
                }
                SLIP_ESC => {
                    framed.put_u8(SLIP_ESC);
                    framed.put_u8(SLIP_ESC_ESC);
                }
                _ => framed.put_u8(byte),
            }
        }
        framed.put_u8(SLIP_END);
        framed.freeze()
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.escape_pending = false;
    }
}

/// Framing selected by name in module params
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingMethod {
    Raw,
    Cr,
    Lf,
    CrLf,
    Slip,
}

impl FramingMethod {
    /// Build a fresh framer with empty decode state
    pub fn build(&self) -> Box<dyn Framer> {
        self.build_with_limit(DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Build a fresh framer that rejects messages longer than `max_message_size`
    pub fn build_with_limit(&self, max_message_size: usize) -> Box<dyn Framer> {
        match self {
            FramingMethod::Raw => Box::new(RawFramer),
            FramingMethod::Cr => Box::new(separator_framer(b"\r", max_message_size)),
            FramingMethod::Lf => Box::new(separator_framer(b"\n", max_message_size)),
            FramingMethod::CrLf => Box::new(separator_framer(b"\r\n", max_message_size)),
            FramingMethod::Slip => {
                Box::new(SlipFramer::new().with_max_message_size(max_message_size))
            }
        }
    }

    pub fn build_shared(&self) -> SharedFramer {
        Arc::new(Mutex::new(self.build()))
    }

    pub fn build_shared_with_limit(&self, max_message_size: usize) -> SharedFramer {
        Arc::new(Mutex::new(self.build_with_limit(max_message_size)))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FramingMethod::Raw => "RAW",
            FramingMethod::Cr => "CR",
            FramingMethod::Lf => "LF",
            FramingMethod::CrLf => "CRLF",
            FramingMethod::Slip => "SLIP",
        }
    }
}

fn separator_framer(separator: &'static [u8], max_message_size: usize) -> ByteSeparatorFramer {
    ByteSeparatorFramer {
        separator: separator.to_vec(),
        buffer: BytesMut::new(),
        scanned: 0,
        max_message_size,
    }
}

impl FromStr for FramingMethod {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "RAW" => Ok(FramingMethod::Raw),
            "CR" => Ok(FramingMethod::Cr),
            "LF" => Ok(FramingMethod::Lf),
            "CRLF" => Ok(FramingMethod::CrLf),
            "SLIP" => Ok(FramingMethod::Slip),
            other => Err(TransportError::InvalidFraming(format!(
                "unknown framing method: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for FramingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

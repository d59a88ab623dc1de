//! An owned, cursor-backed view over a single packet's payload bytes.
//!
//! A [`FramedStream`](crate::FramedStream) reads exactly `length` bytes off
//! the wire and hands them here as a `Buffer`, so every packet body is
//! decoded synchronously against an in-memory slice rather than the socket
//! directly.

use std::io::{Cursor, Read};

use crate::{read_varint, read_utf, Decode, ProtocolError, Result};

/// An in-memory, cursor-backed packet body.
#[derive(Debug, Clone)]
pub struct Buffer {
    cursor: Cursor<Vec<u8>>,
}

impl Buffer {
    /// Wraps the given bytes for sequential reading from the front.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Buffer {
            cursor: Cursor::new(data),
        }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        let pos = self.cursor.position() as usize;
        self.cursor.get_ref().len().saturating_sub(pos)
    }

    /// Reads `len` bytes, failing if fewer remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        if len > self.remaining() {
            return Err(ProtocolError::Truncated {
                wanted: len,
                available: self.remaining(),
            });
        }
        let mut buf = vec![0u8; len];
        self.cursor.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads the protocol VarInt at the cursor.
    pub fn read_varint(&mut self) -> Result<i32> {
        read_varint(&mut self.cursor)
    }

    /// Reads a length-prefixed UTF-8 string at the cursor.
    pub fn read_utf(&mut self) -> Result<String> {
        read_utf(&mut self.cursor)
    }

    /// Decodes a value of type `T` at the cursor.
    pub fn read<'a, T: Decode<'a>>(&mut self) -> Result<T> {
        T::decode(&mut self.cursor)
    }

    /// Consumes and returns every remaining byte.
    pub fn read_remaining(&mut self) -> Vec<u8> {
        let remaining = self.remaining();
        self.read_bytes(remaining)
            .expect("remaining() bytes are always readable")
    }
}

impl Read for Buffer {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

//! Typed argument streams.
//!
//! [`ArgumentWriter`] appends command arguments in the sensor's canonical
//! byte order (big-endian integers, IEEE-754 `f32`). [`ArgumentReader`] walks
//! a response payload the other way.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Appends typed values to a bounded buffer.
///
/// Implementors only provide [`put`](ArgumentWriter::put); a failed `put`
/// must leave the buffer untouched.
pub trait ArgumentWriter {
    /// Append raw bytes, or fail without writing anything.
    fn put(&mut self, bytes: &[u8]) -> Result<()>;

    fn add_u8(&mut self, value: u8) -> Result<()> {
        self.put(&[value])
    }

    /// Booleans travel as a single `0`/`1` byte.
    fn add_bool(&mut self, value: bool) -> Result<()> {
        self.add_u8(u8::from(value))
    }

    fn add_u16(&mut self, value: u16) -> Result<()> {
        self.put(&value.to_be_bytes())
    }

    fn add_i16(&mut self, value: i16) -> Result<()> {
        self.put(&value.to_be_bytes())
    }

    fn add_u32(&mut self, value: u32) -> Result<()> {
        self.put(&value.to_be_bytes())
    }

    fn add_i32(&mut self, value: i32) -> Result<()> {
        self.put(&value.to_be_bytes())
    }

    fn add_float(&mut self, value: f32) -> Result<()> {
        self.put(&value.to_bits().to_be_bytes())
    }

    fn add_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.put(data)
    }
}

/// Owned byte buffer with a hard capacity.
#[derive(Debug, Clone)]
pub struct ArgumentBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl ArgumentBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Start with `prefix` already written; capacity grows to fit it.
    pub(crate) fn with_prefix(capacity: usize, prefix: &[u8]) -> Self {
        let capacity = capacity.max(prefix.len());
        let mut buf = BytesMut::with_capacity(capacity);
        buf.put_slice(prefix);
        Self { buf, capacity }
    }

    /// Write cursor: number of bytes appended so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.buf.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

impl ArgumentWriter for ArgumentBuffer {
    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        let needed = self.buf.len() + bytes.len();
        if needed > self.capacity {
            return Err(FrameError::CapacityExceeded {
                needed,
                capacity: self.capacity,
            });
        }
        self.buf.put_slice(bytes);
        Ok(())
    }
}

/// Reads typed values from a response payload, front to back.
#[derive(Debug, Clone)]
pub struct ArgumentReader {
    data: Bytes,
}

impl ArgumentReader {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn remaining(&self) -> usize {
        self.data.remaining()
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.data.remaining() < needed {
            return Err(FrameError::PayloadTooShort {
                needed,
                remaining: self.data.remaining(),
            });
        }
        Ok(())
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.data.get_u8())
    }

    /// Any nonzero byte reads as `true`.
    pub fn get_bool(&mut self) -> Result<bool> {
        Ok(self.get_u8()? != 0)
    }

    pub fn get_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.data.get_u16())
    }

    pub fn get_i16(&mut self) -> Result<i16> {
        self.ensure(2)?;
        Ok(self.data.get_i16())
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.data.get_u32())
    }

    pub fn get_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.data.get_i32())
    }

    pub fn get_float(&mut self) -> Result<f32> {
        self.ensure(4)?;
        Ok(self.data.get_f32())
    }

    pub fn get_bytes(&mut self, len: usize) -> Result<Bytes> {
        self.ensure(len)?;
        Ok(self.data.split_to(len))
    }
}

use std::collections::VecDeque;

use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::{ReadChannel, WriteChannel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Byte(u8),
    Idle,
}

/// In-memory line: everything written can be read back in order.
///
/// Idle slots can be queued between bytes to model a UART that has not yet
/// received the rest of a frame. Each idle slot makes exactly one read return
/// `Ok(0)`.
#[derive(Debug, Default)]
pub struct Loopback {
    queue: VecDeque<Slot>,
    write_budget: Option<usize>,
    closed: bool,
}

impl Loopback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loopback preloaded with received bytes.
    pub fn with_bytes(bytes: &[u8]) -> Self {
        let mut lb = Self::new();
        lb.push(bytes);
        lb
    }

    /// Append bytes to the receive side.
    pub fn push(&mut self, bytes: &[u8]) {
        self.queue.extend(bytes.iter().copied().map(Slot::Byte));
    }

    /// Append `count` reads that report no data.
    pub fn push_idle(&mut self, count: usize) {
        self.queue.extend(std::iter::repeat(Slot::Idle).take(count));
    }

    /// Accept at most `bytes` more written bytes; later writes come up short.
    pub fn limit_writes(&mut self, bytes: usize) {
        self.write_budget = Some(bytes);
    }

    /// Fail every subsequent write, and every read once the queue is drained.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Number of buffered bytes (idle slots excluded).
    pub fn pending(&self) -> usize {
        self.queue
            .iter()
            .filter(|slot| matches!(slot, Slot::Byte(_)))
            .count()
    }

    /// Drain all buffered bytes, dropping idle slots.
    pub fn take_bytes(&mut self) -> Vec<u8> {
        self.queue
            .drain(..)
            .filter_map(|slot| match slot {
                Slot::Byte(b) => Some(b),
                Slot::Idle => None,
            })
            .collect()
    }
}

impl ReadChannel for Loopback {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.queue.front() {
            None if self.closed => return Err(TransportError::Closed),
            None => return Ok(0),
            Some(Slot::Idle) => {
                self.queue.pop_front();
                return Ok(0);
            }
            Some(Slot::Byte(_)) => {}
        }

        let mut n = 0;
        while n < buf.len() {
            match self.queue.front() {
                Some(Slot::Byte(b)) => {
                    buf[n] = *b;
                    n += 1;
                    self.queue.pop_front();
                }
                _ => break,
            }
        }
        Ok(n)
    }
}

impl WriteChannel for Loopback {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let accepted = match self.write_budget.as_mut() {
            Some(budget) => {
                let n = buf.len().min(*budget);
                *budget -= n;
                n
            }
            None => buf.len(),
        };
        if accepted < buf.len() {
            trace!(requested = buf.len(), accepted, "loopback short write");
        }
        self.push(&buf[..accepted]);
        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_bytes_read_back_in_order() {
        let mut lb = Loopback::new();
        assert_eq!(lb.write(&[1, 2, 3]).unwrap(), 3);

        let mut buf = [0u8; 2];
        assert_eq!(lb.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(lb.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 3);
        assert_eq!(lb.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn idle_slots_interrupt_reads() {
        let mut lb = Loopback::with_bytes(&[0xAA]);
        lb.push_idle(2);
        lb.push(&[0xBB]);

        let mut buf = [0u8; 4];
        assert_eq!(lb.read(&mut buf).unwrap(), 1);
        assert_eq!(lb.read(&mut buf).unwrap(), 0);
        assert_eq!(lb.read(&mut buf).unwrap(), 0);
        assert_eq!(lb.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 0xBB);
    }

    #[test]
    fn write_limit_produces_short_write() {
        let mut lb = Loopback::new();
        lb.limit_writes(2);
        assert_eq!(lb.write(&[1]).unwrap(), 1);
        assert_eq!(lb.write(&[2, 3]).unwrap(), 1);
        assert_eq!(lb.write(&[4]).unwrap(), 0);
        assert_eq!(lb.take_bytes(), vec![1, 2]);
    }

    #[test]
    fn closed_loopback_errors_once_drained() {
        let mut lb = Loopback::with_bytes(&[9]);
        lb.close();

        let mut buf = [0u8; 1];
        assert_eq!(lb.read(&mut buf).unwrap(), 1);
        assert!(matches!(lb.read(&mut buf), Err(TransportError::Closed)));
        assert!(matches!(lb.write(&[1]), Err(TransportError::Closed)));
    }

    #[test]
    fn pending_ignores_idle_slots() {
        let mut lb = Loopback::with_bytes(&[1, 2]);
        lb.push_idle(3);
        assert_eq!(lb.pending(), 2);
        assert_eq!(lb.take_bytes(), vec![1, 2]);
        assert_eq!(lb.pending(), 0);
    }
}

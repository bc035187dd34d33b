//! Byte stuffing and the additive frame checksum.
//!
//! Pure, I/O-free building blocks shared by the streaming encoder/decoder and
//! the in-memory codec. The checksum always covers original (unstuffed)
//! bytes.

/// Marks the start and end of every frame.
pub const FRAME_DELIMITER: u8 = 0x7E;

/// Escape marker; the following byte has bit 5 inverted.
pub const STUFF_BYTE: u8 = 0x7D;

/// Bit flipped in an escaped byte.
pub const STUFF_MASK: u8 = 0x20;

/// Values that never appear raw between two delimiters (XON, XOFF, escape,
/// delimiter).
pub const RESERVED: [u8; 4] = [0x11, 0x13, STUFF_BYTE, FRAME_DELIMITER];

/// Whether `byte` must be escaped on the wire.
pub fn needs_stuffing(byte: u8) -> bool {
    matches!(byte, 0x11 | 0x13 | STUFF_BYTE | FRAME_DELIMITER)
}

/// Running 8-bit additive checksum.
///
/// A frame is intact when header, payload and the transmitted complement sum
/// to `0xFF`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Checksum(u8);

impl Checksum {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn add(&mut self, byte: u8) {
        self.0 = self.0.wrapping_add(byte);
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// The byte transmitted at the end of a frame.
    pub fn complement(self) -> u8 {
        !self.0
    }

    /// True once the transmitted complement has been accumulated.
    pub fn is_valid(self) -> bool {
        self.0 == 0xFF
    }
}

/// Wire form of one frame byte: one raw byte or an escape pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StuffedByte {
    bytes: [u8; 2],
    len: usize,
}

impl StuffedByte {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn is_escaped(&self) -> bool {
        self.len == 2
    }
}

/// Accumulate `byte` into `checksum` and return its wire form.
pub fn stuff(byte: u8, checksum: &mut Checksum) -> StuffedByte {
    checksum.add(byte);
    if needs_stuffing(byte) {
        StuffedByte {
            bytes: [STUFF_BYTE, byte ^ STUFF_MASK],
            len: 2,
        }
    } else {
        StuffedByte {
            bytes: [byte, 0],
            len: 1,
        }
    }
}

/// Reverses [`stuff`] one raw wire byte at a time.
///
/// Keeping the "escape pending" flag here lets a caller stop between the
/// marker and the escaped byte (e.g. when the line runs dry) and resume later.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unstuffer {
    escaped: bool,
}

impl Unstuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one raw byte.
    ///
    /// Returns the recovered original byte, already added to `checksum`, or
    /// `None` when `raw` was an escape marker.
    pub fn feed(&mut self, raw: u8, checksum: &mut Checksum) -> Option<u8> {
        let byte = if self.escaped {
            self.escaped = false;
            raw ^ STUFF_MASK
        } else if raw == STUFF_BYTE {
            self.escaped = true;
            return None;
        } else {
            raw
        };
        checksum.add(byte);
        Some(byte)
    }

    /// True between an escape marker and the byte it escapes.
    pub fn is_pending(&self) -> bool {
        self.escaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_bytes_are_escaped() {
        for byte in RESERVED {
            let mut checksum = Checksum::new();
            let stuffed = stuff(byte, &mut checksum);
            assert!(stuffed.is_escaped());
            assert_eq!(stuffed.as_bytes(), &[STUFF_BYTE, byte ^ 0x20]);
            assert_eq!(checksum.value(), byte);
        }
    }

    #[test]
    fn other_bytes_pass_through() {
        for byte in (0u8..=255).filter(|b| !RESERVED.contains(b)) {
            let mut checksum = Checksum::new();
            let stuffed = stuff(byte, &mut checksum);
            assert_eq!(stuffed.as_bytes(), &[byte]);
        }
    }

    #[test]
    fn unstuffer_recovers_escaped_byte() {
        let mut checksum = Checksum::new();
        let mut unstuffer = Unstuffer::new();

        assert_eq!(unstuffer.feed(STUFF_BYTE, &mut checksum), None);
        assert!(unstuffer.is_pending());
        assert_eq!(checksum.value(), 0);

        assert_eq!(unstuffer.feed(0x5E, &mut checksum), Some(0x7E));
        assert!(!unstuffer.is_pending());
        assert_eq!(checksum.value(), 0x7E);
    }

    #[test]
    fn checksum_wraps_and_complements() {
        let mut checksum = Checksum::new();
        for byte in [0x00, 0x03, 0x00, 0xFF, 0x80] {
            checksum.add(byte);
        }
        assert_eq!(checksum.value(), 0x82);

        let complement = checksum.complement();
        checksum.add(complement);
        assert!(checksum.is_valid());
    }

    #[test]
    fn stuff_then_unstuff_matches_checksum() {
        let data = [0x00, 0x11, 0x7D, 0x42, 0x13, 0x7E];
        let mut tx = Checksum::new();
        let mut wire = Vec::new();
        for byte in data {
            wire.extend_from_slice(stuff(byte, &mut tx).as_bytes());
        }

        let mut rx = Checksum::new();
        let mut unstuffer = Unstuffer::new();
        let recovered: Vec<u8> = wire
            .iter()
            .filter_map(|raw| unstuffer.feed(*raw, &mut rx))
            .collect();

        assert_eq!(recovered, data);
        assert_eq!(rx, tx);
    }
}

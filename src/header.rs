//! Stream framing header.
//!
//! Every stream client receives exactly one copy of this 8-byte record as its
//! first binary message, before any video data: a 4-byte magic followed by the
//! frame width and height as big-endian `u16`s. Everything after it is raw
//! MPEG-1 elementary stream data with no additional framing.

/// Magic constant identifying the stream to the in-browser player.
pub const STREAM_MAGIC: [u8; 4] = *b"jsmp";

/// Encoded size of the header on the wire.
pub const HEADER_LEN: usize = 8;

/// The fixed per-connection framing header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    pub width: u16,
    pub height: u16,
}

impl StreamHeader {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Encode as `{magic, width BE, height BE}`.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[..4].copy_from_slice(&STREAM_MAGIC);
        buf[4..6].copy_from_slice(&self.width.to_be_bytes());
        buf[6..8].copy_from_slice(&self.height.to_be_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_magic_then_big_endian_dimensions() {
        let header = StreamHeader::new(640, 480);
        let bytes = header.encode();
        assert_eq!(&bytes[..4], b"jsmp");
        assert_eq!(bytes[4..6], [0x02, 0x80]); // 640
        assert_eq!(bytes[6..8], [0x01, 0xE0]); // 480
    }

    #[test]
    fn encodes_extreme_dimensions() {
        let bytes = StreamHeader::new(u16::MAX, 1).encode();
        assert_eq!(bytes[4..6], [0xFF, 0xFF]);
        assert_eq!(bytes[6..8], [0x00, 0x01]);
    }
}

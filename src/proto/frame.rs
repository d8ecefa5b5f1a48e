//! On-wire framing.
//!
//! Data frame, on the wire:
//!
//! ```text
//! | offset | size | field                                |
//! |--------|------|--------------------------------------|
//! | 0      | 10   | MD5 prefix over the compressed body   |
//! | 10     | var  | compressed body                       |
//! ```
//!
//! The compressed body, once inflated, is:
//!
//! ```text
//! | offset | size | field                    |
//! |--------|------|--------------------------|
//! | 0      | 2    | sender nonce (BE)        |
//! | 2      | 2    | sequence number (BE)     |
//! | 4      | var  | payload                  |
//! ```
//!
//! Ack frame, on the wire, 4 bytes, never compressed:
//!
//! ```text
//! | offset | size | field                              |
//! |--------|------|------------------------------------|
//! | 0      | 2    | receiver nonce (BE)                |
//! | 2      | 1    | checksum = (seq_lo + 1) mod 256    |
//! | 3      | 1    | cumulative sequence, low 8 bits     |
//! ```

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::{ACK_FRAME_LEN, INTEGRITY_TAG_LEN, MAX_DATAGRAM};
use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    pub nonce: u16,
    pub seq: u16,
    pub payload: Vec<u8>,
}

impl DataFrame {
    /// Builds the wire datagram: `md5(compressed)[..10] || compressed`.
    ///
    /// Returns `Error::FrameTooLarge` if the result would not fit in a
    /// single `MAX_DATAGRAM`-byte datagram; the caller should treat this as
    /// a configuration error, not a retry-able condition.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let mut body = Vec::with_capacity(4 + self.payload.len());
        body.extend_from_slice(&self.nonce.to_be_bytes());
        body.extend_from_slice(&self.seq.to_be_bytes());
        body.extend_from_slice(&self.payload);

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&body).expect("in-memory compression never fails");
        let compressed = encoder.finish().expect("in-memory compression never fails");

        let tag = &md5::compute(&compressed).0[..INTEGRITY_TAG_LEN];

        let mut frame = Vec::with_capacity(INTEGRITY_TAG_LEN + compressed.len());
        frame.extend_from_slice(tag);
        frame.extend_from_slice(&compressed);

        if frame.len() > MAX_DATAGRAM {
            return Err(Error::FrameTooLarge(frame.len(), MAX_DATAGRAM));
        }

        Ok(frame)
    }

    /// Validates the integrity tag, decompresses, and extracts the triple.
    ///
    /// Returns `None` on any malformed input: short datagram, tag mismatch,
    /// or a body that doesn't decompress. Malformed or corrupt frames are
    /// discarded silently by the caller, never surfaced as an error.
    pub fn decode(datagram: &[u8]) -> Option<Self> {
        if datagram.len() <= INTEGRITY_TAG_LEN {
            return None;
        }

        let (tag, compressed) = datagram.split_at(INTEGRITY_TAG_LEN);
        let expected = &md5::compute(compressed).0[..INTEGRITY_TAG_LEN];
        if tag != expected {
            return None;
        }

        let mut body = Vec::new();
        let mut decoder = ZlibDecoder::new(compressed);
        decoder.read_to_end(&mut body).ok()?;

        if body.len() < 4 {
            return None;
        }

        let nonce = u16::from_be_bytes([body[0], body[1]]);
        let seq = u16::from_be_bytes([body[2], body[3]]);
        let payload = body[4..].to_vec();

        Some(DataFrame { nonce, seq, payload })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckFrame {
    pub nonce: u16,
    /// Low 8 bits of the cumulative sequence acknowledged. The sender has
    /// to reconstruct the full 16-bit value from this and its own
    /// in-flight window, which is only unambiguous while that window
    /// stays well under 256 segments wide.
    pub seq_lo: u8,
}

impl AckFrame {
    pub fn encode(&self) -> [u8; ACK_FRAME_LEN] {
        let nonce = self.nonce.to_be_bytes();
        let checksum = self.seq_lo.wrapping_add(1);
        [nonce[0], nonce[1], checksum, self.seq_lo]
    }

    /// Returns `None` on a malformed or length-wrong ack; such acks are
    /// discarded silently rather than surfaced as an error.
    pub fn decode(datagram: &[u8]) -> Option<Self> {
        if datagram.len() != ACK_FRAME_LEN {
            return None;
        }

        let nonce = u16::from_be_bytes([datagram[0], datagram[1]]);
        let checksum = datagram[2];
        let seq_lo = datagram[3];

        if checksum != seq_lo.wrapping_add(1) {
            return None;
        }

        Some(AckFrame { nonce, seq_lo })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_frame_round_trips() {
        let frame = DataFrame {
            nonce: 7,
            seq: 42,
            payload: b"hello, world".to_vec(),
        };

        let wire = frame.encode().unwrap();
        let decoded = DataFrame::decode(&wire).unwrap();

        assert_eq!(decoded, frame);
    }

    #[test]
    fn data_frame_rejects_corrupted_tag() {
        let frame = DataFrame {
            nonce: 1,
            seq: 1,
            payload: b"payload".to_vec(),
        };

        let mut wire = frame.encode().unwrap();
        wire[0] ^= 0xff;

        assert!(DataFrame::decode(&wire).is_none());
    }

    #[test]
    fn data_frame_rejects_truncated_body() {
        let frame = DataFrame {
            nonce: 1,
            seq: 1,
            payload: b"payload".to_vec(),
        };

        let wire = frame.encode().unwrap();
        assert!(DataFrame::decode(&wire[..INTEGRITY_TAG_LEN + 2]).is_none());
    }

    #[test]
    fn data_frame_rejects_empty_input() {
        assert!(DataFrame::decode(&[]).is_none());
    }

    #[test]
    fn ack_frame_round_trips() {
        let ack = AckFrame { nonce: 1000, seq_lo: 250 };
        let wire = ack.encode();
        assert_eq!(AckFrame::decode(&wire), Some(ack));
    }

    #[test]
    fn ack_frame_rejects_bad_checksum() {
        let mut wire = AckFrame { nonce: 3, seq_lo: 5 }.encode();
        wire[2] = wire[2].wrapping_add(1);
        assert!(AckFrame::decode(&wire).is_none());
    }

    #[test]
    fn ack_frame_rejects_wrong_length() {
        assert!(AckFrame::decode(&[0, 1, 2]).is_none());
        assert!(AckFrame::decode(&[0, 1, 2, 3, 4]).is_none());
    }

    #[test]
    fn ack_checksum_wraps_at_255() {
        let ack = AckFrame { nonce: 0, seq_lo: 255 };
        let wire = ack.encode();
        assert_eq!(wire[2], 0);
        assert_eq!(AckFrame::decode(&wire), Some(ack));
    }
}

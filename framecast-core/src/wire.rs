//! Length-prefixed wire framing for compressed frames.
//!
//! ## Wire format
//!
//! One frame per message, no handshake, no checksum:
//!
//! ```text
//! | length: i32 little-endian (4) | payload: [u8; length] |
//! ```
//!
//! A declared length that is negative or exceeds [`MAX_FRAME_BYTES`]
//! is a protocol violation fatal to the connection, and is rejected
//! **before** any buffer is reserved for the payload. A clean EOF at a
//! frame boundary is a graceful peer close; EOF mid-frame is a
//! truncated-frame error.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CastError;

/// Size of the length prefix on the wire.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Upper bound on a single frame payload. A 4K frame JPEG-compressed at
/// streaming quality stays well under 2 MiB; anything near this bound
/// is a corrupt or hostile length prefix.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

// ── WireCodec ────────────────────────────────────────────────────

/// `tokio_util` codec implementing the length-prefixed frame protocol.
///
/// Each connection gets its own instance (the decoder carries that
/// connection's read cursor inside the `Framed` buffer).
#[derive(Debug, Default)]
pub struct WireCodec;

impl Decoder for WireCodec {
    type Item = Bytes;
    type Error = CastError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, CastError> {
        if src.len() < LENGTH_PREFIX_LEN {
            return Ok(None);
        }

        let declared = {
            let mut prefix = &src[..LENGTH_PREFIX_LEN];
            prefix.get_i32_le()
        };
        if declared < 0 {
            return Err(CastError::Protocol("negative frame length"));
        }
        let len = declared as usize;
        if len > MAX_FRAME_BYTES {
            return Err(CastError::FrameTooLarge {
                size: len,
                max: MAX_FRAME_BYTES,
            });
        }

        if src.len() < LENGTH_PREFIX_LEN + len {
            // Partial frame — reserve what we still need and wait.
            src.reserve(LENGTH_PREFIX_LEN + len - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX_LEN);
        Ok(Some(src.split_to(len).freeze()))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, CastError> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(CastError::Protocol("connection closed mid-frame")),
        }
    }
}

impl Encoder<Bytes> for WireCodec {
    type Error = CastError;

    fn encode(&mut self, payload: Bytes, dst: &mut BytesMut) -> Result<(), CastError> {
        if payload.len() > MAX_FRAME_BYTES {
            return Err(CastError::FrameTooLarge {
                size: payload.len(),
                max: MAX_FRAME_BYTES,
            });
        }
        dst.reserve(LENGTH_PREFIX_LEN + payload.len());
        dst.put_i32_le(payload.len() as i32);
        dst.extend_from_slice(&payload);
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_one(payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        WireCodec
            .encode(Bytes::copy_from_slice(payload), &mut buf)
            .unwrap();
        buf
    }

    #[test]
    fn roundtrip() {
        let payload = vec![0x42u8; 340];
        let mut buf = encode_one(&payload);
        let decoded = WireCodec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&decoded[..], &payload[..]);
        assert!(buf.is_empty());
    }

    #[test]
    fn roundtrip_empty_payload() {
        let mut buf = encode_one(&[]);
        assert_eq!(buf.len(), LENGTH_PREFIX_LEN);
        let decoded = WireCodec.decode(&mut buf).unwrap().unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn partial_prefix_yields_none() {
        let mut buf = BytesMut::from(&[0x01u8, 0x00][..]);
        assert!(WireCodec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn partial_payload_yields_none_until_complete() {
        let full = encode_one(&[7u8; 100]);
        let mut buf = BytesMut::from(&full[..50]);
        let mut codec = WireCodec;

        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&full[50..]);
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.len(), 100);
    }

    #[test]
    fn negative_length_is_protocol_error() {
        let mut buf = BytesMut::from(&(-1i32).to_le_bytes()[..]);
        assert!(matches!(
            WireCodec.decode(&mut buf),
            Err(CastError::Protocol(_))
        ));
    }

    #[test]
    fn oversized_length_is_rejected_before_buffering() {
        let declared = (MAX_FRAME_BYTES + 1) as i32;
        let mut buf = BytesMut::from(&declared.to_le_bytes()[..]);
        let before = buf.capacity();
        let err = WireCodec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, CastError::FrameTooLarge { .. }));
        // The declared length must not have been reserved.
        assert!(buf.capacity() <= before.max(LENGTH_PREFIX_LEN));
    }

    #[test]
    fn eof_mid_frame_is_truncation() {
        let full = encode_one(&[9u8; 64]);
        let mut buf = BytesMut::from(&full[..20]);
        assert!(matches!(
            WireCodec.decode_eof(&mut buf),
            Err(CastError::Protocol(_))
        ));
    }

    #[test]
    fn eof_at_boundary_is_clean() {
        let mut buf = BytesMut::new();
        assert!(WireCodec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn back_to_back_frames_decode_in_order() {
        let mut buf = encode_one(&[1u8; 120]);
        buf.extend_from_slice(&encode_one(&[2u8; 340]));
        buf.extend_from_slice(&encode_one(&[3u8; 58]));

        let mut codec = WireCodec;
        let sizes: Vec<usize> = std::iter::from_fn(|| {
            codec.decode(&mut buf).unwrap().map(|b| b.len())
        })
        .collect();
        assert_eq!(sizes, vec![120, 340, 58]);
    }

    #[test]
    fn encoder_rejects_oversized_payload() {
        let payload = Bytes::from(vec![0u8; MAX_FRAME_BYTES + 1]);
        let mut buf = BytesMut::new();
        assert!(matches!(
            WireCodec.encode(payload, &mut buf),
            Err(CastError::FrameTooLarge { .. })
        ));
        assert!(buf.is_empty());
    }
}

//! Self-describing payload codec.
//!
//! Stored bytes are `[flag][body]` where flag 0 = plain JSON and flag 1 =
//! zstd-compressed JSON. The flag makes decoding independent of whatever
//! threshold was active when the entry was written.

use crate::errors::{CacheError, CacheResult};

const FLAG_PLAIN: u8 = 0;
const FLAG_ZSTD: u8 = 1;

/// zstd level 3 is the library default; artifacts here are JSON and
/// compress 5-10x at negligible cost.
const ZSTD_LEVEL: i32 = 3;

/// Wraps `payload`, compressing when it reaches `threshold` bytes.
/// Returns the encoded bytes and whether compression happened.
pub fn encode(payload: &[u8], threshold: usize) -> CacheResult<(Vec<u8>, bool)> {
    if payload.len() >= threshold {
        let body = zstd::stream::encode_all(payload, ZSTD_LEVEL)
            .map_err(|e| CacheError::Codec(format!("zstd encode: {e}")))?;
        let mut out = Vec::with_capacity(body.len() + 1);
        out.push(FLAG_ZSTD);
        out.extend_from_slice(&body);
        Ok((out, true))
    } else {
        let mut out = Vec::with_capacity(payload.len() + 1);
        out.push(FLAG_PLAIN);
        out.extend_from_slice(payload);
        Ok((out, false))
    }
}

/// Reverses [`encode`]. Rejects unknown flags and empty buffers.
pub fn decode(stored: &[u8]) -> CacheResult<Vec<u8>> {
    match stored.split_first() {
        Some((&FLAG_PLAIN, body)) => Ok(body.to_vec()),
        Some((&FLAG_ZSTD, body)) => zstd::stream::decode_all(body)
            .map_err(|e| CacheError::Codec(format!("zstd decode: {e}"))),
        Some((flag, _)) => Err(CacheError::Codec(format!("unknown payload flag {flag}"))),
        None => Err(CacheError::Codec("empty payload".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_payload_stays_plain() {
        let (encoded, compressed) = encode(b"tiny", 1024).unwrap();
        assert!(!compressed);
        assert_eq!(encoded[0], FLAG_PLAIN);
        assert_eq!(decode(&encoded).unwrap(), b"tiny");
    }

    #[test]
    fn large_payload_round_trips_compressed() {
        let payload = vec![b'a'; 64 * 1024];
        let (encoded, compressed) = encode(&payload, 10 * 1024).unwrap();
        assert!(compressed);
        assert_eq!(encoded[0], FLAG_ZSTD);
        assert!(encoded.len() < payload.len());
        assert_eq!(decode(&encoded).unwrap(), payload);
    }

    #[test]
    fn exactly_at_threshold_compresses() {
        let payload = vec![b'x'; 100];
        let (encoded, compressed) = encode(&payload, 100).unwrap();
        assert!(compressed);
        assert_eq!(decode(&encoded).unwrap(), payload);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(decode(&[9, 1, 2, 3]).is_err());
        assert!(decode(&[]).is_err());
    }
}

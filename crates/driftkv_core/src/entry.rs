//! Entry codec.
//!
//! One entry is a `(key, value)` record framed on disk as:
//!
//! ```text
//! total_len (u32 LE) | key_len (u32 LE) | key bytes | value_len (u32 LE) | value bytes
//! ```
//!
//! `total_len` covers the whole frame including itself, so a frame can be
//! skipped or replayed from its first four bytes alone. Key and value are
//! UTF-8 and never empty.

use crate::error::{StoreError, StoreResult};

/// Fixed framing cost per entry: three `u32` length fields.
pub const FRAME_OVERHEAD: usize = 12;

/// A single key-value record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The key.
    pub key: String,
    /// The value.
    pub value: String,
}

impl Entry {
    /// Creates a new entry, rejecting empty keys and values.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> StoreResult<Self> {
        let key = key.into();
        let value = value.into();

        if key.is_empty() {
            return Err(StoreError::invalid_argument("key must not be empty"));
        }
        if value.is_empty() {
            return Err(StoreError::invalid_argument("value must not be empty"));
        }

        Ok(Self { key, value })
    }

    /// Returns the framed size of this entry in bytes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        FRAME_OVERHEAD + self.key.len() + self.value.len()
    }

    /// Encodes the entry into its on-disk frame.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let total = self.encoded_len();
        let mut buf = Vec::with_capacity(total);

        buf.extend_from_slice(&(total as u32).to_le_bytes());
        buf.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.key.as_bytes());
        buf.extend_from_slice(&(self.value.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.value.as_bytes());

        buf
    }

    /// Decodes exactly one entry from a frame.
    ///
    /// The buffer must hold the complete frame. Inconsistent lengths and
    /// non-UTF-8 payloads are corruption; truncated buffers are reported as
    /// corruption too, since torn-tail tolerance is the caller's decision.
    pub fn decode(data: &[u8]) -> StoreResult<Self> {
        let total = Self::frame_len(data)? as usize;

        if data.len() < total {
            return Err(StoreError::corruption(format!(
                "incomplete frame: have {} bytes of {}",
                data.len(),
                total
            )));
        }

        let key_len = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
        if FRAME_OVERHEAD + key_len > total {
            return Err(StoreError::corruption(format!(
                "key length {key_len} overruns frame of {total} bytes"
            )));
        }

        let value_len_at = 8 + key_len;
        let value_len = u32::from_le_bytes([
            data[value_len_at],
            data[value_len_at + 1],
            data[value_len_at + 2],
            data[value_len_at + 3],
        ]) as usize;

        if FRAME_OVERHEAD + key_len + value_len != total {
            return Err(StoreError::corruption(format!(
                "length mismatch: total {total}, key {key_len}, value {value_len}"
            )));
        }

        let key = std::str::from_utf8(&data[8..8 + key_len])
            .map_err(|_| StoreError::corruption("key is not valid UTF-8"))?;
        let value_at = value_len_at + 4;
        let value = std::str::from_utf8(&data[value_at..value_at + value_len])
            .map_err(|_| StoreError::corruption("value is not valid UTF-8"))?;

        if key.is_empty() || value.is_empty() {
            return Err(StoreError::corruption("empty key or value in frame"));
        }

        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Reads the total frame length from the first four bytes of a frame.
    ///
    /// Validates only what those four bytes can tell: the prefix must be
    /// present and the total must cover at least the framing overhead.
    pub fn frame_len(data: &[u8]) -> StoreResult<u32> {
        if data.len() < 4 {
            return Err(StoreError::corruption(format!(
                "frame prefix truncated: {} bytes",
                data.len()
            )));
        }

        let total = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if (total as usize) < FRAME_OVERHEAD {
            return Err(StoreError::corruption(format!(
                "frame length {total} smaller than framing overhead"
            )));
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encode_layout() {
        let entry = Entry::new("key1", "value1").unwrap();
        let encoded = entry.encode();

        assert_eq!(encoded.len(), 22);
        assert_eq!(entry.encoded_len(), 22);
        // total_len
        assert_eq!(&encoded[0..4], &22u32.to_le_bytes());
        // key_len | key
        assert_eq!(&encoded[4..8], &4u32.to_le_bytes());
        assert_eq!(&encoded[8..12], b"key1");
        // value_len | value
        assert_eq!(&encoded[12..16], &6u32.to_le_bytes());
        assert_eq!(&encoded[16..22], b"value1");
    }

    #[test]
    fn decode_restores_entry() {
        let entry = Entry::new("some-key", "some value with spaces").unwrap();
        let decoded = Entry::decode(&entry.encode()).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn unicode_round_trip() {
        let entry = Entry::new("ключ", "значення-\u{1F680}").unwrap();
        let decoded = Entry::decode(&entry.encode()).unwrap();
        assert_eq!(decoded, entry);
        assert_eq!(entry.encoded_len(), 12 + "ключ".len() + "значення-\u{1F680}".len());
    }

    #[test]
    fn empty_key_rejected() {
        let result = Entry::new("", "value");
        assert!(matches!(result, Err(StoreError::InvalidArgument { .. })));
    }

    #[test]
    fn empty_value_rejected() {
        let result = Entry::new("key", "");
        assert!(matches!(result, Err(StoreError::InvalidArgument { .. })));
    }

    #[test]
    fn truncated_frame_is_corruption() {
        let encoded = Entry::new("key1", "value1").unwrap().encode();
        let result = Entry::decode(&encoded[..10]);
        assert!(matches!(result, Err(StoreError::Corruption { .. })));
    }

    #[test]
    fn length_mismatch_is_corruption() {
        let mut encoded = Entry::new("key1", "value1").unwrap().encode();
        // Shrink the value length without touching the total.
        encoded[12..16].copy_from_slice(&3u32.to_le_bytes());
        let result = Entry::decode(&encoded);
        assert!(matches!(result, Err(StoreError::Corruption { .. })));
    }

    #[test]
    fn key_overrun_is_corruption() {
        let mut encoded = Entry::new("key1", "value1").unwrap().encode();
        encoded[4..8].copy_from_slice(&1000u32.to_le_bytes());
        let result = Entry::decode(&encoded);
        assert!(matches!(result, Err(StoreError::Corruption { .. })));
    }

    #[test]
    fn invalid_utf8_is_corruption() {
        let mut encoded = Entry::new("key1", "value1").unwrap().encode();
        encoded[9] = 0xFF;
        let result = Entry::decode(&encoded);
        assert!(matches!(result, Err(StoreError::Corruption { .. })));
    }

    #[test]
    fn frame_len_rejects_tiny_totals() {
        let result = Entry::frame_len(&5u32.to_le_bytes());
        assert!(matches!(result, Err(StoreError::Corruption { .. })));
    }

    proptest! {
        // Arbitrary bytes must never panic the decoder; they either decode
        // to a valid entry or report corruption.
        #[test]
        fn decode_never_panics(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = Entry::decode(&data);
        }

        #[test]
        fn round_trip_arbitrary_strings(
            key in "[a-zA-Z0-9:_/-]{1,64}",
            value in "\\PC{1,128}",
        ) {
            let entry = Entry::new(key, value).unwrap();
            let decoded = Entry::decode(&entry.encode()).unwrap();
            prop_assert_eq!(decoded, entry);
        }
    }
}

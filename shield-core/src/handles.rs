//! Canonical representation of ciphertext handles.
//!
//! Encryption services hand back handles as raw bytes, as integers or as (possibly
//! unprefixed) hex strings. Every handle argument of the contract is a `bytes32`, so each
//! handle is normalized to a 32-byte big-endian value, rendered as `0x` followed by 64
//! lowercase hex digits, before it leaves the encryption adapter.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Width of a handle on the contract interface.
pub const HANDLE_BYTES: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandleError {
    #[error("handle is not valid hex: {0}")]
    InvalidHex(String),

    #[error("handle is {0} bytes, at most 32 fit a bytes32")]
    TooLong(usize),
}

/// A handle as delivered by an encryption service, before normalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawHandle {
    Bytes(Vec<u8>),
    /// A 256-bit unsigned integer, big-endian.
    Number([u8; HANDLE_BYTES]),
    Text(String),
}

impl RawHandle {
    /// Integer handle from a big-endian 256-bit value.
    pub fn number_be(be: [u8; HANDLE_BYTES]) -> Self {
        RawHandle::Number(be)
    }
}

impl From<Vec<u8>> for RawHandle {
    fn from(bytes: Vec<u8>) -> Self {
        RawHandle::Bytes(bytes)
    }
}

impl From<u128> for RawHandle {
    fn from(n: u128) -> Self {
        let mut be = [0u8; HANDLE_BYTES];
        be[HANDLE_BYTES - 16..].copy_from_slice(&n.to_be_bytes());
        RawHandle::Number(be)
    }
}

impl From<String> for RawHandle {
    fn from(s: String) -> Self {
        RawHandle::Text(s)
    }
}

impl From<&str> for RawHandle {
    fn from(s: &str) -> Self {
        RawHandle::Text(s.to_string())
    }
}

/// A normalized ciphertext handle: exactly one `bytes32`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct HandleHex([u8; HANDLE_BYTES]);

impl HandleHex {
    pub const fn new(bytes: [u8; HANDLE_BYTES]) -> Self {
        Self(bytes)
    }

    /// Left-pad `bytes` to 32 bytes. Longer inputs are rejected, never truncated.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HandleError> {
        if bytes.len() > HANDLE_BYTES {
            return Err(HandleError::TooLong(bytes.len()));
        }
        let mut out = [0u8; HANDLE_BYTES];
        out[HANDLE_BYTES - bytes.len()..].copy_from_slice(bytes);
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; HANDLE_BYTES] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        canonical_hex(&self.0)
    }
}

impl fmt::Display for HandleHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for HandleHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandleHex({})", self.to_hex())
    }
}

impl FromStr for HandleHex {
    type Err = HandleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex_text(s).and_then(|bytes| Self::from_slice(&bytes))
    }
}

impl Serialize for HandleHex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HandleHex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// `0x` + two lowercase hex digits per byte.
pub fn canonical_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Normalize a handle in any supported shape to its `bytes32` value.
///
/// - bytes: left-padded with zero bytes;
/// - numbers: the 256-bit big-endian value as-is;
/// - text: optional `0x`/`0X` prefix, any case, odd lengths get one leading `0`, then
///   left-padded like bytes.
///
/// Anything wider than 32 bytes is an error.
pub fn normalize_handle(raw: &RawHandle) -> Result<HandleHex, HandleError> {
    match raw {
        RawHandle::Bytes(bytes) => HandleHex::from_slice(bytes),
        RawHandle::Number(be) => Ok(HandleHex(*be)),
        RawHandle::Text(s) => s.parse(),
    }
}

fn decode_hex_text(s: &str) -> Result<Vec<u8>, HandleError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);

    let mut lowered = digits.to_ascii_lowercase();
    if lowered.len() % 2 == 1 {
        lowered.insert(0, '0');
    }

    hex::decode(&lowered).map_err(|_| HandleError::InvalidHex(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_canonical(s: &str) -> bool {
        s.len() == 2 + 2 * HANDLE_BYTES
            && s.starts_with("0x")
            && s[2..].chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }

    #[test]
    fn bytes32_number_and_text_forms_agree() {
        let mut word = [0u8; HANDLE_BYTES];
        word[31] = 7;

        let from_bytes32 = normalize_handle(&RawHandle::Bytes(word.to_vec())).unwrap();
        let from_number = normalize_handle(&RawHandle::from(7u128)).unwrap();
        let from_text = normalize_handle(&RawHandle::Text("0x7".to_string())).unwrap();

        let expected = format!("0x{}7", "0".repeat(63));
        assert_eq!(from_bytes32.to_hex(), expected);
        assert_eq!(from_number.to_hex(), expected);
        assert_eq!(from_text.to_hex(), expected);
    }

    #[test]
    fn short_values_are_left_padded() {
        let from_bytes = normalize_handle(&RawHandle::Bytes(vec![0x01, 0xab, 0xff])).unwrap();
        let from_number = normalize_handle(&RawHandle::from(0x01abffu128)).unwrap();
        let from_text = normalize_handle(&RawHandle::Text("0x01ABFF".to_string())).unwrap();
        let from_bare = normalize_handle(&RawHandle::Text("1abff".to_string())).unwrap();

        assert_eq!(from_bytes.to_hex(), format!("0x{:0>64}", "01abff"));
        assert_eq!(from_bytes, from_number);
        assert_eq!(from_bytes, from_text);
        assert_eq!(from_bytes, from_bare);
    }

    #[test]
    fn full_width_numbers_are_kept() {
        let be = [0xffu8; HANDLE_BYTES];
        let h = normalize_handle(&RawHandle::number_be(be)).unwrap();
        assert_eq!(h.to_hex(), format!("0x{}", "f".repeat(64)));
        assert_eq!(h, normalize_handle(&RawHandle::Bytes(be.to_vec())).unwrap());
    }

    #[test]
    fn normalization_is_idempotent() {
        let inputs = [
            RawHandle::Bytes(vec![]),
            RawHandle::Bytes(vec![0x00, 0x10]),
            RawHandle::from(0u128),
            RawHandle::from(u128::MAX),
            RawHandle::Text("0XDEADbeef".to_string()),
            RawHandle::Text("abc".to_string()),
        ];

        for raw in inputs {
            let once = normalize_handle(&raw).unwrap();
            let twice = normalize_handle(&RawHandle::Text(once.to_hex())).unwrap();
            assert_eq!(once, twice);
            assert!(is_canonical(&once.to_hex()), "{once}");
        }
    }

    #[test]
    fn zero_in_every_shape_is_the_zero_word() {
        let zero = HandleHex::default();
        assert_eq!(normalize_handle(&RawHandle::from(0u128)).unwrap(), zero);
        assert_eq!(normalize_handle(&RawHandle::Bytes(vec![])).unwrap(), zero);
        assert_eq!(normalize_handle(&RawHandle::Text("0x".into())).unwrap(), zero);
    }

    #[test]
    fn leading_zero_bytes_survive_in_byte_and_text_form() {
        let h = normalize_handle(&RawHandle::Bytes(vec![0, 0, 7])).unwrap();
        assert_eq!(h.as_bytes()[29..], [0, 0, 7]);
        assert_eq!("0x000007".parse::<HandleHex>().unwrap(), h);
    }

    #[test]
    fn oversized_handles_are_rejected() {
        let err = normalize_handle(&RawHandle::Bytes(vec![1; 33])).unwrap_err();
        assert_eq!(err, HandleError::TooLong(33));

        let text = format!("0x{}", "ab".repeat(33));
        assert_eq!(text.parse::<HandleHex>().unwrap_err(), HandleError::TooLong(33));
    }

    #[test]
    fn non_hex_text_is_rejected() {
        let err = normalize_handle(&RawHandle::Text("0xzz".to_string())).unwrap_err();
        assert_eq!(err, HandleError::InvalidHex("0xzz".to_string()));
    }

    #[test]
    fn serde_uses_canonical_string() {
        let h = HandleHex::from_slice(&[0xAB, 0x01]).unwrap();
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"0x{:0>64}\"", "ab01"));
        let back: HandleHex = serde_json::from_str("\"0xAB01\"").unwrap();
        assert_eq!(back, h);
    }
}

//! Deterministic hashing and canonical serialization (C2).
//!
//! Every identity derived from hashing — request fingerprints, snapshot
//! content hashes, portfolio snapshot hashes, scenario-set hashes — must go
//! through [`canonical_json`] / [`content_hash`]. Using any other
//! serialization path makes hashes drift between otherwise-equal values.
//!
//! `canonical_dict(x)` from the specification is realized here as
//! [`to_canonical_value`]: a fully ordered, normalized `serde_json::Value`
//! with object keys sorted lexicographically (guaranteed by `serde_json`'s
//! `BTreeMap`-backed `Map` when the `preserve_order` feature is not
//! enabled) and all numbers finite. Collections with set semantics (sorted
//! asset/field lists, sorted tag sets) are the *caller's* responsibility:
//! types whose equality should be insertion-order-independent must store
//! those fields pre-sorted before they reach this module, since this module
//! cannot tell a meaningful sequence (an OHLC series) from an unordered set
//! (a list of requested fields) once both have become a JSON array.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::HashError;

/// Converts `value` into a canonical, fully-ordered `serde_json::Value`.
///
/// Rejects non-finite floats (NaN / +-Infinity cannot round-trip through
/// JSON and must never participate in a content hash).
pub fn to_canonical_value<T: Serialize>(value: &T) -> Result<Value, HashError> {
    serde_json::to_value(value).map_err(|e| HashError::Serialization(e.to_string()))
}

/// Serializes `value` to canonical JSON text: sorted keys, compact
/// separators (`,` and `:`, no surrounding whitespace), all non-ASCII
/// characters escaped as `\uXXXX` (`ensure_ascii=true`), numbers finite.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, HashError> {
    let canonical = to_canonical_value(value)?;
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, AsciiFormatter);
    canonical
        .serialize(&mut serializer)
        .map_err(|e| HashError::Serialization(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| HashError::Serialization(e.to_string()))
}

/// `content_hash(x) = sha256(canonical_json(x))`, hex-encoded lowercase.
pub fn content_hash<T: Serialize>(value: &T) -> Result<String, HashError> {
    let json = canonical_json(value)?;
    let digest = Sha256::digest(json.as_bytes());
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(out, "{:02x}", b).expect("writing to a String cannot fail");
    }
    out
}

/// A `serde_json` formatter that behaves like `CompactFormatter` but escapes
/// every byte outside the printable ASCII range as `\uXXXX`, matching
/// Python's `json.dumps(..., ensure_ascii=True)` — the behavior the
/// specification pins canonical JSON to.
struct AsciiFormatter;

impl serde_json::ser::Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> std::io::Result<()>
    where
        W: ?Sized + std::io::Write,
    {
        for ch in fragment.chars() {
            if ch.is_ascii() && !ch.is_ascii_control() {
                writer.write_all(&[ch as u8])?;
            } else {
                let mut buf = [0u16; 2];
                for unit in ch.encode_utf16(&mut buf) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Sample {
        b: i32,
        a: i32,
        tags: Vec<String>,
    }

    #[test]
    fn keys_are_sorted_regardless_of_struct_field_order() {
        let s = Sample {
            b: 2,
            a: 1,
            tags: vec!["x".to_string()],
        };
        let json = canonical_json(&s).unwrap();
        assert_eq!(json, r#"{"a":1,"b":2,"tags":["x"]}"#);
    }

    #[test]
    fn separators_are_compact() {
        let mut m = BTreeMap::new();
        m.insert("k", 1);
        let json = canonical_json(&m).unwrap();
        assert!(!json.contains(' '));
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        #[derive(Serialize)]
        struct Bad {
            v: f64,
        }
        let bad = Bad { v: f64::NAN };
        assert!(canonical_json(&bad).is_err());
    }

    #[test]
    fn content_hash_is_stable_and_order_independent_for_equal_maps() {
        let mut m1 = BTreeMap::new();
        m1.insert("a", 1);
        m1.insert("b", 2);
        let mut m2 = BTreeMap::new();
        m2.insert("b", 2);
        m2.insert("a", 1);
        assert_eq!(content_hash(&m1).unwrap(), content_hash(&m2).unwrap());
    }

    #[test]
    fn non_ascii_is_escaped() {
        #[derive(Serialize)]
        struct WithUnicode {
            name: String,
        }
        let v = WithUnicode {
            name: "café".to_string(),
        };
        let json = canonical_json(&v).unwrap();
        assert!(json.is_ascii());
        assert!(json.contains("\\u00e9"));
    }
}

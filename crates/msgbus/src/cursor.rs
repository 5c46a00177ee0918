//! Cursor string codec.
//!
//! Encodes/decodes an ordered list of `(topic key, id)` pairs into a single
//! opaque string a subscriber can persist and hand back to `subscribe` to
//! resume exactly where it left off.
//!
//! Wire format: `escape(key) + "," + hex16(id)` cursors joined by `|`, no
//! trailing delimiter. `hex16` is 16 uppercase hex digits, zero-padded,
//! big-endian nibbles. Bit-exact with prior versions of this library —
//! changing the escaping rule or hex width is a wire-format break.

use std::fmt::Write as _;
use thiserror::Error;

/// One decoded `(key, id)` pair.
///
/// The topic reference is deliberately absent: the decoder has no access to
/// a topic registry, so callers attach it via
/// [`crate::subscription::Subscription::set_cursor_topic`] during subscribe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCursor {
    pub key: String,
    pub id: u64,
}

/// A `(key, id)` pair ready to be encoded.
#[derive(Debug, Clone, Copy)]
pub struct CursorEntry<'a> {
    pub key: &'a str,
    pub id: u64,
}

/// Failure decoding a cursor string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CursorDecodeError {
    #[error("cursor id {0:?} is not 16 hex digits")]
    MalformedId(String),
}

const ESCAPE_CHARS: [char; 3] = ['\\', '|', ','];

fn needs_escaping(key: &str) -> bool {
    key.chars().any(|c| ESCAPE_CHARS.contains(&c))
}

fn push_escaped(out: &mut String, key: &str) {
    if !needs_escaping(key) {
        out.push_str(key);
        return;
    }
    for c in key.chars() {
        if ESCAPE_CHARS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Encodes a list of cursors into the bus's opaque cursor string.
///
/// An empty list encodes to the empty string.
#[must_use]
pub fn encode(cursors: &[CursorEntry<'_>]) -> String {
    let mut out = String::new();
    for (i, cursor) in cursors.iter().enumerate() {
        if i > 0 {
            out.push('|');
        }
        push_escaped(&mut out, cursor.key);
        out.push(',');
        let _ = write!(out, "{:016X}", cursor.id);
    }
    out
}

/// Decodes a cursor string produced by [`encode`].
///
/// The empty string decodes to the empty list. A single pass over the
/// input tracks whether we're reading a key or an id, plus a one-shot
/// escape flag; a trailing id with no closing `|` is accepted.
pub fn decode(s: &str) -> Result<Vec<DecodedCursor>, CursorDecodeError> {
    if s.is_empty() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    let mut key = String::new();
    let mut id_buf = String::new();
    let mut in_id = false;
    let mut escaped = false;

    for c in s.chars() {
        if escaped {
            key.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if !in_id => escaped = true,
            ',' if !in_id => in_id = true,
            '|' if in_id => {
                finish_cursor(&mut key, &mut id_buf, &mut out)?;
                in_id = false;
            }
            _ if in_id => id_buf.push(c),
            _ => key.push(c),
        }
    }

    finish_cursor(&mut key, &mut id_buf, &mut out)?;
    Ok(out)
}

fn finish_cursor(
    key: &mut String,
    id_buf: &mut String,
    out: &mut Vec<DecodedCursor>,
) -> Result<(), CursorDecodeError> {
    if id_buf.len() != 16 {
        return Err(CursorDecodeError::MalformedId(id_buf.clone()));
    }
    let id = u64::from_str_radix(id_buf, 16)
        .map_err(|_| CursorDecodeError::MalformedId(id_buf.clone()))?;
    out.push(DecodedCursor {
        key: std::mem::take(key),
        id,
    });
    id_buf.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_round_trips() {
        assert_eq!(encode(&[]), "");
        assert_eq!(decode("").unwrap(), Vec::new());
    }

    #[test]
    fn single_cursor_round_trips() {
        let entries = [CursorEntry { key: "t", id: 3 }];
        let encoded = encode(&entries);
        assert_eq!(encoded, "t,0000000000000003");
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, vec![DecodedCursor { key: "t".into(), id: 3 }]);
    }

    #[test]
    fn escaping_round_trips() {
        // S3 from the bus specification.
        let key = "a|b\\c,d";
        let entries = [CursorEntry { key, id: 0xDEAD_BEEF }];
        let encoded = encode(&entries);
        assert_eq!(encoded, "a\\|b\\\\c\\,d,00000000DEADBEEF");

        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].key, key);
        assert_eq!(decoded[0].id, 0xDEAD_BEEF);
    }

    #[test]
    fn multiple_cursors_join_with_pipe() {
        let entries = [
            CursorEntry { key: "x", id: 2 },
            CursorEntry { key: "y", id: 1 },
        ];
        let encoded = encode(&entries);
        assert_eq!(encoded, "x,0000000000000002|y,0000000000000001");

        let decoded = decode(&encoded).unwrap();
        assert_eq!(
            decoded,
            vec![
                DecodedCursor { key: "x".into(), id: 2 },
                DecodedCursor { key: "y".into(), id: 1 },
            ]
        );
    }

    #[test]
    fn malformed_id_length_is_rejected() {
        assert!(decode("t,123").is_err());
    }

    #[test]
    fn unicode_keys_round_trip() {
        let key = "\u{1F600}-topic";
        let entries = [CursorEntry { key, id: 42 }];
        let encoded = encode(&entries);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded[0].key, key);
        assert_eq!(decoded[0].id, 42);
    }
}

//! # Chunking and the Numeric Codec
//!
//! ## Size Law
//!
//! An envelope of at most [`MAX_SINGLE_JWS_LEN`] characters travels in one
//! QR code. Anything longer is split into `n = ceil(len / MAX_CHUNK_LEN)`
//! parts whose lengths differ by at most one, so no part exceeds
//! [`MAX_CHUNK_LEN`] and the last part is never a tiny remainder. The
//! four-character gap between the two limits pays for the `i/n/` prefix.
//!
//! ## Framing
//!
//! - one chunk: `shc:/<digits>`
//! - `i` of `n`: `shc:/<i>/<n>/<digits>` with `i` starting at 1
//!
//! Joining keys parts by their embedded index, so chunks may be supplied
//! in any order.

use crate::error::ChunkError;

/// Longest envelope that is sent as a single QR code.
pub const MAX_SINGLE_JWS_LEN: usize = 1195;

/// Longest part of a multi-chunk envelope.
pub const MAX_CHUNK_LEN: usize = 1191;

/// Offset subtracted from each character code before encoding.
const NUMERIC_OFFSET: u32 = 45;

/// Highest character code that fits in two digits.
const MAX_CODE: u32 = NUMERIC_OFFSET + 99;

const PREFIX: &str = "shc:/";

/// Split envelope text into balanced parts. Lengths are counted in
/// characters.
pub fn split_jws(jws: &str) -> Vec<String> {
    let chars: Vec<char> = jws.chars().collect();
    let len = chars.len();
    if len <= MAX_SINGLE_JWS_LEN {
        return vec![jws.to_string()];
    }

    let count = len.div_ceil(MAX_CHUNK_LEN);
    let base = len / count;
    let extra = len % count;

    let mut parts = Vec::with_capacity(count);
    let mut start = 0;
    for i in 0..count {
        let size = base + usize::from(i < extra);
        parts.push(chars[start..start + size].iter().collect());
        start += size;
    }
    parts
}

/// Encode text as two digits per character.
pub fn encode_numeric(text: &str) -> Result<String, ChunkError> {
    let mut out = String::with_capacity(text.len() * 2);
    for (position, ch) in text.chars().enumerate() {
        let code = u32::from(ch);
        if !(NUMERIC_OFFSET..=MAX_CODE).contains(&code) {
            return Err(ChunkError::InvalidCharacter { ch, position });
        }
        let value = code - NUMERIC_OFFSET;
        out.push(digit(value / 10));
        out.push(digit(value % 10));
    }
    Ok(out)
}

/// Decode a two-digits-per-character numeric string.
pub fn decode_numeric(digits: &str) -> Result<String, ChunkError> {
    let bytes = digits.as_bytes();
    if bytes.len() % 2 != 0 {
        return Err(ChunkError::MalformedNumeric(format!(
            "odd length {}",
            bytes.len()
        )));
    }
    let mut out = String::with_capacity(bytes.len() / 2);
    for (i, pair) in bytes.chunks_exact(2).enumerate() {
        let (hi, lo) = match (ascii_digit(pair[0]), ascii_digit(pair[1])) {
            (Some(hi), Some(lo)) => (hi, lo),
            _ => {
                return Err(ChunkError::MalformedNumeric(format!(
                    "non-digit at pair {i}"
                )))
            }
        };
        let code = hi * 10 + lo + NUMERIC_OFFSET;
        let ch = char::from_u32(code).ok_or_else(|| {
            ChunkError::MalformedNumeric(format!("code {code} at pair {i} is not a character"))
        })?;
        out.push(ch);
    }
    Ok(out)
}

/// Split and frame an envelope into QR chunk text.
pub fn jws_to_qr_chunks(jws: &str) -> Result<Vec<String>, ChunkError> {
    let parts = split_jws(jws);
    let total = parts.len();
    let chunks = if total == 1 {
        vec![format!("{PREFIX}{}", encode_numeric(&parts[0])?)]
    } else {
        parts
            .iter()
            .enumerate()
            .map(|(i, part)| Ok(format!("{PREFIX}{}/{total}/{}", i + 1, encode_numeric(part)?)))
            .collect::<Result<Vec<_>, ChunkError>>()?
    };
    tracing::debug!(chars = jws.chars().count(), chunks = total, "split envelope into QR chunks");
    Ok(chunks)
}

/// Reassemble an envelope from framed chunk text, in any order.
pub fn qr_chunks_to_jws<S: AsRef<str>>(chunks: &[S]) -> Result<String, ChunkError> {
    if chunks.is_empty() {
        return Err(ChunkError::Empty);
    }

    let mut parsed = chunks
        .iter()
        .map(|c| parse_chunk(c.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    if let [FramedChunk {
        position: None,
        digits,
    }] = parsed.as_slice()
    {
        return decode_numeric(digits);
    }

    let count = parsed.len();
    let mut indexed = Vec::with_capacity(count);
    for chunk in parsed.drain(..) {
        let (ordinal, total) = chunk.position.ok_or_else(|| {
            ChunkError::InconsistentSet("unindexed chunk in a multi-chunk set".to_string())
        })?;
        if total != count {
            return Err(ChunkError::InconsistentSet(format!(
                "chunk {ordinal} declares {total} parts but {count} were supplied"
            )));
        }
        indexed.push((ordinal, chunk.digits));
    }
    indexed.sort_by_key(|(ordinal, _)| *ordinal);
    for (expected, (ordinal, _)) in (1..=count).zip(&indexed) {
        if *ordinal != expected {
            return Err(ChunkError::InconsistentSet(format!(
                "expected chunk {expected}, found {ordinal}"
            )));
        }
    }

    let mut jws = String::new();
    for (_, digits) in &indexed {
        jws.push_str(&decode_numeric(digits)?);
    }
    tracing::debug!(chunks = count, "joined QR chunks");
    Ok(jws)
}

/// A chunk with its prefix parsed: `(ordinal, total)` when indexed.
pub(crate) struct FramedChunk<'a> {
    pub(crate) position: Option<(usize, usize)>,
    pub(crate) digits: &'a str,
}

pub(crate) fn parse_chunk(text: &str) -> Result<FramedChunk<'_>, ChunkError> {
    let text = text.trim();
    let rest = text
        .strip_prefix(PREFIX)
        .ok_or_else(|| ChunkError::MalformedPrefix(format!("missing {PREFIX:?}")))?;

    if !rest.contains('/') {
        return Ok(FramedChunk {
            position: None,
            digits: rest,
        });
    }

    let mut fields = rest.splitn(3, '/');
    let (Some(ordinal), Some(total), Some(digits)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(ChunkError::MalformedPrefix(format!(
            "expected {PREFIX}i/n/, found {}",
            truncate(text)
        )));
    };
    let ordinal = parse_index(ordinal)?;
    let total = parse_index(total)?;
    if ordinal == 0 || ordinal > total {
        return Err(ChunkError::MalformedPrefix(format!(
            "chunk index {ordinal} out of range 1..={total}"
        )));
    }
    Ok(FramedChunk {
        position: Some((ordinal, total)),
        digits,
    })
}

fn parse_index(field: &str) -> Result<usize, ChunkError> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ChunkError::MalformedPrefix(format!(
            "chunk index {field:?} is not a number"
        )));
    }
    field
        .parse()
        .map_err(|_| ChunkError::MalformedPrefix(format!("chunk index {field:?} out of range")))
}

fn digit(value: u32) -> char {
    char::from(b'0' + value as u8)
}

fn ascii_digit(b: u8) -> Option<u32> {
    b.is_ascii_digit().then(|| u32::from(b - b'0'))
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(24) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(text: &str) -> String {
        text.chars()
            .map(|c| format!("{:02}", u32::from(c) - 45))
            .collect()
    }

    #[test]
    fn short_envelope_is_one_chunk() {
        let jws = "s".repeat(1195);
        let chunks = jws_to_qr_chunks(&jws).unwrap();
        assert_eq!(chunks, vec![format!("shc:/{}", numeric(&jws))]);
    }

    #[test]
    fn one_over_the_limit_splits() {
        let jws = "l".repeat(1196);
        let parts = split_jws(&jws);
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|p| p.len() <= MAX_CHUNK_LEN));
        assert_eq!(parts[0].len(), 598);
        assert_eq!(parts[1].len(), 598);
    }

    #[test]
    fn three_chunks_are_framed_with_index_and_total() {
        let jws = "t".repeat(1191 * 2 + 1);
        let chunks = jws_to_qr_chunks(&jws).unwrap();
        assert_eq!(chunks.len(), 3);

        let expected: Vec<String> = split_jws(&jws)
            .iter()
            .enumerate()
            .map(|(i, part)| format!("shc:/{}/3/{}", i + 1, numeric(part)))
            .collect();
        assert_eq!(chunks, expected);
    }

    #[test]
    fn balanced_split_has_no_tiny_tail() {
        let parts = split_jws(&"t".repeat(1191 * 2 + 1));
        let lens: Vec<usize> = parts.iter().map(String::len).collect();
        assert_eq!(lens, vec![795, 794, 794]);
    }

    #[test]
    fn numeric_codec_edges() {
        assert_eq!(encode_numeric("-").unwrap(), "00");
        assert_eq!(encode_numeric("\u{90}").unwrap(), "99");
        assert_eq!(encode_numeric("eyJ.").unwrap(), "56762901");
        assert_eq!(decode_numeric("56762901").unwrap(), "eyJ.");
    }

    #[test]
    fn encode_rejects_characters_outside_alphabet() {
        assert!(matches!(
            encode_numeric("ab,c"),
            Err(ChunkError::InvalidCharacter { ch: ',', position: 2 })
        ));
        assert!(jws_to_qr_chunks("a b").is_err());
    }

    #[test]
    fn decode_rejects_malformed_digits() {
        assert!(matches!(decode_numeric("123"), Err(ChunkError::MalformedNumeric(_))));
        assert!(matches!(decode_numeric("1a"), Err(ChunkError::MalformedNumeric(_))));
    }

    #[test]
    fn join_accepts_any_order() {
        let jws = "abc.def-ghi_".repeat(300);
        let mut chunks = jws_to_qr_chunks(&jws).unwrap();
        assert_eq!(chunks.len(), 4);
        chunks.reverse();
        chunks.swap(0, 2);
        assert_eq!(qr_chunks_to_jws(&chunks).unwrap(), jws);
    }

    #[test]
    fn join_rejects_incomplete_set() {
        let jws = "t".repeat(1191 * 2 + 1);
        let mut chunks = jws_to_qr_chunks(&jws).unwrap();
        chunks.pop();
        assert!(matches!(
            qr_chunks_to_jws(&chunks),
            Err(ChunkError::InconsistentSet(_))
        ));
    }

    #[test]
    fn join_rejects_duplicate_index() {
        let jws = "t".repeat(1191 + 100);
        let chunks = jws_to_qr_chunks(&jws).unwrap();
        let duplicated = vec![chunks[0].clone(), chunks[0].clone()];
        assert!(matches!(
            qr_chunks_to_jws(&duplicated),
            Err(ChunkError::InconsistentSet(_))
        ));
    }

    #[test]
    fn join_rejects_bad_prefix() {
        assert!(matches!(
            qr_chunks_to_jws(&["shc:0000"]),
            Err(ChunkError::MalformedPrefix(_))
        ));
        assert!(matches!(
            qr_chunks_to_jws(&["shc:/0/2/00", "shc:/2/2/00"]),
            Err(ChunkError::MalformedPrefix(_))
        ));
        assert!(matches!(
            qr_chunks_to_jws(&["shc:/x/2/00"]),
            Err(ChunkError::MalformedPrefix(_))
        ));
        assert!(matches!(qr_chunks_to_jws::<&str>(&[]), Err(ChunkError::Empty)));
    }

    #[test]
    fn single_indexed_chunk_joins() {
        assert_eq!(qr_chunks_to_jws(&["shc:/1/1/5676"]).unwrap(), "ey");
    }
}

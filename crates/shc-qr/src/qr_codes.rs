//! # QR Code Sets
//!
//! [`QrCodes`] is the transport form of one envelope: an ordered list of
//! framed chunks. Each [`Chunk`] keeps its position so a scanner can show
//! progress ("2 of 3") before the set is complete.

use shc_crypto::Jws;

use crate::chunking::{jws_to_qr_chunks, parse_chunk, qr_chunks_to_jws};
use crate::error::ChunkError;

/// One framed QR payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    ordinal: usize,
    total: usize,
    data: String,
}

impl Chunk {
    /// 1-based position of this chunk.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// The full `shc:/...` text to render.
    pub fn data(&self) -> &str {
        &self.data
    }
}

/// The chunks of one envelope, ordered by ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrCodes {
    chunks: Vec<Chunk>,
}

impl QrCodes {
    /// Wrap scanned chunk text. Chunks may arrive in any order; they are
    /// validated and sorted.
    pub fn new<S: AsRef<str>>(chunks: &[S]) -> Result<Self, ChunkError> {
        // Validate the set as a whole before keeping it.
        qr_chunks_to_jws(chunks)?;

        let total = chunks.len();
        let mut out = Vec::with_capacity(total);
        for text in chunks {
            let text = text.as_ref().trim();
            let ordinal = parse_chunk(text)?.position.map_or(1, |(ordinal, _)| ordinal);
            out.push(Chunk {
                ordinal,
                total,
                data: text.to_string(),
            });
        }
        out.sort_by_key(|c| c.ordinal);
        Ok(Self { chunks: out })
    }

    /// Chunk a compact envelope string.
    pub fn from_compact(compact: &str) -> Result<Self, ChunkError> {
        let framed = jws_to_qr_chunks(compact)?;
        let total = framed.len();
        let chunks = framed
            .into_iter()
            .enumerate()
            .map(|(i, data)| Chunk {
                ordinal: i + 1,
                total,
                data,
            })
            .collect();
        Ok(Self { chunks })
    }

    /// Chunk a signed envelope.
    pub fn from_jws(jws: &Jws) -> Result<Self, ChunkError> {
        Self::from_compact(&jws.to_compact()?)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk text for `ordinal` (1-based).
    pub fn chunk_text(&self, ordinal: usize) -> Option<&str> {
        self.chunks
            .iter()
            .find(|c| c.ordinal == ordinal)
            .map(Chunk::data)
    }

    /// Reassemble the compact envelope string.
    pub fn to_compact(&self) -> Result<String, ChunkError> {
        let texts: Vec<&str> = self.chunks.iter().map(Chunk::data).collect();
        qr_chunks_to_jws(&texts)
    }

    /// Reassemble and parse the envelope.
    pub fn to_jws(&self) -> Result<Jws, ChunkError> {
        Ok(Jws::from_compact(&self.to_compact()?)?)
    }
}

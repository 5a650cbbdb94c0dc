//! Decoder for `Transfer-Encoding: chunked` bodies.
//!
//! ```text
//! chunk      = chunk-size CRLF chunk-data CRLF
//! last-chunk = "0" CRLF
//! body       = *chunk last-chunk CRLF
//! ```
//!
//! Chunk extensions and trailer fields are not accepted.

use log::{debug, trace};

use crate::error::ParseError;
use crate::parser::ParserConfig;

/// Position of a [`ChunkedBodyDecoder`] inside the chunk grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    /// Accumulating hex digits of a chunk-size line.
    ReadingLength,
    /// Saw the CR ending a chunk-size line, expecting LF.
    LengthLineEnd,
    /// Copying chunk data.
    ReadingChunkData,
    /// Expecting the CR after chunk data (or after the last chunk).
    ChunkTrailerCR,
    /// Expecting the LF after chunk data (or after the last chunk).
    ChunkTrailerLF,
}

/// Incremental decoder for a chunked body.
///
/// Bytes may be fed one at a time with [`feed`](Self::feed) or as slices
/// with [`decode`](Self::decode); the result does not depend on how the
/// input is split. Decoded content accumulates in [`content`](Self::content)
/// and can be read before the body is finished.
#[derive(Debug, Clone)]
pub struct ChunkedBodyDecoder {
    state: ChunkState,
    /// Size of the current chunk, built from hex digits.
    length: usize,
    /// Hex digits seen on the current size line.
    digits: usize,
    /// Content bytes still expected for the current chunk.
    remaining: usize,
    /// Set once the zero-size chunk has been read.
    last_chunk: bool,
    output: Vec<u8>,
    finished: bool,
    max_chunk_size: usize,
    max_body_size: usize,
}

impl ChunkedBodyDecoder {
    /// Create a decoder with the default [`ParserConfig`] limits.
    pub fn new() -> Self {
        let config = ParserConfig::default();
        Self::with_limits(config.max_chunk_size, config.max_body_size)
    }

    /// Create a decoder that rejects chunks larger than `max_chunk_size`
    /// and bodies larger than `max_body_size`.
    pub fn with_limits(max_chunk_size: usize, max_body_size: usize) -> Self {
        Self {
            state: ChunkState::ReadingLength,
            length: 0,
            digits: 0,
            remaining: 0,
            last_chunk: false,
            output: Vec::new(),
            finished: false,
            max_chunk_size,
            max_body_size,
        }
    }

    /// Consume a single byte.
    ///
    /// Bytes fed after the body has finished are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the byte violates the chunk grammar or a
    /// configured limit.
    pub fn feed(&mut self, byte: u8) -> Result<(), ParseError> {
        if self.finished {
            return Ok(());
        }

        match self.state {
            ChunkState::ReadingLength => {
                if byte == b'\r' {
                    if self.digits == 0 {
                        return Err(ParseError::InvalidChunkSize("empty chunk size".into()));
                    }
                    self.state = ChunkState::LengthLineEnd;
                } else if let Some(value) = hex_value(byte) {
                    self.length = self
                        .length
                        .checked_mul(16)
                        .and_then(|l| l.checked_add(value))
                        .filter(|&l| l <= self.max_chunk_size)
                        .ok_or(ParseError::ChunkSizeOverflow)?;
                    self.digits += 1;
                } else {
                    return Err(ParseError::InvalidChunkSize(format!(
                        "non-hex byte 0x{byte:02X} in chunk size"
                    )));
                }
            }

            ChunkState::LengthLineEnd => {
                if byte != b'\n' {
                    return Err(ParseError::UnexpectedByte {
                        expected: "LF after chunk size CR",
                        found: byte,
                    });
                }
                trace!("chunk size {}", self.length);
                if self.length == 0 {
                    self.last_chunk = true;
                    self.state = ChunkState::ChunkTrailerCR;
                } else {
                    if self
                        .output
                        .len()
                        .checked_add(self.length)
                        .is_none_or(|total| total > self.max_body_size)
                    {
                        return Err(ParseError::BodyTooLarge);
                    }
                    self.remaining = self.length;
                    self.output.reserve(self.length.min(65_536));
                    self.state = ChunkState::ReadingChunkData;
                }
            }

            ChunkState::ReadingChunkData => {
                self.output.push(byte);
                self.remaining -= 1;
                if self.remaining == 0 {
                    self.state = ChunkState::ChunkTrailerCR;
                }
            }

            ChunkState::ChunkTrailerCR => {
                if byte != b'\r' {
                    return Err(ParseError::UnexpectedByte {
                        expected: if self.last_chunk {
                            "CR ending the chunked body (trailer fields are not supported)"
                        } else {
                            "CR after chunk data"
                        },
                        found: byte,
                    });
                }
                self.state = ChunkState::ChunkTrailerLF;
            }

            ChunkState::ChunkTrailerLF => {
                if byte != b'\n' {
                    return Err(ParseError::UnexpectedByte {
                        expected: "LF after chunk CR",
                        found: byte,
                    });
                }
                if self.last_chunk {
                    debug!("chunked body finished, {} bytes", self.output.len());
                    self.finished = true;
                } else {
                    self.length = 0;
                    self.digits = 0;
                    self.state = ChunkState::ReadingLength;
                }
            }
        }

        Ok(())
    }

    /// Consume as much of `data` as belongs to the chunked body and return
    /// the number of bytes consumed.
    ///
    /// Stops early once the body has finished; the rest of `data` is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// Same as [`feed`](Self::feed).
    pub fn decode(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut i = 0;

        while i < data.len() && !self.finished {
            if self.state == ChunkState::ReadingChunkData {
                let to_copy = (data.len() - i).min(self.remaining);
                self.output.extend_from_slice(&data[i..i + to_copy]);
                self.remaining -= to_copy;
                i += to_copy;
                if self.remaining == 0 {
                    self.state = ChunkState::ChunkTrailerCR;
                }
                continue;
            }

            self.feed(data[i])?;
            i += 1;
        }

        Ok(i)
    }

    /// `true` once the last chunk and its CRLF have been consumed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn state(&self) -> ChunkState {
        self.state
    }

    /// Content decoded so far.
    pub fn content(&self) -> &[u8] {
        &self.output
    }

    /// Consume the decoder and return the decoded content.
    pub fn into_content(self) -> Vec<u8> {
        self.output
    }
}

impl Default for ChunkedBodyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn hex_value(b: u8) -> Option<usize> {
    match b {
        b'0'..=b'9' => Some(usize::from(b - b'0')),
        b'a'..=b'f' => Some(usize::from(b - b'a' + 10)),
        b'A'..=b'F' => Some(usize::from(b - b'A' + 10)),
        _ => None,
    }
}

//! Streaming codec traits.
//!
//! The compression adapters in `dpac-deflate` drive a block codec one chunk
//! at a time through these traits. Each step consumes some input, produces
//! some output, and reports a status; the adapters own the surrounding
//! buffer state machines. Keeping the seam here lets the resumption logic be
//! exercised against a scripted codec, independent of the real compression
//! library.

use crate::error::Result;

/// Flush directive for a compression step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// Not the final chunk; the codec may buffer for better compression.
    #[default]
    None,
    /// Final chunk; the codec must emit all pending output and terminate
    /// the stream.
    Finish,
}

/// Status of a streaming compression step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressStatus {
    /// The step consumed all input it was given; more can be accepted.
    NeedsInput,
    /// The output buffer filled before the input was consumed.
    NeedsOutput,
    /// The stream is terminated; no further input is accepted.
    Done,
}

/// Status of a streaming decompression step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressStatus {
    /// More compressed input is needed to make progress.
    NeedsInput,
    /// The output buffer filled before the input was consumed.
    NeedsOutput,
    /// The end of the compressed stream was reached.
    Done,
}

/// A streaming compressor (encoder).
pub trait Compressor {
    /// Run one compression step.
    ///
    /// Returns `(bytes consumed from input, bytes written to output, status)`.
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)>;

    /// Reset the compressor to its initial state.
    fn reset(&mut self);

    /// Whether the compressor has terminated its stream.
    fn is_finished(&self) -> bool;

    /// Compress an entire buffer at once (convenience method).
    fn compress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut buffer = vec![0u8; 32768];
        let mut pos = 0;

        loop {
            let flush = if pos >= input.len() {
                FlushMode::Finish
            } else {
                FlushMode::None
            };
            let (consumed, produced, status) =
                self.compress(&input[pos..], &mut buffer, flush)?;
            pos += consumed;
            output.extend_from_slice(&buffer[..produced]);
            if status == CompressStatus::Done {
                break;
            }
        }

        Ok(output)
    }
}

/// A streaming decompressor (decoder).
pub trait Decompressor {
    /// Run one decompression step.
    ///
    /// Returns `(bytes consumed from input, bytes written to output, status)`.
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)>;

    /// Reset the decompressor to its initial state.
    fn reset(&mut self);

    /// Whether the end of the compressed stream was reached.
    fn is_finished(&self) -> bool;

    /// Decompress an entire buffer at once (convenience method).
    fn decompress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut buffer = vec![0u8; 32768];
        let mut pos = 0;

        loop {
            let (consumed, produced, status) =
                self.decompress(&input[pos..], &mut buffer)?;
            pos += consumed;
            output.extend_from_slice(&buffer[..produced]);
            match status {
                DecompressStatus::Done => break,
                DecompressStatus::NeedsInput if pos >= input.len() => break,
                DecompressStatus::NeedsInput | DecompressStatus::NeedsOutput => continue,
            }
        }

        Ok(output)
    }
}

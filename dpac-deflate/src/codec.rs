//! Raw-deflate codec contexts.
//!
//! [`DeflateCodec`] and [`InflateCodec`] implement the streaming
//! [`Compressor`]/[`Decompressor`] traits over flate2's low-level contexts.
//! Raw deflate is used (no zlib header or trailing checksum); the archive
//! layer accounts for payload identity itself.

use dpac_core::codec::{
    CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode,
};
use dpac_core::error::{DpacError, Result};
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

/// A streaming raw-deflate compressor.
pub struct DeflateCodec {
    ctx: Compress,
    finished: bool,
}

impl std::fmt::Debug for DeflateCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeflateCodec")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl DeflateCodec {
    /// Create a compressor at the default compression level.
    pub fn new() -> Self {
        Self::with_level(Compression::default())
    }

    /// Create a compressor at a specific compression level.
    pub fn with_level(level: Compression) -> Self {
        Self {
            ctx: Compress::new(level, false),
            finished: false,
        }
    }
}

impl Default for DeflateCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor for DeflateCodec {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        let before_in = self.ctx.total_in();
        let before_out = self.ctx.total_out();
        let flush = match flush {
            FlushMode::None => FlushCompress::None,
            FlushMode::Finish => FlushCompress::Finish,
        };
        let status = self
            .ctx
            .compress(input, output, flush)
            .map_err(|e| DpacError::codec(e.to_string()))?;
        let consumed = (self.ctx.total_in() - before_in) as usize;
        let produced = (self.ctx.total_out() - before_out) as usize;
        let status = match status {
            Status::StreamEnd => {
                self.finished = true;
                CompressStatus::Done
            }
            Status::Ok | Status::BufError => {
                if consumed < input.len() {
                    CompressStatus::NeedsOutput
                } else {
                    CompressStatus::NeedsInput
                }
            }
        };
        Ok((consumed, produced, status))
    }

    fn reset(&mut self) {
        self.ctx.reset();
        self.finished = false;
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

/// A streaming raw-deflate decompressor.
pub struct InflateCodec {
    ctx: Decompress,
    finished: bool,
}

impl std::fmt::Debug for InflateCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InflateCodec")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl InflateCodec {
    /// Create a decompressor.
    pub fn new() -> Self {
        Self {
            ctx: Decompress::new(false),
            finished: false,
        }
    }
}

impl Default for InflateCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for InflateCodec {
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        let before_in = self.ctx.total_in();
        let before_out = self.ctx.total_out();
        let status = self
            .ctx
            .decompress(input, output, FlushDecompress::None)
            .map_err(|e| DpacError::codec(e.to_string()))?;
        let consumed = (self.ctx.total_in() - before_in) as usize;
        let produced = (self.ctx.total_out() - before_out) as usize;
        let status = match status {
            Status::StreamEnd => {
                self.finished = true;
                DecompressStatus::Done
            }
            Status::Ok | Status::BufError => {
                if consumed < input.len() {
                    DecompressStatus::NeedsOutput
                } else {
                    DecompressStatus::NeedsInput
                }
            }
        };
        Ok((consumed, produced, status))
    }

    fn reset(&mut self) {
        self.ctx.reset(false);
        self.finished = false;
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

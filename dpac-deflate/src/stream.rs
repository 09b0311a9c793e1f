//! Compress-on-write and decompress-on-read stream adapters.
//!
//! [`DeflateStream`] and [`InflateStream`] wrap an underlying stream and
//! implement the same [`WriteStream`]/[`ReadStream`] contracts, so they
//! compose transparently with archive entry streams and with each other.
//! Both are forward-only: `seek` and `skip` fail with
//! [`DpacError::IllegalState`].
//!
//! Each adapter drives its codec through a pair of staging buffers one chunk
//! at a time, so reads and writes can be issued one byte or one bulk
//! transfer at a time without materializing the whole payload.

use crate::codec::{DeflateCodec, InflateCodec};
use dpac_core::codec::{CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode};
use dpac_core::error::{DpacError, Result};
use dpac_core::stream::{ReadStream, Stream, Transfer, WriteStream};

/// Staging buffer size used by both adapters.
pub const CHUNK_SIZE: usize = 32 * 1024;

/// A write stream that deflates everything written through it.
///
/// Bytes written via [`WriteStream::write_bytes`] batch in an input staging
/// buffer and flush through the codec one full chunk at a time;
/// [`WriteStream::drain_from`] is the bulk path that compresses a whole
/// source stream chunk by chunk. [`DeflateStream::finish`] terminates the
/// compressed stream and must run before the sink is read back; dropping the
/// adapter finishes on a best-effort basis.
#[derive(Debug)]
pub struct DeflateStream<W: WriteStream, C: Compressor = DeflateCodec> {
    sink: W,
    codec: C,
    staged: Vec<u8>,
    out_buf: Vec<u8>,
    total_in: u64,
    total_out: u64,
    finished: bool,
}

impl<W: WriteStream> DeflateStream<W> {
    /// Wrap a sink stream with a default-level deflate codec.
    pub fn new(sink: W) -> Self {
        Self::with_codec(sink, DeflateCodec::new())
    }
}

impl<W: WriteStream, C: Compressor> DeflateStream<W, C> {
    /// Wrap a sink stream with a specific codec.
    pub fn with_codec(sink: W, codec: C) -> Self {
        Self {
            sink,
            codec,
            staged: Vec::with_capacity(CHUNK_SIZE),
            out_buf: vec![0u8; CHUNK_SIZE],
            total_in: 0,
            total_out: 0,
            finished: false,
        }
    }

    /// Cumulative `(compressed bytes written, plain bytes read)` totals.
    pub fn totals(&self) -> Transfer {
        Transfer {
            bytes_written: self.total_out,
            bytes_read: self.total_in,
        }
    }

    /// Terminate the compressed stream and flush the sink.
    ///
    /// Idempotent; a second call is a no-op.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.flush_staged(FlushMode::Finish)?;
        self.finished = true;
        self.sink.flush()
    }

    /// Finish the stream and return the underlying sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.finish()?;
        let this = std::mem::ManuallyDrop::new(self);
        // SAFETY: self is consumed and Drop is suppressed, so the sink can
        // be moved out without a double drop.
        Ok(unsafe { std::ptr::read(&this.sink) })
    }

    /// Run the staged input through the codec and clear it.
    fn flush_staged(&mut self, flush: FlushMode) -> Result<u64> {
        let staged = std::mem::take(&mut self.staged);
        let written = self.run_codec(&staged, flush)?;
        self.staged = staged;
        self.staged.clear();
        Ok(written)
    }

    /// Feed one input chunk through the codec, flushing every full or
    /// partial output buffer it produces to the sink.
    ///
    /// With [`FlushMode::None`] the loop ends once the chunk is consumed and
    /// the codec stops asking for output room; with [`FlushMode::Finish`] it
    /// ends only when the codec reports completion. Returns the compressed
    /// bytes written to the sink.
    fn run_codec(&mut self, input: &[u8], flush: FlushMode) -> Result<u64> {
        let mut pos = 0;
        let mut written = 0u64;
        loop {
            let (consumed, produced, status) =
                self.codec.compress(&input[pos..], &mut self.out_buf, flush)?;
            pos += consumed;
            self.total_in += consumed as u64;
            if produced > 0 {
                self.sink.write_bytes(&self.out_buf[..produced])?;
                self.total_out += produced as u64;
                written += produced as u64;
            }
            match status {
                CompressStatus::Done => break,
                CompressStatus::NeedsOutput => continue,
                CompressStatus::NeedsInput => {
                    if flush == FlushMode::None && pos >= input.len() {
                        break;
                    }
                }
            }
        }
        Ok(written)
    }
}

impl<W: WriteStream, C: Compressor> Stream for DeflateStream<W, C> {
    fn position(&self) -> u64 {
        self.total_in + self.staged.len() as u64
    }

    fn size(&self) -> Option<u64> {
        None
    }

    fn seek(&mut self, _position: u64) -> Result<()> {
        Err(DpacError::illegal_state(
            "deflate streams are forward-only and cannot seek",
        ))
    }
}

impl<W: WriteStream, C: Compressor> WriteStream for DeflateStream<W, C> {
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        if self.finished {
            return Err(DpacError::illegal_state(
                "deflate stream is already finished",
            ));
        }
        let mut rest = buf;
        while !rest.is_empty() {
            let room = CHUNK_SIZE - self.staged.len();
            let take = room.min(rest.len());
            self.staged.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.staged.len() == CHUNK_SIZE {
                self.flush_staged(FlushMode::None)?;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.sink.flush()
    }

    fn drain_from<R: ReadStream + ?Sized>(&mut self, source: &mut R) -> Result<Transfer> {
        if self.finished {
            return Err(DpacError::illegal_state(
                "deflate stream is already finished",
            ));
        }
        // Preserve byte order with anything previously staged.
        if !self.staged.is_empty() {
            self.flush_staged(FlushMode::None)?;
        }

        let mut chunk = vec![0u8; CHUNK_SIZE];
        let mut transfer = Transfer::default();
        loop {
            let read = source.read_into(&mut chunk)?;
            let last = !source.has_remaining();
            let flush = if last { FlushMode::Finish } else { FlushMode::None };
            transfer.bytes_written += self.run_codec(&chunk[..read], flush)?;
            transfer.bytes_read += read as u64;
            if last {
                self.finished = true;
                self.sink.flush()?;
                break;
            }
            if read == 0 {
                break;
            }
        }
        Ok(transfer)
    }
}

impl<W: WriteStream, C: Compressor> Drop for DeflateStream<W, C> {
    fn drop(&mut self) {
        // Best-effort finish on drop
        let _ = self.finish();
    }
}

/// Which refill action the inflate state machine takes next.
///
/// `BufferedInput` is the resumption case: the codec filled the output
/// buffer before consuming the whole input chunk, so the unconsumed
/// remainder must be decompressed before any more source bytes are pulled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefillState {
    /// The input buffer is spent; the next refill pulls from the source.
    NeedInput,
    /// The input buffer still holds unconsumed compressed bytes.
    BufferedInput,
}

/// A read stream that inflates everything read through it.
///
/// Owns a decompression context, an input buffer with a read index, and an
/// output buffer with a read index. Every typed read ultimately lands in
/// [`ReadStream::read_into`], which serves bytes out of the output buffer
/// and refills it through the codec on demand.
///
/// Generic over the [`Decompressor`] so the resumption logic can be tested
/// against a scripted codec.
#[derive(Debug)]
pub struct InflateStream<R: ReadStream, D: Decompressor = InflateCodec> {
    source: R,
    codec: D,
    in_buf: Vec<u8>,
    in_len: usize,
    in_pos: usize,
    out_buf: Vec<u8>,
    out_len: usize,
    out_pos: usize,
    state: RefillState,
    delivered: u64,
}

impl<R: ReadStream> InflateStream<R> {
    /// Wrap a source stream carrying raw-deflate bytes.
    pub fn new(source: R) -> Self {
        Self::with_codec(source, InflateCodec::new())
    }
}

impl<R: ReadStream, D: Decompressor> InflateStream<R, D> {
    /// Wrap a source stream with a specific codec.
    pub fn with_codec(source: R, codec: D) -> Self {
        Self::with_buffer_len(source, codec, CHUNK_SIZE)
    }

    fn with_buffer_len(source: R, codec: D, buffer_len: usize) -> Self {
        Self {
            source,
            codec,
            in_buf: vec![0u8; buffer_len],
            in_len: 0,
            in_pos: 0,
            out_buf: vec![0u8; buffer_len],
            out_len: 0,
            out_pos: 0,
            state: RefillState::NeedInput,
            delivered: 0,
        }
    }

    /// Consume the adapter and return the underlying source.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Refill the output buffer with the next batch of decompressed bytes.
    ///
    /// Returns the number of bytes now available, or 0 at end of stream.
    fn refill(&mut self) -> Result<usize> {
        self.out_pos = 0;
        self.out_len = 0;
        loop {
            if self.codec.is_finished() {
                return Ok(0);
            }
            if self.state == RefillState::NeedInput {
                let read = self.source.read_into(&mut self.in_buf)?;
                self.in_len = read;
                self.in_pos = 0;
                self.state = RefillState::BufferedInput;
            }
            let (consumed, produced, status) = self
                .codec
                .decompress(&self.in_buf[self.in_pos..self.in_len], &mut self.out_buf)?;
            self.in_pos += consumed;
            let input_spent = self.in_pos >= self.in_len;
            if input_spent {
                // Safe to forget the chunk; the next refill pulls fresh bytes.
                self.state = RefillState::NeedInput;
                self.in_pos = 0;
                self.in_len = 0;
            }
            if produced > 0 || status == DecompressStatus::Done {
                self.out_len = produced;
                return Ok(produced);
            }
            if status == DecompressStatus::NeedsInput
                && input_spent
                && !self.source.has_remaining()
            {
                return Err(DpacError::illegal_state(
                    "compressed stream ended before decompression finished",
                ));
            }
        }
    }
}

impl<R: ReadStream, D: Decompressor> Stream for InflateStream<R, D> {
    fn position(&self) -> u64 {
        self.delivered
    }

    fn size(&self) -> Option<u64> {
        None
    }

    fn seek(&mut self, _position: u64) -> Result<()> {
        Err(DpacError::illegal_state(
            "inflate streams are forward-only and cannot seek",
        ))
    }

    fn has_remaining(&self) -> bool {
        self.out_pos < self.out_len
            || (!self.codec.is_finished()
                && (self.in_pos < self.in_len || self.source.has_remaining()))
    }
}

impl<R: ReadStream, D: Decompressor> ReadStream for InflateStream<R, D> {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            if self.out_pos == self.out_len {
                if self.refill()? == 0 {
                    break;
                }
            }
            let take = (self.out_len - self.out_pos).min(buf.len() - total);
            buf[total..total + take]
                .copy_from_slice(&self.out_buf[self.out_pos..self.out_pos + take]);
            self.out_pos += take;
            total += take;
        }
        self.delivered += total as u64;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpac_core::stream::MemoryStream;
    use std::cell::Cell;
    use std::rc::Rc;

    fn fill_pattern(len: usize) -> Vec<u8> {
        // xorshift-ish filler, deterministic and incompressible enough
        let mut state = 0x2545_F491_4F6C_DD1Du64;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state & 0xFF) as u8
            })
            .collect()
    }

    fn deflate_to_vec(payload: &[u8]) -> (Vec<u8>, Transfer) {
        let mut source = MemoryStream::from_vec(payload.to_vec());
        let mut deflate = DeflateStream::new(MemoryStream::new());
        let transfer = deflate.drain_from(&mut source).unwrap();
        (deflate.into_inner().unwrap().into_inner(), transfer)
    }

    fn inflate_to_vec(compressed: Vec<u8>) -> Vec<u8> {
        let mut inflate = InflateStream::new(MemoryStream::from_vec(compressed));
        let mut sink = MemoryStream::new();
        sink.drain_from(&mut inflate).unwrap();
        sink.into_inner()
    }

    #[test]
    fn test_bulk_roundtrip() {
        let payload = b"streaming compression adapter roundtrip".repeat(500);
        let (compressed, transfer) = deflate_to_vec(&payload);
        assert_eq!(transfer.bytes_read, payload.len() as u64);
        assert_eq!(transfer.bytes_written, compressed.len() as u64);
        assert!(compressed.len() < payload.len());
        assert_eq!(inflate_to_vec(compressed), payload);
    }

    #[test]
    fn test_roundtrip_at_chunk_boundaries() {
        for len in [
            0,
            1,
            CHUNK_SIZE - 1,
            CHUNK_SIZE,
            CHUNK_SIZE + 1,
            3 * CHUNK_SIZE + 17,
        ] {
            let payload = fill_pattern(len);
            let (compressed, _) = deflate_to_vec(&payload);
            assert_eq!(inflate_to_vec(compressed), payload, "payload len {len}");
        }
    }

    #[test]
    fn test_staged_byte_writes() {
        // Cross the staging-buffer boundary writing a few bytes at a time.
        let payload = fill_pattern(CHUNK_SIZE + 5);
        let mut deflate = DeflateStream::new(MemoryStream::new());
        for chunk in payload.chunks(3) {
            deflate.write_bytes(chunk).unwrap();
        }
        assert_eq!(deflate.position(), payload.len() as u64);
        deflate.finish().unwrap();
        let compressed = deflate.into_inner().unwrap().into_inner();
        assert_eq!(inflate_to_vec(compressed), payload);
    }

    #[test]
    fn test_write_after_finish_fails() {
        let mut deflate = DeflateStream::new(MemoryStream::new());
        deflate.write_bytes(b"tail").unwrap();
        deflate.finish().unwrap();
        let err = deflate.write_bytes(b"more").unwrap_err();
        assert!(matches!(err, DpacError::IllegalState { .. }));
        // finish stays idempotent
        deflate.finish().unwrap();
    }

    #[test]
    fn test_seek_is_illegal_on_both_adapters() {
        let mut deflate = DeflateStream::new(MemoryStream::new());
        assert!(matches!(
            deflate.seek(0),
            Err(DpacError::IllegalState { .. })
        ));
        assert!(matches!(
            deflate.skip(1),
            Err(DpacError::IllegalState { .. })
        ));

        let (compressed, _) = deflate_to_vec(b"payload");
        let mut inflate = InflateStream::new(MemoryStream::from_vec(compressed));
        assert!(matches!(
            inflate.seek(0),
            Err(DpacError::IllegalState { .. })
        ));
        assert!(matches!(
            inflate.skip(1),
            Err(DpacError::IllegalState { .. })
        ));
    }

    #[test]
    fn test_has_remaining_tracks_last_byte() {
        let payload = b"0123456789";
        let (compressed, _) = deflate_to_vec(payload);
        let mut inflate = InflateStream::new(MemoryStream::from_vec(compressed));

        let mut buf = [0u8; 1];
        for i in 0..payload.len() {
            assert!(inflate.has_remaining(), "before byte {i}");
            assert_eq!(inflate.read_into(&mut buf).unwrap(), 1);
            assert_eq!(buf[0], payload[i]);
        }
        assert!(!inflate.has_remaining());
        assert_eq!(inflate.read_into(&mut buf).unwrap(), 0);
        assert_eq!(inflate.position(), payload.len() as u64);
    }

    #[test]
    fn test_typed_reads_through_inflate() {
        let mut plain = MemoryStream::new();
        plain.write_u32(0xCAFE_BABE).unwrap();
        plain.write_string("nested").unwrap();
        plain.write_i64(-42).unwrap();
        plain.rewind();

        let mut deflate = DeflateStream::new(MemoryStream::new());
        deflate.drain_from(&mut plain).unwrap();
        let compressed = deflate.into_inner().unwrap().into_inner();

        let mut inflate = InflateStream::new(MemoryStream::from_vec(compressed));
        assert_eq!(inflate.read_u32().unwrap(), 0xCAFE_BABE);
        assert_eq!(inflate.read_string().unwrap(), "nested");
        assert_eq!(inflate.read_i64().unwrap(), -42);
        assert!(!inflate.has_remaining());
    }

    /// A source wrapper that counts how often the inflate adapter pulls
    /// fresh compressed bytes.
    struct CountingSource {
        inner: MemoryStream,
        pulls: Rc<Cell<usize>>,
    }

    impl Stream for CountingSource {
        fn position(&self) -> u64 {
            self.inner.position()
        }
        fn size(&self) -> Option<u64> {
            self.inner.size()
        }
        fn seek(&mut self, position: u64) -> Result<()> {
            self.inner.seek(position)
        }
    }

    impl ReadStream for CountingSource {
        fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
            self.pulls.set(self.pulls.get() + 1);
            self.inner.read_into(buf)
        }
    }

    /// Scripted decompressor: every input byte expands to `expansion`
    /// copies, and the stream ends after `remaining_input` bytes.
    struct ScriptedInflater {
        expansion: usize,
        remaining_input: usize,
        finished: bool,
    }

    impl Decompressor for ScriptedInflater {
        fn decompress(
            &mut self,
            input: &[u8],
            output: &mut [u8],
        ) -> Result<(usize, usize, DecompressStatus)> {
            if self.remaining_input == 0 {
                self.finished = true;
                return Ok((0, 0, DecompressStatus::Done));
            }
            let consumed = (output.len() / self.expansion)
                .min(input.len())
                .min(self.remaining_input);
            for (i, &byte) in input[..consumed].iter().enumerate() {
                output[i * self.expansion..(i + 1) * self.expansion].fill(byte);
            }
            self.remaining_input -= consumed;
            let status = if self.remaining_input == 0 {
                self.finished = true;
                DecompressStatus::Done
            } else if consumed < input.len() {
                DecompressStatus::NeedsOutput
            } else {
                DecompressStatus::NeedsInput
            };
            Ok((consumed, consumed * self.expansion, status))
        }

        fn reset(&mut self) {
            self.finished = false;
        }

        fn is_finished(&self) -> bool {
            self.finished
        }
    }

    #[test]
    fn test_refill_resumes_buffered_input_without_rereading_source() {
        // One 64-byte source chunk expands 4x, so the 64-byte output buffer
        // fills after a quarter of the input: three refills must resume the
        // buffered remainder without touching the source again.
        let buffer_len = 64;
        let source_bytes: Vec<u8> = (0..64u8).collect();
        let pulls = Rc::new(Cell::new(0));
        let source = CountingSource {
            inner: MemoryStream::from_vec(source_bytes.clone()),
            pulls: Rc::clone(&pulls),
        };
        let codec = ScriptedInflater {
            expansion: 4,
            remaining_input: source_bytes.len(),
            finished: false,
        };
        let mut inflate = InflateStream::with_buffer_len(source, codec, buffer_len);

        let mut sink = MemoryStream::new();
        let transfer = sink.drain_from(&mut inflate).unwrap();
        assert_eq!(transfer.bytes_written, (source_bytes.len() * 4) as u64);
        assert_eq!(pulls.get(), 1, "source must be read exactly once");

        let out = sink.into_inner();
        for (i, &byte) in source_bytes.iter().enumerate() {
            assert!(out[i * 4..(i + 1) * 4].iter().all(|&b| b == byte));
        }
    }

    #[test]
    fn test_truncated_stream_is_illegal_state() {
        // The codec expects more input than the source holds.
        let source = MemoryStream::from_vec(vec![7u8; 16]);
        let codec = ScriptedInflater {
            expansion: 1,
            remaining_input: 32,
            finished: false,
        };
        let mut inflate = InflateStream::with_buffer_len(source, codec, 64);

        // The first 16 bytes decompress fine; asking for more hits the
        // truncation.
        let mut buf = [0u8; 16];
        assert_eq!(inflate.read_into(&mut buf).unwrap(), 16);
        let err = inflate.read_into(&mut buf).unwrap_err();
        assert!(matches!(err, DpacError::IllegalState { .. }));
    }
}

use std::io::Read;
use std::thread;
use std::time::Duration;

use super::UnitSink;
use super::h264::{ACCESS_UNIT_DELIMITER, NAL_IDR, NAL_NON_IDR, NAL_PPS, NAL_SEI};
use crate::error::{IngestError, Result};

const CHUNK_LEN: usize = 8192;

/// Re-slices a raw H.264 elementary byte stream on access-unit
/// boundaries.
///
/// Scans for Annex-B start codes (both 3-byte `00 00 01` and 4-byte
/// `00 00 00 01`) and peeks the NAL type behind each one. A non-IDR
/// slice, IDR slice, SEI, or PPS opens a new access unit: everything
/// buffered before its start code is flushed to the sink, prefixed with
/// the access unit delimiter, and the start code itself is retained at
/// the head of the next buffer.
///
/// An optional inter-flush delay paces output for downstream consumers
/// that expect near-realtime delivery; zero flushes immediately.
///
/// End of input always leaves a partial access unit behind (the final
/// unit has no following boundary), reported as
/// [`UnexpectedEnd`](IngestError::UnexpectedEnd) carrying the number of
/// unflushed bytes.
pub struct ByteStreamLexer {
    delay: Duration,
}

impl ByteStreamLexer {
    pub fn new(delay: Duration) -> Self {
        ByteStreamLexer { delay }
    }

    /// Lex `src` to completion, emitting access units on `sink`.
    pub fn lex<R: Read, S: UnitSink>(&self, src: &mut R, sink: &mut S) -> Result<()> {
        let mut buf: Vec<u8> = Vec::new();
        let mut unit: Vec<u8> = Vec::new();
        let mut chunk = [0u8; CHUNK_LEN];
        let mut scan = 0usize;

        loop {
            let n = src.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            // Hold back the longest prefix that could still be a start
            // code split across reads.
            while scan + 5 <= buf.len() {
                let (sc_len, nal_type) = if buf[scan..scan + 4] == [0, 0, 0, 1] {
                    (4, buf[scan + 4] & 0x1F)
                } else if buf[scan..scan + 3] == [0, 0, 1] {
                    (3, buf[scan + 3] & 0x1F)
                } else {
                    scan += 1;
                    continue;
                };

                let boundary = matches!(nal_type, NAL_NON_IDR | NAL_IDR | NAL_SEI | NAL_PPS);
                if boundary && scan > 0 {
                    unit.clear();
                    unit.extend_from_slice(&ACCESS_UNIT_DELIMITER);
                    unit.extend_from_slice(&buf[..scan]);
                    sink.put(&unit)?;
                    tracing::trace!(bytes = unit.len(), nal_type, "access unit lexed");
                    if !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }
                    // Retain the new NAL's start code at the buffer head.
                    buf.drain(..scan);
                    scan = sc_len;
                } else {
                    scan += sc_len;
                }
            }
        }

        if !buf.is_empty() {
            return Err(IngestError::UnexpectedEnd(buf.len()));
        }
        Ok(())
    }
}

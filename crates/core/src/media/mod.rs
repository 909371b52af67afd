//! Depacketizers and access-unit framing.
//!
//! This module turns RTP payloads back into codec-native access units:
//! ordered sequences of NAL units in Annex-B byte-stream form, each NAL
//! prefixed by a start code.
//!
//! ## Supported codecs
//!
//! | Codec | Module | RFC | Packetization handled |
//! |-------|--------|-----|----------------------|
//! | H.264 | [`h264`] | [RFC 6184](https://tools.ietf.org/html/rfc6184) | Single NALU, STAP-A, FU-A |
//! | H.265 | [`h265`] | [RFC 7798](https://tools.ietf.org/html/rfc7798) | Single NALU, aggregation (48), fragmentation (49) |
//!
//! [`lexer`] covers the non-RTP path: re-slicing a raw H.264 elementary
//! stream on access-unit boundaries.
//!
//! ## The sink capability
//!
//! Depacketizers are generic over a [`UnitSink`], which accepts one
//! whole access unit per call. Implementations copy the bytes before
//! returning — the depacketizer reuses its buffer immediately after.
//! The sink is synchronous: if it blocks, the depacketizer blocks with
//! it. No internal queues.

pub mod h264;
pub mod h265;
pub mod lexer;

use std::io;

use crate::error::Result;

/// Downstream consumer of access units.
///
/// One call per access unit; the slice is only valid for the duration
/// of the call, so implementations must copy what they keep.
pub trait UnitSink {
    fn put(&mut self, unit: &[u8]) -> Result<()>;
}

impl<T: UnitSink + ?Sized> UnitSink for &mut T {
    fn put(&mut self, unit: &[u8]) -> Result<()> {
        (**self).put(unit)
    }
}

/// Collects access units for inspection; the test workhorse.
impl UnitSink for Vec<Vec<u8>> {
    fn put(&mut self, unit: &[u8]) -> Result<()> {
        self.push(unit.to_vec());
        Ok(())
    }
}

/// Adapts any [`io::Write`] into a sink, concatenating access units.
///
/// Useful for writing a playable Annex-B elementary stream to a file.
pub struct WriteSink<W: io::Write>(pub W);

impl<W: io::Write> UnitSink for WriteSink<W> {
    fn put(&mut self, unit: &[u8]) -> Result<()> {
        self.0.write_all(unit)?;
        Ok(())
    }
}

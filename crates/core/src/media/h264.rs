use super::UnitSink;
use crate::error::{IngestError, Result};
use crate::rtp::packet;

/// Coded slice of a non-IDR picture.
pub const NAL_NON_IDR: u8 = 1;
/// Coded slice of an IDR picture.
pub const NAL_IDR: u8 = 5;
/// Supplemental enhancement information.
pub const NAL_SEI: u8 = 6;
/// Sequence parameter set.
pub const NAL_SPS: u8 = 7;
/// Picture parameter set.
pub const NAL_PPS: u8 = 8;

const STAP_A: u8 = 24;
const STAP_B: u8 = 25;
const MTAP16: u8 = 26;
const MTAP24: u8 = 27;
const FU_A: u8 = 28;
const FU_B: u8 = 29;

/// Access unit delimiter NALU: type 9, primary picture payload 0xF0,
/// with its 3-byte start code.
pub const ACCESS_UNIT_DELIMITER: [u8; 5] = [0x00, 0x00, 0x01, 0x09, 0xF0];

/// Annex-B start code prefixed to every NAL unit.
pub const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// H.264 RTP depacketizer (RFC 6184).
///
/// Consumes one RTP packet per [`write`](Self::write) call and produces
/// zero or more Annex-B access units on the sink. Handles the three
/// packetization modes a camera actually sends:
///
/// - **Single NAL Unit** (§5.6): types 1–23, written with a start code.
/// - **STAP-A** (§5.7.1): type 24; the body is a sequence of
///   `size(16) nalu(size)` records, each written with a start code.
/// - **FU-A** (§5.8): type 28; fragments of one NALU spread across
///   packets:
///
///   ```text
///   FU indicator:  [F|NRI|Type=28]     (1 byte)
///   FU header:     [S|E|R|NAL_Type]    (1 byte)
///   Fragment data: [...]
///   ```
///
///   The reassembled NALU header is
///   `(indicator & 0xE0) | (FU_header & 0x1F)`.
///
/// STAP-B, MTAP16/24, and FU-B fail with
/// [`Unsupported`](IngestError::Unsupported) rather than being silently
/// dropped.
///
/// ## Access-unit boundaries
///
/// The buffer is initialised with the access unit delimiter. After a
/// packet's payload is fully written, the unit is flushed to the sink
/// when the newly completed NAL unit is an SPS, IDR slice, or non-IDR
/// slice and the buffer holds at least one NAL unit beyond the AUD.
/// Aggregation packets check once, on their last record; fragments only
/// when the end fragment completes. After a flush the buffer is reset
/// to the AUD alone.
pub struct H264Depacketizer<S: UnitSink> {
    sink: S,
    /// Current access unit, always beginning with the AUD.
    buf: Vec<u8>,
    /// Partial NALU being reassembled from FU-A fragments.
    frag: Vec<u8>,
    fragmented: bool,
}

/// Append one NAL unit to the access-unit buffer with its start code.
fn append_nalu(buf: &mut Vec<u8>, nalu: &[u8]) {
    buf.extend_from_slice(&START_CODE);
    buf.extend_from_slice(nalu);
}

impl<S: UnitSink> H264Depacketizer<S> {
    pub fn new(sink: S) -> Self {
        H264Depacketizer {
            sink,
            buf: ACCESS_UNIT_DELIMITER.to_vec(),
            frag: Vec::new(),
            fragmented: false,
        }
    }

    /// Consume the depacketizer, returning the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Borrow the sink, e.g. to inspect collected units.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Process one whole RTP packet.
    pub fn write(&mut self, pkt: &[u8]) -> Result<()> {
        let payload = packet::payload(pkt)?;
        if payload.is_empty() {
            return Err(IngestError::ShortPacket { len: 0, need: 1 });
        }
        let nal_type = payload[0] & 0x1F;

        // A missing fragment voids the whole in-progress NALU.
        if self.fragmented && nal_type != FU_A {
            tracing::debug!(nal_type, "fragmentation interrupted, partial NALU dropped");
            self.frag.clear();
            self.fragmented = false;
        }

        match nal_type {
            1..=23 => {
                append_nalu(&mut self.buf, payload);
                self.maybe_flush(nal_type)
            }
            STAP_A => self.write_aggregation(&payload[1..]),
            FU_A => self.write_fragment(payload),
            STAP_B => Err(IngestError::Unsupported("STAP-B")),
            MTAP16 => Err(IngestError::Unsupported("MTAP16")),
            MTAP24 => Err(IngestError::Unsupported("MTAP24")),
            FU_B => Err(IngestError::Unsupported("FU-B")),
            _ => Err(IngestError::Unsupported("reserved H.264 NAL type")),
        }
    }

    /// STAP-A body: `size(16) nalu(size)` records back to back
    /// (RFC 6184 §5.7.1).
    fn write_aggregation(&mut self, body: &[u8]) -> Result<()> {
        let mut idx = 0;
        let mut last_type = None;
        while idx < body.len() {
            if body.len() < idx + 2 {
                return Err(IngestError::ShortPacket {
                    len: body.len(),
                    need: idx + 2,
                });
            }
            let size = u16::from_be_bytes([body[idx], body[idx + 1]]) as usize;
            idx += 2;
            if body.len() < idx + size {
                return Err(IngestError::ShortPacket {
                    len: body.len(),
                    need: idx + size,
                });
            }
            let nalu = &body[idx..idx + size];
            idx += size;
            if nalu.is_empty() {
                continue;
            }
            append_nalu(&mut self.buf, nalu);
            last_type = Some(nalu[0] & 0x1F);
        }

        match last_type {
            Some(nal_type) => self.maybe_flush(nal_type),
            None => Ok(()),
        }
    }

    /// One FU-A fragment (RFC 6184 §5.8).
    fn write_fragment(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() < 2 {
            return Err(IngestError::ShortPacket {
                len: payload.len(),
                need: 2,
            });
        }
        let indicator = payload[0];
        let fu_header = payload[1];
        let start = fu_header & 0x80 != 0;
        let end = fu_header & 0x40 != 0;
        let data = &payload[2..];

        if start && end {
            self.frag.clear();
            self.fragmented = false;
            return Err(IngestError::BadFragment);
        }

        if start {
            if self.fragmented {
                tracing::debug!("start fragment while reassembling, partial NALU dropped");
            }
            self.frag.clear();
            self.frag.push((indicator & 0xE0) | (fu_header & 0x1F));
            self.frag.extend_from_slice(data);
            self.fragmented = true;
            return Ok(());
        }

        if !self.fragmented {
            tracing::debug!("continuation fragment without start, dropped");
            return Ok(());
        }

        self.frag.extend_from_slice(data);
        if end {
            self.fragmented = false;
            let nal_type = self.frag[0] & 0x1F;
            append_nalu(&mut self.buf, &self.frag);
            self.frag.clear();
            return self.maybe_flush(nal_type);
        }
        Ok(())
    }

    fn maybe_flush(&mut self, nal_type: u8) -> Result<()> {
        if matches!(nal_type, NAL_SPS | NAL_IDR | NAL_NON_IDR)
            && self.buf.len() > ACCESS_UNIT_DELIMITER.len()
        {
            tracing::trace!(bytes = self.buf.len(), "access unit complete");
            self.sink.put(&self.buf)?;
            self.buf.truncate(ACCESS_UNIT_DELIMITER.len());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtp::Packet;

    fn rtp(payload: &[u8]) -> Vec<u8> {
        Packet {
            payload: payload.to_vec(),
            ..Packet::default()
        }
        .encode()
    }

    fn prefixed(nalus: &[&[u8]]) -> Vec<u8> {
        let mut unit = ACCESS_UNIT_DELIMITER.to_vec();
        for nalu in nalus {
            unit.extend_from_slice(&START_CODE);
            unit.extend_from_slice(nalu);
        }
        unit
    }

    fn make_depacketizer() -> H264Depacketizer<Vec<Vec<u8>>> {
        H264Depacketizer::new(Vec::new())
    }

    #[test]
    fn single_nalu() {
        let mut d = make_depacketizer();
        d.write(&rtp(&[0x01, 0x02, 0x03, 0x04, 0x05])).unwrap();
        assert_eq!(d.sink().len(), 1);
        assert_eq!(
            d.sink()[0],
            [0x00, 0x00, 0x01, 0x09, 0xF0, 0x00, 0x00, 0x00, 0x01, 0x01, 0x02, 0x03, 0x04, 0x05]
        );
    }

    #[test]
    fn fua_reassembly() {
        let mut d = make_depacketizer();
        d.write(&rtp(&[0x1C, 0x81, 0x01, 0x02, 0x03])).unwrap();
        assert!(d.sink().is_empty());
        d.write(&rtp(&[0x1C, 0x01, 0x04, 0x05, 0x06])).unwrap();
        d.write(&rtp(&[0x1C, 0x41, 0x07, 0x08, 0x09])).unwrap();

        // Reassembled header: (0x1C & 0xE0) | (0x81 & 0x1F) = 0x01.
        assert_eq!(d.sink().len(), 1);
        assert_eq!(
            d.sink()[0],
            [
                0x00, 0x00, 0x01, 0x09, 0xF0, 0x00, 0x00, 0x00, 0x01, 0x01, 0x01, 0x02, 0x03,
                0x04, 0x05, 0x06, 0x07, 0x08, 0x09
            ]
        );
    }

    #[test]
    fn stap_a_aggregation() {
        let mut d = make_depacketizer();
        d.write(&rtp(&[
            0x18, 0x00, 0x04, 0x01, 0x02, 0x03, 0x04, 0x00, 0x04, 0x01, 0x02, 0x03, 0x04,
        ]))
        .unwrap();

        // Both records land in one access unit after the AUD.
        assert_eq!(
            d.into_sink(),
            vec![prefixed(&[&[0x01, 0x02, 0x03, 0x04], &[0x01, 0x02, 0x03, 0x04]])]
        );
    }

    #[test]
    fn parameter_sets_group_with_idr() {
        let mut d = make_depacketizer();
        let sps = [0x67, 0x42, 0x00, 0x1E];
        let pps = [0x68, 0xCE, 0x38, 0x80];
        let idr = [0x65, 0x88, 0x00];

        d.write(&rtp(&sps)).unwrap();
        assert_eq!(d.sink().as_slice(), &[prefixed(&[&sps])]);
        d.write(&rtp(&pps)).unwrap();
        assert_eq!(d.sink().len(), 1, "PPS does not close an access unit");
        d.write(&rtp(&idr)).unwrap();
        assert_eq!(d.sink().len(), 2);
        assert_eq!(d.sink()[1], prefixed(&[&pps, &idr]));
    }

    #[test]
    fn unsupported_types_fail_without_state_change() {
        let mut d = make_depacketizer();
        let pps = [0x68, 0xCE];
        d.write(&rtp(&pps)).unwrap();

        for payload in [[0x19u8, 0xAA], [0x1A, 0xAA], [0x1B, 0xAA], [0x1D, 0xAA]] {
            assert!(matches!(
                d.write(&rtp(&payload)),
                Err(IngestError::Unsupported(_))
            ));
        }

        // The buffered PPS survived the failed calls.
        d.write(&rtp(&[0x65, 0x88])).unwrap();
        assert_eq!(d.into_sink(), vec![prefixed(&[&pps, &[0x65, 0x88]])]);
    }

    #[test]
    fn start_and_end_bits_together_are_malformed() {
        let mut d = make_depacketizer();
        d.write(&rtp(&[0x1C, 0x81, 0x01])).unwrap();
        assert!(matches!(
            d.write(&rtp(&[0x1C, 0xC1, 0x02])),
            Err(IngestError::BadFragment)
        ));

        // Fragmentation state was reset: a fresh NALU flows through.
        d.write(&rtp(&[0x01, 0xAA])).unwrap();
        assert_eq!(d.into_sink(), vec![prefixed(&[&[0x01, 0xAA]])]);
    }

    #[test]
    fn interrupted_fragment_is_discarded() {
        let mut d = make_depacketizer();
        d.write(&rtp(&[0x1C, 0x81, 0x01, 0x02])).unwrap();
        // A single NALU interrupts the fragment; the partial NALU must
        // not leak into the output.
        d.write(&rtp(&[0x01, 0xAA, 0xBB])).unwrap();
        assert_eq!(d.sink().as_slice(), &[prefixed(&[&[0x01, 0xAA, 0xBB]])]);

        // A stray end fragment after the reset is dropped.
        d.write(&rtp(&[0x1C, 0x41, 0x03])).unwrap();
        assert_eq!(d.sink().len(), 1);
    }

    #[test]
    fn truncated_stap_a_is_short() {
        let mut d = make_depacketizer();
        assert!(matches!(
            d.write(&rtp(&[0x18, 0x00, 0x09, 0x01, 0x02])),
            Err(IngestError::ShortPacket { .. })
        ));
    }
}

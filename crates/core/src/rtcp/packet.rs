use crate::error::{IngestError, Result};

/// RTCP protocol version (RFC 3550 §6.4).
pub const VERSION: u8 = 2;

/// Sender report packet type.
pub const TYPE_SENDER_REPORT: u8 = 200;
/// Receiver report packet type.
pub const TYPE_RECEIVER_REPORT: u8 = 201;
/// Source description packet type.
pub const TYPE_SOURCE_DESCRIPTION: u8 = 202;

/// SDES item type for the canonical end-point identifier.
pub const SDES_CNAME: u8 = 1;

/// 24-bit all-ones cumulative loss, meaning "unknown" (RFC 3550 §6.4.1).
pub const LOSS_UNKNOWN: u32 = 0x00FF_FFFF;

/// Fixed part of a sender report: header, SSRC, 8-byte NTP timestamp.
const SR_TIMESTAMP_END: usize = 16;

/// One reception report block (RFC 3550 §6.4.1), 24 bytes on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportBlock {
    /// SSRC of the source this block reports on.
    pub ssrc: u32,
    /// Fraction of packets lost since the previous report.
    pub fraction_lost: u8,
    /// Cumulative packets lost, 24-bit; [`LOSS_UNKNOWN`] when untracked.
    pub packets_lost: u32,
    /// Extended highest sequence: `(cycles << 16) | last_sequence`.
    pub highest_sequence: u32,
    /// Interarrival jitter estimate.
    pub jitter: u32,
    /// Middle 32 bits of the last sender report's NTP timestamp.
    pub last_sr: u32,
    /// Delay since that sender report, in units of 1/65536 s.
    pub delay: u32,
}

/// A receiver report with exactly one report block (RFC 3550 §6.4.2).
///
/// ```text
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|  RC=1   |   PT=201      |            length             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                     SSRC of packet sender                     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                 report block (24 bytes) ...                   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverReport {
    /// SSRC of the reporting client.
    pub ssrc: u32,
    pub block: ReportBlock,
}

impl ReceiverReport {
    /// Append the encoded report to `buf` (big-endian throughout).
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        // Header: V=2, P=0, RC=1, PT=201, length = 7 words beyond the first.
        buf.push(VERSION << 6 | 1);
        buf.push(TYPE_RECEIVER_REPORT);
        buf.extend_from_slice(&7u16.to_be_bytes());
        buf.extend_from_slice(&self.ssrc.to_be_bytes());

        let b = &self.block;
        buf.extend_from_slice(&b.ssrc.to_be_bytes());
        buf.push(b.fraction_lost);
        buf.extend_from_slice(&b.packets_lost.to_be_bytes()[1..4]);
        buf.extend_from_slice(&b.highest_sequence.to_be_bytes());
        buf.extend_from_slice(&b.jitter.to_be_bytes());
        buf.extend_from_slice(&b.last_sr.to_be_bytes());
        buf.extend_from_slice(&b.delay.to_be_bytes());
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32);
        self.encode_into(&mut buf);
        buf
    }
}

/// A source description with one chunk carrying a CNAME item
/// (RFC 3550 §6.5).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDescription {
    /// SSRC of the described source (the reporting client).
    pub ssrc: u32,
    /// Canonical end-point identifier, at most 255 bytes on the wire.
    pub cname: String,
}

impl SourceDescription {
    /// Append the encoded description to `buf`.
    ///
    /// The chunk's item list ends with a zero-type item and the packet is
    /// zero-padded to a 32-bit boundary.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        let name = &self.cname.as_bytes()[..self.cname.len().min(255)];
        // ssrc + item header + text + at least one terminating zero.
        let chunk_len = 4 + 2 + name.len() + 1;
        let padded = chunk_len.next_multiple_of(4);
        let words = (4 + padded) / 4;

        buf.push(VERSION << 6 | 1);
        buf.push(TYPE_SOURCE_DESCRIPTION);
        buf.extend_from_slice(&(words as u16 - 1).to_be_bytes());
        buf.extend_from_slice(&self.ssrc.to_be_bytes());
        buf.push(SDES_CNAME);
        buf.push(name.len() as u8);
        buf.extend_from_slice(name);
        buf.resize(buf.len() + (padded - chunk_len) + 1, 0);
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32);
        self.encode_into(&mut buf);
        buf
    }
}

/// Extract the two NTP timestamp words from an encoded sender report.
///
/// Returns `(seconds, fraction)` — the most and least significant 32-bit
/// halves of the 64-bit NTP timestamp. Fails with `BadVersion` when the
/// version field is not 2 and `WrongType` when the packet type is not
/// 200.
pub fn parse_sender_timestamp(buf: &[u8]) -> Result<(u32, u32)> {
    if buf.len() < SR_TIMESTAMP_END {
        return Err(IngestError::ShortPacket {
            len: buf.len(),
            need: SR_TIMESTAMP_END,
        });
    }
    let v = buf[0] >> 6;
    if v != VERSION {
        return Err(IngestError::BadVersion(v));
    }
    if buf[1] != TYPE_SENDER_REPORT {
        return Err(IngestError::WrongType(buf[1]));
    }
    let seconds = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);
    let fraction = u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]);
    Ok((seconds, fraction))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_report() -> ReceiverReport {
        ReceiverReport {
            ssrc: 0xD6E098DA,
            block: ReportBlock {
                ssrc: 0x6FAD40C6,
                fraction_lost: 0,
                packets_lost: LOSS_UNKNOWN,
                highest_sequence: 0x00018308,
                jitter: 0x20,
                last_sr: 0xB9E1252A,
                delay: 0x2BF9,
            },
        }
    }

    #[test]
    fn receiver_report_bytes() {
        let expect: [u8; 32] = [
            0x81, 0xC9, 0x00, 0x07, // V=2, RC=1, PT=201, length=7
            0xD6, 0xE0, 0x98, 0xDA, // sender SSRC
            0x6F, 0xAD, 0x40, 0xC6, // source SSRC
            0x00, 0xFF, 0xFF, 0xFF, // fraction lost, cumulative lost
            0x00, 0x01, 0x83, 0x08, // extended highest sequence
            0x00, 0x00, 0x00, 0x20, // jitter
            0xB9, 0xE1, 0x25, 0x2A, // LSR
            0x00, 0x00, 0x2B, 0xF9, // DLSR
        ];
        assert_eq!(make_report().encode(), expect);
    }

    #[test]
    fn source_description_bytes() {
        let sdes = SourceDescription {
            ssrc: 0xD6E098DA,
            cname: "saxon-pc".to_string(),
        };
        let expect: [u8; 20] = [
            0x81, 0xCA, 0x00, 0x04, // V=2, SC=1, PT=202, length=4
            0xD6, 0xE0, 0x98, 0xDA, // chunk SSRC
            0x01, 0x08, // CNAME item, 8 bytes
            b's', b'a', b'x', b'o', b'n', b'-', b'p', b'c', //
            0x00, 0x00, // terminator + pad
        ];
        assert_eq!(sdes.encode(), expect);
    }

    #[test]
    fn sdes_pads_to_word_boundary() {
        for len in 1..=8 {
            let sdes = SourceDescription {
                ssrc: 1,
                cname: "x".repeat(len),
            };
            let buf = sdes.encode();
            assert_eq!(buf.len() % 4, 0, "cname len {len}");
            let words = u16::from_be_bytes([buf[2], buf[3]]) as usize;
            assert_eq!(buf.len(), 4 * (words + 1), "cname len {len}");
            // Item list always ends with a zero-type octet.
            assert_eq!(buf[buf.len() - 1], 0);
        }
    }

    #[test]
    fn compound_packet_layout() {
        let mut buf = Vec::new();
        make_report().encode_into(&mut buf);
        SourceDescription {
            ssrc: 0xD6E098DA,
            cname: "saxon-pc".to_string(),
        }
        .encode_into(&mut buf);
        assert_eq!(buf.len(), 52);
        assert_eq!(buf[32], 0x81);
        assert_eq!(buf[33], 0xCA);
    }

    #[test]
    fn parse_sender_timestamp_words() {
        let mut sr = vec![
            0x80, 0xC8, 0x00, 0x06, // V=2, RC=0, PT=200
            0x6F, 0xAD, 0x40, 0xC6, // SSRC
            0xE8, 0x4B, 0x12, 0x34, // NTP seconds
            0x80, 0x00, 0x00, 0x00, // NTP fraction
        ];
        sr.extend_from_slice(&[0u8; 12]); // RTP ts + counts
        let (seconds, fraction) = parse_sender_timestamp(&sr).unwrap();
        assert_eq!(seconds, 0xE84B1234);
        assert_eq!(fraction, 0x80000000);
    }

    #[test]
    fn parse_rejects_wrong_type() {
        let rr = make_report().encode();
        assert!(matches!(
            parse_sender_timestamp(&rr),
            Err(IngestError::WrongType(TYPE_RECEIVER_REPORT))
        ));
    }

    #[test]
    fn parse_rejects_bad_version() {
        let mut sr = vec![0u8; 28];
        sr[0] = 0x40;
        sr[1] = TYPE_SENDER_REPORT;
        assert!(matches!(
            parse_sender_timestamp(&sr),
            Err(IngestError::BadVersion(1))
        ));
    }

    #[test]
    fn parse_rejects_short_packet() {
        assert!(matches!(
            parse_sender_timestamp(&[0x80, 0xC8]),
            Err(IngestError::ShortPacket { need: 16, .. })
        ));
    }
}

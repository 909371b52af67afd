use crate::error::{IngestError, Result};

/// RTP protocol version (RFC 3550 §5.1).
pub const VERSION: u8 = 2;

/// Size of the fixed RTP header in bytes.
pub const MIN_HEADER_LEN: usize = 12;

/// One RTP datagram (RFC 3550 §5.1).
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         CSRC list ...                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The CSRC list length is authoritative — the wire CC field is derived
/// from `csrc.len()` at encode time. The extension flag is derived from
/// `extension.is_some()`, the padding flag from `padding > 0`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    /// Marker bit; codec-specific meaning (RFC 3550 §5.1).
    pub marker: bool,
    /// 7-bit payload type (RFC 3551).
    pub payload_type: u8,
    /// 16-bit sequence number, wrapping.
    pub sequence: u16,
    /// 32-bit media clock timestamp.
    pub timestamp: u32,
    /// Synchronization source identifier.
    pub ssrc: u32,
    /// Contributing source identifiers (0–15).
    pub csrc: Vec<u32>,
    /// Optional header extension (RFC 3550 §5.3.1).
    pub extension: Option<Extension>,
    /// Payload bytes.
    pub payload: Vec<u8>,
    /// Trailing padding octets, 0 for none. When non-zero the last
    /// padding octet carries the count (RFC 3550 §5.1).
    pub padding: u8,
}

/// RTP header extension: a 16-bit profile identifier followed by
/// length-prefixed 32-bit words (RFC 3550 §5.3.1).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extension {
    pub profile: u16,
    pub words: Vec<u32>,
}

impl Packet {
    /// Exact encoded size in bytes.
    pub fn wire_len(&self) -> usize {
        let ext = self
            .extension
            .as_ref()
            .map_or(0, |e| 4 + 4 * e.words.len());
        MIN_HEADER_LEN + 4 * self.csrc.len() + ext + self.payload.len() + self.padding as usize
    }

    /// Encode into a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }

    /// Encode into `buf`, reusing its capacity when it suffices.
    ///
    /// All multi-byte fields are written big-endian: fixed header, CSRC
    /// list, extension header, payload, then padding with the count in
    /// the final octet.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.clear();
        buf.reserve(self.wire_len());

        let mut first = VERSION << 6 | (self.csrc.len() as u8 & 0x0F);
        if self.padding > 0 {
            first |= 0x20;
        }
        if self.extension.is_some() {
            first |= 0x10;
        }
        buf.push(first);
        buf.push((self.marker as u8) << 7 | (self.payload_type & 0x7F));
        buf.extend_from_slice(&self.sequence.to_be_bytes());
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        buf.extend_from_slice(&self.ssrc.to_be_bytes());

        for csrc in &self.csrc {
            buf.extend_from_slice(&csrc.to_be_bytes());
        }

        if let Some(ext) = &self.extension {
            buf.extend_from_slice(&ext.profile.to_be_bytes());
            buf.extend_from_slice(&(ext.words.len() as u16).to_be_bytes());
            for word in &ext.words {
                buf.extend_from_slice(&word.to_be_bytes());
            }
        }

        buf.extend_from_slice(&self.payload);

        if self.padding > 0 {
            buf.resize(buf.len() + self.padding as usize - 1, 0);
            buf.push(self.padding);
        }
    }
}

/// Validate the fixed header: length and version.
fn check(buf: &[u8]) -> Result<()> {
    if buf.len() < MIN_HEADER_LEN {
        return Err(IngestError::ShortPacket {
            len: buf.len(),
            need: MIN_HEADER_LEN,
        });
    }
    let v = buf[0] >> 6;
    if v != VERSION {
        return Err(IngestError::BadVersion(v));
    }
    Ok(())
}

/// Protocol version field of an encoded packet.
pub fn version(buf: &[u8]) -> Result<u8> {
    check(buf)?;
    Ok(buf[0] >> 6)
}

/// Marker bit of an encoded packet.
pub fn marker(buf: &[u8]) -> Result<bool> {
    check(buf)?;
    Ok(buf[1] & 0x80 != 0)
}

/// Sequence number of an encoded packet.
pub fn sequence(buf: &[u8]) -> Result<u16> {
    check(buf)?;
    Ok(u16::from_be_bytes([buf[2], buf[3]]))
}

/// Media timestamp of an encoded packet.
pub fn timestamp(buf: &[u8]) -> Result<u32> {
    check(buf)?;
    Ok(u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]))
}

/// Synchronization source identifier of an encoded packet.
pub fn ssrc(buf: &[u8]) -> Result<u32> {
    check(buf)?;
    Ok(u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]))
}

/// Payload of an encoded packet, past the CSRC list (4 bytes each) and
/// the extension header (4 + 4·N bytes) when the extension flag is set.
///
/// Trailing padding is not stripped.
pub fn payload(buf: &[u8]) -> Result<&[u8]> {
    check(buf)?;

    let csrc_count = (buf[0] & 0x0F) as usize;
    let mut offset = MIN_HEADER_LEN + 4 * csrc_count;

    if buf[0] & 0x10 != 0 {
        if buf.len() < offset + 4 {
            return Err(IngestError::ShortPacket {
                len: buf.len(),
                need: offset + 4,
            });
        }
        let words = u16::from_be_bytes([buf[offset + 2], buf[offset + 3]]) as usize;
        offset += 4 + 4 * words;
    }

    if buf.len() < offset {
        return Err(IngestError::ShortPacket {
            len: buf.len(),
            need: offset,
        });
    }
    Ok(&buf[offset..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_packet() -> Packet {
        Packet {
            marker: true,
            payload_type: 96,
            sequence: 0x1234,
            timestamp: 0xAABBCCDD,
            ssrc: 0x6FAD40C6,
            payload: vec![1, 2, 3, 4, 5],
            ..Packet::default()
        }
    }

    #[test]
    fn encode_fixed_header() {
        let buf = make_packet().encode();
        assert_eq!(buf.len(), 17);
        assert_eq!(buf[0] >> 6, 2);
        assert_eq!(buf[1], 0x80 | 96);
        assert_eq!(&buf[2..4], &[0x12, 0x34]);
    }

    #[test]
    fn accessors_invert_encoder() {
        let pkt = make_packet();
        let buf = pkt.encode();
        assert_eq!(version(&buf).unwrap(), 2);
        assert_eq!(marker(&buf).unwrap(), pkt.marker);
        assert_eq!(sequence(&buf).unwrap(), pkt.sequence);
        assert_eq!(timestamp(&buf).unwrap(), pkt.timestamp);
        assert_eq!(ssrc(&buf).unwrap(), pkt.ssrc);
        assert_eq!(payload(&buf).unwrap(), pkt.payload.as_slice());
    }

    #[test]
    fn payload_skips_csrc_list() {
        let mut pkt = make_packet();
        pkt.csrc = vec![0x11111111, 0x22222222];
        let buf = pkt.encode();
        assert_eq!(buf[0] & 0x0F, 2);
        assert_eq!(payload(&buf).unwrap(), pkt.payload.as_slice());
    }

    #[test]
    fn payload_skips_extension() {
        let mut pkt = make_packet();
        pkt.extension = Some(Extension {
            profile: 0xBEDE,
            words: vec![0xCAFEF00D, 0x01020304],
        });
        let buf = pkt.encode();
        assert_ne!(buf[0] & 0x10, 0);
        assert_eq!(payload(&buf).unwrap(), pkt.payload.as_slice());
    }

    #[test]
    fn padding_count_in_last_octet() {
        let mut pkt = make_packet();
        pkt.padding = 3;
        let buf = pkt.encode();
        assert_ne!(buf[0] & 0x20, 0);
        assert_eq!(*buf.last().unwrap(), 3);
        assert_eq!(buf.len(), pkt.wire_len());
    }

    #[test]
    fn wire_len_is_exact() {
        let mut pkt = make_packet();
        pkt.csrc = vec![7];
        pkt.extension = Some(Extension {
            profile: 1,
            words: vec![2],
        });
        assert_eq!(pkt.encode().len(), pkt.wire_len());
    }

    #[test]
    fn encode_reuses_buffer() {
        let pkt = make_packet();
        let mut buf = Vec::with_capacity(64);
        let cap = buf.capacity();
        pkt.encode_into(&mut buf);
        assert_eq!(buf.capacity(), cap);
        assert_eq!(buf.len(), pkt.wire_len());
    }

    #[test]
    fn short_packet_rejected() {
        let buf = [0x80u8; 11];
        assert!(matches!(
            sequence(&buf),
            Err(IngestError::ShortPacket { len: 11, need: 12 })
        ));
    }

    #[test]
    fn bad_version_rejected() {
        let mut buf = make_packet().encode();
        buf[0] = 0x40 | (buf[0] & 0x3F);
        assert!(matches!(payload(&buf), Err(IngestError::BadVersion(1))));
    }

    #[test]
    fn truncated_extension_rejected() {
        let mut pkt = make_packet();
        pkt.extension = Some(Extension {
            profile: 0,
            words: vec![0; 8],
        });
        pkt.payload.clear();
        let mut buf = pkt.encode();
        buf.truncate(20);
        assert!(matches!(
            payload(&buf),
            Err(IngestError::ShortPacket { .. })
        ));
    }
}

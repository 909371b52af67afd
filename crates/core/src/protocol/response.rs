use std::io::BufRead;

use crate::error::{IngestError, ResponseErrorKind, Result};

/// A parsed RTSP response (RFC 2326 §7).
///
/// ```text
/// RTSP/1.0 200 OK\r\n
/// CSeq: 2\r\n
/// Content-Type: application/sdp\r\n
/// Content-Length: 142\r\n
/// \r\n
/// v=0\r\n...
/// ```
///
/// The status line is validated against the `RTSP/` prefix; header names
/// are stored as-received and looked up case-insensitively; the body is
/// read for exactly `Content-Length` bytes (zero when absent).
#[derive(Debug)]
pub struct RtspResponse {
    /// Protocol name from the status line (always `RTSP` on success).
    pub proto: String,
    pub proto_major: u8,
    pub proto_minor: u8,
    pub status_code: u16,
    pub reason: String,
    /// Headers as ordered (name, value) pairs; names may repeat.
    pub headers: Vec<(String, String)>,
    /// Value of `Content-Length`, 0 when the header is absent.
    pub content_length: usize,
    pub body: Vec<u8>,
}

fn invalid(kind: ResponseErrorKind) -> IngestError {
    IngestError::InvalidResponse { kind }
}

impl RtspResponse {
    /// Read and parse one complete response from `reader`.
    ///
    /// On a malformed status line or header the connection is no longer
    /// usable — the reader may have consumed past the fault.
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<Self> {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Err(invalid(ResponseErrorKind::EmptyResponse));
        }

        let status_line = line.trim_end_matches(['\r', '\n']);
        let mut parts = status_line.splitn(3, ' ');
        let version = parts
            .next()
            .ok_or_else(|| invalid(ResponseErrorKind::InvalidStatusLine))?;
        let (proto, digits) = version
            .split_once('/')
            .ok_or_else(|| invalid(ResponseErrorKind::InvalidStatusLine))?;
        if proto != "RTSP" {
            return Err(invalid(ResponseErrorKind::InvalidStatusLine));
        }
        let (major, minor) = digits
            .split_once('.')
            .ok_or_else(|| invalid(ResponseErrorKind::InvalidStatusLine))?;
        let proto_major: u8 = major
            .parse()
            .map_err(|_| invalid(ResponseErrorKind::InvalidStatusLine))?;
        let proto_minor: u8 = minor
            .parse()
            .map_err(|_| invalid(ResponseErrorKind::InvalidStatusLine))?;
        let status_code: u16 = parts
            .next()
            .and_then(|code| code.parse().ok())
            .ok_or_else(|| invalid(ResponseErrorKind::InvalidStatusLine))?;
        let reason = parts.next().unwrap_or("").to_string();

        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                return Err(invalid(ResponseErrorKind::InvalidHeader));
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                break;
            }
            let colon = line
                .find(':')
                .ok_or_else(|| invalid(ResponseErrorKind::InvalidHeader))?;
            headers.push((
                line[..colon].trim().to_string(),
                line[colon + 1..].trim().to_string(),
            ));
        }

        let mut response = RtspResponse {
            proto: proto.to_string(),
            proto_major,
            proto_minor,
            status_code,
            reason,
            headers,
            content_length: 0,
            body: Vec::new(),
        };

        if let Some(value) = response.get_header("Content-Length") {
            response.content_length = value
                .parse()
                .map_err(|_| invalid(ResponseErrorKind::InvalidContentLength))?;
        }
        if response.content_length > 0 {
            let mut body = vec![0u8; response.content_length];
            reader.read_exact(&mut body)?;
            response.body = body;
        }

        Ok(response)
    }

    /// First value of a header, looked up case-insensitively.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// All values of a header, in wire order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<RtspResponse> {
        RtspResponse::read_from(&mut raw.as_bytes())
    }

    #[test]
    fn parse_ok_fixture() {
        let raw = "RTSP/1.0 200 OK\r\n\
                   CSeq: 2\r\n\
                   Date: Wed, 03 Jun 2015 01:23:45 GMT\r\n\
                   Public: OPTIONS, DESCRIBE, SETUP, TEARDOWN, PLAY\r\n\r\n";
        let resp = parse(raw).unwrap();
        assert_eq!(resp.proto, "RTSP");
        assert_eq!(resp.proto_major, 1);
        assert_eq!(resp.proto_minor, 0);
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.reason, "OK");
        assert_eq!(resp.content_length, 0);
        assert_eq!(resp.get_all("Cseq"), vec!["2"]);
        assert_eq!(resp.get_all("Date").len(), 1);
        assert!(resp.get_header("Public").unwrap().contains("DESCRIBE"));
    }

    #[test]
    fn parse_body_by_content_length() {
        let raw = "RTSP/1.0 200 OK\r\n\
                   CSeq: 2\r\n\
                   Content-Type: application/sdp\r\n\
                   Content-Length: 10\r\n\r\n\
                   v=0\r\no=cam";
        let resp = parse(raw).unwrap();
        assert_eq!(resp.content_length, 10);
        assert_eq!(resp.body, b"v=0\r\no=cam");
    }

    #[test]
    fn parse_non_200_status() {
        let resp = parse("RTSP/1.0 454 Session Not Found\r\nCSeq: 4\r\n\r\n").unwrap();
        assert_eq!(resp.status_code, 454);
        assert_eq!(resp.reason, "Session Not Found");
    }

    #[test]
    fn reject_non_rtsp_status_line() {
        assert!(matches!(
            parse("HTTP/1.1 200 OK\r\n\r\n"),
            Err(IngestError::InvalidResponse {
                kind: ResponseErrorKind::InvalidStatusLine
            })
        ));
    }

    #[test]
    fn reject_empty_response() {
        assert!(matches!(
            parse(""),
            Err(IngestError::InvalidResponse {
                kind: ResponseErrorKind::EmptyResponse
            })
        ));
    }

    #[test]
    fn reject_header_without_colon() {
        assert!(matches!(
            parse("RTSP/1.0 200 OK\r\nBadHeader\r\n\r\n"),
            Err(IngestError::InvalidResponse {
                kind: ResponseErrorKind::InvalidHeader
            })
        ));
    }

    #[test]
    fn reject_bad_content_length() {
        assert!(matches!(
            parse("RTSP/1.0 200 OK\r\nContent-Length: many\r\n\r\n"),
            Err(IngestError::InvalidResponse {
                kind: ResponseErrorKind::InvalidContentLength
            })
        ));
    }
}

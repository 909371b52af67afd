//! RTSP 1.0 control client (RFC 2326 subset).
//!
//! This module speaks the text-based RTSP signaling protocol from the
//! client side — building requests, parsing responses, and driving the
//! session lifecycle against an IP camera.
//!
//! ## RTSP message format (RFC 2326 §4)
//!
//! RTSP messages follow HTTP/1.1 syntax with a different method set:
//!
//! ```text
//! DESCRIBE rtsp://camera/CH001.sdp RTSP/1.0\r\n
//! CSeq: 2\r\n
//! Accept: application/sdp\r\n
//! \r\n
//! ```
//!
//! Key differences from HTTP:
//! - Stateful: the `Session` token assigned during SETUP persists across
//!   requests (RFC 2326 §3).
//! - Different methods: OPTIONS, DESCRIBE, SETUP, PLAY, TEARDOWN.
//!
//! ## Negotiation sequence
//!
//! | Method | RFC section | Purpose |
//! |--------|-------------|---------|
//! | OPTIONS | §10.1 | Capability discovery |
//! | DESCRIBE | §10.2 | Retrieve SDP session description |
//! | SETUP | §10.4 | Negotiate transport (UDP port pairs) |
//! | PLAY | §10.5 | Start media delivery |
//! | TEARDOWN | §10.7 | Destroy session, close connection |

pub mod client;
pub mod request;
pub mod response;

pub use client::{RtspClient, TransportInfo};
pub use request::{Method, RtspRequest};
pub use response::RtspResponse;

//! RTP packet codec and receiver (RFC 3550).
//!
//! The wire codec in [`packet`] is a set of pure functions over byte
//! slices plus an encoder; [`receiver`] owns the UDP socket and the
//! per-source counters (SSRC, last sequence, cycle count) that the RTCP
//! client reports on.
//!
//! ```text
//! UDP socket ── Receiver::read ──► one RTP datagram per call
//!                    │
//!                    └── SourceStats (shared, read-only) ──► rtcp::Client
//! ```

pub mod packet;
pub mod receiver;

pub use packet::Packet;
pub use receiver::{Receiver, SourceStats};

//! RTCP codec and reporting client (RFC 3550 §6).
//!
//! [`packet`] encodes the receiver report and source description this
//! client produces and parses the sender-report timestamp it consumes.
//! [`client`] runs the periodic reporting loop alongside the RTP receive
//! path, sharing the receiver's source counters read-only.

pub mod client;
pub mod packet;

pub use client::{Client, ClientConfig};
pub use packet::{ReceiverReport, ReportBlock, SourceDescription};

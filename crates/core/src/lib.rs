//! # ingest — RTSP/RTP camera ingest library
//!
//! A Rust library for pulling live media streams out of IP cameras:
//! RTSP session negotiation, RTP/RTCP transport, and depacketization of
//! H.264 and H.265 payloads into Annex-B access units ready for a
//! downstream muxer.
//!
//! ## Protocol references
//!
//! | RFC | Topic | How this crate uses it |
//! |-----|-------|----------------------|
//! | [RFC 2326](https://tools.ietf.org/html/rfc2326) | RTSP 1.0 | Client-side request/response, session lifecycle, transport negotiation |
//! | [RFC 3550](https://tools.ietf.org/html/rfc3550) | RTP/RTCP | Packet codecs, source statistics, receiver reports |
//! | [RFC 6184](https://tools.ietf.org/html/rfc6184) | H.264 RTP payload | Single NALU / STAP-A / FU-A depacketization |
//! | [RFC 7798](https://tools.ietf.org/html/rfc7798) | H.265 RTP payload | Single NALU / aggregation / fragmentation, optional DONL |
//!
//! ## Architecture
//!
//! Data flows bottom-up; each layer consumes one kind of framed unit
//! and emits the next:
//!
//! ```text
//! UDP socket ── rtp::Receiver ──► RTP packets ──► media depacketizer ──► access units
//!                    │
//!                    └── shares SSRC/sequence/cycle state with ── rtcp::Client ──► UDP socket
//! TCP socket ── protocol::RtspClient ── negotiates ports and session ──┘
//! Raw H.264 stream ──► media::lexer ──► access units
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use ingest::media::h264::H264Depacketizer;
//! use ingest::media::WriteSink;
//! use ingest::protocol::{RtspClient, TransportInfo};
//! use ingest::rtcp;
//! use ingest::rtp::Receiver;
//! use std::net::SocketAddr;
//!
//! let mut rtsp = RtspClient::open("rtsp://192.168.0.50/CH001.sdp")?;
//! rtsp.options()?;
//! rtsp.describe()?;
//!
//! let (mut receiver, rtcp_socket) = Receiver::bind_pair("0.0.0.0".parse().unwrap())?;
//! let port = receiver.local_addr()?.port();
//! let setup = rtsp.setup(
//!     "track1",
//!     &format!("RTP/AVP;unicast;client_port={}-{}", port, port + 1),
//! )?;
//!
//! let info = TransportInfo::parse(setup.get_header("Transport").unwrap_or("")).unwrap();
//! let remote: SocketAddr = SocketAddr::new(rtsp.peer_addr().ip(), info.server_rtcp_port);
//! let reports = rtcp::Client::start(
//!     rtcp_socket,
//!     remote,
//!     receiver.stats(),
//!     rtcp::ClientConfig::default(),
//! )?;
//! rtsp.play()?;
//!
//! let file = std::fs::File::create("capture.h264")?;
//! let mut depacketizer = H264Depacketizer::new(WriteSink(file));
//! let mut buf = [0u8; 2048];
//! for _ in 0..10_000 {
//!     let n = receiver.read(&mut buf)?;
//!     depacketizer.write(&buf[..n])?;
//! }
//! reports.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Crate layout
//!
//! - [`protocol`] — RTSP 1.0 client: request builder, response parser,
//!   connection lifecycle.
//! - [`rtp`] — RTP packet codec and UDP receiver with source statistics.
//! - [`rtcp`] — receiver report / source description codec and the
//!   periodic reporting client.
//! - [`media`] — [`UnitSink`] capability, H.264/H.265 depacketizers,
//!   Annex-B byte-stream lexer.
//! - [`error`] — [`IngestError`] enum and [`Result`] alias.

pub mod error;
pub mod media;
pub mod protocol;
pub mod rtcp;
pub mod rtp;

pub use error::{IngestError, Result};
pub use media::{UnitSink, WriteSink, h264::H264Depacketizer, h265::H265Depacketizer, lexer::ByteStreamLexer};
pub use protocol::{RtspClient, TransportInfo};
pub use rtp::{Receiver, SourceStats};

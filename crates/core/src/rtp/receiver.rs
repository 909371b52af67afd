use std::net::{IpAddr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::RngExt;

use super::packet;
use crate::error::{IngestError, Result};

/// Per-call read deadline on the RTP socket.
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Ephemeral range the client picks its RTP/RTCP port pair from.
const PORT_MIN: u16 = 16384;
const PORT_MAX: u16 = 32766;
const BIND_ATTEMPTS: usize = 16;

#[derive(Debug, Default)]
struct SourceState {
    ssrc: u32,
    sequence: u16,
    cycles: u16,
}

/// Shared, read-only view of the receiver's per-source counters.
///
/// The RTCP client holds a clone of this handle to fill in the extended
/// highest sequence field of its receiver reports; it never mutates the
/// counters. Each accessor takes the lock only for a single point read.
#[derive(Clone, Default)]
pub struct SourceStats {
    inner: Arc<Mutex<SourceState>>,
}

impl SourceStats {
    /// SSRC of the tracked sender, 0 until the first packet locks it in.
    pub fn ssrc(&self) -> u32 {
        self.inner.lock().ssrc
    }

    /// Sequence number of the most recent packet.
    pub fn sequence(&self) -> u16 {
        self.inner.lock().sequence
    }

    /// Number of 16-bit sequence wraparounds observed.
    pub fn cycles(&self) -> u16 {
        self.inner.lock().cycles
    }

    pub(crate) fn record(&self, ssrc: u32, sequence: u16) {
        let mut state = self.inner.lock();
        if state.ssrc == 0 {
            state.ssrc = ssrc;
            tracing::debug!(ssrc = format_args!("{:#010X}", ssrc), "sender SSRC locked");
        }
        if sequence < state.sequence {
            state.cycles = state.cycles.wrapping_add(1);
            tracing::debug!(cycles = state.cycles, "sequence number wrapped");
        }
        state.sequence = sequence;
    }
}

/// UDP receiver delivering one whole RTP datagram per [`read`](Self::read).
///
/// Maintains cumulative source state across reads: the first packet locks
/// in the sender's SSRC, and every packet updates the last-seen sequence
/// number, incrementing the cycle counter whenever the 16-bit sequence
/// wraps. The state is exposed through a [`SourceStats`] handle for the
/// RTCP client.
pub struct Receiver {
    socket: UdpSocket,
    stats: SourceStats,
}

impl Receiver {
    /// Bind an RTP socket on `addr` with the default read deadline.
    pub fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(READ_TIMEOUT))?;
        tracing::debug!(local = %socket.local_addr()?, "RTP socket bound");
        Ok(Receiver {
            socket,
            stats: SourceStats::default(),
        })
    }

    /// Bind an RTP/RTCP socket pair on `ip`: RTP on a random even port,
    /// RTCP on the odd successor (RFC 3550 §11 client convention).
    ///
    /// Returns the receiver and the raw RTCP socket for
    /// [`rtcp::Client`](crate::rtcp::Client).
    pub fn bind_pair(ip: IpAddr) -> Result<(Self, UdpSocket)> {
        let mut last_err = None;
        for _ in 0..BIND_ATTEMPTS {
            let port = rand::rng().random_range(PORT_MIN / 2..PORT_MAX / 2) * 2;
            let rtp = match UdpSocket::bind(SocketAddr::new(ip, port)) {
                Ok(s) => s,
                Err(e) => {
                    last_err = Some(e);
                    continue;
                }
            };
            match UdpSocket::bind(SocketAddr::new(ip, port + 1)) {
                Ok(rtcp) => {
                    rtp.set_read_timeout(Some(READ_TIMEOUT))?;
                    tracing::debug!(rtp_port = port, rtcp_port = port + 1, "port pair bound");
                    return Ok((
                        Receiver {
                            socket: rtp,
                            stats: SourceStats::default(),
                        },
                        rtcp,
                    ));
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(IngestError::Io(last_err.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::AddrInUse, "no free port pair")
        })))
    }

    /// Restrict the socket to datagrams from `remote` (the camera's RTP
    /// address learned during SETUP).
    pub fn connect(&self, remote: SocketAddr) -> Result<()> {
        self.socket.connect(remote)?;
        Ok(())
    }

    /// Local address of the RTP socket.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Read exactly one UDP datagram into `buf`; `buf[..n]` is one RTP
    /// packet.
    ///
    /// A read hitting the deadline yields [`IngestError::Timeout`], which
    /// is not fatal — the caller retries at its discretion. Malformed
    /// packets fail the current read with `ShortPacket`/`BadVersion`
    /// without touching the source counters; the receiver stays usable.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.socket.recv(buf).map_err(IngestError::from_socket)?;
        let datagram = &buf[..n];
        let sequence = packet::sequence(datagram)?;
        let ssrc = packet::ssrc(datagram)?;
        self.stats.record(ssrc, sequence);
        tracing::trace!(n, sequence, "RTP datagram");
        Ok(n)
    }

    /// Shared handle over the source counters for the RTCP client.
    pub fn stats(&self) -> SourceStats {
        self.stats.clone()
    }

    /// SSRC of the tracked sender, 0 until locked in.
    pub fn ssrc(&self) -> u32 {
        self.stats.ssrc()
    }

    /// Last observed sequence number.
    pub fn sequence(&self) -> u16 {
        self.stats.sequence()
    }

    /// Number of sequence wraparounds observed.
    pub fn cycles(&self) -> u16 {
        self.stats.cycles()
    }
}

use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver as ErrorReceiver, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::packet::{self, LOSS_UNKNOWN, ReceiverReport, ReportBlock, SourceDescription};
use crate::error::{IngestError, Result};
use crate::rtp::SourceStats;

/// Fixed non-zero SSRC identifying the local reporting client.
pub const CLIENT_SSRC: u32 = 1;

/// Default interval between receiver reports.
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_secs(2);

/// How often the worker threads check the running flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Read deadline on the RTCP socket; bounds how long close can take.
const RECV_DEADLINE: Duration = Duration::from_millis(500);

/// Configuration for the reporting [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Interval between RR+SDES compound packets.
    pub send_interval: Duration,
    /// Canonical end-point name carried in the SDES chunk.
    pub cname: String,
    /// SSRC of the local client.
    pub ssrc: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            send_interval: DEFAULT_SEND_INTERVAL,
            cname: "ingest".to_string(),
            ssrc: CLIENT_SSRC,
        }
    }
}

/// What the receiver task remembers about the last sender report.
#[derive(Debug, Default)]
struct SenderReportState {
    /// Middle 32 bits of the SR's 64-bit NTP timestamp (bytes 2..6).
    last_sr: u32,
    /// Wall-clock instant the SR arrived.
    received_at: Option<Instant>,
}

/// RTCP reporting client (RFC 3550 §6.4).
///
/// Runs two threads for the lifetime of the session:
///
/// - a **receiver** blocking on the RTCP socket, recording the NTP
///   timestamp and arrival instant of each sender report;
/// - a **sender** waking every [`ClientConfig::send_interval`] to emit
///   one RR+SDES compound packet, filling the extended-highest-sequence
///   field from the RTP receiver's shared [`SourceStats`].
///
/// Errors from either thread are delivered on a rendezvous channel the
/// owner must drain via [`take_err`](Self::take_err) or
/// [`errors`](Self::errors); an undrained channel blocks the failing
/// thread until the owner catches up or closes the client.
///
/// [`close`](Self::close) signals both threads, releases the error
/// channel so no hand-off can stall shutdown, waits for both to
/// return, then drops the socket.
pub struct Client {
    running: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
    errors: ErrorReceiver<IngestError>,
}

impl Client {
    /// Start reporting to `remote` over `socket`.
    ///
    /// `stats` is the read-only counter handle from
    /// [`Receiver::stats`](crate::rtp::Receiver::stats).
    pub fn start(
        socket: UdpSocket,
        remote: SocketAddr,
        stats: SourceStats,
        config: ClientConfig,
    ) -> Result<Self> {
        socket.set_read_timeout(Some(RECV_DEADLINE))?;
        socket.connect(remote)?;
        tracing::info!(%remote, interval = ?config.send_interval, "RTCP client started");

        let socket = Arc::new(socket);
        let running = Arc::new(AtomicBool::new(true));
        let sr_state = Arc::new(Mutex::new(SenderReportState::default()));
        let (err_tx, errors) = mpsc::sync_channel(0);

        let mut handles = Vec::with_capacity(2);
        {
            let socket = socket.clone();
            let running = running.clone();
            let sr_state = sr_state.clone();
            let err_tx = err_tx.clone();
            handles.push(thread::spawn(move || {
                receive_loop(&socket, &running, &sr_state, &err_tx);
            }));
        }
        {
            let running = running.clone();
            handles.push(thread::spawn(move || {
                send_loop(&socket, &running, &sr_state, &stats, &config, &err_tx);
            }));
        }

        Ok(Client {
            running,
            handles,
            errors,
        })
    }

    /// Take one pending task error, if any thread is waiting to hand
    /// one over.
    pub fn take_err(&self) -> Option<IngestError> {
        self.errors.try_recv().ok()
    }

    /// The error channel itself, for owners that want to block-drain.
    pub fn errors(&self) -> &ErrorReceiver<IngestError> {
        &self.errors
    }

    /// Signal both tasks, wait for them to return, and release the
    /// socket.
    ///
    /// The error channel is released before joining: a task blocked
    /// handing over an error gets `SendError` back, re-checks the stop
    /// flag, and exits. Close cannot deadlock on an undrained channel.
    pub fn close(self) {
        let Client {
            running,
            handles,
            errors,
        } = self;
        running.store(false, Ordering::SeqCst);
        drop(errors);
        for handle in handles {
            let _ = handle.join();
        }
        tracing::info!("RTCP client closed");
    }
}

/// Blocking read loop over the RTCP socket. Each sender report updates
/// the shared LSR word and arrival instant; read deadlines just re-check
/// the running flag.
fn receive_loop(
    socket: &UdpSocket,
    running: &AtomicBool,
    sr_state: &Mutex<SenderReportState>,
    err_tx: &SyncSender<IngestError>,
) {
    let mut buf = [0u8; 1500];
    while running.load(Ordering::SeqCst) {
        let n = match socket.recv(&mut buf) {
            Ok(n) => n,
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => {
                if running.load(Ordering::SeqCst) {
                    let _ = err_tx.send(IngestError::Io(e));
                }
                continue;
            }
        };

        match packet::parse_sender_timestamp(&buf[..n]) {
            Ok((seconds, fraction)) => {
                let mut state = sr_state.lock();
                state.last_sr = (seconds & 0xFFFF) << 16 | fraction >> 16;
                state.received_at = Some(Instant::now());
                tracing::debug!(lsr = format_args!("{:#010X}", state.last_sr), "sender report");
            }
            Err(e) => {
                let _ = err_tx.send(e);
            }
        }
    }
    tracing::debug!("RTCP receive loop exited");
}

/// Periodic report loop: every `send_interval`, write one RR+SDES
/// compound packet built from the current source counters and SR state.
fn send_loop(
    socket: &UdpSocket,
    running: &AtomicBool,
    sr_state: &Mutex<SenderReportState>,
    stats: &SourceStats,
    config: &ClientConfig,
    err_tx: &SyncSender<IngestError>,
) {
    let mut buf = Vec::with_capacity(64);
    let mut last_send = Instant::now();
    while running.load(Ordering::SeqCst) {
        thread::sleep(POLL_INTERVAL);
        if last_send.elapsed() < config.send_interval {
            continue;
        }
        last_send = Instant::now();

        let (last_sr, delay) = {
            let state = sr_state.lock();
            (state.last_sr, delay_since(state.received_at))
        };

        let report = ReceiverReport {
            ssrc: config.ssrc,
            block: ReportBlock {
                ssrc: stats.ssrc(),
                fraction_lost: 0,
                packets_lost: LOSS_UNKNOWN,
                highest_sequence: (stats.cycles() as u32) << 16 | stats.sequence() as u32,
                jitter: jitter(),
                last_sr,
                delay,
            },
        };

        buf.clear();
        report.encode_into(&mut buf);
        SourceDescription {
            ssrc: config.ssrc,
            cname: config.cname.clone(),
        }
        .encode_into(&mut buf);

        match socket.send(&buf) {
            Ok(_) => {
                tracing::trace!(
                    highest = report.block.highest_sequence,
                    last_sr,
                    delay,
                    "receiver report sent"
                );
            }
            Err(e) => {
                let _ = err_tx.send(IngestError::from_socket(e));
            }
        }
    }
    tracing::debug!("RTCP send loop exited");
}

/// Delay since the last sender report in 1/65536 s units, saturating at
/// the 32-bit field; zero when no report has arrived yet.
fn delay_since(received_at: Option<Instant>) -> u32 {
    match received_at {
        Some(at) => {
            let units = at.elapsed().as_micros() * 65536 / 1_000_000;
            units.min(u32::MAX as u128) as u32
        }
        None => 0,
    }
}

/// Interarrival jitter for the report block.
///
/// TODO: estimate per RFC 3550 §6.4.1 once the receiver records
/// per-packet arrival times; reported as zero until then.
fn jitter() -> u32 {
    0
}

//! Raw-socket probe executor.
//!
//! Crafts TCP segments with the scan mode's flags and correlates replies
//! without ever completing a handshake. This requires raw socket access
//! (root or CAP_NET_RAW).
//!
//! # How It Works
//!
//! 1. One layer-4 TCP channel is opened for sending, and it also receives
//!    TCP segments. A second layer-4 channel receives ICMP.
//! 2. Each probe registers a waiter keyed by (target, target port, source
//!    port), then sends a single segment from a random ephemeral port.
//! 3. A receiver thread per channel matches incoming TCP replies, or ICMP
//!    errors quoting one of our segments, to the waiter and wakes it.
//! 4. A waiter that hears nothing before its timeout reports `NoResponse`.
//! 5. If a receiver thread dies, every waiting and later probe fails with
//!    `ProbeError::RawSocket` instead of timing out.

use super::classify::{ProbeOutcome, ReplyLayer};
use super::mode::ScanMode;
use super::traits::Prober;
use crate::error::ProbeError;
use crate::types::Port;
use async_trait::async_trait;
use pnet::packet::icmp::destination_unreachable::DestinationUnreachablePacket;
use pnet::packet::icmp::{IcmpPacket, IcmpTypes};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::tcp::{self, MutableTcpPacket, TcpPacket};
use pnet::packet::Packet;
use pnet::transport::{
    icmp_packet_iter, tcp_packet_iter, transport_channel, TransportChannelType::Layer4,
    TransportProtocol::Ipv4, TransportReceiver, TransportSender,
};
use rand::Rng;
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

const CHANNEL_BUFFER: usize = 4096;
const TCP_HEADER_LEN: usize = 20;

/// How often receiver threads wake up to check for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Port used only to ask the kernel for a route; nothing is ever sent to it.
const ROUTE_PROBE_PORT: u16 = 9;

/// Identifies the reply a probe is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ProbeKey {
    target: Ipv4Addr,
    target_port: u16,
    source_port: u16,
}

type PendingMap = HashMap<ProbeKey, oneshot::Sender<ReplyLayer>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// First fatal error seen by a receiver thread.
#[derive(Debug, Clone, Default)]
struct ReceiverFailure(Arc<Mutex<Option<String>>>);

impl ReceiverFailure {
    /// Keep the first failure; later ones are only logged.
    fn record(&self, channel: &str, error: &dyn std::fmt::Display) {
        warn!(%error, "{} receiver stopped", channel);
        lock(&self.0).get_or_insert_with(|| format!("{} receiver failed: {}", channel, error));
    }

    fn check(&self) -> Result<(), ProbeError> {
        match lock(&self.0).as_ref() {
            Some(reason) => Err(ProbeError::RawSocket(reason.clone())),
            None => Ok(()),
        }
    }
}

/// Record a receiver failure and wake every waiter so none sits out its timeout.
fn fail_receiver(
    channel: &str,
    error: &dyn std::fmt::Display,
    pending: &Mutex<PendingMap>,
    failure: &ReceiverFailure,
) {
    failure.record(channel, error);
    lock(pending).clear();
}

/// Removes a probe's waiter when the probe finishes or is aborted.
struct PendingProbe {
    key: ProbeKey,
    pending: Arc<Mutex<PendingMap>>,
}

impl Drop for PendingProbe {
    fn drop(&mut self) {
        lock(&self.pending).remove(&self.key);
    }
}

/// Probe executor backed by raw IPv4 sockets.
///
/// **Requires elevated privileges (root/sudo).**
pub struct RawProber {
    sender: Mutex<TransportSender>,
    pending: Arc<Mutex<PendingMap>>,
    routes: Mutex<HashMap<Ipv4Addr, Ipv4Addr>>,
    shutdown: Arc<AtomicBool>,
    failure: ReceiverFailure,
}

impl RawProber {
    /// Open the raw channels and start the receiver threads.
    ///
    /// # Errors
    /// Returns `ProbeError::PermissionDenied` when raw sockets are not
    /// available to this process.
    pub fn open() -> Result<Self, ProbeError> {
        let (sender, tcp_rx) =
            transport_channel(CHANNEL_BUFFER, Layer4(Ipv4(IpNextHeaderProtocols::Tcp)))
                .map_err(ProbeError::from_channel_error)?;
        let (_, icmp_rx) =
            transport_channel(CHANNEL_BUFFER, Layer4(Ipv4(IpNextHeaderProtocols::Icmp)))
                .map_err(ProbeError::from_channel_error)?;

        let pending = Arc::new(Mutex::new(PendingMap::new()));
        let shutdown = Arc::new(AtomicBool::new(false));
        let failure = ReceiverFailure::default();

        spawn_receiver("tcprobe-tcp-rx", {
            let pending = Arc::clone(&pending);
            let shutdown = Arc::clone(&shutdown);
            let failure = failure.clone();
            move || receive_tcp(tcp_rx, &pending, &shutdown, &failure)
        })?;
        spawn_receiver("tcprobe-icmp-rx", {
            let pending = Arc::clone(&pending);
            let shutdown = Arc::clone(&shutdown);
            let failure = failure.clone();
            move || receive_icmp(icmp_rx, &pending, &shutdown, &failure)
        })?;

        Ok(Self {
            sender: Mutex::new(sender),
            pending,
            routes: Mutex::new(HashMap::new()),
            shutdown,
            failure,
        })
    }

    /// Reserve a source port for a probe and register its waiter.
    fn register(
        &self,
        target: Ipv4Addr,
        target_port: u16,
    ) -> (PendingProbe, oneshot::Receiver<ReplyLayer>) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let mut pending = lock(&self.pending);
        let mut rng = rand::thread_rng();

        let key = loop {
            let key = ProbeKey {
                target,
                target_port,
                source_port: rng.gen_range(49152..=65535),
            };
            if !pending.contains_key(&key) {
                break key;
            }
        };
        pending.insert(key, reply_tx);

        let guard = PendingProbe {
            key,
            pending: Arc::clone(&self.pending),
        };
        (guard, reply_rx)
    }

    /// Local address the kernel would use to reach `target`.
    fn source_for(&self, target: Ipv4Addr) -> Result<Ipv4Addr, ProbeError> {
        if let Some(source) = lock(&self.routes).get(&target) {
            return Ok(*source);
        }

        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.connect(&SocketAddr::new(IpAddr::V4(target), ROUTE_PROBE_PORT).into())?;
        let source = match socket.local_addr()?.as_socket() {
            Some(SocketAddr::V4(addr)) => *addr.ip(),
            _ => {
                return Err(ProbeError::RawSocket(format!(
                    "no IPv4 route to {}",
                    target
                )))
            }
        };

        lock(&self.routes).insert(target, source);
        Ok(source)
    }
}

impl Drop for RawProber {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl Prober for RawProber {
    async fn probe(
        &self,
        address: IpAddr,
        port: Port,
        mode: ScanMode,
        timeout: Duration,
    ) -> Result<ProbeOutcome, ProbeError> {
        let IpAddr::V4(target) = address else {
            return Err(ProbeError::Unsupported(format!(
                "{} is IPv6; raw probes support IPv4 targets only",
                address
            )));
        };

        self.failure.check()?;
        let source = self.source_for(target)?;
        let (waiter, reply_rx) = self.register(target, port.as_u16());
        let segment = build_probe_segment(
            source,
            target,
            waiter.key.source_port,
            port.as_u16(),
            mode,
        )?;

        {
            let packet = TcpPacket::new(&segment)
                .ok_or_else(|| ProbeError::InvalidPacket("TCP segment too short".to_string()))?;
            lock(&self.sender)
                .send_to(packet, address)
                .map_err(|e| ProbeError::RawSocket(e.to_string()))?;
        }
        trace!(%target, port = port.as_u16(), %mode, source_port = waiter.key.source_port, "probe sent");

        let reply = tokio::time::timeout(timeout, reply_rx).await;
        drop(waiter);
        await_outcome(reply, &self.failure)
    }
}

/// Turn a waiter's result into an outcome, unless the receivers have died.
fn await_outcome(
    reply: Result<Result<ReplyLayer, oneshot::error::RecvError>, tokio::time::error::Elapsed>,
    failure: &ReceiverFailure,
) -> Result<ProbeOutcome, ProbeError> {
    match reply {
        Ok(Ok(layer)) => Ok(ProbeOutcome::Responded(layer)),
        Ok(Err(_)) | Err(_) => {
            failure.check()?;
            Ok(ProbeOutcome::NoResponse)
        }
    }
}

/// Build a bare TCP header (no options, no payload) carrying `mode`'s flags.
pub(crate) fn build_probe_segment(
    source: Ipv4Addr,
    target: Ipv4Addr,
    source_port: u16,
    target_port: u16,
    mode: ScanMode,
) -> Result<Vec<u8>, ProbeError> {
    let mut buffer = vec![0u8; TCP_HEADER_LEN];
    let mut segment = MutableTcpPacket::new(&mut buffer)
        .ok_or_else(|| ProbeError::InvalidPacket("failed to create TCP packet".to_string()))?;

    segment.set_source(source_port);
    segment.set_destination(target_port);
    segment.set_sequence(rand::random());
    segment.set_acknowledgement(0);
    segment.set_data_offset(5);
    segment.set_reserved(0);
    segment.set_flags(mode.tcp_flags());
    segment.set_window(1024);
    segment.set_urgent_ptr(0);

    let checksum = tcp::ipv4_checksum(&segment.to_immutable(), &source, &target);
    segment.set_checksum(checksum);

    Ok(buffer)
}

fn spawn_receiver<F>(name: &str, body: F) -> Result<(), ProbeError>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map(|_| ())
        .map_err(ProbeError::Io)
}

/// Wake the probe waiting on `key`, if any. Later duplicates are ignored.
fn dispatch(pending: &Mutex<PendingMap>, key: ProbeKey, layer: ReplyLayer) {
    if let Some(waiter) = lock(pending).remove(&key) {
        let _ = waiter.send(layer);
    }
}

fn receive_tcp(
    mut rx: TransportReceiver,
    pending: &Mutex<PendingMap>,
    shutdown: &AtomicBool,
    failure: &ReceiverFailure,
) {
    let mut packets = tcp_packet_iter(&mut rx);
    while !shutdown.load(Ordering::Relaxed) {
        match packets.next_with_timeout(POLL_INTERVAL) {
            Ok(Some((segment, IpAddr::V4(from)))) => {
                let key = ProbeKey {
                    target: from,
                    target_port: segment.get_source(),
                    source_port: segment.get_destination(),
                };
                dispatch(pending, key, ReplyLayer::Tcp {
                    flags: segment.get_flags(),
                });
            }
            Ok(_) => {}
            Err(e) => {
                fail_receiver("TCP", &e, pending, failure);
                break;
            }
        }
    }
    debug!("TCP receiver exiting");
}

fn receive_icmp(
    mut rx: TransportReceiver,
    pending: &Mutex<PendingMap>,
    shutdown: &AtomicBool,
    failure: &ReceiverFailure,
) {
    let mut packets = icmp_packet_iter(&mut rx);
    while !shutdown.load(Ordering::Relaxed) {
        match packets.next_with_timeout(POLL_INTERVAL) {
            Ok(Some((message, _))) => {
                if let Some((key, layer)) = parse_icmp_error(&message) {
                    dispatch(pending, key, layer);
                }
            }
            Ok(None) => {}
            Err(e) => {
                fail_receiver("ICMP", &e, pending, failure);
                break;
            }
        }
    }
    debug!("ICMP receiver exiting");
}

/// Recover the probe an ICMP destination-unreachable message is about.
///
/// The message quotes the offending IPv4 header plus at least the first
/// 8 bytes of our TCP header, which hold both port numbers.
fn parse_icmp_error(message: &IcmpPacket<'_>) -> Option<(ProbeKey, ReplyLayer)> {
    if message.get_icmp_type() != IcmpTypes::DestinationUnreachable {
        return None;
    }

    let unreachable = DestinationUnreachablePacket::new(message.packet())?;
    let quoted = Ipv4Packet::new(unreachable.payload())?;
    if quoted.get_next_level_protocol() != IpNextHeaderProtocols::Tcp {
        return None;
    }

    let header_len = usize::from(quoted.get_header_length()) * 4;
    let transport = unreachable.payload().get(header_len..header_len + 4)?;
    let source_port = u16::from_be_bytes([transport[0], transport[1]]);
    let target_port = u16::from_be_bytes([transport[2], transport[3]]);

    let key = ProbeKey {
        target: quoted.get_destination(),
        target_port,
        source_port,
    };
    let layer = ReplyLayer::Icmp {
        icmp_type: message.get_icmp_type().0,
        code: message.get_icmp_code().0,
    };
    Some((key, layer))
}

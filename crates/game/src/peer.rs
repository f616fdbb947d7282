//! Point-to-point datagram transport.
//!
//! A `PeerConnection` talks to exactly one remote endpoint over UDP. It moves
//! opaque byte packets and knows nothing about the simulation; no sync
//! protocol is layered on top yet.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket};

use tracing::{debug, trace, warn};

/// Largest packet sent or received, in bytes.
pub const MAX_PACKET_SIZE: usize = 1500;

/// Non-blocking UDP link to a fixed remote peer.
#[derive(Debug)]
pub struct PeerConnection {
    socket: UdpSocket,
    remote: SocketAddr,
}

impl PeerConnection {
    /// Bind `local_port` on all IPv4 interfaces and fix the remote endpoint.
    ///
    /// The remote is resolved once, here. Port 0 binds an ephemeral port.
    pub fn connect(local_port: u16, remote: impl ToSocketAddrs) -> io::Result<Self> {
        let remote = remote
            .to_socket_addrs()?
            .find(SocketAddr::is_ipv4)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "remote address did not resolve to an IPv4 endpoint",
                )
            })?;

        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, local_port))?;
        socket.set_nonblocking(true)?;

        debug!(local = %socket.local_addr()?, %remote, "peer connection bound");
        Ok(Self { socket, remote })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    /// Send one packet to the remote peer.
    pub fn send_packet(&self, data: &[u8]) -> io::Result<()> {
        if data.len() > MAX_PACKET_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "packet of {} bytes exceeds {MAX_PACKET_SIZE} bytes",
                    data.len()
                ),
            ));
        }

        let sent = self.socket.send_to(data, self.remote).inspect_err(|e| {
            warn!(remote = %self.remote, error = %e, "send failed");
        })?;
        if sent != data.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("sent {sent} of {} bytes", data.len()),
            ));
        }
        Ok(())
    }

    /// Receive the next packet from the remote peer, if one is waiting.
    ///
    /// Returns `Ok(None)` when nothing is queued. Packets from any other
    /// sender are discarded. On success `buf` holds exactly the packet.
    pub fn fetch_packet(&self, buf: &mut Vec<u8>) -> io::Result<Option<usize>> {
        loop {
            buf.resize(MAX_PACKET_SIZE, 0);
            match self.socket.recv_from(buf) {
                Ok((len, from)) if from == self.remote => {
                    buf.truncate(len);
                    return Ok(Some(len));
                }
                Ok((len, from)) => {
                    trace!(%from, len, "discarding packet from unexpected sender");
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    buf.clear();
                    return Ok(None);
                }
                Err(e) => {
                    buf.clear();
                    warn!(remote = %self.remote, error = %e, "receive failed");
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::{Duration, Instant};

    use super::*;

    fn loopback_socket() -> UdpSocket {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        socket
    }

    fn peer_for(remote: &UdpSocket) -> (PeerConnection, SocketAddr) {
        let peer = PeerConnection::connect(0, remote.local_addr().unwrap()).unwrap();
        let port = peer.local_addr().unwrap().port();
        (peer, SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
    }

    /// Poll until a packet arrives or two seconds pass.
    fn fetch_within(peer: &PeerConnection, buf: &mut Vec<u8>) -> Option<usize> {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if let Some(len) = peer.fetch_packet(buf).unwrap() {
                return Some(len);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn test_fetch_empty_is_none() {
        let remote = loopback_socket();
        let (peer, _) = peer_for(&remote);
        let mut buf = Vec::new();
        assert_eq!(peer.fetch_packet(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_send_and_fetch() {
        let remote = loopback_socket();
        let (peer, peer_addr) = peer_for(&remote);

        peer.send_packet(b"ping").unwrap();
        let mut inbound = [0u8; MAX_PACKET_SIZE];
        let (len, from) = remote.recv_from(&mut inbound).unwrap();
        assert_eq!(&inbound[..len], b"ping");
        assert_eq!(from.port(), peer_addr.port());

        remote.send_to(b"pong", peer_addr).unwrap();
        let mut buf = Vec::new();
        assert_eq!(fetch_within(&peer, &mut buf), Some(4));
        assert_eq!(buf, b"pong");
    }

    #[test]
    fn test_discards_other_senders() {
        let remote = loopback_socket();
        let stranger = loopback_socket();
        let (peer, peer_addr) = peer_for(&remote);

        stranger.send_to(b"noise", peer_addr).unwrap();
        remote.send_to(b"real", peer_addr).unwrap();

        let mut buf = Vec::new();
        assert_eq!(fetch_within(&peer, &mut buf), Some(4));
        assert_eq!(buf, b"real");
    }

    #[test]
    fn test_oversized_packet_rejected() {
        let remote = loopback_socket();
        let (peer, _) = peer_for(&remote);
        let err = peer.send_packet(&[0u8; MAX_PACKET_SIZE + 1]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}

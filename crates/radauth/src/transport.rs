//! Network capability used by an exchange
//!
//! Kept behind traits so the failover logic can be driven by scripted
//! transports in tests.

use async_trait::async_trait;
use std::io;
use std::net::{IpAddr, SocketAddr};
use tokio::net::UdpSocket;
use tokio::time::Instant;

/// A bound datagram socket. Dropping it releases the local port.
#[async_trait]
pub trait DatagramSocket: Send + Sync {
    async fn send_to(&self, datagram: &[u8], target: SocketAddr) -> io::Result<()>;

    async fn recv_from(&self, buffer: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    fn local_addr(&self) -> io::Result<SocketAddr>;

    /// Receive one datagram, or `Ok(None)` once `deadline` passes
    async fn recv_until(
        &self,
        buffer: &mut [u8],
        deadline: Instant,
    ) -> io::Result<Option<(usize, SocketAddr)>> {
        match tokio::time::timeout_at(deadline, self.recv_from(buffer)).await {
            Ok(received) => received.map(Some),
            Err(_) => Ok(None),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Resolve a hostname or address literal to one or more addresses
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>>;

    async fn bind(&self, local: SocketAddr) -> io::Result<Box<dyn DatagramSocket>>;
}

/// System resolver and tokio UDP sockets
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpTransport;

#[async_trait]
impl Transport for UdpTransport {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }

        let addresses: Vec<IpAddr> = tokio::net::lookup_host((host, 0))
            .await?
            .map(|addr| addr.ip())
            .collect();
        if addresses.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses for '{}'", host),
            ));
        }
        Ok(addresses)
    }

    async fn bind(&self, local: SocketAddr) -> io::Result<Box<dyn DatagramSocket>> {
        Ok(Box::new(TokioDatagram(UdpSocket::bind(local).await?)))
    }
}

struct TokioDatagram(UdpSocket);

#[async_trait]
impl DatagramSocket for TokioDatagram {
    async fn send_to(&self, datagram: &[u8], target: SocketAddr) -> io::Result<()> {
        let sent = self.0.send_to(datagram, target).await?;
        if sent != datagram.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short send: {} of {} bytes", sent, datagram.len()),
            ));
        }
        Ok(())
    }

    async fn recv_from(&self, buffer: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.0.recv_from(buffer).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.0.local_addr()
    }
}

//! One request/reply round trip with one server
//!
//! An exchange never retries. It resolves, binds a fresh socket, sends a
//! single Access-Request and waits at most the server's timeout for an
//! authenticated answer. The socket is dropped on every exit path before the
//! next attempt starts.

use crate::cancel::CancelToken;
use crate::registry::ServerRecord;
use crate::transport::{DatagramSocket, Transport};
use radauth_proto::{
    AccessRequest, AttributeType, Code, IdentifierSequence, Packet, PacketError, ReplyError,
    RequestBuilder,
};
use std::io;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Why an attempt produced no usable answer
#[derive(Error, Debug)]
pub enum AttemptFailure {
    #[error("could not resolve '{host}': {source}")]
    Resolution {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("malformed reply: {0}")]
    Malformed(PacketError),
    #[error("reply failed Response Authenticator check (wrong secret or spoofed reply)")]
    AuthenticatorMismatch,
    #[error("reply failed Message-Authenticator check (wrong secret or spoofed reply)")]
    MessageAuthenticatorMismatch,
    #[error("reply carries no Message-Authenticator")]
    MessageAuthenticatorMissing,
    #[error("unexpected reply code {0:?}")]
    UnexpectedCode(Code),
    #[error("could not encode request: {0}")]
    Encoding(PacketError),
    #[error("cancelled")]
    Cancelled,
}

impl AttemptFailure {
    /// Failures that point at a wrong secret or an attacker, not an outage
    pub fn is_security_relevant(&self) -> bool {
        matches!(
            self,
            AttemptFailure::AuthenticatorMismatch
                | AttemptFailure::MessageAuthenticatorMismatch
                | AttemptFailure::MessageAuthenticatorMissing
        )
    }
}

/// What the answering server said besides accept/reject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerReply {
    /// Name of the server that answered
    pub server: String,
    pub reply_messages: Vec<String>,
}

impl ServerReply {
    fn from_packet(server: &ServerRecord, reply: &Packet) -> Self {
        ServerReply {
            server: server.name.clone(),
            reply_messages: reply
                .find_all_attributes(AttributeType::ReplyMessage as u8)
                .filter_map(|attr| attr.as_string().ok())
                .collect(),
        }
    }
}

#[derive(Debug)]
pub enum AttemptResult {
    Accepted(ServerReply),
    Rejected(ServerReply),
    Indeterminate(AttemptFailure),
}

pub struct Exchange {
    transport: Arc<dyn Transport>,
    identifiers: IdentifierSequence,
    nas_identifier: Option<String>,
}

impl Exchange {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Exchange {
            transport,
            identifiers: IdentifierSequence::random(),
            nas_identifier: None,
        }
    }

    pub fn with_identifiers(mut self, identifiers: IdentifierSequence) -> Self {
        self.identifiers = identifiers;
        self
    }

    pub fn with_nas_identifier(mut self, nas_identifier: Option<String>) -> Self {
        self.nas_identifier = nas_identifier;
        self
    }

    /// Run one attempt against `server`
    pub async fn attempt(
        &self,
        server: &ServerRecord,
        username: &str,
        password: &str,
        cancel: &CancelToken,
    ) -> AttemptResult {
        let result = self.run(server, username, password, cancel).await;
        match result {
            Ok(reply) if !reply.code.is_final_answer() => {
                AttemptResult::Indeterminate(AttemptFailure::UnexpectedCode(reply.code))
            }
            Ok(reply) if reply.code == Code::AccessAccept => {
                info!(server = %server.name, "Access-Accept: authentication was successful");
                AttemptResult::Accepted(ServerReply::from_packet(server, &reply))
            }
            Ok(reply) => {
                info!(server = %server.name, "Access-Reject: authentication was not successful");
                AttemptResult::Rejected(ServerReply::from_packet(server, &reply))
            }
            Err(failure) => {
                if failure.is_security_relevant() {
                    warn!(server = %server.name, host = %server.host, "{}", failure);
                } else {
                    debug!(server = %server.name, "{}", failure);
                }
                AttemptResult::Indeterminate(failure)
            }
        }
    }

    async fn run(
        &self,
        server: &ServerRecord,
        username: &str,
        password: &str,
        cancel: &CancelToken,
    ) -> Result<Packet, AttemptFailure> {
        if cancel.is_cancelled() {
            return Err(AttemptFailure::Cancelled);
        }

        let target_ip = self.resolve_one(&server.host, None).await.map_err(|source| {
            AttemptFailure::Resolution {
                host: server.host.clone(),
                source,
            }
        })?;
        let target = SocketAddr::new(target_ip, server.port);
        debug!(server = %server.name, %target, "resolved");

        let bind_ip = self.resolve_one(&server.bind_address, Some(target_ip)).await?;
        let socket = self.transport.bind(SocketAddr::new(local_for(bind_ip, target_ip), 0)).await?;

        let request = RequestBuilder::new(username, password.as_bytes(), server.method, server.secret())
            .nas_identifier(self.nas_identifier.as_deref())
            .message_authenticator(server.message_authenticator)
            .build(self.identifiers.next())
            .map_err(AttemptFailure::Encoding)?;

        debug!(
            server = %server.name,
            method = %server.method,
            identifier = request.identifier(),
            local = ?socket.local_addr().ok(),
            "sending Access-Request"
        );
        socket.send_to(request.as_bytes(), target).await?;

        let deadline = Instant::now() + server.timeout;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AttemptFailure::Cancelled),
            reply = await_reply(socket.as_ref(), &request, server, target, deadline) => reply,
        }
    }

    /// First resolved address, preferring the family of `like` when given
    async fn resolve_one(&self, host: &str, like: Option<IpAddr>) -> io::Result<IpAddr> {
        let addresses = self.transport.resolve(host).await?;
        let preferred = like.and_then(|like| {
            addresses
                .iter()
                .copied()
                .find(|ip| ip.is_ipv4() == like.is_ipv4())
        });
        preferred
            .or_else(|| addresses.first().copied())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no addresses for '{}'", host)))
    }
}

/// An unspecified IPv4 bind address follows the target to IPv6
fn local_for(bind_ip: IpAddr, target_ip: IpAddr) -> IpAddr {
    match (bind_ip, target_ip) {
        (IpAddr::V4(v4), IpAddr::V6(_)) if v4.is_unspecified() => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        _ => bind_ip,
    }
}

/// Wait for the datagram that answers `request`.
///
/// Datagrams from other addresses and replies carrying another identifier
/// are strays from earlier attempts and are skipped. Anything else from the
/// server ends the wait.
async fn await_reply(
    socket: &dyn DatagramSocket,
    request: &AccessRequest,
    server: &ServerRecord,
    target: SocketAddr,
    deadline: Instant,
) -> Result<Packet, AttemptFailure> {
    let mut buffer = vec![0u8; Packet::MAX_PACKET_SIZE];
    loop {
        let Some((len, from)) = socket.recv_until(&mut buffer, deadline).await? else {
            return Err(AttemptFailure::Timeout(server.timeout));
        };

        if from != target {
            debug!(server = %server.name, %from, "ignoring datagram from unexpected address");
            continue;
        }

        match request.check_reply(
            &buffer[..len],
            server.secret(),
            server.message_authenticator,
        ) {
            Ok(reply) => return Ok(reply),
            Err(ReplyError::IdentifierMismatch { expected, got }) => {
                debug!(server = %server.name, expected, got, "ignoring reply to another request");
            }
            Err(ReplyError::Malformed(e)) => return Err(AttemptFailure::Malformed(e)),
            Err(ReplyError::AuthenticatorMismatch) => {
                return Err(AttemptFailure::AuthenticatorMismatch);
            }
            Err(ReplyError::MessageAuthenticatorMismatch) => {
                return Err(AttemptFailure::MessageAuthenticatorMismatch);
            }
            Err(ReplyError::MessageAuthenticatorMissing) => {
                return Err(AttemptFailure::MessageAuthenticatorMissing);
            }
        }
    }
}

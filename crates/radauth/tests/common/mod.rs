//! Scripted transport for driving the orchestrator without a network

#![allow(dead_code)]

use async_trait::async_trait;
use radauth::{DatagramSocket, ServerConfig, Transport};
use radauth_proto::{calculate_response_authenticator, Attribute, AttributeType, Code, Packet};
use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// How a scripted host reacts to a request
#[derive(Debug, Clone)]
pub enum Behavior {
    Silent,
    Accept(&'static str),
    Reject,
    /// Accept signed with the wrong secret
    ForgedAccept,
    Garbage,
    Unresolvable,
}

struct Host {
    addr: IpAddr,
    secret: Vec<u8>,
    behavior: Behavior,
}

#[derive(Default)]
struct Script {
    hosts: HashMap<String, Host>,
    by_addr: HashMap<IpAddr, String>,
    sent: Vec<String>,
    binds: usize,
}

/// Records every datagram sent and answers per host behavior
#[derive(Clone, Default)]
pub struct MockTransport {
    script: Arc<Mutex<Script>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(self, name: &str, secret: &str, behavior: Behavior) -> Self {
        {
            let mut script = self.script.lock().unwrap();
            let addr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, script.hosts.len() as u8 + 1));
            script.by_addr.insert(addr, name.to_string());
            script.hosts.insert(
                name.to_string(),
                Host {
                    addr,
                    secret: secret.as_bytes().to_vec(),
                    behavior,
                },
            );
        }
        self
    }

    /// Host names in the order requests were sent to them
    pub fn sent(&self) -> Vec<String> {
        self.script.lock().unwrap().sent.clone()
    }

    pub fn binds(&self) -> usize {
        self.script.lock().unwrap().binds
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }
        let script = self.script.lock().unwrap();
        match script.hosts.get(host) {
            Some(entry) if !matches!(entry.behavior, Behavior::Unresolvable) => Ok(vec![entry.addr]),
            _ => Err(io::Error::new(io::ErrorKind::NotFound, format!("unknown host {}", host))),
        }
    }

    async fn bind(&self, local: SocketAddr) -> io::Result<Box<dyn DatagramSocket>> {
        self.script.lock().unwrap().binds += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Box::new(MockSocket {
            local,
            script: self.script.clone(),
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }))
    }
}

struct MockSocket {
    local: SocketAddr,
    script: Arc<Mutex<Script>>,
    tx: mpsc::UnboundedSender<(Vec<u8>, SocketAddr)>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<(Vec<u8>, SocketAddr)>>,
}

#[async_trait]
impl DatagramSocket for MockSocket {
    async fn send_to(&self, datagram: &[u8], target: SocketAddr) -> io::Result<()> {
        let reply = {
            let mut script = self.script.lock().unwrap();
            let name = script
                .by_addr
                .get(&target.ip())
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionRefused, "no such host"))?;
            script.sent.push(name.clone());
            let host = &script.hosts[&name];
            answer(datagram, &host.secret, &host.behavior)
        };
        if let Some(reply) = reply {
            let _ = self.tx.send((reply, target));
        }
        Ok(())
    }

    async fn recv_from(&self, buffer: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Some((datagram, from)) => {
                buffer[..datagram.len()].copy_from_slice(&datagram);
                Ok((datagram.len(), from))
            }
            None => std::future::pending().await,
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.local)
    }
}

fn answer(request: &[u8], secret: &[u8], behavior: &Behavior) -> Option<Vec<u8>> {
    match behavior {
        Behavior::Silent | Behavior::Unresolvable => None,
        Behavior::Garbage => Some(vec![0xde, 0xad, 0xbe, 0xef]),
        Behavior::Accept(message) => Some(reply(request, Code::AccessAccept, secret, &[*message])),
        Behavior::Reject => Some(reply(request, Code::AccessReject, secret, &[])),
        Behavior::ForgedAccept => Some(reply(request, Code::AccessAccept, b"forged", &[])),
    }
}

/// Build a signed reply to `request`
pub fn reply(request: &[u8], code: Code, secret: &[u8], messages: &[&str]) -> Vec<u8> {
    let request = Packet::decode(request).unwrap();
    let mut packet = Packet::new(code, request.identifier, [0; 16]);
    for message in messages {
        packet.add_attribute(Attribute::string(AttributeType::ReplyMessage as u8, message).unwrap());
    }
    packet.authenticator = calculate_response_authenticator(&packet, &request.authenticator, secret);
    packet.encode().unwrap()
}

/// Server entry pointing at a mock host
pub fn server(name: &str, secret: &str, priority: i32) -> ServerConfig {
    let mut config = ServerConfig::new(name);
    config.host = name.to_string();
    config.secret = secret.to_string();
    config.priority = priority;
    config.timeout = 30;
    config.method = Some("PAP".to_string());
    config
}

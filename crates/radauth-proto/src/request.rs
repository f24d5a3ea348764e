//! Access-Request construction and reply authentication
//!
//! This is the client half of an exchange: [`RequestBuilder`] turns a
//! username, password and [`AuthMethod`] into an encoded
//! [`AccessRequest`], and [`AccessRequest::check_reply`] decides whether a
//! datagram is a genuine answer to it.

use crate::attributes::{Attribute, AttributeType};
use crate::auth::{encrypt_user_password, generate_request_authenticator, verify_response_authenticator};
use crate::chap::ChapResponse;
use crate::message_auth::{self, MESSAGE_AUTHENTICATOR_LENGTH};
use crate::packet::{Code, Packet, PacketError};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use thiserror::Error;

/// How the password is carried in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMethod {
    /// User-Password, obfuscated with the shared secret
    Pap,
    /// CHAP-Password, challenge/response over the Request Authenticator
    Chap,
}

impl FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("pap") {
            Ok(AuthMethod::Pap)
        } else if s.eq_ignore_ascii_case("chap") {
            Ok(AuthMethod::Chap)
        } else {
            Err(format!("unknown authentication method '{}'", s))
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::Pap => f.write_str("PAP"),
            AuthMethod::Chap => f.write_str("CHAP"),
        }
    }
}

/// Packet identifier source: a wrapping counter.
///
/// Consecutive identifiers differ, so as long as fewer than 256 requests
/// share a socket no two pending requests collide.
#[derive(Debug)]
pub struct IdentifierSequence(AtomicU8);

impl IdentifierSequence {
    pub fn starting_at(first: u8) -> Self {
        IdentifierSequence(AtomicU8::new(first))
    }

    /// Start at a random point so restarts do not replay identifiers
    pub fn random() -> Self {
        Self::starting_at(rand::random())
    }

    pub fn next(&self) -> u8 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdentifierSequence {
    fn default() -> Self {
        Self::random()
    }
}

/// Why a datagram was not accepted as the reply to a request
#[derive(Error, Debug)]
pub enum ReplyError {
    #[error("Malformed reply: {0}")]
    Malformed(#[from] PacketError),
    #[error("Reply identifier {got} does not match request identifier {expected}")]
    IdentifierMismatch { expected: u8, got: u8 },
    #[error("Response authenticator mismatch")]
    AuthenticatorMismatch,
    #[error("Reply carries no Message-Authenticator")]
    MessageAuthenticatorMissing,
    #[error("Message-Authenticator mismatch")]
    MessageAuthenticatorMismatch,
}

/// An encoded Access-Request, kept for correlating and verifying its reply
#[derive(Debug, Clone)]
pub struct AccessRequest {
    packet: Packet,
    encoded: Vec<u8>,
}

impl AccessRequest {
    pub fn identifier(&self) -> u8 {
        self.packet.identifier
    }

    pub fn authenticator(&self) -> &[u8; 16] {
        &self.packet.authenticator
    }

    pub fn length(&self) -> usize {
        self.encoded.len()
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.encoded
    }

    pub fn has_message_authenticator(&self) -> bool {
        self.packet
            .find_attribute(AttributeType::MessageAuthenticator as u8)
            .is_some()
    }

    /// Recompute the reply's Response Authenticator with this request's
    /// authenticator and compare it with the one the reply carries.
    pub fn verify_response(&self, reply: &Packet, secret: &[u8]) -> bool {
        verify_response_authenticator(reply, self.authenticator(), secret)
    }

    /// Decode `datagram` and authenticate it as the reply to this request.
    ///
    /// A Message-Authenticator in the reply is always verified; its absence
    /// is an error only when `require_message_authenticator` is set.
    pub fn check_reply(
        &self,
        datagram: &[u8],
        secret: &[u8],
        require_message_authenticator: bool,
    ) -> Result<Packet, ReplyError> {
        let reply = Packet::decode(datagram)?;

        if reply.identifier != self.identifier() {
            return Err(ReplyError::IdentifierMismatch {
                expected: self.identifier(),
                got: reply.identifier,
            });
        }

        if !self.verify_response(&reply, secret) {
            return Err(ReplyError::AuthenticatorMismatch);
        }

        match message_auth::verify_reply(datagram, self.authenticator(), secret)? {
            Some(true) => {}
            Some(false) => return Err(ReplyError::MessageAuthenticatorMismatch),
            None if require_message_authenticator => {
                return Err(ReplyError::MessageAuthenticatorMissing);
            }
            None => {}
        }

        Ok(reply)
    }
}

/// Builds Access-Requests for one set of credentials against one server
#[derive(Clone, Copy)]
pub struct RequestBuilder<'a> {
    username: &'a str,
    password: &'a [u8],
    method: AuthMethod,
    secret: &'a [u8],
    nas_identifier: Option<&'a str>,
    message_authenticator: bool,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(username: &'a str, password: &'a [u8], method: AuthMethod, secret: &'a [u8]) -> Self {
        RequestBuilder {
            username,
            password,
            method,
            secret,
            nas_identifier: None,
            message_authenticator: false,
        }
    }

    pub fn nas_identifier(mut self, nas_identifier: Option<&'a str>) -> Self {
        self.nas_identifier = nas_identifier;
        self
    }

    pub fn message_authenticator(mut self, enabled: bool) -> Self {
        self.message_authenticator = enabled;
        self
    }

    /// Build a request with a fresh random Request Authenticator
    pub fn build(&self, identifier: u8) -> Result<AccessRequest, PacketError> {
        self.build_with_authenticator(identifier, generate_request_authenticator())
    }

    /// Build a request with a caller-chosen Request Authenticator.
    ///
    /// The CHAP identifier is the packet identifier.
    pub fn build_with_authenticator(
        &self,
        identifier: u8,
        authenticator: [u8; 16],
    ) -> Result<AccessRequest, PacketError> {
        let mut packet = Packet::new(Code::AccessRequest, identifier, authenticator);
        packet.add_attribute(Attribute::string(AttributeType::UserName as u8, self.username)?);

        let password = match self.method {
            AuthMethod::Pap => Attribute::new(
                AttributeType::UserPassword as u8,
                encrypt_user_password(self.password, self.secret, &authenticator)?,
            )?,
            AuthMethod::Chap => Attribute::new(
                AttributeType::ChapPassword as u8,
                ChapResponse::compute(identifier, self.password, &authenticator).to_bytes(),
            )?,
        };
        packet.add_attribute(password);

        if let Some(nas_identifier) = self.nas_identifier {
            packet.add_attribute(Attribute::string(
                AttributeType::NasIdentifier as u8,
                nas_identifier,
            )?);
        }

        if !self.message_authenticator {
            let encoded = packet.encode()?;
            return Ok(AccessRequest { packet, encoded });
        }

        packet.add_attribute(Attribute::new(
            AttributeType::MessageAuthenticator as u8,
            vec![0; MESSAGE_AUTHENTICATOR_LENGTH],
        )?);
        let mut encoded = packet.encode()?;
        message_auth::sign_request(&mut encoded, self.secret)?;

        let signed = &encoded[encoded.len() - MESSAGE_AUTHENTICATOR_LENGTH..];
        if let Some(slot) = packet.attributes.last_mut() {
            slot.value_mut().copy_from_slice(signed);
        }
        Ok(AccessRequest { packet, encoded })
    }
}

//! RADIUS client protocol primitives
//!
//! Byte-level building blocks for authenticating against a RADIUS server
//! (RFC 2865, with Message-Authenticator from RFC 2869). Nothing in this
//! crate touches the network.
//!
//! # Features
//!
//! - Packet and attribute encoding/decoding with strict length checks
//! - PAP User-Password obfuscation and CHAP-Password responses
//! - Response Authenticator and Message-Authenticator verification
//! - [`RequestBuilder`] / [`AccessRequest`] for the full client exchange
//!
//! # Example
//!
//! ```rust
//! use radauth_proto::{AuthMethod, IdentifierSequence, RequestBuilder};
//!
//! let ids = IdentifierSequence::random();
//! let request = RequestBuilder::new("alice", b"password", AuthMethod::Pap, b"secret")
//!     .build(ids.next())
//!     .unwrap();
//!
//! // `request.as_bytes()` goes on the wire; a reply datagram is checked with
//! // `request.check_reply(&datagram, b"secret", false)`.
//! assert_eq!(request.as_bytes().len(), request.length());
//! ```

pub mod attributes;
pub mod auth;
pub mod chap;
pub mod message_auth;
pub mod packet;
pub mod request;

pub use attributes::{Attribute, AttributeType};
pub use auth::{
    calculate_response_authenticator, decrypt_user_password, encrypt_user_password,
    generate_request_authenticator, verify_response_authenticator,
};
pub use chap::{ChapError, ChapResponse, compute_chap_response};
pub use packet::{Code, Packet, PacketError};
pub use request::{AccessRequest, AuthMethod, IdentifierSequence, ReplyError, RequestBuilder};

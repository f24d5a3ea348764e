//! RADIUS Authentication Client
//!
//! This crate authenticates a username and password against a list of
//! RADIUS servers with prioritized failover, built on the `radauth-proto`
//! packet codec.
//!
//! # Features
//!
//! - PAP and CHAP
//! - Priority ordering with per-round shuffling of equal priorities
//! - Response Authenticator and optional Message-Authenticator checks
//! - JSON or server-block configuration
//! - Cancellation of in-flight calls
//!
//! # Example
//!
//! ```rust,no_run
//! use radauth::{AuthOrchestrator, AuthOutcome, FileSource, UdpTransport};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = AuthOrchestrator::new(Arc::new(UdpTransport));
//!     let source = FileSource::new("/etc/radauth.conf");
//!
//!     match orchestrator.authenticate("alice", "password", 3, &source).await? {
//!         AuthOutcome::Accepted(reply) => println!("welcome ({})", reply.server),
//!         AuthOutcome::Rejected(_) => println!("access denied"),
//!         AuthOutcome::Indeterminate(reason) => println!("no answer: {:?}", reason),
//!     }
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod conf;
pub mod config;
pub mod exchange;
pub mod orchestrator;
pub mod registry;
pub mod scheduler;
pub mod transport;

pub use cancel::{CancelHandle, CancelToken};
pub use config::{Config, ConfigError, ServerConfig};
pub use exchange::{AttemptFailure, AttemptResult, Exchange, ServerReply};
pub use orchestrator::{AuthOrchestrator, AuthOutcome, IndeterminateReason};
pub use registry::{FileSource, ServerRecord, ServerRegistry, ServerSource, StaticSource};
pub use scheduler::{AttemptOrder, ClockSeed, FailoverScheduler, FixedSeed, SeedSource};
pub use transport::{DatagramSocket, Transport, UdpTransport};

pub use radauth_proto::AuthMethod;

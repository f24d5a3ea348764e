//! Top-level authentication with failover across servers and rounds

use crate::cancel::CancelToken;
use crate::config::ConfigError;
use crate::exchange::{AttemptFailure, AttemptResult, Exchange, ServerReply};
use crate::registry::{ServerRegistry, ServerSource};
use crate::scheduler::FailoverScheduler;
use crate::transport::Transport;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why no server gave a definitive answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndeterminateReason {
    /// Every attempt in every round failed
    AllServersUnreachable,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Accepted(ServerReply),
    Rejected(ServerReply),
    Indeterminate(IndeterminateReason),
}

impl AuthOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AuthOutcome::Accepted(_))
    }

    /// The answering server's reply, if any server answered
    pub fn reply(&self) -> Option<&ServerReply> {
        match self {
            AuthOutcome::Accepted(reply) | AuthOutcome::Rejected(reply) => Some(reply),
            AuthOutcome::Indeterminate(_) => None,
        }
    }
}

impl fmt::Display for AuthOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthOutcome::Accepted(reply) => write!(f, "accepted by {}", reply.server),
            AuthOutcome::Rejected(reply) => write!(f, "rejected by {}", reply.server),
            AuthOutcome::Indeterminate(IndeterminateReason::AllServersUnreachable) => {
                write!(f, "no server answered")
            }
            AuthOutcome::Indeterminate(IndeterminateReason::Cancelled) => write!(f, "cancelled"),
        }
    }
}

pub struct AuthOrchestrator {
    exchange: Exchange,
    scheduler: FailoverScheduler,
}

impl AuthOrchestrator {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        AuthOrchestrator {
            exchange: Exchange::new(transport),
            scheduler: FailoverScheduler::default(),
        }
    }

    pub fn with_scheduler(mut self, scheduler: FailoverScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_exchange(mut self, exchange: Exchange) -> Self {
        self.exchange = exchange;
        self
    }

    pub fn with_nas_identifier(mut self, nas_identifier: Option<String>) -> Self {
        self.exchange = self.exchange.with_nas_identifier(nas_identifier);
        self
    }

    /// Authenticate against the servers of `source`.
    ///
    /// Each of the `max_rounds` rounds tries every server once, in the
    /// scheduler's order. The first Accept or Reject ends the call.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        max_rounds: u32,
        source: &dyn ServerSource,
    ) -> Result<AuthOutcome, ConfigError> {
        self.authenticate_until(username, password, max_rounds, source, &CancelToken::never())
            .await
    }

    /// [`authenticate`](Self::authenticate) that stops early once `cancel` fires
    pub async fn authenticate_until(
        &self,
        username: &str,
        password: &str,
        max_rounds: u32,
        source: &dyn ServerSource,
        cancel: &CancelToken,
    ) -> Result<AuthOutcome, ConfigError> {
        if max_rounds == 0 {
            return Err(ConfigError::Invalid("at least one round is required".to_string()));
        }
        let registry = ServerRegistry::load(source)?;
        Ok(self.run(&registry, username, password, max_rounds, cancel).await)
    }

    /// Run the rounds against an already loaded registry
    pub async fn run(
        &self,
        registry: &ServerRegistry,
        username: &str,
        password: &str,
        max_rounds: u32,
        cancel: &CancelToken,
    ) -> AuthOutcome {
        for round in 1..=max_rounds {
            let order = self.scheduler.order(registry.servers(), round);
            debug!(round = order.round, max_rounds, servers = order.len(), "starting round");

            for server in order.iter() {
                match self.exchange.attempt(server, username, password, cancel).await {
                    AttemptResult::Accepted(reply) => return AuthOutcome::Accepted(reply),
                    AttemptResult::Rejected(reply) => return AuthOutcome::Rejected(reply),
                    AttemptResult::Indeterminate(AttemptFailure::Cancelled) => {
                        info!(round, server = %server.name, "authentication cancelled");
                        return AuthOutcome::Indeterminate(IndeterminateReason::Cancelled);
                    }
                    AttemptResult::Indeterminate(failure) => {
                        debug!(round, server = %server.name, "trying next server: {}", failure);
                    }
                }
            }
        }

        warn!(
            rounds = max_rounds,
            servers = registry.len(),
            "no server gave a definitive answer"
        );
        AuthOutcome::Indeterminate(IndeterminateReason::AllServersUnreachable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::registry::StaticSource;
    use crate::transport::UdpTransport;

    fn reply(server: &str) -> ServerReply {
        ServerReply {
            server: server.to_string(),
            reply_messages: vec![],
        }
    }

    #[test]
    fn test_outcome_accessors() {
        let accepted = AuthOutcome::Accepted(reply("a"));
        assert!(accepted.is_accepted());
        assert_eq!(accepted.reply().map(|r| r.server.as_str()), Some("a"));
        assert_eq!(accepted.to_string(), "accepted by a");

        let rejected = AuthOutcome::Rejected(reply("b"));
        assert!(!rejected.is_accepted());
        assert_eq!(rejected.to_string(), "rejected by b");

        let unreachable = AuthOutcome::Indeterminate(IndeterminateReason::AllServersUnreachable);
        assert!(unreachable.reply().is_none());
        assert_eq!(unreachable.to_string(), "no server answered");
    }

    #[tokio::test]
    async fn test_zero_rounds_is_invalid() {
        let mut entry = ServerConfig::new("only");
        entry.host = "127.0.0.1".to_string();
        entry.method = Some("PAP".to_string());

        let result = AuthOrchestrator::new(Arc::new(UdpTransport))
            .authenticate("alice", "pw", 0, &StaticSource(vec![entry]))
            .await;
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}

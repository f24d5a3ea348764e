mod common;

use common::{server, Behavior, MockTransport};
use radauth::{
    AuthOrchestrator, AuthOutcome, CancelHandle, ConfigError, FailoverScheduler, FileSource,
    IndeterminateReason, StaticSource,
};
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn orchestrator(transport: &MockTransport) -> AuthOrchestrator {
    AuthOrchestrator::new(Arc::new(transport.clone())).with_scheduler(FailoverScheduler::seeded(42))
}

#[tokio::test]
async fn test_single_server_accepts() {
    let transport = MockTransport::new().host("only", "s3cret", Behavior::Accept("Hello, alice"));
    let source = StaticSource(vec![server("only", "s3cret", 0)]);

    let outcome = orchestrator(&transport)
        .authenticate("alice", "password", 3, &source)
        .await
        .unwrap();

    match outcome {
        AuthOutcome::Accepted(reply) => {
            assert_eq!(reply.server, "only");
            assert_eq!(reply.reply_messages, vec!["Hello, alice"]);
        }
        other => panic!("expected accept, got {:?}", other),
    }
    assert_eq!(transport.sent(), vec!["only"]);
}

#[tokio::test]
async fn test_all_silent_tries_every_server_every_round() {
    let transport = MockTransport::new()
        .host("low", "s", Behavior::Silent)
        .host("high", "s", Behavior::Silent);
    let source = StaticSource(vec![server("low", "s", 5), server("high", "s", 10)]);

    let outcome = orchestrator(&transport)
        .authenticate("alice", "password", 2, &source)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        AuthOutcome::Indeterminate(IndeterminateReason::AllServersUnreachable)
    );
    assert_eq!(transport.sent(), vec!["high", "low", "high", "low"]);
    assert_eq!(transport.binds(), 4);
}

#[tokio::test]
async fn test_reject_stops_failover() {
    let transport = MockTransport::new()
        .host("primary", "s", Behavior::Reject)
        .host("backup", "s", Behavior::Accept("unused"));
    let source = StaticSource(vec![server("primary", "s", 10), server("backup", "s", 1)]);

    let outcome = orchestrator(&transport)
        .authenticate("alice", "wrong", 3, &source)
        .await
        .unwrap();

    assert!(matches!(&outcome, AuthOutcome::Rejected(reply) if reply.server == "primary"));
    assert_eq!(transport.sent(), vec!["primary"]);
}

#[tokio::test]
async fn test_forged_accept_is_not_trusted() {
    let transport = MockTransport::new()
        .host("primary", "s", Behavior::ForgedAccept)
        .host("backup", "s", Behavior::Accept("from backup"));
    let source = StaticSource(vec![server("primary", "s", 10), server("backup", "s", 1)]);

    let outcome = orchestrator(&transport)
        .authenticate("alice", "password", 1, &source)
        .await
        .unwrap();

    assert!(outcome.is_accepted());
    assert_eq!(outcome.reply().unwrap().server, "backup");
    assert_eq!(transport.sent(), vec!["primary", "backup"]);
}

#[tokio::test]
async fn test_garbage_and_unresolvable_fail_over() {
    let transport = MockTransport::new()
        .host("garbage", "s", Behavior::Garbage)
        .host("nowhere", "s", Behavior::Unresolvable)
        .host("good", "s", Behavior::Reject);
    let source = StaticSource(vec![
        server("garbage", "s", 30),
        server("nowhere", "s", 20),
        server("good", "s", 10),
    ]);

    let outcome = orchestrator(&transport)
        .authenticate("alice", "password", 1, &source)
        .await
        .unwrap();

    assert!(matches!(&outcome, AuthOutcome::Rejected(reply) if reply.server == "good"));
    // Resolution fails before any socket is bound
    assert_eq!(transport.sent(), vec!["garbage", "good"]);
    assert_eq!(transport.binds(), 2);
}

#[tokio::test]
async fn test_empty_source_is_a_config_error() {
    let transport = MockTransport::new();
    let result = orchestrator(&transport)
        .authenticate("alice", "password", 3, &StaticSource(vec![]))
        .await;

    assert!(matches!(result, Err(ConfigError::NoServersConfigured)));
    assert_eq!(transport.binds(), 0);
}

#[tokio::test]
async fn test_unusable_entries_are_discarded() {
    let transport = MockTransport::new().host("good", "s", Behavior::Accept("ok"));
    let mut no_method = server("broken", "s", 50);
    no_method.method = None;
    let mut unknown_method = server("odd", "s", 40);
    unknown_method.method = Some("MSCHAP".to_string());

    let source = StaticSource(vec![no_method.clone(), unknown_method, server("good", "s", 0)]);
    let outcome = orchestrator(&transport)
        .authenticate("alice", "password", 1, &source)
        .await
        .unwrap();
    assert!(outcome.is_accepted());
    assert_eq!(transport.sent(), vec!["good"]);

    let result = orchestrator(&transport)
        .authenticate("alice", "password", 1, &StaticSource(vec![no_method]))
        .await;
    assert!(matches!(result, Err(ConfigError::NoServersConfigured)));
}

#[tokio::test]
async fn test_zero_rounds_rejected() {
    let transport = MockTransport::new().host("only", "s", Behavior::Accept("ok"));
    let result = orchestrator(&transport)
        .authenticate("alice", "password", 0, &StaticSource(vec![server("only", "s", 0)]))
        .await;

    assert!(matches!(result, Err(ConfigError::Invalid(_))));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_equal_priorities_rotate_across_rounds() {
    let transport = MockTransport::new()
        .host("a", "s", Behavior::Silent)
        .host("b", "s", Behavior::Silent)
        .host("c", "s", Behavior::Silent);
    let mut servers = vec![server("a", "s", 7), server("b", "s", 7), server("c", "s", 7)];
    for entry in &mut servers {
        entry.timeout = 1;
    }

    let rounds = 20;
    orchestrator(&transport)
        .authenticate("alice", "password", rounds, &StaticSource(servers))
        .await
        .unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 3 * rounds as usize);
    for round in sent.chunks(3) {
        let mut names = round.to_vec();
        names.sort();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
    let mut firsts: Vec<&String> = sent.chunks(3).map(|round| &round[0]).collect();
    firsts.sort();
    firsts.dedup();
    assert!(firsts.len() > 1, "tie order never changed across rounds");
}

#[tokio::test]
async fn test_cancel_stops_waiting() {
    let transport = MockTransport::new()
        .host("slow", "s", Behavior::Silent)
        .host("slower", "s", Behavior::Silent);
    let mut slow = server("slow", "s", 2);
    slow.timeout = 10_000;
    let mut slower = server("slower", "s", 1);
    slower.timeout = 10_000;

    let handle = CancelHandle::new();
    let token = handle.token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
    });

    let started = Instant::now();
    let outcome = orchestrator(&transport)
        .authenticate_until("alice", "password", 3, &StaticSource(vec![slow, slower]), &token)
        .await
        .unwrap();

    assert_eq!(outcome, AuthOutcome::Indeterminate(IndeterminateReason::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(transport.sent(), vec!["slow"]);
}

#[tokio::test]
async fn test_cancelled_before_start_sends_nothing() {
    let transport = MockTransport::new().host("only", "s", Behavior::Accept("ok"));
    let handle = CancelHandle::new();
    handle.cancel();

    let outcome = orchestrator(&transport)
        .authenticate_until(
            "alice",
            "password",
            1,
            &StaticSource(vec![server("only", "s", 0)]),
            &handle.token(),
        )
        .await
        .unwrap();

    assert_eq!(outcome, AuthOutcome::Indeterminate(IndeterminateReason::Cancelled));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_server_blocks_from_file() {
    let transport = MockTransport::new()
        .host("radius-a", "alpha", Behavior::Silent)
        .host("radius-b", "beta", Behavior::Accept("via file"));

    let mut file = tempfile::Builder::new().suffix(".conf").tempfile().unwrap();
    writeln!(
        file,
        "# two servers\n\
         first {{\n  host radius-a\n  secret alpha\n  priority 9\n  timeout 20\n  method PAP\n}}\n\
         second {{\n  host radius-b\n  secret beta\n  priority 3\n  method CHAP\n}}"
    )
    .unwrap();

    let outcome = orchestrator(&transport)
        .authenticate("alice", "password", 1, &FileSource::new(file.path()))
        .await
        .unwrap();

    assert!(matches!(&outcome, AuthOutcome::Accepted(reply) if reply.server == "second"));
    assert_eq!(transport.sent(), vec!["radius-a", "radius-b"]);
}

#[tokio::test]
async fn test_missing_file_is_a_config_error() {
    let transport = MockTransport::new();
    let dir = tempfile::tempdir().unwrap();
    let result = orchestrator(&transport)
        .authenticate("alice", "password", 1, &FileSource::new(dir.path().join("absent.json")))
        .await;

    assert!(matches!(result, Err(ConfigError::Io(_))));
}

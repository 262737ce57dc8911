use iamprobe::{
    check::{ApiError, CheckError, CheckOutcome},
    probe::{ProbeError, Shard, probe_shard},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::helpers::{
    MockEndpoint, ScriptedChecker, generated, invalid_permission, names, sorted,
};

fn shard(permissions: Vec<String>) -> Shard {
    Shard {
        index: 0,
        permissions,
    }
}

async fn collect(mut rx: mpsc::UnboundedReceiver<String>) -> Vec<String> {
    let mut out = Vec::new();
    while let Some(permission) = rx.recv().await {
        out.push(permission);
    }
    out
}

#[tokio::test]
async fn test_invalid_permission_is_eliminated_and_batch_retried() {
    let checker = ScriptedChecker::new(vec![
        Ok(CheckOutcome::Rejected(ApiError::new(
            "PERMISSION_DENIED",
            "Permission a.b.invalid is not valid for this resource.",
        ))),
        Ok(CheckOutcome::Granted(names(&["a.b.get"]))),
    ]);
    let (tx, rx) = mpsc::unbounded_channel();

    let report = probe_shard(
        &checker,
        shard(names(&["a.b.get", "a.b.invalid", "a.b.list"])),
        &tx,
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    drop(tx);

    assert_eq!(
        checker.calls(),
        vec![
            names(&["a.b.get", "a.b.invalid", "a.b.list"]),
            names(&["a.b.get", "a.b.list"]),
        ]
    );
    assert_eq!(collect(rx).await, ["a.b.get"]);
    assert_eq!(report.calls, 2);
    assert_eq!(report.invalid, ["a.b.invalid"]);
    assert!(!report.cancelled);
}

#[tokio::test]
async fn test_all_granted_emits_each_exactly_once() {
    let candidates = generated("svc", 42);
    let checker = MockEndpoint::new().grant(candidates.iter().map(String::as_str));
    let (tx, rx) = mpsc::unbounded_channel();

    let report = probe_shard(
        &checker,
        shard(candidates.clone()),
        &tx,
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    drop(tx);

    assert_eq!(collect(rx).await, candidates);
    assert_eq!(report.granted, 42);
    assert_eq!(report.calls, 1);
}

#[tokio::test]
async fn test_single_invalid_never_confirmed() {
    let mut candidates = generated("svc", 10);
    candidates.insert(4, "svc.res.bogus".to_string());
    let checker = MockEndpoint::new()
        .grant(candidates.iter().map(String::as_str))
        .invalid(["svc.res.bogus"]);
    let (tx, rx) = mpsc::unbounded_channel();

    let report = probe_shard(&checker, shard(candidates), &tx, &CancellationToken::new())
        .await
        .unwrap();
    drop(tx);

    let confirmed = collect(rx).await;
    assert!(!confirmed.contains(&"svc.res.bogus".to_string()));
    assert_eq!(confirmed, generated("svc", 10));
    assert_eq!(report.invalid, ["svc.res.bogus"]);
}

#[tokio::test]
async fn test_batches_are_capped_at_one_hundred() {
    let candidates = generated("svc", 150);
    let checker = MockEndpoint::new().grant(["svc.res.verb0", "svc.res.verb149"]);
    let (tx, rx) = mpsc::unbounded_channel();

    let report = probe_shard(&checker, shard(candidates), &tx, &CancellationToken::new())
        .await
        .unwrap();
    drop(tx);

    let calls = checker.calls();
    assert!(calls.len() >= 2);
    assert_eq!(calls[0].len(), 100);
    assert_eq!(calls[1].len(), 50);
    assert_eq!(report.calls, calls.len());
    assert_eq!(collect(rx).await, ["svc.res.verb0", "svc.res.verb149"]);
}

#[tokio::test]
async fn test_valid_prefix_is_resubmitted_not_emitted() {
    // Names before the invalid one are valid but only confirmed by the retry.
    let checker = MockEndpoint::new()
        .grant(["x.y.get", "x.y.list"])
        .invalid(["x.y.nope"]);
    let (tx, rx) = mpsc::unbounded_channel();

    probe_shard(
        &checker,
        shard(names(&["x.y.get", "x.y.update", "x.y.nope", "x.y.list"])),
        &tx,
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    drop(tx);

    assert_eq!(checker.calls()[1], names(&["x.y.get", "x.y.update", "x.y.list"]));
    assert_eq!(collect(rx).await, ["x.y.get", "x.y.list"]);
}

#[tokio::test]
async fn test_invalid_in_second_batch_does_not_replay_first() {
    let mut candidates = generated("svc", 120);
    candidates[110] = "svc.res.bogus".to_string();
    let checker = MockEndpoint::new()
        .grant(["svc.res.verb0", "svc.res.verb119"])
        .invalid(["svc.res.bogus"]);
    let (tx, rx) = mpsc::unbounded_channel();

    let report = probe_shard(&checker, shard(candidates), &tx, &CancellationToken::new())
        .await
        .unwrap();
    drop(tx);

    let calls = checker.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1].len(), 20);
    assert_eq!(calls[2].len(), 19);
    assert_eq!(report.invalid, ["svc.res.bogus"]);
    assert_eq!(collect(rx).await, ["svc.res.verb0", "svc.res.verb119"]);
}

#[tokio::test]
async fn test_unrecoverable_api_error_stops_shard() {
    let checker = MockEndpoint::new()
        .grant(["a.res.verb1"])
        .forbid(["a.res.verb0"]);
    let (tx, rx) = mpsc::unbounded_channel();

    let err = probe_shard(
        &checker,
        shard(generated("a", 250)),
        &tx,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();
    drop(tx);

    assert_eq!(
        err.api_error(),
        Some(&ApiError::new(
            "PERMISSION_DENIED",
            "Caller does not have permission"
        ))
    );
    // Only the first batch was ever submitted.
    assert_eq!(checker.call_count(), 1);
    assert!(collect(rx).await.is_empty());
}

#[tokio::test]
async fn test_transport_error_stops_shard_after_partial_results() {
    let checker = ScriptedChecker::new(vec![
        Ok(CheckOutcome::Granted(names(&["svc.res.verb3"]))),
        Err(CheckError::Transport {
            url: "http://127.0.0.1:1/".to_string(),
            reason: "connection refused".to_string(),
        }),
    ]);
    let (tx, rx) = mpsc::unbounded_channel();

    let err = probe_shard(
        &checker,
        shard(generated("svc", 250)),
        &tx,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();
    drop(tx);

    assert!(matches!(err, ProbeError::Check(ref e) if e.is_transport_error()));
    assert_eq!(checker.calls().len(), 2);
    assert_eq!(collect(rx).await, ["svc.res.verb3"]);
}

#[tokio::test]
async fn test_invalid_name_outside_batch_is_fatal() {
    let checker = ScriptedChecker::new(vec![Ok(CheckOutcome::Rejected(
        invalid_permission("not.in.batch"),
    ))]);
    let (tx, _rx) = mpsc::unbounded_channel();

    let err = probe_shard(
        &checker,
        shard(names(&["a.b.get"])),
        &tx,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        ProbeError::UnknownInvalidPermission { ref permission } if permission == "not.in.batch"
    ));
    assert_eq!(checker.calls().len(), 1);
}

#[tokio::test]
async fn test_rerun_is_deterministic() {
    let mut candidates = generated("svc", 230);
    candidates[7] = "svc.res.bad1".to_string();
    candidates[160] = "svc.res.bad2".to_string();
    let granted: Vec<String> = candidates.iter().step_by(3).cloned().collect();

    let mut runs = Vec::new();
    for _ in 0..2 {
        let checker = MockEndpoint::new()
            .grant(granted.iter().map(String::as_str))
            .invalid(["svc.res.bad1", "svc.res.bad2"]);
        let (tx, rx) = mpsc::unbounded_channel();
        probe_shard(
            &checker,
            shard(candidates.clone()),
            &tx,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        drop(tx);
        runs.push(sorted(collect(rx).await));
    }

    assert_eq!(runs[0], runs[1]);
    assert!(!runs[0].contains(&"svc.res.bad1".to_string()));
}

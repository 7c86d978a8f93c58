use std::sync::Arc;
use std::time::Duration;

use promptgate_core::{
    EngineConfig, ErrorKind, EvaluationRunner, MemoryPromptStore, MemoryScoreStore, PromptGate,
    PromptGateError, ScoringError, ScriptedScorer, VersionStore,
};

fn config() -> EngineConfig {
    EngineConfig::default().with_scorer_timeout(Duration::from_secs(30))
}

#[tokio::test]
async fn rerun_replaces_the_stored_record() {
    let scorer = Arc::new(ScriptedScorer::new().with_scores("x", &[60.0, 80.0]));
    let gate = PromptGate::in_memory(scorer.clone(), &config());
    let v1 = gate.create_version("A", "x", None).await.unwrap().version;

    let first = gate.run_evaluation(&v1).await.unwrap();
    assert_eq!(first.average_score(), Some(70.0));

    scorer.set_scores("x", &[100.0]);
    let second = gate.run_evaluation(&v1).await.unwrap();
    assert_ne!(first.run_id, second.run_id);

    let stored = gate.score_of(&v1).await.unwrap().expect("stored record");
    assert_eq!(stored, second);
    assert_eq!(gate.scores().await.unwrap().get(&v1), Some(&100.0));
}

#[tokio::test]
async fn failed_run_keeps_the_previous_record() {
    let scorer = Arc::new(ScriptedScorer::new().with_scores("x", &[75.0]));
    let gate = PromptGate::in_memory(scorer.clone(), &config());
    let v1 = gate.create_version("A", "x", None).await.unwrap().version;
    let before = gate.run_evaluation(&v1).await.unwrap();

    scorer.set_failure("x", ScoringError::Unreachable("connection refused".into()));
    let err = gate.run_evaluation(&v1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Scoring);

    assert_eq!(gate.score_of(&v1).await.unwrap(), Some(before));
}

#[tokio::test]
async fn malformed_results_are_not_stored() {
    let scorer = ScriptedScorer::new()
        .with_results("x", vec![])
        .with_scores("y", &[50.0, 120.0]);
    let gate = PromptGate::in_memory(Arc::new(scorer), &config());
    let v1 = gate.create_version("A", "x", None).await.unwrap().version;
    let v2 = gate.create_version("B", "y", None).await.unwrap().version;

    for version in [&v1, &v2] {
        let err = gate.run_evaluation(version).await.unwrap_err();
        assert!(
            matches!(err, PromptGateError::Scoring(ScoringError::Malformed(_))),
            "{:?}",
            err
        );
        assert_eq!(gate.score_of(version).await.unwrap(), None);
    }
}

#[tokio::test]
async fn unknown_version_is_not_found() {
    let scorer = Arc::new(ScriptedScorer::new());
    let gate = PromptGate::in_memory(scorer.clone(), &config());

    let err = gate.run_evaluation(&"v7".into()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(scorer.calls(), 0);
}

#[tokio::test]
async fn updated_content_is_what_gets_scored() {
    let scorer = ScriptedScorer::new()
        .with_scores("draft", &[30.0])
        .with_scores("final", &[90.0]);
    let gate = PromptGate::in_memory(Arc::new(scorer), &config());
    let v1 = gate.create_version("A", "draft", None).await.unwrap().version;
    let stale = gate.run_evaluation(&v1).await.unwrap();

    let updated = gate.update_version(&v1, "A", "final").await.unwrap();
    assert!(!stale.is_current_for(&updated));

    let fresh = gate.run_evaluation(&v1).await.unwrap();
    assert_eq!(fresh.average_score(), Some(90.0));
    assert!(fresh.is_current_for(&updated));
}

#[tokio::test(start_paused = true)]
async fn slow_scorer_times_out() {
    let scorer = ScriptedScorer::new()
        .with_scores("x", &[90.0])
        .with_delay(Duration::from_secs(10));
    let config = EngineConfig::default().with_scorer_timeout(Duration::from_secs(2));
    let gate = PromptGate::in_memory(Arc::new(scorer), &config);
    let v1 = gate.create_version("A", "x", None).await.unwrap().version;

    let err = gate.run_evaluation(&v1).await.unwrap_err();
    assert!(matches!(
        err,
        PromptGateError::Scoring(ScoringError::TimedOut { after_ms: 2000 })
    ));
    assert_eq!(gate.score_of(&v1).await.unwrap(), None);
}

#[tokio::test]
async fn run_many_reports_each_version_in_order() {
    let scorer = ScriptedScorer::new()
        .with_scores("a", &[10.0])
        .with_failure("b", ScoringError::Malformed("bad body".into()))
        .with_scores("c", &[30.0]);
    let gate = PromptGate::in_memory(Arc::new(scorer), &config());
    let mut ids = Vec::new();
    for content in ["a", "b", "c"] {
        ids.push(gate.create_version("p", content, None).await.unwrap().version);
    }
    ids.push("missing".into());

    let runs = gate.run_many(&ids).await;
    let order: Vec<_> = runs.iter().map(|(v, _)| v.clone()).collect();
    assert_eq!(order, ids);
    assert!(runs[0].1.is_ok());
    assert_eq!(runs[1].1.as_ref().unwrap_err().kind(), ErrorKind::Scoring);
    assert!(runs[2].1.is_ok());
    assert_eq!(runs[3].1.as_ref().unwrap_err().kind(), ErrorKind::NotFound);
}

fn runner(scorer: ScriptedScorer) -> (VersionStore, EvaluationRunner) {
    let versions = VersionStore::new(Arc::new(MemoryPromptStore::new()));
    let runner = EvaluationRunner::new(
        versions.clone(),
        Arc::new(MemoryScoreStore::new()),
        Arc::new(scorer),
        Duration::from_secs(60),
    );
    (versions, runner)
}

#[tokio::test(start_paused = true)]
async fn runs_for_one_version_serialize() {
    let (versions, runner) =
        runner(ScriptedScorer::new().with_scores("x", &[50.0]).with_delay(Duration::from_secs(5)));
    let v1 = versions.create("A", "x", None).await.unwrap().version;

    let started = tokio::time::Instant::now();
    let (a, b) = tokio::join!(runner.run(&v1), runner.run(&v1));
    assert!(a.is_ok() && b.is_ok());
    assert!(started.elapsed() >= Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn runs_for_different_versions_overlap() {
    let (versions, runner) = runner(
        ScriptedScorer::new()
            .with_scores("x", &[50.0])
            .with_scores("y", &[60.0])
            .with_delay(Duration::from_secs(5)),
    );
    let v1 = versions.create("A", "x", None).await.unwrap().version;
    let v2 = versions.create("B", "y", None).await.unwrap().version;

    let started = tokio::time::Instant::now();
    let (a, b) = tokio::join!(runner.run(&v1), runner.run(&v2));
    assert!(a.is_ok() && b.is_ok());
    assert!(started.elapsed() < Duration::from_secs(10));
}

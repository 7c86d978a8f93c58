use std::sync::Arc;

use async_trait::async_trait;
use promptgate_core::{
    ActiveSlotRegistry, EngineConfig, ErrorKind, GateRejection, MemoryPromptStore,
    MemorySlotStore, PromptGate, PromptGateError, Result, ScoreBand, ScoreLookup, ScriptedScorer,
    SlotStore, VersionId, VersionStore,
};
use tokio::sync::Barrier;

fn gate(scorer: ScriptedScorer) -> PromptGate {
    PromptGate::in_memory(Arc::new(scorer), &EngineConfig::default())
}

fn scenario_scorer() -> ScriptedScorer {
    ScriptedScorer::new()
        .with_scores("x", &[90.0, 70.0, 50.0])
        .with_scores("y", &[95.0, 96.0])
        .with_scores("z", &[40.0, 45.0])
        .with_scores("w", &[80.0])
}

#[tokio::test]
async fn first_publish_then_improvement_then_regression() {
    let gate = gate(scenario_scorer());

    // Scenario A: first publish needs only a scored staging version.
    let v1 = gate.create_version("A", "x", None).await.unwrap().version;
    assert_eq!(v1, VersionId::from("v1"));
    let record = gate.run_evaluation(&v1).await.unwrap();
    assert_eq!(record.average_score(), Some(70.0));
    assert_eq!(record.summary.distribution.get(ScoreBand::Excellent), 1);
    assert_eq!(record.summary.distribution.get(ScoreBand::Good), 1);
    assert_eq!(record.summary.distribution.get(ScoreBand::Fair), 1);
    assert_eq!(record.summary.distribution.get(ScoreBand::Poor), 0);

    gate.set_staging(&v1).await.unwrap();
    let outcome = gate.publish(None).await.unwrap();
    assert_eq!(outcome.production, v1);
    assert_eq!(outcome.score, 70.0);
    assert_eq!(outcome.previous, None);

    // Scenario B: 95.5 > 70.0.
    let v2 = gate.create_version("B", "y", None).await.unwrap().version;
    assert_eq!(
        gate.run_evaluation(&v2).await.unwrap().average_score(),
        Some(95.5)
    );
    gate.set_staging(&v2).await.unwrap();
    let outcome = gate.publish(None).await.unwrap();
    assert_eq!(outcome.production, v2);
    assert_eq!(outcome.previous, Some(v1.clone()));

    // Scenario C: 42.5 < 95.5.
    let v3 = gate.create_version("C", "z", None).await.unwrap().version;
    gate.run_evaluation(&v3).await.unwrap();
    gate.set_staging(&v3).await.unwrap();
    let err = gate.publish(None).await.unwrap_err();
    match err.rejection() {
        Some(GateRejection::NoImprovement {
            staging,
            staging_score,
            production,
            production_score,
        }) => {
            assert_eq!(staging, &v3);
            assert_eq!(*staging_score, 42.5);
            assert_eq!(production, &v2);
            assert_eq!(*production_score, 95.5);
        }
        other => panic!("expected NoImprovement, got {:?}", other),
    }

    let slots = gate.active_slots().await.unwrap();
    assert_eq!(slots.production, Some(v2));
    assert_eq!(slots.staging, Some(v3));
}

#[tokio::test]
async fn publish_without_staging_is_rejected() {
    let gate = gate(scenario_scorer());
    let err = gate.publish(None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::GateRejected);
    assert_eq!(
        err.rejection().map(GateRejection::reason_code),
        Some("NoStagingSelected")
    );
}

#[tokio::test]
async fn unevaluated_staging_is_rejected() {
    let gate = gate(scenario_scorer());
    let v1 = gate.create_version("A", "x", None).await.unwrap().version;
    gate.set_staging(&v1).await.unwrap();

    let err = gate.publish(None).await.unwrap_err();
    assert_eq!(
        err.rejection(),
        Some(&GateRejection::NotEvaluated { version: v1 })
    );
    assert_eq!(gate.active_slots().await.unwrap().production, None);
}

#[tokio::test]
async fn set_staging_unknown_version_is_not_found() {
    let gate = gate(scenario_scorer());
    let v1 = gate.create_version("A", "x", None).await.unwrap().version;
    gate.set_staging(&v1).await.unwrap();

    let err = gate.set_staging(&"v404".into()).await.unwrap_err();
    assert!(matches!(err, PromptGateError::VersionNotFound(ref v) if v.as_str() == "v404"));
    assert_eq!(gate.active_slots().await.unwrap().staging, Some(v1));
}

#[tokio::test]
async fn stale_expected_staging_does_not_publish() {
    let gate = gate(scenario_scorer());
    let v1 = gate.create_version("A", "x", None).await.unwrap().version;
    let v2 = gate.create_version("B", "y", None).await.unwrap().version;
    gate.run_many(&[v1.clone(), v2.clone()]).await;

    gate.set_staging(&v2).await.unwrap();
    let err = gate.publish(Some(&v1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConcurrentModification);
    assert_eq!(gate.active_slots().await.unwrap().production, None);

    let outcome = gate.publish(Some(&v2)).await.unwrap();
    assert_eq!(outcome.production, v2);
}

/// Scenario D on one engine: task A publishes the staged v2 while task B
/// restages v3 and publishes it. Exactly one commit happens.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_publishes_commit_exactly_once() {
    for _ in 0..20 {
        let gate = Arc::new(gate(scenario_scorer()));
        let v1 = gate.create_version("A", "x", None).await.unwrap().version;
        let v2 = gate.create_version("B", "y", None).await.unwrap().version;
        let v3 = gate.create_version("D", "w", None).await.unwrap().version;
        gate.run_many(&[v1.clone(), v2.clone(), v3.clone()]).await;

        gate.set_staging(&v1).await.unwrap();
        gate.publish(None).await.unwrap();
        gate.set_staging(&v2).await.unwrap();

        let a = {
            let gate = gate.clone();
            let v2 = v2.clone();
            tokio::spawn(async move { gate.publish(Some(&v2)).await })
        };
        let b = {
            let gate = gate.clone();
            let v3 = v3.clone();
            tokio::spawn(async move {
                gate.set_staging(&v3).await?;
                gate.publish(Some(&v3)).await
            })
        };
        let results = [a.await.unwrap(), b.await.unwrap()];

        let committed: Vec<VersionId> = results
            .iter()
            .filter_map(|r| r.as_ref().ok().map(|o| o.production.clone()))
            .collect();
        assert_eq!(committed.len(), 1, "results: {:?}", results);

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                matches!(
                    err.kind(),
                    ErrorKind::GateRejected | ErrorKind::ConcurrentModification
                ),
                "unexpected error {:?}",
                err
            );
            if let Some(rejection) = err.rejection() {
                assert_eq!(rejection.reason_code(), "NoImprovement");
            }
        }

        let production = gate.active_slots().await.unwrap().production;
        assert_eq!(production.as_ref(), committed.first());
    }
}

/// Holds every publish at the staging score lookup until both publishes
/// have read the slots.
struct RendezvousScores {
    barrier: Barrier,
    staging: VersionId,
}

#[async_trait]
impl ScoreLookup for RendezvousScores {
    async fn average_score(&self, version: &VersionId) -> Result<Option<f64>> {
        if version == &self.staging {
            self.barrier.wait().await;
            return Ok(Some(90.0));
        }
        Ok(Some(50.0))
    }
}

#[tokio::test]
async fn registries_sharing_a_store_are_kept_apart_by_compare_and_set() {
    let versions = VersionStore::new(Arc::new(MemoryPromptStore::new()));
    let v1 = versions.create("A", "x", None).await.unwrap().version;
    let v2 = versions.create("B", "y", None).await.unwrap().version;
    let slots: Arc<dyn SlotStore> = Arc::new(MemorySlotStore::new());
    slots.compare_and_set_production(None, v1.clone()).await.unwrap();

    let first = ActiveSlotRegistry::new(versions.clone(), slots.clone());
    let second = ActiveSlotRegistry::new(versions.clone(), slots.clone());
    first.set_staging(&v2).await.unwrap();

    let scores = RendezvousScores {
        barrier: Barrier::new(2),
        staging: v2.clone(),
    };
    let (a, b) = tokio::join!(first.publish(&scores, None), second.publish(&scores, None));

    let (ok, err) = match (a, b) {
        (Ok(ok), Err(err)) | (Err(err), Ok(ok)) => (ok, err),
        other => panic!("expected one commit and one failure, got {:?}", other),
    };
    assert_eq!(ok.production, v2);
    assert_eq!(ok.previous, Some(v1));
    assert_eq!(err.kind(), ErrorKind::ConcurrentModification);
    assert_eq!(slots.slots().await.unwrap().production, Some(v2));
}

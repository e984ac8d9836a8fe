//! Label store persistence and end-to-end recording through the answer
//! service.

mod common;

use std::sync::Arc;
use tempfile::TempDir;

use common::{orchestrator, FixedGatingModel, ScriptedLm, ScriptedScorer, StaticIndex};
use janus::application::{AnswerRequest, AnswerService};
use janus::domain::models::{ActionKind, Config, Query, ResolutionRecord};
use janus::domain::ports::LabelStore;
use janus::infrastructure::database::{DatabaseConnection, SqliteLabelStore};
use janus::infrastructure::gating::HeuristicGatingModel;

async fn open_store(dir: &TempDir) -> (DatabaseConnection, SqliteLabelStore) {
    let db = DatabaseConnection::open(dir.path().join("labels.db"), 2)
        .await
        .expect("Failed to open database");
    db.migrate().await.expect("Failed to run migrations");
    let store = SqliteLabelStore::new(db.pool().clone());
    (db, store)
}

async fn resolved_record(text: &str, model: Arc<dyn janus::GatingModel>) -> ResolutionRecord {
    let config = Config::default();
    let orchestrator = orchestrator(
        &config,
        model,
        ScriptedLm::replying("An answer."),
        StaticIndex::fresh(),
        ScriptedScorer::always(0.9, 0.9),
    );
    let query = Query::new(text);
    let resolution = orchestrator
        .resolve(&query, common::budget(&query, &config))
        .await
        .expect("resolution should succeed");
    ResolutionRecord::from(&resolution)
}

#[tokio::test]
async fn test_record_and_list_recent() {
    let dir = TempDir::new().unwrap();
    let (db, store) = open_store(&dir).await;

    let first = resolved_record(
        "Who wrote Don Quixote?",
        FixedGatingModel::new(&[(ActionKind::Parametric, 0.9)]),
    )
    .await;
    let second = resolved_record("is it this one?", Arc::new(HeuristicGatingModel::new())).await;

    store.record(&first).await.unwrap();
    store.record(&second).await.unwrap();

    let records = store.list_recent(10).await.unwrap();
    assert_eq!(records.len(), 2);
    let ids: Vec<_> = records.iter().map(|r| r.query_id).collect();
    assert!(ids.contains(&first.query_id));
    assert!(ids.contains(&second.query_id));

    let limited = store.list_recent(1).await.unwrap();
    assert_eq!(limited.len(), 1);

    let stored = records
        .iter()
        .find(|r| r.query_id == first.query_id)
        .unwrap();
    assert_eq!(stored.outcome, "accepted");
    assert_eq!(stored.final_action.as_deref(), Some("parametric"));
    assert_eq!(stored.trace.len(), first.trace.len());

    db.close().await;
}

#[tokio::test]
async fn test_recording_twice_replaces() {
    let dir = TempDir::new().unwrap();
    let (db, store) = open_store(&dir).await;

    let record = resolved_record(
        "Who wrote Don Quixote?",
        FixedGatingModel::new(&[(ActionKind::Parametric, 0.9)]),
    )
    .await;
    store.record(&record).await.unwrap();
    store.record(&record).await.unwrap();

    assert_eq!(store.list_recent(10).await.unwrap().len(), 1);
    db.close().await;
}

#[tokio::test]
async fn test_count_by_outcome() {
    let dir = TempDir::new().unwrap();
    let (db, store) = open_store(&dir).await;

    let parametric = FixedGatingModel::new(&[(ActionKind::Parametric, 0.9)]);
    let escalate = FixedGatingModel::new(&[(ActionKind::Escalate, 0.9)]);
    for text in ["Who wrote Hamlet?", "What is the capital of France?"] {
        store
            .record(&resolved_record(text, parametric.clone()).await)
            .await
            .unwrap();
    }
    store
        .record(&resolved_record("Who painted the Mona Lisa?", escalate).await)
        .await
        .unwrap();

    let counts = store.count_by_outcome().await.unwrap();
    assert_eq!(
        counts,
        vec![("accepted".to_string(), 2), ("escalated".to_string(), 1)]
    );
    db.close().await;
}

#[tokio::test]
async fn test_answer_service_records_each_resolution() {
    let dir = TempDir::new().unwrap();
    let (db, store) = open_store(&dir).await;
    let config = Config::default();

    let service = AnswerService::new(
        orchestrator(
            &config,
            FixedGatingModel::new(&[(ActionKind::Parametric, 0.9)]),
            ScriptedLm::replying("Miguel de Cervantes."),
            StaticIndex::empty(),
            ScriptedScorer::always(0.95, 0.9),
        ),
        Arc::new(store.clone()),
        &config,
    );

    let answer = service
        .answer(AnswerRequest::new("Who wrote Don Quixote?"))
        .await
        .unwrap();
    assert!(answer.is_accepted());
    assert_eq!(answer.display_text(), "Miguel de Cervantes.");

    let records = store.list_recent(5).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].query_text, "Who wrote Don Quixote?");
    assert_eq!(records[0].final_answer, answer);
    db.close().await;
}

#[tokio::test]
async fn test_answer_service_survives_store_failure() {
    let dir = TempDir::new().unwrap();
    let (db, store) = open_store(&dir).await;
    let config = Config::default();
    db.close().await;

    let service = AnswerService::new(
        orchestrator(
            &config,
            FixedGatingModel::new(&[(ActionKind::Parametric, 0.9)]),
            ScriptedLm::replying("Miguel de Cervantes."),
            StaticIndex::empty(),
            ScriptedScorer::always(0.95, 0.9),
        ),
        Arc::new(store),
        &config,
    );

    let answer = service
        .answer(AnswerRequest::new("Who wrote Don Quixote?"))
        .await
        .unwrap();
    assert!(answer.is_accepted());
}

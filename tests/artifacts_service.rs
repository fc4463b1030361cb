mod support;

use std::sync::Arc;

use oracle::application::artifacts::{
    ArtifactServiceError, CreateArtifactCommand, CreateChoiceCommand,
};
use oracle::application::history::HistoryServiceError;
use oracle::application::paging::ArtifactListQuery;
use oracle::application::repos::{ArtifactQueryFilter, UserHistoryRepo};
use oracle::application::resolver::{ArtifactView, ReferenceField};
use oracle::cache::{ViewCache, ViewKey};
use oracle::domain::references::ReferenceKind;
use oracle::domain::types::ArtifactType;

use support::{InMemoryStore, UnavailableViewCache, harness, harness_with_backend};

fn query(depth: u32) -> ArtifactListQuery {
    ArtifactListQuery {
        depth,
        ..Default::default()
    }
}

#[tokio::test]
async fn listing_twice_hits_the_cache() {
    let store = InMemoryStore::new();
    store.insert(ArtifactType::Text, "intro").await;
    let app = harness(store.clone(), true);

    let first = app.artifacts.list(&query(0)).await.unwrap();
    let second = app.artifacts.list(&query(0)).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.calls.lists(), 1);
}

#[tokio::test]
async fn each_depth_is_cached_separately() {
    let store = InMemoryStore::new();
    store.insert(ArtifactType::Text, "intro").await;
    let app = harness(store.clone(), true);

    app.artifacts.list(&query(0)).await.unwrap();
    app.artifacts.list(&query(1)).await.unwrap();
    app.artifacts.list(&query(1)).await.unwrap();

    assert_eq!(store.calls.lists(), 2);
    assert_eq!(app.views.as_ref().unwrap().len(), 2);
}

#[tokio::test]
async fn create_invalidates_every_cached_depth() {
    let store = InMemoryStore::new();
    store.insert(ArtifactType::Text, "intro").await;
    let app = harness(store.clone(), true);
    let views = app.views.clone().unwrap();

    for depth in 0..3 {
        app.artifacts.list(&query(depth)).await.unwrap();
    }
    assert_eq!(views.len(), 3);

    app.artifacts
        .create(CreateArtifactCommand::new(ArtifactType::Text, "fresh"))
        .await
        .unwrap();

    for depth in 0..3 {
        assert!(views.get(&ViewKey::artifacts(depth)).await.unwrap().is_none());
    }

    let page = app.artifacts.list(&query(0)).await.unwrap();
    assert_eq!(page.data.len(), 2);
}

#[tokio::test]
async fn cached_and_uncached_paths_agree() {
    let store = InMemoryStore::new();
    let root = store.insert(ArtifactType::Question, "Ownership").await;
    let answer = store.insert(ArtifactType::Answer, "Moves").await;
    let old = store.insert(ArtifactType::Text, "Legacy").await;
    store.deprecate(old.id).await;
    store.link(ReferenceKind::Answers, &root, &answer, None).await;

    let cached = harness(store.clone(), true);
    let uncached = harness(store.clone(), false);

    let queries = [
        query(1),
        ArtifactListQuery {
            depth: 0,
            show_deprecated: true,
            ..Default::default()
        },
        ArtifactListQuery {
            depth: 0,
            filter: ArtifactQueryFilter {
                artifact_type: Some(ArtifactType::Answer),
                ..Default::default()
            },
            ..Default::default()
        },
        ArtifactListQuery {
            depth: 0,
            limit: Some(1),
            offset: Some(1),
            ..Default::default()
        },
    ];

    for query in &queries {
        let from_cache = cached.artifacts.list(query).await.unwrap();
        let from_store = uncached.artifacts.list(query).await.unwrap();
        assert_eq!(from_cache, from_store, "query {query:?}");
    }
}

#[tokio::test]
async fn deprecated_artifacts_are_hidden_by_default() {
    let store = InMemoryStore::new();
    let kept = store.insert(ArtifactType::Text, "kept").await;
    let old = store.insert(ArtifactType::Text, "old").await;
    store.deprecate(old.id).await;
    let app = harness(store, true);

    let page = app.artifacts.list(&query(0)).await.unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].guid, kept.guid);
}

fn nesting(view: &ArtifactView) -> usize {
    match &view.artifacts {
        ReferenceField::Nested(children) => children.first().map_or(1, |child| 1 + nesting(child)),
        ReferenceField::Leaf(_) => 0,
    }
}

#[tokio::test]
async fn depth_beyond_the_limit_is_rejected() {
    let store = InMemoryStore::new();
    let mut chain = Vec::new();
    for n in 0..13 {
        chain.push(store.insert(ArtifactType::Text, &format!("step {n}")).await);
    }
    for pair in chain.windows(2) {
        store.link(ReferenceKind::Children, &pair[0], &pair[1], Some(0)).await;
    }
    let app = harness(store, true);
    let root = chain[0].guid;

    let page = app.artifacts.list(&query(8)).await.unwrap();
    let view = page.data.iter().find(|view| view.guid == root).unwrap();
    assert_eq!(nesting(view), 8);

    let err = app.artifacts.list(&query(10)).await.unwrap_err();
    assert!(matches!(
        err,
        ArtifactServiceError::DepthLimitExceeded {
            requested: 10,
            limit: 8
        }
    ));
    let err = app.artifacts.get(&root.to_string(), 9).await.unwrap_err();
    assert!(matches!(
        err,
        ArtifactServiceError::DepthLimitExceeded { requested: 9, .. }
    ));

    let views = app.views.as_ref().unwrap();
    assert!(views.get(&ViewKey::artifacts(10)).await.unwrap().is_none());
    assert_eq!(views.len(), 1);
}

#[tokio::test]
async fn unavailable_cache_backend_falls_back_to_the_store() {
    let store = InMemoryStore::new();
    store.insert(ArtifactType::Text, "intro").await;
    let app = harness_with_backend(store.clone(), Arc::new(UnavailableViewCache));

    for _ in 0..2 {
        let page = app.artifacts.list(&query(1)).await.unwrap();
        assert_eq!(page.data.len(), 1);
    }
    assert_eq!(store.calls.lists(), 2);

    let guid = app
        .artifacts
        .create(CreateArtifactCommand::new(ArtifactType::Text, "more"))
        .await
        .unwrap();
    assert_eq!(store.artifact_count().await, 2);

    let page = app.artifacts.list(&query(0)).await.unwrap();
    assert!(page.data.iter().any(|view| view.guid == guid));
}

#[tokio::test]
async fn dangling_reference_leaves_store_unchanged() {
    let store = InMemoryStore::new();
    let known = store.insert(ArtifactType::Text, "known").await;
    let app = harness(store.clone(), true);
    let missing = uuid::Uuid::new_v4().to_string();

    let mut command = CreateArtifactCommand::new(ArtifactType::Text, "bad");
    command.artifacts = vec![known.guid.to_string(), missing.clone()];

    let err = app.artifacts.create(command).await.unwrap_err();
    match err {
        ArtifactServiceError::ReferenceNotFound(guid) => assert_eq!(guid, missing),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.artifact_count().await, 1);
    assert_eq!(store.edge_count().await, 0);
}

#[tokio::test]
async fn malformed_reference_is_reported_verbatim() {
    let store = InMemoryStore::new();
    let app = harness(store, false);

    let mut command = CreateArtifactCommand::new(ArtifactType::Navigational, "menu");
    command.choices = vec![CreateChoiceCommand {
        title: "Next".to_string(),
        order: 0,
        artifact_id: Some("not-a-guid".to_string()),
    }];

    let err = app.artifacts.create(command).await.unwrap_err();
    assert!(err.to_string().contains("not-a-guid"));
}

#[tokio::test]
async fn create_persists_ordered_children_and_choices() {
    let store = InMemoryStore::new();
    let b = store.insert(ArtifactType::Text, "B").await;
    let c = store.insert(ArtifactType::Text, "C").await;
    let app = harness(store, true);

    let mut command = CreateArtifactCommand::new(ArtifactType::Navigational, "menu");
    command.artifacts = vec![c.guid.to_string(), b.guid.to_string()];
    command.choices = vec![CreateChoiceCommand {
        title: "Go to B".to_string(),
        order: 0,
        artifact_id: Some(b.guid.to_string()),
    }];
    command.topics = vec![" loops ".to_string(), "loops".to_string()];

    let guid = app.artifacts.create(command).await.unwrap();
    let view = app.artifacts.get(&guid.to_string(), 0).await.unwrap();

    assert_eq!(view.artifacts, ReferenceField::Leaf(vec![c.guid, b.guid]));
    assert_eq!(view.choices.len(), 1);
    assert_eq!(view.choices[0].artifact_id, Some(b.guid));
    assert_eq!(view.topics, vec!["loops".to_string()]);
}

#[tokio::test]
async fn blank_content_is_rejected() {
    let store = InMemoryStore::new();
    let app = harness(store.clone(), false);

    let err = app
        .artifacts
        .create(CreateArtifactCommand::new(ArtifactType::Text, "   "))
        .await
        .unwrap_err();
    assert!(matches!(err, ArtifactServiceError::Domain(_)));
    assert_eq!(store.artifact_count().await, 0);
}

#[tokio::test]
async fn store_constraint_failures_are_classified() {
    let store = InMemoryStore::new();
    store.fail_writes(true);
    let app = harness(store, false);

    let err = app
        .artifacts
        .create(CreateArtifactCommand::new(ArtifactType::Text, "body"))
        .await
        .unwrap_err();
    assert!(matches!(err, ArtifactServiceError::ConstraintViolation(_)));
}

#[tokio::test]
async fn unknown_single_artifact_is_not_found() {
    let app = harness(InMemoryStore::new(), false);

    let missing = uuid::Uuid::new_v4().to_string();
    assert!(matches!(
        app.artifacts.get(&missing, 0).await,
        Err(ArtifactServiceError::NotFound)
    ));
    assert!(matches!(
        app.artifacts.get("garbage", 0).await,
        Err(ArtifactServiceError::NotFound)
    ));
}

#[tokio::test]
async fn history_update_links_the_response() {
    let store = InMemoryStore::new();
    let artifact = store.insert(ArtifactType::ProgrammingExercise, "fizzbuzz").await;
    let history = store.add_history(&artifact).await;
    let response = store.add_feedback_response().await;
    let app = harness(store.clone(), true);
    let views = app.views.clone().unwrap();
    for depth in 0..2 {
        app.artifacts.list(&query(depth)).await.unwrap();
    }
    assert_eq!(views.len(), 2);

    for _ in 0..2 {
        app.history
            .update_history(history.id, &response.guid.to_string())
            .await
            .unwrap();
    }

    let stored = store.find_history(history.id).await.unwrap().unwrap();
    assert_eq!(stored.coding_feedback_response_id, Some(response.id));
    assert!(views.is_empty());
}

#[tokio::test]
async fn history_update_with_unknown_response_changes_nothing() {
    let store = InMemoryStore::new();
    let artifact = store.insert(ArtifactType::ProgrammingExercise, "fizzbuzz").await;
    let history = store.add_history(&artifact).await;
    let app = harness(store.clone(), true);

    let err = app
        .history
        .update_history(history.id, &uuid::Uuid::new_v4().to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, HistoryServiceError::FeedbackResponseNotFound(_)));

    let stored = store.find_history(history.id).await.unwrap().unwrap();
    assert_eq!(stored.coding_feedback_response_id, None);
}

#[tokio::test]
async fn history_update_with_unknown_row_is_not_found() {
    let store = InMemoryStore::new();
    let response = store.add_feedback_response().await;
    let app = harness(store, false);

    let err = app
        .history
        .update_history(9999, &response.guid.to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, HistoryServiceError::HistoryNotFound(9999)));
    assert!(err.is_not_found());
}

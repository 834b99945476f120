//! Integration tests for file records, attachments and wiki provisioning.

mod common;

use assert_matches::assert_matches;
use common::{file, page, setup, WIKI};
use wikifeat_core::error::CoreError;
use wikifeat_core::hashing::attachment_digest;
use wikifeat_core::pagination::Pagination;
use wikifeat_db::{MemoryStore, StoreError};
use wikifeat_wikis::{provision, WikiError};

// ---------------------------------------------------------------------------
// Records and attachments
// ---------------------------------------------------------------------------

#[tokio::test]
async fn record_with_attachment_round_trip() {
    let (_, engine) = setup().await;

    let rev = engine
        .files
        .save_record(WIKI, file("logo.png"), "f1", "", "ann")
        .await
        .unwrap();
    let rev = engine
        .files
        .save_attachment(WIKI, "f1", &rev, "logo.png", "image/png", vec![1, 2, 3, 4])
        .await
        .unwrap();

    let (record, current_rev) = engine.files.read_record(WIKI, "f1").await.unwrap();
    assert_eq!(current_rev, rev);
    assert_eq!(record.id, "f1");
    assert_eq!(record.uploaded_by, "ann");
    let info = &record.attachments["logo.png"];
    assert_eq!(info.content_type, "image/png");
    assert_eq!(info.length, 4);
    assert_eq!(info.digest, attachment_digest(&[1, 2, 3, 4]));

    let data = engine
        .files
        .get_attachment(WIKI, "f1", Some(&rev), "logo.png")
        .await
        .unwrap();
    assert_eq!(data.content_type, "image/png");
    assert_eq!(data.data, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn metadata_update_keeps_attachments() {
    let (_, engine) = setup().await;
    let rev = engine
        .files
        .save_record(WIKI, file("notes.txt"), "f1", "", "ann")
        .await
        .unwrap();
    let rev = engine
        .files
        .save_attachment(WIKI, "f1", &rev, "notes.txt", "text/plain", b"hello".to_vec())
        .await
        .unwrap();

    let mut edited = file("notes.txt");
    edited.description = "meeting notes".into();
    engine
        .files
        .save_record(WIKI, edited, "f1", &rev, "bob")
        .await
        .unwrap();

    let (record, _) = engine.files.read_record(WIKI, "f1").await.unwrap();
    assert_eq!(record.description, "meeting notes");
    assert_eq!(record.uploaded_by, "bob");
    let data = engine
        .files
        .get_attachment(WIKI, "f1", None, "notes.txt")
        .await
        .unwrap();
    assert_eq!(data.data, b"hello".to_vec());
}

#[tokio::test]
async fn attachment_requires_current_revision() {
    let (_, engine) = setup().await;
    let rev = engine
        .files
        .save_record(WIKI, file("a.txt"), "f1", "", "ann")
        .await
        .unwrap();
    engine
        .files
        .save_attachment(WIKI, "f1", &rev, "a.txt", "text/plain", b"1".to_vec())
        .await
        .unwrap();

    let stale = engine
        .files
        .save_attachment(WIKI, "f1", &rev, "a.txt", "text/plain", b"2".to_vec())
        .await;
    assert_matches!(stale, Err(WikiError::Core(CoreError::Conflict(_))));
}

#[tokio::test]
async fn delete_attachment_then_record() {
    let (_, engine) = setup().await;
    let rev = engine
        .files
        .save_record(WIKI, file("a.txt"), "f1", "", "ann")
        .await
        .unwrap();
    let rev = engine
        .files
        .save_attachment(WIKI, "f1", &rev, "a.txt", "text/plain", b"1".to_vec())
        .await
        .unwrap();

    engine
        .files
        .delete_attachment(WIKI, "f1", &rev, "a.txt")
        .await
        .unwrap();
    assert_matches!(
        engine.files.get_attachment(WIKI, "f1", None, "a.txt").await,
        Err(WikiError::Core(CoreError::NotFound { entity: "attachment", .. }))
    );

    engine.files.delete_record(WIKI, "f1").await.unwrap();
    assert_matches!(
        engine.files.read_record(WIKI, "f1").await,
        Err(WikiError::Core(CoreError::NotFound { entity: "file", .. }))
    );
}

#[tokio::test]
async fn record_requires_name() {
    let (_, engine) = setup().await;
    let result = engine
        .files
        .save_record(WIKI, file(""), "f1", "", "ann")
        .await;
    assert_matches!(result, Err(WikiError::Core(CoreError::Validation(_))));
}

// ---------------------------------------------------------------------------
// Indexes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn file_and_image_indexes() {
    let (_, engine) = setup().await;
    for (id, name, mime) in [
        ("f1", "b-photo.jpg", "image/jpeg"),
        ("f2", "a-report.pdf", "application/pdf"),
        ("f3", "c-diagram.png", "image/png"),
    ] {
        let rev = engine
            .files
            .save_record(WIKI, file(name), id, "", "ann")
            .await
            .unwrap();
        engine
            .files
            .save_attachment(WIKI, id, &rev, name, mime, vec![0; 8])
            .await
            .unwrap();
    }
    engine
        .files
        .save_record(WIKI, file("d-empty"), "f4", "", "ann")
        .await
        .unwrap();

    let all = engine
        .files
        .index(WIKI, Pagination::unbounded())
        .await
        .unwrap();
    assert_eq!(all.total_rows, 4);
    let names: Vec<&str> = all.rows.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["a-report.pdf", "b-photo.jpg", "c-diagram.png", "d-empty"]);

    let images = engine
        .files
        .image_index(WIKI, Pagination::unbounded())
        .await
        .unwrap();
    assert_eq!(images.total_rows, 2);
    let ids: Vec<&str> = images.rows.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["f1", "f3"]);
    assert!(images.rows.iter().all(|f| f.has_image()));

    let paged = engine
        .files
        .index(WIKI, Pagination::new(2, 3))
        .await
        .unwrap();
    assert_eq!(paged.total_rows, 4);
    assert_eq!(paged.rows.len(), 1);
}

// ---------------------------------------------------------------------------
// Provisioning
// ---------------------------------------------------------------------------

#[tokio::test]
async fn provisioning_twice_conflicts() {
    let store = MemoryStore::new();
    provision::create_wiki(&store, "w1").await.unwrap();
    assert_matches!(
        provision::create_wiki(&store, "w1").await,
        Err(WikiError::Core(CoreError::Conflict(_)))
    );
}

#[tokio::test]
async fn deleted_wiki_rejects_writes() {
    let (store, engine) = setup().await;
    provision::delete_wiki(store.as_ref(), WIKI).await.unwrap();

    let result = engine.pages.create(WIKI, page("Home", "x"), "p1", "joe").await;
    assert_matches!(result, Err(WikiError::Store(StoreError::NotFound(_))));
    assert_eq!(result.unwrap_err().status_code(), 404);
}

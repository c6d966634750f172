use crate::{
    notify::LogNotifier,
    session::{ReviewSession, SessionState},
    store::{self, BlobStore, sqlite::SqliteStore},
};

use super::{BASE, UPDATED, category, edits, fixture, options};

#[tokio::test]
async fn sqlite_store_round_trip() {
    let store = SqliteStore::open("sqlite::memory:").await.unwrap();
    assert_eq!(store.get(BASE).await.unwrap(), None);
    assert!(
        store::load_dataset_or_empty(&store, BASE)
            .await
            .unwrap()
            .is_empty()
    );

    let body = fixture().await;
    store.put(BASE, body.clone().into()).await.unwrap();
    assert_eq!(store.get(BASE).await.unwrap().as_deref(), Some(body.as_slice()));

    let dataset = store::load_dataset(&store, BASE).await.unwrap().unwrap();
    assert_eq!(dataset.len(), 11);
    assert_eq!(
        dataset.header().last().map(String::as_str),
        Some("desc (product.metafields.custom.desc)")
    );

    store::save_dataset(&store, "copy.csv", &dataset).await.unwrap();
    assert_eq!(store.get("copy.csv").await.unwrap().as_deref(), Some(body.as_slice()));
}

#[tokio::test]
async fn session_over_sqlite_store() {
    let store = SqliteStore::open("sqlite::memory:").await.unwrap();
    store.put(BASE, fixture().await.into()).await.unwrap();
    let mut session = ReviewSession::open(
        &store,
        LogNotifier,
        "wedding",
        category(),
        Default::default(),
        options(3),
        SessionState::default(),
    )
    .await
    .unwrap();
    session
        .submit(edits(&[("kanjivaram-gold", "kg-1.jpg", "Temple border in gold.")]))
        .await
        .unwrap();
    assert_eq!(
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blob")
            .fetch_one(store.pool())
            .await
            .unwrap(),
        2
    );
    let updated = store::load_dataset(&store, UPDATED).await.unwrap().unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated.rows()[0].text("Body (HTML)"), "Temple border in gold.");
}

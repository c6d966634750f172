use std::sync::atomic::Ordering;

use crate::{
    ErrorDetail,
    config::MergeMode,
    notify::LogNotifier,
    record::{Dataset, RecordKey},
    session::{ReviewSession, SessionState},
    store::{self, StoreError, memory::MemoryStore},
};

use super::{
    BASE, FailingNotifier, FlakyStore, RecordingNotifier, UPDATED, category, edits, options,
    seeded_store,
};

fn handles(session: &ReviewSession<MemoryStore, LogNotifier>) -> Vec<String> {
    session
        .page()
        .into_iter()
        .map(|entry| entry.key.handle)
        .collect()
}

#[tokio::test]
async fn resumes_with_pending_rows_first() {
    let store = seeded_store().await;
    let mut session = ReviewSession::open(
        store.clone(),
        LogNotifier,
        "wedding",
        category(),
        Default::default(),
        options(5),
        SessionState::default(),
    )
    .await
    .unwrap();
    assert_eq!(session.eligible().len(), 7);
    assert_eq!(session.cursor().next_slice(), 0..5);
    assert_eq!(
        handles(&session),
        [
            "banarasi-red",
            "kanjivaram-gold",
            "paithani-green",
            "chanderi-pink",
            "bandhani-maroon"
        ]
    );

    let outcome = session
        .submit(edits(&[
            ("banarasi-red", "br-1.jpg", "A regal red Banarasi drape."),
            ("kanjivaram-gold", "kg-1.jpg", ""),
            ("paithani-green", "pg-1.jpg", "Peacock motifs on green silk."),
            ("chanderi-pink", "cp-1.jpg", "   "),
            ("bandhani-maroon", "bm-1.jpg", "Tie-dyed maroon georgette."),
        ]))
        .await
        .unwrap();
    assert_eq!(
        outcome.touched.iter().collect::<Vec<_>>(),
        ["banarasi-red", "paithani-green", "bandhani-maroon"]
    );
    assert!(!outcome.wrapped);
    assert_eq!(session.cursor().offset(), 5);
    assert_eq!(handles(&session), ["patola-blue", "organza-ivory"]);

    let updated = store::load_dataset(&store, UPDATED).await.unwrap().unwrap();
    assert_eq!(updated.len(), 3);
    for row in updated.rows() {
        assert_eq!(row.text("edited"), "True");
        assert_eq!(row.text("SEO Description"), row.text("Body (HTML)"));
        assert_eq!(
            row.text("SEO Description"),
            row.text("desc (product.metafields.custom.desc)")
        );
    }
    assert_eq!(
        updated.rows()[1].text("SEO Description"),
        "Peacock motifs on green silk."
    );

    // carried offset 5 no longer fits the four remaining rows
    let state = session.into_state();
    assert_eq!(state.offset("wedding"), 5);
    let session = ReviewSession::open(
        store.clone(),
        LogNotifier,
        "wedding",
        category(),
        Default::default(),
        options(5),
        state,
    )
    .await
    .unwrap();
    assert_eq!(session.cursor().offset(), 0);
    assert_eq!(
        handles(&session),
        [
            "kanjivaram-gold",
            "chanderi-pink",
            "patola-blue",
            "organza-ivory"
        ]
    );
}

#[tokio::test]
async fn completion_reaches_sibling_rows_on_reload() {
    let store = seeded_store().await;
    let mut session = ReviewSession::open(
        store.clone(),
        LogNotifier,
        "wedding",
        category(),
        Default::default(),
        options(5),
        SessionState::default(),
    )
    .await
    .unwrap();
    session
        .submit(edits(&[("paithani-green", "pg-1.jpg", "Green silk.")]))
        .await
        .unwrap();
    let columns = Default::default();
    // only the edited row is marked in memory and in the log
    assert!(session.base().rows()[3].is_done(&columns));
    assert!(!session.base().rows()[4].is_done(&columns));
    assert_eq!(session.updated().len(), 1);

    let reloaded = ReviewSession::open(
        store,
        LogNotifier,
        "wedding",
        category(),
        Default::default(),
        options(5),
        SessionState::default(),
    )
    .await
    .unwrap();
    for position in 3..=5 {
        assert!(reloaded.base().rows()[position].is_done(&columns));
    }
    assert!(!reloaded.base().rows()[2].is_done(&columns));
    assert_eq!(reloaded.summary().done_products, 1);
    assert_eq!(reloaded.summary().products, 8);
}

#[tokio::test]
async fn blank_batch_writes_nothing() {
    let store = seeded_store().await;
    let mut session = ReviewSession::open(
        store.clone(),
        LogNotifier,
        "wedding",
        category(),
        Default::default(),
        options(2),
        SessionState::default(),
    )
    .await
    .unwrap();
    let before = session.base().clone();
    let outcome = session
        .submit(edits(&[
            ("banarasi-red", "br-1.jpg", " \t"),
            ("kanjivaram-gold", "kg-1.jpg", ""),
        ]))
        .await
        .unwrap();
    assert!(outcome.touched.is_empty());
    assert_eq!(session.base(), &before);
    assert_eq!(store.text(UPDATED).await, None);
    assert_eq!(session.cursor().offset(), 2);
}

#[tokio::test]
async fn absent_log_reads_as_empty() {
    let store = seeded_store().await;
    let session = ReviewSession::open(
        store,
        LogNotifier,
        "wedding",
        category(),
        Default::default(),
        options(5),
        SessionState::default(),
    )
    .await
    .unwrap();
    assert!(session.updated().is_empty());
    assert_eq!(session.summary().done_products, 0);
}

#[tokio::test]
async fn missing_required_column_fails() {
    let store = MemoryStore::new();
    store
        .insert(BASE, "Handle,Image Src,Title\nred,r.jpg,Red\n")
        .await;
    let result = ReviewSession::open(
        store,
        LogNotifier,
        "wedding",
        category(),
        Default::default(),
        options(5),
        SessionState::default(),
    )
    .await;
    let Err(StoreError::Dataset(error)) = result else {
        panic!("expected a dataset error");
    };
    assert_eq!(error.context.blob, BASE);
    assert!(matches!(
        &*error.detail,
        ErrorDetail::MissingColumns(missing) if missing == &["desc".to_owned()]
    ));
}

#[tokio::test]
async fn missing_base_fails_as_schema_error() {
    let result = ReviewSession::open(
        MemoryStore::new(),
        LogNotifier,
        "wedding",
        category(),
        Default::default(),
        options(5),
        SessionState::default(),
    )
    .await;
    assert!(matches!(result, Err(StoreError::Dataset(_))));
}

#[tokio::test]
async fn exhaustion_is_announced_once() {
    let store = MemoryStore::new();
    store
        .insert(
            BASE,
            "Handle,Image Src,Title,desc\nred,r.jpg,Red,red silk\nblue,b.jpg,Blue,blue silk\n",
        )
        .await;
    let notifier = RecordingNotifier::default();
    let mut session = ReviewSession::open(
        store.clone(),
        notifier.clone(),
        "wedding",
        category(),
        Default::default(),
        options(5),
        SessionState::default(),
    )
    .await
    .unwrap();
    assert_eq!(notifier.count(), 0);

    let outcome = session
        .submit(edits(&[
            ("red", "r.jpg", "Red."),
            ("blue", "b.jpg", "Blue."),
        ]))
        .await
        .unwrap();
    assert!(outcome.wrapped);
    assert!(session.page().is_empty());
    assert_eq!(notifier.count(), 1);
    let (topic, subject, _) = notifier.published.lock().unwrap()[0].clone();
    assert_eq!(topic, "catalog-review");
    assert_eq!(subject, "Wedding descriptions complete");

    session.reload().await;
    assert_eq!(notifier.count(), 1);

    // a front end carrying the state does not announce again
    let state = session.into_state();
    ReviewSession::open(
        store,
        notifier.clone(),
        "wedding",
        category(),
        Default::default(),
        options(5),
        state,
    )
    .await
    .unwrap();
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn notifier_failure_does_not_abort() {
    let store = MemoryStore::new();
    store
        .insert(BASE, "Handle,Image Src,Title,desc,edited\nred,r.jpg,Red,red silk,True\n")
        .await;
    let session = ReviewSession::open(
        store,
        FailingNotifier,
        "wedding",
        category(),
        Default::default(),
        options(5),
        SessionState::default(),
    )
    .await
    .unwrap();
    assert!(session.eligible().is_empty());
    assert!(session.state().notified.contains("wedding"));
}

#[tokio::test]
async fn failed_write_leaves_session_untouched() {
    let store = FlakyStore::default();
    store.inner.insert(BASE, super::fixture().await).await;
    store.reject_puts.store(true, Ordering::SeqCst);
    let mut session = ReviewSession::open(
        store.clone(),
        LogNotifier,
        "wedding",
        category(),
        Default::default(),
        options(5),
        SessionState::default(),
    )
    .await
    .unwrap();
    let before = session.base().clone();
    let batch = edits(&[("banarasi-red", "br-1.jpg", "Red.")]);

    let result = session.submit(batch.clone()).await;
    assert!(matches!(result, Err(StoreError::Store(_))));
    assert_eq!(session.base(), &before);
    assert!(session.updated().is_empty());
    assert_eq!(session.cursor().offset(), 0);
    assert_eq!(store.inner.text(UPDATED).await, None);

    store.reject_puts.store(false, Ordering::SeqCst);
    let outcome = session.submit(batch).await.unwrap();
    assert_eq!(outcome.touched.len(), 1);
    assert_eq!(session.updated().len(), 1);
}

#[tokio::test]
async fn write_back_rewrites_base() {
    let store = seeded_store().await;
    let mut options = options(5);
    options.write_back_base = true;
    let mut session = ReviewSession::open(
        store.clone(),
        LogNotifier,
        "wedding",
        category(),
        Default::default(),
        options,
        SessionState::default(),
    )
    .await
    .unwrap();
    session
        .submit(edits(&[("chanderi-pink", "cp-1.jpg", "Pink and silver.")]))
        .await
        .unwrap();
    let base = store::load_dataset(&store, BASE).await.unwrap().unwrap();
    assert_eq!(base.len(), 11);
    assert_eq!(base.header().last().map(String::as_str), Some("edited"));
    let row = &base.rows()[6];
    assert_eq!(row.text("Body (HTML)"), "Pink and silver.");
    assert_eq!(row.text("edited"), "True");
    assert_eq!(base.rows()[0].text("edited"), "");
}

#[tokio::test]
async fn failed_write_back_keeps_logged_edits() {
    let store = FlakyStore::default();
    store.inner.insert(BASE, super::fixture().await).await;
    store.read_only.lock().unwrap().insert(BASE.into());
    let mut options = options(5);
    options.write_back_base = true;
    let mut session = ReviewSession::open(
        store.clone(),
        LogNotifier,
        "wedding",
        category(),
        Default::default(),
        options,
        SessionState::default(),
    )
    .await
    .unwrap();
    let fixture = String::from_utf8(super::fixture().await).unwrap();

    let result = session
        .submit(edits(&[("banarasi-red", "br-1.jpg", "Red.")]))
        .await;
    assert!(matches!(result, Err(StoreError::Store(_))));
    assert_eq!(session.cursor().offset(), 0);
    assert_eq!(session.updated().len(), 1);
    assert_eq!(store.inner.text(BASE).await, Some(fixture));

    let log = store::load_dataset(&store, UPDATED).await.unwrap().unwrap();
    assert_eq!(log.rows()[0].text("SEO Description"), "Red.");
    assert_eq!(log.rows()[0].text("edited"), "True");

    let reopened = ReviewSession::open(
        store.clone(),
        LogNotifier,
        "wedding",
        category(),
        Default::default(),
        super::options(5),
        SessionState::default(),
    )
    .await
    .unwrap();
    assert!(
        reopened
            .page()
            .iter()
            .all(|entry| entry.key.handle != "banarasi-red")
    );
}

#[tokio::test]
async fn full_overwrite_replaces_logged_row_in_place() {
    let store = seeded_store().await;
    store
        .insert(
            UPDATED,
            "Handle,Image Src,SEO Description,edited\n\
             banarasi-red,br-1.jpg,draft,False\n\
             retired-sku,x.jpg,kept,True\n",
        )
        .await;
    let mut options = options(5);
    options.merge_mode = MergeMode::FullOverwrite;
    let mut session = ReviewSession::open(
        store.clone(),
        LogNotifier,
        "wedding",
        category(),
        Default::default(),
        options,
        SessionState::default(),
    )
    .await
    .unwrap();
    session
        .submit(edits(&[
            ("banarasi-red", "br-1.jpg", "Final."),
            ("kanjivaram-gold", "kg-1.jpg", "Gold."),
        ]))
        .await
        .unwrap();
    let updated = store::load_dataset(&store, UPDATED).await.unwrap().unwrap();
    let rows = updated
        .rows()
        .iter()
        .map(|row| (row.text("Handle"), row.text("SEO Description")))
        .collect::<Vec<_>>();
    assert_eq!(
        rows,
        [
            ("banarasi-red", "Final."),
            ("retired-sku", "kept"),
            ("kanjivaram-gold", "Gold."),
        ]
    );
    // logged columns stay ahead of the ones the base introduced
    assert_eq!(&updated.header()[..4], ["Handle", "Image Src", "SEO Description", "edited"]);
}

/// Two sessions on one category do not see each other's writes; the later
/// write replaces the log. Nothing guards against this.
#[tokio::test]
async fn concurrent_sessions_overwrite_each_other() {
    let store = seeded_store().await;
    let open = || {
        ReviewSession::open(
            store.clone(),
            LogNotifier,
            "wedding",
            category(),
            Default::default(),
            options(5),
            SessionState::default(),
        )
    };
    let mut first = open().await.unwrap();
    let mut second = open().await.unwrap();
    first
        .submit(edits(&[("banarasi-red", "br-1.jpg", "From first.")]))
        .await
        .unwrap();
    second
        .submit(edits(&[("kanjivaram-gold", "kg-1.jpg", "From second.")]))
        .await
        .unwrap();

    let updated: Dataset = store::load_dataset(&store, UPDATED).await.unwrap().unwrap();
    let keys = updated
        .rows()
        .iter()
        .map(|row| row.key(&Default::default()))
        .collect::<Vec<_>>();
    assert_eq!(keys, [RecordKey::new("kanjivaram-gold", "kg-1.jpg")]);
}

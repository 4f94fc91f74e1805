use std::sync::Arc;

use docattach::{
    bson::{Bson, doc},
    memory::InMemoryStore,
    prelude::*,
};
use rstest::{fixture, rstest};

#[derive(HostModel)]
#[host_model(app_label = "app", model_name = "widgets")]
struct Widget {
    id: i64,
}

struct Fixture {
    store: InMemoryStore,
    attachment: Attachment<Widget>,
}

impl Fixture {
    async fn document(&self, id: i64) -> DocumentProxy {
        self.attachment.document(&Widget { id }).await.unwrap()
    }

    async fn stored(&self) -> Vec<docattach::bson::Document> {
        self.store.documents(&Namespace::new("app", "widgets")).await
    }
}

#[fixture]
fn fixture() -> Fixture {
    let store = InMemoryStore::new();

    Fixture {
        attachment: Attachment::new(store.clone()),
        store,
    }
}

#[rstest]
#[tokio::test]
async fn test_widget_color_scenario(fixture: Fixture) {
    let doc = fixture.document(42).await;

    assert_eq!(doc.binding().to_string(), "mongodb://localhost:27017/app.widgets#42");

    assert_eq!(doc.get_or("color", "unknown").await.unwrap(), Bson::from("unknown"));
    assert_eq!(fixture.stored().await, vec![doc! { "_id": 42_i64 }]);

    doc.set("color", "red").await.unwrap();
    assert_eq!(doc.get_or("color", "unknown").await.unwrap(), Bson::from("red"));

    assert_eq!(doc.delete("color").await.unwrap(), Some(Bson::from("red")));
    assert_eq!(doc.get_or("color", "unknown").await.unwrap(), Bson::from("unknown"));
}

#[rstest]
#[tokio::test]
async fn test_materialize_is_idempotent(fixture: Fixture) {
    let doc = fixture.document(7).await;

    let first = doc.materialize().await.unwrap();
    let second = doc.materialize().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(fixture.stored().await.len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_concurrent_first_reads_create_one_document(fixture: Fixture) {
    let doc = fixture.document(7).await;

    let (a, b, c) = tokio::join!(doc.materialize(), doc.materialize(), doc.materialize());

    assert_eq!(a.unwrap(), b.unwrap());
    assert!(c.is_ok());
    assert_eq!(fixture.stored().await, vec![doc! { "_id": 7_i64 }]);
}

#[rstest]
#[tokio::test]
async fn test_delete_absent_field_returns_default(fixture: Fixture) {
    let doc = fixture.document(1).await;
    doc.set("size", 3).await.unwrap();
    let before = doc.materialize().await.unwrap();

    assert_eq!(doc.delete_or("color", "none").await.unwrap(), Bson::from("none"));
    assert_eq!(doc.delete("color").await.unwrap(), None);
    assert_eq!(doc.materialize().await.unwrap(), before);
}

#[rstest]
#[tokio::test]
async fn test_delete_on_missing_document_creates_nothing(fixture: Fixture) {
    let doc = fixture.document(1).await;

    assert_eq!(doc.delete("color").await.unwrap(), None);
    assert!(fixture.stored().await.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_concurrent_pops_observe_value_once(fixture: Fixture) {
    let doc = fixture.document(5).await;
    let other = fixture.document(5).await;
    doc.set("token", "abc").await.unwrap();

    let (a, b) = tokio::join!(doc.delete("token"), other.delete("token"));
    let observed: Vec<Bson> = [a.unwrap(), b.unwrap()].into_iter().flatten().collect();

    assert_eq!(observed, vec![Bson::from("abc")]);
    assert!(!doc.contains_key("token").await.unwrap());
}

#[rstest]
#[tokio::test]
async fn test_mapping_views(fixture: Fixture) {
    let doc = fixture.document(3).await;
    doc.update(doc! { "color": "red", "size": 4 }).await.unwrap();

    assert_eq!(doc.keys().await.unwrap(), vec!["_id", "color", "size"]);
    assert_eq!(
        doc.values().await.unwrap(),
        vec![Bson::Int64(3), Bson::from("red"), Bson::Int32(4)]
    );
    assert_eq!(doc.items().await.unwrap()[1], ("color".to_string(), Bson::from("red")));
    assert_eq!(doc.len().await.unwrap(), 3);
    assert!(doc.contains_key("size").await.unwrap());
    assert_eq!(doc.get("missing").await.unwrap(), None);
}

#[rstest]
#[tokio::test]
async fn test_set_default_keeps_existing_value(fixture: Fixture) {
    let doc = fixture.document(9).await;

    assert_eq!(doc.set_default("color", "red").await.unwrap(), Bson::from("red"));
    assert_eq!(doc.set_default("color", "blue").await.unwrap(), Bson::from("red"));
    assert_eq!(doc.get("color").await.unwrap(), Some(Bson::from("red")));
}

#[rstest]
#[tokio::test]
async fn test_modifiers(fixture: Fixture) {
    let doc = fixture.document(11).await;

    doc.increment("views", 2).await.unwrap();
    doc.increment("views", 3).await.unwrap();
    doc.apply_modifier("push", "tags", "sale").await.unwrap();
    doc.apply_modifier(Modifier::AddToSet, "tags", "sale").await.unwrap();
    doc.apply_update(doc! { "$set": { "color": "red" }, "$unset": { "views": "" } })
        .await
        .unwrap();

    assert_eq!(
        doc.materialize().await.unwrap(),
        doc! { "_id": 11_i64, "tags": ["sale"], "color": "red" }
    );
}

#[rstest]
#[tokio::test]
async fn test_unknown_modifier_is_a_store_error(fixture: Fixture) {
    let doc = fixture.document(11).await;
    let err = doc.apply_modifier("frobnicate", "a", 1).await.unwrap_err();

    assert!(!err.is_guard());
    assert!(matches!(
        err.driver_error::<docattach::memory::MemoryStoreError>(),
        Some(docattach::memory::MemoryStoreError::UnknownOperator(op)) if op == "$frobnicate"
    ));
}

#[rstest]
#[tokio::test]
async fn test_guards_never_reach_the_store(fixture: Fixture) {
    let doc = fixture.document(12).await;

    assert!(matches!(doc.pop_item().await, Err(AttachError::Unsupported(_))));
    assert!(matches!(
        doc.apply_update(doc! { "color": "red" }).await,
        Err(AttachError::InvalidUpdate(_))
    ));
    assert!(fixture.stored().await.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_clear_removes_document(fixture: Fixture) {
    let doc = fixture.document(13).await;
    doc.set("color", "red").await.unwrap();

    assert_eq!(doc.clear().await.unwrap(), 1);
    assert!(fixture.stored().await.is_empty());
    assert_eq!(doc.get("color").await.unwrap(), None);
}

#[rstest]
#[tokio::test]
async fn test_proxies_are_independent_views(fixture: Fixture) {
    let first = fixture.document(20).await;
    let second = fixture.document(20).await;
    let unrelated = fixture.document(21).await;

    first.set("color", "red").await.unwrap();

    assert_eq!(second.get("color").await.unwrap(), Some(Bson::from("red")));
    assert_eq!(unrelated.get("color").await.unwrap(), None);
}

#[rstest]
#[tokio::test]
async fn test_document_over_shared_driver() {
    let store = InMemoryStore::new();
    let binding = Binding::new(Endpoint::default(), Namespace::new("app", "notes"));
    let doc = DocumentProxy::new(binding, "note-1", Arc::new(store.clone()));

    doc.set("body", "hello").await.unwrap();

    assert_eq!(
        store.documents(&Namespace::new("app", "notes")).await,
        vec![doc! { "_id": "note-1", "body": "hello" }]
    );
}

#[rstest]
#[tokio::test]
async fn test_dotted_keys_read_back_what_was_written(fixture: Fixture) {
    let doc = fixture.document(30).await;

    doc.set("dims.w", 3).await.unwrap();

    assert_eq!(doc.get("dims.w").await.unwrap(), Some(Bson::Int32(3)));
    assert!(doc.contains_key("dims.w").await.unwrap());
    assert!(doc.contains_key("dims").await.unwrap());

    assert_eq!(doc.delete("dims.w").await.unwrap(), Some(Bson::Int32(3)));
    assert_eq!(doc.get("dims.w").await.unwrap(), None);
    assert_eq!(fixture.stored().await, vec![doc! { "_id": 30_i64, "dims": {} }]);
}

#[rstest]
#[tokio::test]
async fn test_adjacent_large_keys_are_distinct_documents(fixture: Fixture) {
    let first = fixture.document(9_007_199_254_740_992).await;
    let second = fixture.document(9_007_199_254_740_993).await;

    first.set("owner", "first").await.unwrap();

    assert_eq!(second.get("owner").await.unwrap(), None);

    second.set("owner", "second").await.unwrap();

    assert_eq!(first.get("owner").await.unwrap(), Some(Bson::from("first")));
    assert_eq!(fixture.stored().await.len(), 2);
}

#[rstest]
#[tokio::test]
async fn test_push_all_appends_each_element(fixture: Fixture) {
    let doc = fixture.document(31).await;

    doc.apply_modifier("pushAll", "tags", vec!["a", "b"]).await.unwrap();
    doc.apply_modifier(Modifier::PushAll, "tags", vec!["c"]).await.unwrap();

    assert_eq!(
        doc.get("tags").await.unwrap(),
        Some(Bson::Array(vec!["a".into(), "b".into(), "c".into()]))
    );
}

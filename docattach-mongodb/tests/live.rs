//! Runs against a MongoDB server on localhost:27017.
//!
//! `cargo test -p docattach-mongodb -- --ignored`

use bson::{Bson, doc, oid::ObjectId};
use futures::TryStreamExt;

use docattach_core::{
    binding::{Endpoint, Namespace},
    driver::Connector,
    options::{FindOptions, IndexKeys, IndexOptions, InsertOptions, UpdateOptions},
    update::UpdateDoc,
};
use docattach_mongodb::MongoDbConnector;

fn scratch() -> Namespace {
    Namespace::new("docattach_test", format!("live_{}", ObjectId::new().to_hex()))
}

#[tokio::test]
#[ignore = "needs a MongoDB server on localhost:27017"]
async fn test_round_trip_against_server() {
    let connector = MongoDbConnector::new();
    let driver = connector.connect(&Endpoint::default()).await.unwrap();
    let namespace = scratch();

    let ids = driver
        .insert_many(
            &namespace,
            vec![doc! { "_id": 2, "x": 1 }, doc! { "_id": 1, "x": 1 }],
            InsertOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(ids, vec![Bson::Int32(2), Bson::Int32(1)]);

    let sorted: Vec<_> = driver
        .find(
            &namespace,
            doc! { "x": 1 },
            FindOptions::builder().sort(doc! { "_id": 1 }).build(),
        )
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(sorted[0].get_i32("_id").unwrap(), 1);

    let outcome = driver
        .update(
            &namespace,
            doc! { "_id": 1 },
            UpdateDoc::set(doc! { "color": "red" }),
            UpdateOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.modified, 1);

    let popped = driver
        .run_command(
            &namespace.database,
            doc! {
                "findAndModify": namespace.collection.as_str(),
                "query": { "_id": 1 },
                "update": { "$unset": { "color": 1 } },
            },
        )
        .await
        .unwrap();
    assert_eq!(
        popped.get_document("value").unwrap().get_str("color").unwrap(),
        "red"
    );

    let name = driver
        .create_index(&namespace, IndexKeys::from("x"), IndexOptions::default())
        .await
        .unwrap();
    assert_eq!(name, "x_1");

    assert_eq!(driver.remove(&namespace, doc! {}).await.unwrap(), 2);

    connector.shutdown().await;
}

//! Integration tests for the query facade.
//!
//! These tests require a MongoDB server to be running.
//! Set MONGODB_URI (default mongodb://localhost:27017/) and run with --ignored.

use bson::{doc, oid::ObjectId, Bson};
use mangrove_mongodb::{QueryFacade, StoreConfig};

async fn facade() -> QueryFacade {
    let uri = std::env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017/".to_string());

    let config = StoreConfig {
        uri: Some(uri),
        connect_timeout_secs: 5,
        ..StoreConfig::default().use_test_database()
    };
    QueryFacade::connect(&config).await.unwrap()
}

fn scratch_collection(prefix: &str) -> String {
    format!("{}_{}", prefix, ObjectId::new().to_hex())
}

async fn seed(facade: &QueryFacade, collection: &str) {
    facade
        .insert_documents(
            collection,
            vec![
                doc! { "name": "Alice", "age": 30, "city": "Oslo" },
                doc! { "name": "Bob", "age": 25, "city": "Lima" },
                doc! { "name": "Carol", "age": 41, "city": "Oslo" },
            ],
        )
        .await
        .unwrap();
}

#[tokio::test]
#[ignore] // Only run with --ignored flag when database is available
async fn test_find_sort_project() -> Result<(), Box<dyn std::error::Error>> {
    let facade = facade().await;
    facade.ping().await?;
    let users = scratch_collection("users");
    seed(&facade, &users).await;

    let all = facade.get_results(&users, doc! {}).await?;
    assert_eq!(all.len(), 3);

    let sorted = facade.get_sorted_results(&users, doc! {}, "-age").await?;
    let names: Vec<&str> = sorted.iter().map(|d| d.get_str("name").unwrap()).collect();
    assert_eq!(names, vec!["Carol", "Alice", "Bob"]);

    let fields = facade
        .get_sorted_fields(&users, doc! { "city": "Oslo" }, doc! { "name": 1, "_id": 0 }, "name")
        .await?;
    assert_eq!(fields, vec![doc! { "name": "Alice" }, doc! { "name": "Carol" }]);

    let limited = facade
        .get_fields_with_limit(&users, doc! {}, doc! { "name": 1 }, 2)
        .await?;
    assert_eq!(limited.len(), 2);

    facade.remove_all_documents(&users, doc! {}).await?;
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_mutations() -> Result<(), Box<dyn std::error::Error>> {
    let facade = facade().await;
    let users = scratch_collection("users");
    seed(&facade, &users).await;

    let info = facade
        .update_document(&users, doc! { "name": "Bob" }, doc! { "$set": { "age": 26 } })
        .await?;
    assert_eq!(info.matched, 1);

    let missing = facade
        .update_document(&users, doc! { "name": "Zed" }, doc! { "$set": { "age": 1 } })
        .await;
    assert!(missing.unwrap_err().is_not_found());

    facade.delete_fields(&users, doc! { "name": "Bob" }, &["city"]).await?;
    let bob = facade.find_one_document(&users, doc! { "name": "Bob" }).await?.unwrap();
    assert!(!bob.contains_key("city"));
    assert_eq!(bob.get_i32("age")?, 26);

    let upserted = facade
        .upsert_document(&users, doc! { "name": "Dave" }, doc! { "$set": { "age": 52 } })
        .await?;
    assert!(upserted.upserted_id.is_some());
    assert_eq!(facade.count(&users, doc! {}).await?, 4);

    facade.remove_document(&users, doc! { "name": "Dave" }).await?;
    assert!(facade
        .remove_document(&users, doc! { "name": "Dave" })
        .await
        .unwrap_err()
        .is_not_found());

    facade.remove_all_documents(&users, doc! {}).await?;
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_distinct_aggregate_find_and_modify() -> Result<(), Box<dyn std::error::Error>> {
    let facade = facade().await;
    let users = scratch_collection("users");
    seed(&facade, &users).await;

    let mut cities = facade.distinct(&users, doc! {}, "city").await?;
    cities.sort_by_key(|c| c.as_str().map(String::from));
    assert_eq!(cities, vec![Bson::from("Lima"), Bson::from("Oslo")]);

    let grouped = facade
        .aggregate(
            &users,
            vec![
                doc! { "$group": { "_id": "$city", "n": { "$sum": 1 } } },
                doc! { "$sort": { "_id": 1 } },
            ],
        )
        .await?;
    assert_eq!(grouped[1], doc! { "_id": "Oslo", "n": 2 });

    let counters = scratch_collection("counters");
    facade.insert_documents(&counters, vec![doc! { "_id": "orders", "seq": 1 }]).await?;
    let next = facade
        .find_and_modify(&counters, doc! { "_id": "orders" }, doc! { "$inc": { "seq": 1 } })
        .await?
        .unwrap();
    assert_eq!(next.get_i32("seq")?, 2);

    let by_id = facade.get_result_by_id(&counters, "orders").await?;
    assert_eq!(by_id, Some(doc! { "_id": "orders", "seq": 2 }));

    facade.remove_all_documents(&users, doc! {}).await?;
    facade.remove_all_documents(&counters, doc! {}).await?;
    Ok(())
}

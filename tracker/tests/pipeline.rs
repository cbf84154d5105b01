use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use assert_json_diff::assert_json_include;
use serde_json::json;
use time::macros::datetime;

use tracker::buffer::EventBuffer;
use tracker::drain::DrainLoop;
use tracker::event::TrackedEvent;
use tracker::store::memory::MemoryStore;
use tracker::store::{CollectionConfig, ProcessorDeclaration};
use tracker::time::FixedTime;

fn hit(pairs: &[(&str, &str)]) -> TrackedEvent {
    TrackedEvent::from_params(HashMap::from_iter(
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
    ))
}

fn tracking_config(site_id: &str, collection: &str, kinds: &[&str]) -> CollectionConfig {
    CollectionConfig {
        collection: collection.to_string(),
        site_id: site_id.to_string(),
        processors: kinds
            .iter()
            .map(|kind| ProcessorDeclaration {
                kind: (*kind).to_string(),
                settings: HashMap::new(),
            })
            .collect(),
    }
}

fn pipeline(configs: Vec<CollectionConfig>) -> (Arc<EventBuffer>, Arc<MemoryStore>, DrainLoop) {
    let store = Arc::new(MemoryStore::new(configs));
    let buffer = Arc::new(EventBuffer::new());
    let drain = DrainLoop::new(
        buffer.clone(),
        store.clone(),
        Arc::new(FixedTime {
            time: datetime!(2015-03-14 09:26:53 UTC),
        }),
        Duration::from_secs(10),
    );
    (buffer, store, drain)
}

#[tokio::test]
async fn two_views_in_one_period_accumulate_into_one_counter() {
    let (buffer, store, drain) = pipeline(vec![tracking_config(
        "s1",
        "magento_stats",
        &["popular_product"],
    )]);

    let view = [
        ("page.site_id", "s1"),
        ("page.product.id", "p1"),
        ("page.store_id", "st1"),
    ];
    buffer.add(hit(&view));
    buffer.add(hit(&view));
    drain.run_cycle().await;

    assert_eq!(store.document_count("magento_stats"), 1);
    let doc = store
        .document("magento_stats", "p1|st1|product_view|2015-03-14")
        .unwrap();
    assert_json_include!(
        actual: doc,
        expected: json!({
            "count": 2,
            "product_id": "p1",
            "store_id": "st1",
            "event_type": "product_view",
            "date": "2015-03-14",
            "_parent": "p1|st1",
        })
    );
}

#[tokio::test]
async fn events_without_a_tenant_never_reach_the_store() {
    let (buffer, store, drain) = pipeline(vec![tracking_config(
        "s1",
        "magento_stats",
        &["popular_product"],
    )]);

    buffer.add(hit(&[("page.product.id", "p1"), ("page.store_id", "st1")]));
    drain.run_cycle().await;

    assert_eq!(store.document_count("magento_stats"), 0);
}

#[tokio::test]
async fn the_hundredth_page_fills_the_session_and_the_next_flags_spam() {
    let (buffer, store, drain) = pipeline(vec![tracking_config(
        "s1",
        "magento_sessions",
        &["customer_session"],
    )]);

    for n in 0..100 {
        buffer.add(hit(&[
            ("page.site_id", "s1"),
            ("session.uid", "sess-1"),
            ("page.url", &format!("/page/{n}")),
        ]));
    }
    drain.run_cycle().await;

    let doc = store.document("magento_sessions", "sess-1").unwrap();
    assert_eq!(doc["pages"].as_array().unwrap().len(), 100);
    assert!(doc.get("is_spam").is_none());

    buffer.add(hit(&[
        ("page.site_id", "s1"),
        ("session.uid", "sess-1"),
        ("page.url", "/page/100"),
    ]));
    drain.run_cycle().await;

    let doc = store.document("magento_sessions", "sess-1").unwrap();
    assert_eq!(doc["pages"].as_array().unwrap().len(), 100);
    assert_eq!(doc["is_spam"], json!(true));
}

#[tokio::test]
async fn an_order_with_three_items_updates_three_counters() {
    let (buffer, store, drain) = pipeline(vec![tracking_config(
        "s1",
        "magento_stats",
        &["popular_product"],
    )]);

    buffer.add(hit(&[
        ("page.site_id", "s1"),
        ("page.store_id", "st1"),
        ("page.order.id", "100000042"),
        ("page.order.items.0.product_id", "p1"),
        ("page.order.items.1.product_id", "p2"),
        ("page.order.items.2.product_id", "p3"),
    ]));
    drain.run_cycle().await;

    assert_eq!(store.document_count("magento_stats"), 3);
    for product in ["p1", "p2", "p3"] {
        let doc = store
            .document(
                "magento_stats",
                &format!("{product}|st1|product_order|2015-03-14"),
            )
            .unwrap();
        assert_eq!(doc["event_type"], json!("product_order"));
        assert_eq!(doc["count"], json!(1));
    }
}

#[tokio::test]
async fn sites_only_run_their_own_processors() {
    let (buffer, store, drain) = pipeline(vec![
        tracking_config("s1", "s1_stats", &["popular_product"]),
        tracking_config("s2", "s2_stats", &["popular_product"]),
    ]);

    buffer.add(hit(&[
        ("page.site_id", "s2"),
        ("page.product.id", "p1"),
        ("page.store_id", "st1"),
    ]));
    drain.run_cycle().await;

    assert_eq!(store.document_count("s1_stats"), 0);
    assert_eq!(store.document_count("s2_stats"), 1);
}

#[tokio::test]
async fn unknown_kinds_leave_the_valid_processors_running() {
    let (buffer, store, drain) = pipeline(vec![tracking_config(
        "s1",
        "magento_stats",
        &["legacy_class_path", "popular_product"],
    )]);

    buffer.add(hit(&[
        ("page.site_id", "s1"),
        ("page.product.id", "p1"),
        ("page.store_id", "st1"),
    ]));
    drain.run_cycle().await;

    assert_eq!(store.document_count("magento_stats"), 1);
}

#[tokio::test]
async fn configuration_changes_apply_on_the_next_cycle() {
    let (buffer, store, drain) = pipeline(Vec::new());

    let view = [
        ("page.site_id", "s1"),
        ("page.product.id", "p1"),
        ("page.store_id", "st1"),
    ];

    // No processors configured yet: the cycle drains but writes nothing.
    buffer.add(hit(&view));
    drain.run_cycle().await;
    assert_eq!(store.document_count("magento_stats"), 0);

    store.set_configs(vec![tracking_config(
        "s1",
        "magento_stats",
        &["popular_product"],
    )]);
    buffer.add(hit(&view));
    drain.run_cycle().await;
    assert_eq!(store.document_count("magento_stats"), 1);
}

#[tokio::test]
async fn both_processors_can_feed_off_the_same_hit() {
    let (buffer, store, drain) = pipeline(vec![
        tracking_config("s1", "magento_sessions", &["customer_session"]),
        tracking_config("s1", "magento_stats", &["popular_product"]),
    ]);

    buffer.add(hit(&[
        ("page.site_id", "s1"),
        ("session.uid", "sess-1"),
        ("page.product.id", "p1"),
        ("page.store_id", "st1"),
    ]));
    drain.run_cycle().await;

    assert!(store.document("magento_sessions", "sess-1").is_some());
    assert!(store
        .document("magento_stats", "p1|st1|product_view|2015-03-14")
        .is_some());
}

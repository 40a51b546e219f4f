//! Integration tests for windowed queries and field listing.

use hostgraph::{Sample, Store, StoreConfig};

fn populated_store() -> Store {
    let store = Store::new(StoreConfig::default()).unwrap();
    for ts in [100, 110, 120, 130, 140] {
        store.push("web1", "net", "rx", 1.0, ts);
    }
    for ts in [105, 125] {
        store.push("web1", "net", "tx", 2.0, ts);
    }
    store.push("web1", "net", "drops", 0.0, 101);
    store
}

fn window(store: &Store, since: i64) -> Vec<(String, Vec<i64>)> {
    store
        .latest_items("web1", "net", since)
        .into_iter()
        .map(|(field, samples)| (field, samples.iter().map(|s| s.timestamp).collect()))
        .collect()
}

#[test]
fn test_since_zero_returns_everything() {
    let store = populated_store();
    assert_eq!(
        window(&store, 0),
        vec![
            ("drops".to_string(), vec![101]),
            ("rx".to_string(), vec![100, 110, 120, 130, 140]),
            ("tx".to_string(), vec![105, 125]),
        ]
    );
}

#[test]
fn test_since_returns_suffix_per_field() {
    let store = populated_store();
    assert_eq!(
        window(&store, 120),
        vec![
            ("drops".to_string(), vec![]),
            ("rx".to_string(), vec![120, 130, 140]),
            ("tx".to_string(), vec![125]),
        ]
    );
}

#[test]
fn test_since_before_all_data() {
    let store = populated_store();
    assert_eq!(window(&store, 1), window(&store, 0));
}

#[test]
fn test_since_after_all_data() {
    let store = populated_store();
    assert!(window(&store, 1_000).iter().all(|(_, ts)| ts.is_empty()));
}

#[test]
fn test_window_values_are_preserved() {
    let store = Store::new(StoreConfig::default()).unwrap();
    store.push("h", "g", "f", 0.25, 10);
    store.push("h", "g", "f", -3.5, 20);
    store.push("h", "g", "f", 1e9, 30);

    assert_eq!(
        store.latest_items("h", "g", 20)["f"],
        vec![Sample::new(20, -3.5), Sample::new(30, 1e9)]
    );
}

#[test]
fn test_fields_listing() {
    let store = populated_store();
    assert_eq!(store.fields("web1", "net"), vec!["drops", "rx", "tx"]);
    assert!(store.fields("web1", "disk").is_empty());
    assert!(store.fields("web2", "net").is_empty());
}

#[test]
fn test_unknown_graph_window_is_empty() {
    let store = populated_store();
    assert!(store.latest_items("web1", "disk", 0).is_empty());
    assert!(store.latest_items("web9", "net", 100).is_empty());
}

#[test]
fn test_samples_serialize_with_named_fields() {
    let store = populated_store();
    let items = store.latest_items("web1", "net", 125);
    let json = serde_json::to_value(&items).unwrap();
    assert_eq!(
        json["tx"],
        serde_json::json!([{"timestamp": 125, "value": 2.0}])
    );
    assert_eq!(json["rx"].as_array().map(Vec::len), Some(2));
}

use flyme_frame_tools::package_list::{join_package_list, parse_package_list};
use flyme_frame_tools::{ChannelState, ListKey, PackageListStore, PrivilegedChannel, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Settings table in memory; `reachable`/`granted` simulate the broker.
struct FakeBroker {
    reachable: bool,
    granted: bool,
    values: Mutex<HashMap<String, String>>,
    writes: Mutex<Vec<String>>,
}

impl FakeBroker {
    fn new() -> Self {
        Self {
            reachable: true,
            granted: true,
            values: Mutex::new(HashMap::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    fn with(key: ListKey, value: &str) -> Self {
        let broker = Self::new();
        broker
            .values
            .lock()
            .unwrap()
            .insert(key.settings_key().to_string(), value.to_string());
        broker
    }

    fn value(&self, key: ListKey) -> Option<String> {
        self.values.lock().unwrap().get(key.settings_key()).cloned()
    }

    fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

impl PrivilegedChannel for FakeBroker {
    fn is_available(&self) -> bool {
        self.reachable
    }

    fn has_permission(&self) -> bool {
        self.granted
    }

    fn request_permission(&self) {}

    fn exec(&self, command: &str) -> std::io::Result<String> {
        let parts: Vec<&str> = command.splitn(5, ' ').collect();
        match parts.as_slice() {
            ["settings", "get", "global", key] => Ok(self
                .values
                .lock()
                .unwrap()
                .get(*key)
                .cloned()
                .unwrap_or_else(|| "null".to_string())),
            ["settings", "put", "global", key, value] => {
                let value = if *value == "''" { "" } else { *value };
                self.writes.lock().unwrap().push(value.to_string());
                self.values
                    .lock()
                    .unwrap()
                    .insert(key.to_string(), value.to_string());
                Ok(String::new())
            }
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                command.to_string(),
            )),
        }
    }
}

fn store_for(broker: &Arc<FakeBroker>) -> PackageListStore {
    PackageListStore::new(broker.clone())
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_load_collapses_duplicates_and_empty_segments() {
    let broker = Arc::new(FakeBroker::with(ListKey::FrameInterpolation, "com.a,com.b,,com.a"));
    let store = store_for(&broker);

    assert_eq!(store.load(ListKey::FrameInterpolation), strings(&["com.a", "com.b"]));
    // the other list was never written
    assert!(store.load(ListKey::SuperResolution).is_empty());
}

#[test]
fn test_load_matches_split_semantics() {
    let cases = [
        ("", vec![]),
        (",", vec![]),
        ("com.a", vec!["com.a"]),
        ("com.b,com.a,com.b,com.c,,", vec!["com.b", "com.a", "com.c"]),
        ("  com.a,com.b\n", vec!["com.a", "com.b"]),
    ];
    for (raw, expected) in cases {
        assert_eq!(parse_package_list(raw), strings(&expected), "raw value {:?}", raw);
    }
}

#[test]
fn test_add_writes_and_returns_new_list() {
    let broker = Arc::new(FakeBroker::with(ListKey::FrameInterpolation, "com.a"));
    let store = store_for(&broker);

    let list = store.add(ListKey::FrameInterpolation, &strings(&["com.a"]), "com.b");

    assert_eq!(list, strings(&["com.a", "com.b"]));
    assert_eq!(broker.writes(), vec!["com.a,com.b".to_string()]);
}

#[test]
fn test_add_is_idempotent() {
    let broker = Arc::new(FakeBroker::new());
    let store = store_for(&broker);
    let key = ListKey::SuperResolution;

    let once = store.add(key, &strings(&["com.a"]), "com.x");
    let twice = store.add(key, &once, "com.x");

    assert_eq!(once, twice);
    assert_eq!(broker.writes().len(), 1);
}

#[test]
fn test_load_after_add_contains_package_once() {
    let broker = Arc::new(FakeBroker::with(ListKey::SuperResolution, "com.a,com.b"));
    let store = store_for(&broker);
    let key = ListKey::SuperResolution;

    let current = store.load(key);
    store.add(key, &current, "com.c");
    let reloaded = store.load(key);

    assert_eq!(reloaded.iter().filter(|p| *p == "com.c").count(), 1);
    assert_eq!(reloaded, strings(&["com.a", "com.b", "com.c"]));
}

#[test]
fn test_remove_last_package_writes_empty_value() {
    let broker = Arc::new(FakeBroker::with(ListKey::FrameInterpolation, "com.x"));
    let store = store_for(&broker);

    assert!(store.remove(ListKey::FrameInterpolation, "com.x").is_empty());
    assert_eq!(broker.value(ListKey::FrameInterpolation).as_deref(), Some(""));
    assert!(store.load(ListKey::FrameInterpolation).is_empty());
}

#[test]
fn test_remove_is_idempotent_and_keeps_order() {
    let broker = Arc::new(FakeBroker::with(
        ListKey::FrameInterpolation,
        "com.d,com.x,com.b,com.a",
    ));
    let store = store_for(&broker);
    let key = ListKey::FrameInterpolation;

    let once = store.remove(key, "com.x");
    let twice = store.remove(key, "com.x");

    assert_eq!(once, strings(&["com.d", "com.b", "com.a"]));
    assert_eq!(once, twice);
    assert_eq!(store.load(key), once);
}

#[test]
fn test_remove_uses_persisted_value_not_caller_list() {
    let broker = Arc::new(FakeBroker::with(ListKey::SuperResolution, "com.a"));
    let store = store_for(&broker);
    let key = ListKey::SuperResolution;

    let stale = store.load(key);
    // another editor appends behind our back
    broker
        .values
        .lock()
        .unwrap()
        .insert(key.settings_key().to_string(), "com.a,com.z".to_string());

    assert_eq!(stale, strings(&["com.a"]));
    assert_eq!(store.remove(key, "com.a"), strings(&["com.z"]));
}

#[test]
fn test_remove_keeps_other_duplicates() {
    let broker = Arc::new(FakeBroker::with(
        ListKey::FrameInterpolation,
        "com.a,com.b,com.a",
    ));
    let store = store_for(&broker);

    assert_eq!(
        store.remove(ListKey::FrameInterpolation, "com.b"),
        strings(&["com.a", "com.a"])
    );
    assert_eq!(broker.writes(), vec!["com.a,com.a".to_string()]);
}

#[test]
fn test_unreachable_channel_loads_empty() {
    let broker = Arc::new(FakeBroker {
        reachable: false,
        ..FakeBroker::with(ListKey::FrameInterpolation, "com.a")
    });
    let store = store_for(&broker);

    assert_eq!(store.probe(), ChannelState::Unavailable);
    assert!(store.load(ListKey::FrameInterpolation).is_empty());
    assert!(matches!(
        store.fetch(ListKey::FrameInterpolation),
        Err(StoreError::Unavailable)
    ));
}

#[test]
fn test_denied_channel_is_distinguished() {
    let broker = Arc::new(FakeBroker {
        granted: false,
        ..FakeBroker::with(ListKey::FrameInterpolation, "com.a")
    });
    let store = store_for(&broker);

    assert_eq!(store.probe(), ChannelState::Denied);
    assert!(matches!(
        store.fetch(ListKey::FrameInterpolation),
        Err(StoreError::Denied)
    ));
    assert!(store.load(ListKey::FrameInterpolation).is_empty());
}

#[test]
fn test_lists_are_independent() {
    let broker = Arc::new(FakeBroker::new());
    let store = store_for(&broker);

    store.add(ListKey::FrameInterpolation, &[], "com.a");
    store.add(ListKey::SuperResolution, &[], "com.b");

    assert_eq!(store.load(ListKey::FrameInterpolation), strings(&["com.a"]));
    assert_eq!(store.load(ListKey::SuperResolution), strings(&["com.b"]));
    assert_eq!(
        join_package_list(&store.load(ListKey::FrameInterpolation)),
        "com.a"
    );
}

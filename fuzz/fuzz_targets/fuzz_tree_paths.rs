#![no_main]

use libfuzzer_sys::fuzz_target;
use propbind::{CollisionPolicy, PropertyTree};
use serde_json::json;

// Arbitrary dotted keys: writes must round-trip and reads must never panic.
fuzz_target!(|keys: Vec<String>| {
    let mut tree = PropertyTree::new();
    for (i, key) in keys.iter().enumerate() {
        let _ = tree.get(key);
        let before = tree.clone();
        match tree.set(key, json!(i), CollisionPolicy::Reject) {
            Ok(_) => assert_eq!(tree.get(key), Some(&json!(i))),
            Err(_) => assert_eq!(tree, before),
        }
        if tree.set(key, json!(i), CollisionPolicy::Overwrite).is_ok() {
            assert_eq!(tree.get(key), Some(&json!(i)));
        }
    }
});

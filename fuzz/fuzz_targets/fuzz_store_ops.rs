#![no_main]

use std::cell::Cell;
use std::rc::Rc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use propbind::{BindingOptions, ElementHandle, MemoryElement, PropertyStore};

#[derive(Arbitrary, Debug)]
enum Op {
    BindElement { element: u8, key: u8 },
    BindFunction { key: u8 },
    Update { source: Option<u8>, key: u8, value: i32 },
    Fire { element: u8 },
    Unbind { element: u8, key: u8 },
}

const KEYS: [&str; 4] = ["a", "a.b", "b", "a.b.c"];

// Random sequences of store operations on a handful of elements.
fuzz_target!(|ops: Vec<Op>| {
    let store = PropertyStore::new();
    let concrete: Vec<Rc<MemoryElement>> =
        (0..4).map(|i| MemoryElement::with_field("value", i).into_handle()).collect();
    let handles: Vec<ElementHandle> = concrete
        .iter()
        .map(|e| -> ElementHandle { e.clone() })
        .collect();
    let calls = Rc::new(Cell::new(0u64));

    for op in ops {
        match op {
            Op::BindElement { element, key } => {
                let handle = &handles[usize::from(element) % handles.len()];
                let _ = store.bind_prop(handle, KEYS[usize::from(key) % KEYS.len()], BindingOptions::new());
            }
            Op::BindFunction { key } => {
                let calls = Rc::clone(&calls);
                store.bind_function(KEYS[usize::from(key) % KEYS.len()], move |_| {
                    calls.set(calls.get() + 1);
                });
            }
            Op::Update { source, key, value } => {
                let source = source.map(|s| &handles[usize::from(s) % handles.len()]);
                let _ = store.update_prop(source, KEYS[usize::from(key) % KEYS.len()], value);
            }
            Op::Fire { element } => {
                concrete[usize::from(element) % concrete.len()].fire("change");
            }
            Op::Unbind { element, key } => {
                let handle = &handles[usize::from(element) % handles.len()];
                store.unbind_element(handle, KEYS[usize::from(key) % KEYS.len()]);
            }
        }
    }
});

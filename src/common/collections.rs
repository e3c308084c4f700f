pub use std::collections::BTreeSet;

pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;

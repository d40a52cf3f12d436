//! Specialized collection types

pub use slotmap::{SlotMap, DefaultKey, Key, KeyData};

/// Handle-based map using slot map for stable references
pub type HandleMap<T> = SlotMap<DefaultKey, T>;

/// Convert a slot map key into the opaque `u64` carried by backend handles
pub fn key_to_raw(key: DefaultKey) -> u64 {
    key.data().as_ffi()
}

/// Recover a slot map key from an opaque backend handle value
pub fn raw_to_key(raw: u64) -> DefaultKey {
    KeyData::from_ffi(raw).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_handles_round_trip_through_slot_map_keys() {
        let mut map: HandleMap<&str> = HandleMap::new();
        let key = map.insert("texture");
        let raw = key_to_raw(key);
        assert_eq!(map.get(raw_to_key(raw)), Some(&"texture"));
    }

    #[test]
    fn removed_keys_do_not_resolve() {
        let mut map: HandleMap<u32> = HandleMap::new();
        let key = map.insert(7);
        let raw = key_to_raw(key);
        map.remove(key);
        let reused = map.insert(8);
        assert_ne!(key_to_raw(reused), raw);
        assert!(map.get(raw_to_key(raw)).is_none());
    }
}

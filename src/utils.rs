//! Small standalone helpers shared by the writer and schema modules.

use crate::ordered_map::OrderedMap;

/// `map`'s keys in lexicographic order, independent of insertion order.
pub fn sort_keys<V>(map: &OrderedMap<V>) -> Vec<&str> {
    let mut keys: Vec<&str> = map.keys().collect();
    keys.sort_unstable();
    keys
}

#[inline]
pub fn has_prefix(s: &str, prefix: &str) -> bool {
    s.starts_with(prefix)
}

#[inline]
pub fn has_suffix(s: &str, suffix: &str) -> bool {
    s.ends_with(suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn sort_keys_orders_lexicographically() {
        let mut map = OrderedMap::new();
        map.set("zebra", Value::I32(1));
        map.set("apple", Value::I32(2));
        map.set("mango", Value::I32(3));
        assert_eq!(sort_keys(&map), vec!["apple", "mango", "zebra"]);
    }

    #[test]
    fn prefix_suffix_checks() {
        assert!(has_prefix("hello.world", "hello"));
        assert!(!has_prefix("hello.world", "world"));
        assert!(has_suffix("hello.world", "world"));
        assert!(!has_suffix("hello.world", "hello"));
    }
}

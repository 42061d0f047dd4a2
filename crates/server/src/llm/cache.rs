use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;

const CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Correct,
    Translate,
}

#[derive(Serialize)]
struct CacheKeyParts<'a> {
    mode: Mode,
    text: &'a str,
    history: &'a [String],
    extra_context: &'a str,
    target_language: &'a str,
    model: &'a str,
}

/// Canonical cache key: a sorted-key JSON rendering of every input that can
/// change the answer, so two calls with identical history/context collapse
/// to the same cache slot regardless of field order.
pub fn cache_key(
    mode: Mode,
    text: &str,
    history: &[String],
    extra_context: &str,
    target_language: &str,
    model: &str,
) -> String {
    let parts = CacheKeyParts { mode, text, history, extra_context, target_language, model };
    serde_json::to_string(&parts).expect("cache key parts are always serializable")
}

pub struct ResponseCache {
    inner: LruCache<String, String>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self { inner: LruCache::new(NonZeroUsize::new(CAPACITY).unwrap()) }
    }

    pub fn get(&mut self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    pub fn put(&mut self, key: String, value: String) {
        self.inner.put(key, value);
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_across_equivalent_inputs() {
        let history = vec!["a".to_string(), "b".to_string()];
        let k1 = cache_key(Mode::Correct, "hello", &history, "ctx", "fr", "gpt-4o-mini");
        let k2 = cache_key(Mode::Correct, "hello", &history, "ctx", "fr", "gpt-4o-mini");
        assert_eq!(k1, k2);
    }

    #[test]
    fn key_differs_on_mode() {
        let history: Vec<String> = vec![];
        let k1 = cache_key(Mode::Correct, "hello", &history, "", "fr", "gpt-4o-mini");
        let k2 = cache_key(Mode::Translate, "hello", &history, "", "fr", "gpt-4o-mini");
        assert_ne!(k1, k2);
    }

    #[test]
    fn cache_evicts_least_recently_used_past_capacity() {
        let mut cache = ResponseCache::new();
        for i in 0..CAPACITY + 1 {
            cache.put(format!("key-{i}"), format!("value-{i}"));
        }
        assert!(cache.get("key-0").is_none());
        assert!(cache.get(&format!("key-{CAPACITY}")).is_some());
    }
}

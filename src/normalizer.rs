use lru::LruCache;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::num::NonZeroUsize;

pub const NUM_PLACEHOLDER: &str = "<NUM>";
pub const IP_PLACEHOLDER: &str = "<IP>";

static RE_DATETIME: Lazy<Regex> = Lazy::new(|| {
    // Only the plain `YYYY-MM-DD HH:MM:SS` form; zone suffixes fall through to <NUM>
    Regex::new(r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}").unwrap()
});

static RE_IPV4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}").unwrap()
});

static RE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Rewrite a raw log line into its canonical form.
///
/// Order matters: the date-time is dropped first so it leaves no numeric
/// fragments behind, dotted quads collapse to `<IP>` before the digit rule can
/// split them, and every remaining digit run becomes `<NUM>`. The output holds
/// no digits, so normalizing twice is the same as normalizing once.
pub fn normalize(text: &str) -> String {
    let s = RE_DATETIME.replace_all(text, "");
    let s = RE_IPV4.replace_all(&s, IP_PLACEHOLDER);
    let s = RE_DIGITS.replace_all(&s, NUM_PLACEHOLDER);
    s.trim().to_string()
}

/// Stringify a table cell the way JSON fields are flattened, then normalize.
pub fn normalize_value(v: &Value) -> String {
    normalize(&value_to_text(v))
}

pub fn value_to_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Per-invocation normalizer with a bounded memo of already seen lines.
///
/// Log batches repeat the same raw line many times; the cache lives only as
/// long as one pipeline run so nothing leaks between unrelated inputs.
pub struct Normalizer {
    cache: Option<LruCache<String, String>>,
    hits: usize,
}

impl Normalizer {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache: NonZeroUsize::new(cache_capacity).map(LruCache::new),
            hits: 0,
        }
    }

    pub fn uncached() -> Self {
        Self::new(0)
    }

    pub fn normalize(&mut self, text: &str) -> String {
        let Some(cache) = self.cache.as_mut() else {
            return normalize(text);
        };
        if let Some(hit) = cache.get(text) {
            self.hits += 1;
            return hit.clone();
        }
        let out = normalize(text);
        cache.put(text.to_string(), out.clone());
        out
    }

    pub fn cache_hits(&self) -> usize {
        self.hits
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(8192)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_runs_are_maximal() {
        assert_eq!(normalize("took 1500 ms, retry 3"), "took <NUM> ms, retry <NUM>");
    }

    #[test]
    fn cache_returns_same_text() {
        let mut n = Normalizer::new(4);
        let a = n.normalize("job 42 done");
        let b = n.normalize("job 42 done");
        assert_eq!(a, b);
        assert_eq!(n.cache_hits(), 1);
    }

    #[test]
    fn uncached_normalizer_never_hits() {
        let mut n = Normalizer::uncached();
        n.normalize("x 1");
        n.normalize("x 1");
        assert_eq!(n.cache_hits(), 0);
    }
}

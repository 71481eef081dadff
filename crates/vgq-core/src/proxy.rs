//! Round-robin proxy rotation.
//!
//! The coordinator draws one proxy per job dispatch. Health tracking and
//! pool refresh are an external concern; this just cycles a fixed list.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Rotates over a fixed list of `host:port` proxy strings. Safe to share
/// across tasks; `next()` uses an atomic cursor.
#[derive(Debug, Default)]
pub struct ProxyPool {
    proxies: Vec<String>,
    cursor: AtomicUsize,
}

impl ProxyPool {
    pub fn new(proxies: Vec<String>) -> Self {
        Self {
            proxies,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Next proxy in rotation, or None when the pool is empty (direct connection).
    pub fn next(&self) -> Option<String> {
        if self.proxies.is_empty() {
            return None;
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.proxies.len();
        Some(self.proxies[i].clone())
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pool_yields_none() {
        let pool = ProxyPool::new(Vec::new());
        assert_eq!(pool.next(), None);
        assert!(pool.is_empty());
    }

    #[test]
    fn rotates_in_order_and_wraps() {
        let pool = ProxyPool::new(vec!["a:1".into(), "b:2".into()]);
        assert_eq!(pool.next().as_deref(), Some("a:1"));
        assert_eq!(pool.next().as_deref(), Some("b:2"));
        assert_eq!(pool.next().as_deref(), Some("a:1"));
    }
}

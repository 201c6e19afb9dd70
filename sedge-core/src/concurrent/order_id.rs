//! Monotonic order-id source
//!
//! Ids start at 1 and are unique across any interleaving of concurrent
//! callers; relative ordering between callers is unspecified. Relaxed
//! atomics are sufficient because uniqueness is the only contract.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::types::OrderId;

#[derive(Debug)]
pub struct OrderIdSource {
    next: AtomicU64,
}

impl OrderIdSource {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> OrderId {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for OrderIdSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let ids = OrderIdSource::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
        assert_eq!(ids.next_id(), 3);
    }

    #[test]
    fn test_concurrent_callers_get_distinct_ids() {
        let ids = Arc::new(OrderIdSource::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let ids = Arc::clone(&ids);
            handles.push(thread::spawn(move || {
                (0..500).map(|_| ids.next_id()).collect::<Vec<_>>()
            }));
        }

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(all.len(), 4000);

        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 4000, "order ids must be pairwise distinct");
    }
}

//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Round-robin selector.
///
/// The cursor holds the next index to hand out. Each selection claims one
/// slot with a single `fetch_add`, so concurrent callers never start from
/// the same raw value. When the claimed slot is dead the scan moves forward
/// and the cursor is moved past the backend that was picked, so later
/// callers do not rescan the same dead run.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        let len = backends.len();
        if len == 0 {
            return None;
        }

        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % len;

        for i in 0..len {
            let index = (start + i) % len;
            let backend = &backends[index];
            if backend.is_alive() {
                if index != start {
                    self.cursor.store(index + 1, Ordering::Relaxed);
                }
                return Some(backend.clone());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use url::Url;

    fn pool(n: usize) -> Vec<Arc<Backend>> {
        (0..n)
            .map(|i| {
                let url = Url::parse(&format!("http://127.0.0.1:{}", 8080 + i)).unwrap();
                Arc::new(Backend::new(url))
            })
            .collect()
    }

    fn index_of(backends: &[Arc<Backend>], picked: &Arc<Backend>) -> usize {
        backends.iter().position(|b| Arc::ptr_eq(b, picked)).unwrap()
    }

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new();
        let backends = pool(2);

        let s1 = lb.next_server(&backends).unwrap();
        assert_eq!(s1.url(), backends[0].url());

        let s2 = lb.next_server(&backends).unwrap();
        assert_eq!(s2.url(), backends[1].url());

        let s3 = lb.next_server(&backends).unwrap();
        assert_eq!(s3.url(), backends[0].url());
    }

    #[test]
    fn test_full_cycle_visits_each_once() {
        for n in 1..=6 {
            let lb = RoundRobin::new();
            let backends = pool(n);
            let pick = || index_of(&backends, &lb.next_server(&backends).unwrap());
            let first: Vec<usize> = (0..n).map(|_| pick()).collect();
            let second: Vec<usize> = (0..n).map(|_| pick()).collect();

            let mut sorted = first.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..n).collect::<Vec<_>>(), "pool of {n}");
            assert_eq!(first, second, "order must repeat for pool of {n}");
        }
    }

    #[test]
    fn test_single_alive_always_chosen() {
        let lb = RoundRobin::new();
        let backends = pool(4);
        for (i, b) in backends.iter().enumerate() {
            b.set_alive(i == 2);
        }
        for _ in 0..20 {
            let picked = lb.next_server(&backends).unwrap();
            assert_eq!(index_of(&backends, &picked), 2);
        }
    }

    #[test]
    fn test_none_alive() {
        let lb = RoundRobin::new();
        let backends = pool(3);
        backends.iter().for_each(|b| {
            b.set_alive(false);
        });
        assert!(lb.next_server(&backends).is_none());
        assert!(lb.next_server(&[]).is_none());
    }

    #[test]
    fn test_skips_dead_and_resumes_after_pick() {
        let lb = RoundRobin::new();
        let backends = pool(4);
        backends[0].set_alive(false);
        backends[1].set_alive(false);

        // Cursor starts at 0: slots 0 and 1 are dead, so 2 is picked and the
        // next caller resumes at 3.
        assert_eq!(index_of(&backends, &lb.next_server(&backends).unwrap()), 2);
        assert_eq!(index_of(&backends, &lb.next_server(&backends).unwrap()), 3);
        assert_eq!(index_of(&backends, &lb.next_server(&backends).unwrap()), 2);
    }

    #[test]
    fn test_concurrent_advances_are_unique() {
        let lb = Arc::new(RoundRobin::new());
        let backends = Arc::new(pool(3));
        let threads = 8;
        let per_thread = 300;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let lb = lb.clone();
                let backends = backends.clone();
                std::thread::spawn(move || {
                    let mut counts = HashMap::new();
                    for _ in 0..per_thread {
                        let picked = lb.next_server(&backends).unwrap();
                        *counts.entry(index_of(&backends, &picked)).or_insert(0usize) += 1;
                    }
                    counts
                })
            })
            .collect();

        let mut totals = HashMap::new();
        for handle in handles {
            for (index, count) in handle.join().unwrap() {
                *totals.entry(index).or_insert(0usize) += count;
            }
        }

        // All alive: every fetch_add hands out a distinct slot, so the load
        // splits exactly evenly.
        let expected = threads * per_thread / 3;
        for index in 0..3 {
            assert_eq!(totals[&index], expected);
        }
    }
}

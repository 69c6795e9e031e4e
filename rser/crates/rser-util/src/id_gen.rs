use std::sync::atomic::{AtomicU64, Ordering};

/// Generator for process-unique identities
///
/// Object identity in the stream side tables is one of these integers,
/// assigned once when the object is created.
pub struct IdGenerator {
    counter: AtomicU64,
}

impl IdGenerator {
    /// Create a new generator starting from 1
    ///
    /// Zero is never handed out so it can stand for "no identity".
    pub const fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }

    /// Generate a new unique id
    pub fn next(&self) -> u64 {
        let id = self.counter.fetch_add(1, Ordering::Relaxed);
        if id == u64::MAX {
            panic!("IdGenerator overflow: identity space exhausted");
        }
        id
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_starts_at_one() {
        let gen = IdGenerator::new();
        assert_eq!(gen.next(), 1);
        assert_eq!(gen.next(), 2);
    }

    #[test]
    fn test_generators_are_independent() {
        let gen1 = IdGenerator::new();
        let gen2 = IdGenerator::default();

        assert_eq!(gen1.next(), 1);
        assert_eq!(gen1.next(), 2);
        assert_eq!(gen2.next(), 1);
    }

    #[test]
    fn test_static_generator_is_unique_across_threads() {
        use std::collections::HashSet;
        use std::sync::Arc;

        static GEN: IdGenerator = IdGenerator::new();
        let seen = Arc::new(std::sync::Mutex::new(HashSet::new()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let seen = Arc::clone(&seen);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let id = GEN.next();
                        assert!(seen.lock().unwrap().insert(id), "duplicate id {}", id);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(seen.lock().unwrap().len(), 400);
    }
}

//! Object Counter - Reference count and lifetime state in one word
//!
//! Counter Layout (one machine word):
//! ┌─────────────────────────────────────────┐
//! │  Bits 4-63: Reference count             │
//! ├─────────────────────────────────────────┤
//! │  Bits 1-3:  Validity magic (0b101)      │
//! ├─────────────────────────────────────────┤
//! │  Bit 0:     In-heap (may be destroyed)  │
//! └─────────────────────────────────────────┘
//!
//! State transitions:
//!
//! ```text
//!   InStack ──set_can_delete──▶ InHeap
//!      │                          │
//!   acquire                    acquire
//!      ▼                          ▼
//!   Referenced{in_heap=false}  Referenced{in_heap=true}
//!      │ last release             │ last release
//!      ▼                          ▼
//!   InStack                    (Destroy) ──mark_deleted──▶ Deleted
//! ```
//!
//! A deleted counter holds [`COUNTER_DELETED`]. Any other word whose magic
//! bits are wrong is reported as corrupted.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::diag::fatal;
use crate::error::{ObjectError, Result};

/// Bit positions
pub const IN_HEAP_BIT: usize = 0;
pub const MAGIC_SHIFT: usize = 1;
pub const COUNT_SHIFT: usize = 4;

/// Masks for counter fields
pub const IN_HEAP_MASK: usize = 1 << IN_HEAP_BIT;
pub const MAGIC_MASK: usize = 0b111 << MAGIC_SHIFT;
pub const MAGIC_VALID: usize = 0b101 << MAGIC_SHIFT;
pub const COUNT_INCREMENT: usize = 1 << COUNT_SHIFT;

/// Largest reference count the counter can hold
pub const MAX_REFERENCES: usize = usize::MAX >> COUNT_SHIFT;

/// Sentinel stored in the counter of a deleted object
///
/// Its magic bits are `0b010`, so it never decodes as a live state.
pub const COUNTER_DELETED: usize = 0x5b4d_9f34;

const INITIAL_IN_STACK: usize = MAGIC_VALID;

static_assertions::assert_eq_size!(ObjectCounter, usize);
static_assertions::const_assert!(COUNTER_DELETED & MAGIC_MASK != MAGIC_VALID);

/// Decoded counter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterState {
    /// Unreferenced, storage not owned by the counter
    InStack,
    /// Unreferenced, will be destroyed when the last reference goes
    InHeap,
    /// Has live references
    Referenced { count: usize, in_heap: bool },
    /// Destroyed
    Deleted,
    /// The word does not encode a valid state
    Corrupted(usize),
}

impl fmt::Display for CounterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterState::InStack => write!(f, "unreferenced (in stack)"),
            CounterState::InHeap => write!(f, "unreferenced (in heap)"),
            CounterState::Referenced { count, in_heap } => write!(
                f,
                "{} reference{} ({})",
                count,
                if *count == 1 { "" } else { "s" },
                if *in_heap { "in heap" } else { "in stack" }
            ),
            CounterState::Deleted => write!(f, "deleted"),
            CounterState::Corrupted(raw) => write!(f, "corrupted ({:#x})", raw),
        }
    }
}

/// Outcome of a successful release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// References remain
    Alive(usize),
    /// Last reference gone, object stays (in-stack storage)
    Unreferenced,
    /// Last reference gone, the owner must destroy the object
    Destroy,
}

/// Atomic reference counter with embedded lifetime state
pub struct ObjectCounter {
    word: AtomicUsize,
}

impl ObjectCounter {
    /// Create a counter for an object whose storage it does not own
    pub const fn new_in_stack() -> Self {
        Self {
            word: AtomicUsize::new(INITIAL_IN_STACK),
        }
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(raw: usize) -> Self {
        Self {
            word: AtomicUsize::new(raw),
        }
    }

    /// Raw counter word
    #[inline]
    pub fn raw(&self) -> usize {
        self.word.load(Ordering::Acquire)
    }

    /// Decode a raw counter word
    pub fn decode(raw: usize) -> CounterState {
        if raw == COUNTER_DELETED {
            return CounterState::Deleted;
        }
        if raw & MAGIC_MASK != MAGIC_VALID {
            return CounterState::Corrupted(raw);
        }
        let count = raw >> COUNT_SHIFT;
        let in_heap = raw & IN_HEAP_MASK != 0;
        match (count, in_heap) {
            (0, false) => CounterState::InStack,
            (0, true) => CounterState::InHeap,
            (count, in_heap) => CounterState::Referenced { count, in_heap },
        }
    }

    /// Current state
    #[inline]
    pub fn state(&self) -> CounterState {
        Self::decode(self.raw())
    }

    /// Number of live references (0 for deleted or corrupted counters)
    pub fn reference_count(&self) -> usize {
        match self.state() {
            CounterState::Referenced { count, .. } => count,
            _ => 0,
        }
    }

    /// Check if any reference exists
    pub fn is_referenced(&self) -> bool {
        matches!(self.state(), CounterState::Referenced { .. })
    }

    /// Check if the object will be destroyed by its last release
    pub fn can_be_deleted(&self) -> bool {
        self.raw() & IN_HEAP_MASK != 0 && !matches!(
            self.state(),
            CounterState::Deleted | CounterState::Corrupted(_)
        )
    }

    // === Transitions ===

    /// Mark the object as heap-owned
    ///
    /// Allowed once, and only before the first reference is taken.
    pub fn set_can_delete(&self) -> Result<()> {
        let mut current = self.raw();
        loop {
            match Self::decode(current) {
                CounterState::InStack => {}
                CounterState::InHeap => return Err(ObjectError::CanDeleteAlreadySet),
                CounterState::Referenced { count, .. } => {
                    return Err(ObjectError::CanDeleteAfterUse { count })
                }
                CounterState::Deleted => return Err(ObjectError::UseAfterDelete),
                CounterState::Corrupted(raw) => return Err(ObjectError::Corrupted { raw }),
            }

            match self.word.compare_exchange_weak(
                current,
                current | IN_HEAP_MASK,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(val) => current = val,
            }
        }
    }

    /// Add a reference, returning the new count
    pub fn try_acquire(&self) -> Result<usize> {
        let mut current = self.raw();
        loop {
            let count = match Self::decode(current) {
                CounterState::InStack | CounterState::InHeap => 0,
                CounterState::Referenced { count, .. } => count,
                CounterState::Deleted => return Err(ObjectError::UseAfterDelete),
                CounterState::Corrupted(raw) => return Err(ObjectError::Corrupted { raw }),
            };
            if count >= MAX_REFERENCES {
                return Err(ObjectError::ReferenceOverflow { count });
            }

            match self.word.compare_exchange_weak(
                current,
                current + COUNT_INCREMENT,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(count + 1),
                Err(val) => current = val,
            }
        }
    }

    /// Drop a reference
    pub fn try_release(&self) -> Result<Release> {
        let mut current = self.raw();
        loop {
            let (count, in_heap) = match Self::decode(current) {
                CounterState::Referenced { count, in_heap } => (count, in_heap),
                CounterState::InStack | CounterState::InHeap => {
                    return Err(ObjectError::ReleaseUnreferenced)
                }
                CounterState::Deleted => return Err(ObjectError::UseAfterDelete),
                CounterState::Corrupted(raw) => return Err(ObjectError::Corrupted { raw }),
            };

            match self.word.compare_exchange_weak(
                current,
                current - COUNT_INCREMENT,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Ok(match (count - 1, in_heap) {
                        (0, true) => Release::Destroy,
                        (0, false) => Release::Unreferenced,
                        (left, _) => Release::Alive(left),
                    })
                }
                Err(val) => current = val,
            }
        }
    }

    /// Stamp the deleted sentinel
    ///
    /// Only an unreferenced heap object may be deleted.
    pub fn mark_deleted(&self) -> Result<()> {
        let mut current = self.raw();
        loop {
            match Self::decode(current) {
                CounterState::InHeap => {}
                CounterState::InStack => return Err(ObjectError::DeleteInStack),
                CounterState::Referenced { count, .. } => {
                    return Err(ObjectError::DeleteReferenced { count })
                }
                CounterState::Deleted => return Err(ObjectError::DoubleDelete),
                CounterState::Corrupted(raw) => return Err(ObjectError::Corrupted { raw }),
            }

            match self.word.compare_exchange_weak(
                current,
                COUNTER_DELETED,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(val) => current = val,
            }
        }
    }

    /// Add a reference; violations are fatal
    #[inline]
    pub fn acquire(&self) -> usize {
        self.try_acquire().unwrap_or_else(|err| fatal(err))
    }

    /// Drop a reference; violations are fatal
    #[inline]
    pub fn release(&self) -> Release {
        self.try_release().unwrap_or_else(|err| fatal(err))
    }
}

impl Default for ObjectCounter {
    fn default() -> Self {
        Self::new_in_stack()
    }
}

impl fmt::Debug for ObjectCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectCounter").field(&self.state()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_counter_is_in_stack() {
        let counter = ObjectCounter::new_in_stack();
        assert_eq!(counter.state(), CounterState::InStack);
        assert_eq!(counter.reference_count(), 0);
        assert!(!counter.is_referenced());
        assert!(!counter.can_be_deleted());
    }

    #[test]
    fn test_stack_object_lifecycle() {
        let counter = ObjectCounter::new_in_stack();

        assert_eq!(counter.try_acquire(), Ok(1));
        assert_eq!(counter.try_acquire(), Ok(2));
        assert_eq!(
            counter.state(),
            CounterState::Referenced { count: 2, in_heap: false }
        );

        assert_eq!(counter.try_release(), Ok(Release::Alive(1)));
        assert_eq!(counter.try_release(), Ok(Release::Unreferenced));
        assert_eq!(counter.state(), CounterState::InStack);
    }

    #[test]
    fn test_heap_object_lifecycle() {
        let counter = ObjectCounter::new_in_stack();
        counter.set_can_delete().unwrap();
        assert_eq!(counter.state(), CounterState::InHeap);
        assert!(counter.can_be_deleted());

        counter.try_acquire().unwrap();
        assert_eq!(counter.try_release(), Ok(Release::Destroy));
        counter.mark_deleted().unwrap();
        assert_eq!(counter.state(), CounterState::Deleted);
        assert_eq!(counter.raw(), COUNTER_DELETED);
    }

    #[test]
    fn test_can_delete_only_once() {
        let counter = ObjectCounter::new_in_stack();
        counter.set_can_delete().unwrap();
        assert_eq!(counter.set_can_delete(), Err(ObjectError::CanDeleteAlreadySet));
    }

    #[test]
    fn test_can_delete_before_use_only() {
        let counter = ObjectCounter::new_in_stack();
        counter.try_acquire().unwrap();
        assert_eq!(
            counter.set_can_delete(),
            Err(ObjectError::CanDeleteAfterUse { count: 1 })
        );
    }

    #[test]
    fn test_release_without_acquire() {
        let counter = ObjectCounter::new_in_stack();
        assert_eq!(counter.try_release(), Err(ObjectError::ReleaseUnreferenced));
    }

    #[test]
    fn test_deleted_counter_rejects_everything() {
        let counter = ObjectCounter::from_raw(COUNTER_DELETED);
        assert_eq!(counter.try_acquire(), Err(ObjectError::UseAfterDelete));
        assert_eq!(counter.try_release(), Err(ObjectError::UseAfterDelete));
        assert_eq!(counter.mark_deleted(), Err(ObjectError::DoubleDelete));
        assert_eq!(counter.set_can_delete(), Err(ObjectError::UseAfterDelete));
    }

    #[test]
    fn test_corrupted_counter_detected() {
        let raw = 0xdead_0000;
        let counter = ObjectCounter::from_raw(raw);
        assert_eq!(counter.state(), CounterState::Corrupted(raw));
        assert_eq!(counter.try_acquire(), Err(ObjectError::Corrupted { raw }));
        assert_eq!(counter.try_release(), Err(ObjectError::Corrupted { raw }));
    }

    #[test]
    fn test_reference_overflow() {
        let raw = MAGIC_VALID | IN_HEAP_MASK | (MAX_REFERENCES << COUNT_SHIFT);
        let counter = ObjectCounter::from_raw(raw);
        assert_eq!(counter.reference_count(), MAX_REFERENCES);
        assert_eq!(
            counter.try_acquire(),
            Err(ObjectError::ReferenceOverflow { count: MAX_REFERENCES })
        );
        // the failed acquire leaves the word untouched
        assert_eq!(counter.raw(), raw);
    }

    #[test]
    fn test_delete_in_wrong_state() {
        let counter = ObjectCounter::new_in_stack();
        assert_eq!(counter.mark_deleted(), Err(ObjectError::DeleteInStack));

        counter.set_can_delete().unwrap();
        counter.try_acquire().unwrap();
        assert_eq!(
            counter.mark_deleted(),
            Err(ObjectError::DeleteReferenced { count: 1 })
        );
    }

    #[test]
    #[should_panic(expected = "Release of unreferenced object")]
    fn test_release_is_fatal() {
        let counter = ObjectCounter::new_in_stack();
        counter.release();
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CounterState::InStack.to_string(), "unreferenced (in stack)");
        assert_eq!(
            CounterState::Referenced { count: 1, in_heap: true }.to_string(),
            "1 reference (in heap)"
        );
        assert_eq!(
            CounterState::Referenced { count: 3, in_heap: false }.to_string(),
            "3 references (in stack)"
        );
        assert_eq!(CounterState::Corrupted(0x10).to_string(), "corrupted (0x10)");
    }

    #[test]
    fn test_concurrent_acquire_release() {
        use std::sync::Arc;

        let counter = Arc::new(ObjectCounter::new_in_stack());
        counter.try_acquire().unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counter.try_acquire().unwrap();
                        counter.try_release().unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.reference_count(), 1);
    }
}

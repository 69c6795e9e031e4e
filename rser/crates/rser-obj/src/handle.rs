//! Ref - shared-ownership handle over a counted cell
//!
//! An [`ObjectCell`] pairs a value with its [`ObjectCounter`]. A [`Ref`]
//! is a counted pointer to a cell:
//!
//! - [`Ref::new`] moves the value into a heap cell, flags it can-delete and
//!   takes the first reference. The cell is freed exactly once, when the
//!   last `Ref` drops.
//! - [`Ref::from_static`] references a cell with static storage. Dropping
//!   the last `Ref` only returns it to the unreferenced state.
//!
//! # Example
//!
//! ```rust
//! use rser_obj::{CounterState, ObjectCell, Ref};
//!
//! static ROOT: ObjectCell<&str> = ObjectCell::new("root");
//!
//! let a = Ref::new(String::from("shared"));
//! let b = a.clone();
//! assert!(Ref::ptr_eq(&a, &b));
//! assert_eq!(Ref::reference_count(&a), 2);
//!
//! let r = Ref::from_static(&ROOT);
//! drop(r);
//! assert_eq!(ROOT.counter().state(), CounterState::InStack);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;

use crate::counter::{CounterState, ObjectCounter, Release};
use crate::diag::fatal;

/// A value together with its reference counter
pub struct ObjectCell<T> {
    counter: ObjectCounter,
    value: T,
}

impl<T> ObjectCell<T> {
    /// Create an in-stack cell
    pub const fn new(value: T) -> Self {
        Self {
            counter: ObjectCounter::new_in_stack(),
            value,
        }
    }

    /// The cell's counter
    #[inline]
    pub fn counter(&self) -> &ObjectCounter {
        &self.counter
    }

    /// The contained value
    #[inline]
    pub fn get(&self) -> &T {
        &self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for ObjectCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectCell")
            .field("state", &self.counter.state())
            .field("value", &self.value)
            .finish()
    }
}

/// Counted handle to an [`ObjectCell`]
pub struct Ref<T> {
    ptr: NonNull<ObjectCell<T>>,
    _marker: PhantomData<ObjectCell<T>>,
}

// Same rules as `Arc`: the count is atomic, the value is shared.
unsafe impl<T: Send + Sync> Send for Ref<T> {}
unsafe impl<T: Send + Sync> Sync for Ref<T> {}

impl<T> Ref<T> {
    /// Move `value` into a new heap cell
    pub fn new(value: T) -> Self {
        let cell = Box::new(ObjectCell::new(value));
        if let Err(err) = cell.counter.set_can_delete() {
            fatal(err);
        }
        cell.counter.acquire();
        Self {
            ptr: NonNull::from(Box::leak(cell)),
            _marker: PhantomData,
        }
    }

    /// Reference a cell with static storage
    pub fn from_static(cell: &'static ObjectCell<T>) -> Self {
        cell.counter.acquire();
        Self {
            ptr: NonNull::from(cell),
            _marker: PhantomData,
        }
    }

    #[inline]
    fn cell(&self) -> &ObjectCell<T> {
        // SAFETY: the cell stays allocated while this handle holds a count
        unsafe { self.ptr.as_ref() }
    }

    /// True if both handles point at the same cell
    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.ptr == other.ptr
    }

    /// Number of live handles to this cell
    #[inline]
    pub fn reference_count(this: &Self) -> usize {
        this.cell().counter.reference_count()
    }

    /// The cell's counter
    #[inline]
    pub fn counter(this: &Self) -> &ObjectCounter {
        &this.cell().counter
    }

    /// True if the cell is freed when the last handle drops
    #[inline]
    pub fn is_heap(this: &Self) -> bool {
        this.cell().counter.can_be_deleted()
    }

    /// Address of the value, for diagnostics
    #[inline]
    pub fn as_ptr(this: &Self) -> *const T {
        &this.cell().value
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        self.cell().counter.acquire();
        Self {
            ptr: self.ptr,
            _marker: PhantomData,
        }
    }
}

impl<T> Drop for Ref<T> {
    fn drop(&mut self) {
        match self.cell().counter.release() {
            Release::Alive(_) | Release::Unreferenced => {}
            Release::Destroy => {
                if cfg!(debug_assertions) {
                    if let Err(err) = self.cell().counter.mark_deleted() {
                        fatal(err);
                    }
                }
                log::trace!("destroying object cell at {:p}", self.ptr);
                // SAFETY: `Destroy` is only returned for heap cells created by
                // `Ref::new`, and only to the handle that dropped the last count.
                unsafe { drop(Box::from_raw(self.ptr.as_ptr())) };
            }
        }
    }
}

impl<T> Deref for Ref<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        let cell = self.cell();
        debug_assert!(
            !matches!(
                cell.counter.state(),
                CounterState::Deleted | CounterState::Corrupted(_)
            ),
            "dereference of {} object",
            cell.counter.state()
        );
        &cell.value
    }
}

impl<T> AsRef<T> for Ref<T> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T: fmt::Debug> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: PartialEq> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        Ref::ptr_eq(self, other) || **self == **other
    }
}

impl<T: Eq> Eq for Ref<T> {}

impl<T> fmt::Pointer for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&Ref::as_ptr(self), f)
    }
}

static_assertions::assert_eq_size!(Ref<u64>, usize);
static_assertions::assert_eq_size!(Option<Ref<u64>>, usize);
static_assertions::assert_impl_all!(Ref<u32>: Send, Sync, Clone);
static_assertions::assert_not_impl_any!(Ref<std::cell::Cell<u32>>: Send, Sync);

//! Typed tables
//!
//! The object streams number things in several independent spaces (types,
//! objects being written, objects being read). [`IndexVec`] keeps each
//! table tied to its own index type so the spaces cannot be confused.
//!
//! # Example
//!
//! ```
//! use rser_util::index_vec::{IndexVec, Idx};
//! use rser_util::define_idx;
//!
//! define_idx!(SlotId);
//!
//! let mut slots: IndexVec<SlotId, &str> = IndexVec::new();
//! let id = slots.push("root");
//! assert_eq!(slots[id], "root");
//! assert_eq!(id.index(), 0);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use crate::error::{IndexVecError, IndexVecResult};

/// A dense index into an [`IndexVec`]
pub trait Idx: Copy + Eq {
    /// Panics when `idx` does not fit the index type.
    fn from_usize(idx: usize) -> Self;

    fn index(self) -> usize;
}

impl Idx for usize {
    #[inline]
    fn from_usize(idx: usize) -> Self {
        idx
    }

    #[inline]
    fn index(self) -> usize {
        self
    }
}

/// Table whose positions are handed out as `I`
///
/// Positions are only ever appended or cut from the end, so an index
/// stays valid until the table is truncated below it.
#[derive(Clone, PartialEq)]
pub struct IndexVec<I, T> {
    raw: Vec<T>,
    _marker: PhantomData<fn(&I)>,
}

impl<I, T> IndexVec<I, T> {
    pub const fn new() -> Self {
        Self {
            raw: Vec::new(),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn clear(&mut self) {
        self.raw.clear()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.raw.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.raw
    }
}

impl<I: Idx, T> IndexVec<I, T> {
    /// Append `value`; the returned index names it from now on
    pub fn push(&mut self, value: T) -> I {
        let id = I::from_usize(self.raw.len());
        self.raw.push(value);
        id
    }

    /// Index the next [`push`](Self::push) will hand out
    pub fn next_index(&self) -> I {
        I::from_usize(self.raw.len())
    }

    #[inline]
    pub fn get(&self, id: I) -> Option<&T> {
        self.raw.get(id.index())
    }

    #[inline]
    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.raw.get_mut(id.index())
    }

    /// Checked lookup that reports the table length on a miss
    pub fn try_get(&self, id: I) -> IndexVecResult<&T> {
        self.raw.get(id.index()).ok_or(IndexVecError::OutOfBounds {
            index: id.index(),
            length: self.raw.len(),
        })
    }

    pub fn iter_enumerated(&self) -> impl Iterator<Item = (I, &T)> {
        self.raw
            .iter()
            .enumerate()
            .map(|(position, item)| (I::from_usize(position), item))
    }

    /// Forget everything from `first_dropped` on; no-op past the end
    pub fn truncate(&mut self, first_dropped: I) {
        self.raw.truncate(first_dropped.index())
    }
}

impl<I: Idx, T> Index<I> for IndexVec<I, T> {
    type Output = T;

    #[inline]
    fn index(&self, id: I) -> &T {
        &self.raw[id.index()]
    }
}

impl<I: Idx, T> IndexMut<I> for IndexVec<I, T> {
    #[inline]
    fn index_mut(&mut self, id: I) -> &mut T {
        &mut self.raw[id.index()]
    }
}

impl<I, T> Default for IndexVec<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, T: fmt::Debug> fmt::Debug for IndexVec<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.raw).finish()
    }
}

impl<I, T> FromIterator<T> for IndexVec<I, T> {
    fn from_iter<It: IntoIterator<Item = T>>(items: It) -> Self {
        Self {
            raw: Vec::from_iter(items),
            _marker: PhantomData,
        }
    }
}

/// Declare a `u32` newtype usable as an [`Idx`]
///
/// The generated type prints as its bare number, which is how indices
/// show up in stream error messages.
///
/// ```
/// use rser_util::define_idx;
/// use rser_util::index_vec::IndexVec;
///
/// define_idx!(FrameId);
///
/// let mut frames: IndexVec<FrameId, i32> = IndexVec::new();
/// let id = frames.push(42);
/// assert_eq!(frames[id], 42);
/// assert_eq!(id.to_string(), "0");
/// ```
#[macro_export]
macro_rules! define_idx {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $crate::index_vec::Idx for $name {
            fn from_usize(idx: usize) -> Self {
                match u32::try_from(idx) {
                    Ok(raw) => $name(raw),
                    Err(_) => panic!("{} {} does not fit in u32", stringify!($name), idx),
                }
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

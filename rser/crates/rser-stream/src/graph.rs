//! Object tables
//!
//! Both directions number shared objects in the order they first appear.
//! The writer learns that order up front with a discovery walk that visits
//! values exactly as emission will; the reader learns it as objects arrive.
//! Neither index is ever transmitted except in references.
//!
//! ```text
//! writer                                   reader
//! discover: A(0) -> B(1) -> C(2)           A arrives  -> push 0
//! emit A: new                              B arrives  -> push 1
//!   emit B: new                            ref 0      -> table[0] = A
//!     ref 0 (A)                            C arrives  -> push 2
//!   emit C: new
//! ```

use rser_type::{ObjectId, ObjectRef, TypeId, TypeKind, TypeRegistry, Value};
use rser_util::{FxHashMap, Idx, IndexVec, IndexVecError};

use crate::config::StreamConfig;
use crate::error::ErrorKind;

rser_util::define_idx!(
    /// Position of a shared object in a stream's object table
    ObjectIndex
);

/// A discovered object
#[derive(Debug)]
pub struct WriteEntry {
    pub object: ObjectRef,
    pub written: bool,
}

/// Writer side: identity to index, plus written state
#[derive(Debug, Default)]
pub struct ObjectTable {
    entries: IndexVec<ObjectIndex, WriteEntry>,
    index_of: FxHashMap<ObjectId, ObjectIndex>,
    written: usize,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index_of(&self, id: ObjectId) -> Option<ObjectIndex> {
        self.index_of.get(&id).copied()
    }

    /// Register an object; returns its index and whether it is new
    pub fn register(&mut self, object: &ObjectRef) -> (ObjectIndex, bool) {
        if let Some(index) = self.index_of(object.id()) {
            return (index, false);
        }
        let index = self.entries.push(WriteEntry {
            object: object.clone(),
            written: false,
        });
        self.index_of.insert(object.id(), index);
        log::trace!("registered object {} as index {}", object.id(), index);
        (index, true)
    }

    pub fn is_written(&self, index: ObjectIndex) -> bool {
        self.entries.get(index).is_some_and(|entry| entry.written)
    }

    pub fn mark_written(&mut self, index: ObjectIndex) {
        if let Some(entry) = self.entries.get_mut(index) {
            if !entry.written {
                entry.written = true;
                self.written += 1;
            }
        }
    }

    /// Objects written in full; the reader numbers the next one by this
    pub fn written_count(&self) -> usize {
        self.written
    }

    /// First registered object that was never written
    pub fn first_unwritten(&self) -> Option<(ObjectIndex, &ObjectRef)> {
        self.entries
            .iter_enumerated()
            .find(|(_, entry)| !entry.written)
            .map(|(index, entry)| (index, &entry.object))
    }

    /// Forget objects from `len` on
    pub fn truncate(&mut self, len: usize) {
        let len = ObjectIndex::from_usize(len.min(self.entries.len()));
        for index in len.index()..self.entries.len() {
            let id = self.entries[ObjectIndex::from_usize(index)].object.id();
            self.index_of.remove(&id);
        }
        self.entries.truncate(len);
        self.written = self.entries.iter().filter(|entry| entry.written).count();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index_of.clear();
        self.written = 0;
    }

    /// Register every object reachable from `value`, in emission order
    ///
    /// Objects already in the table are not entered again, so cycles and
    /// objects from earlier writes end the walk. Shape errors are left for
    /// emission to report with a proper location.
    pub fn discover(
        &mut self,
        registry: &TypeRegistry,
        config: &StreamConfig,
        value: &Value,
        type_id: TypeId,
    ) -> Result<(), ErrorKind> {
        let before = self.len();
        Discovery {
            table: self,
            registry,
            config,
        }
        .walk(value, type_id, 1)?;
        log::debug!("discovered {} new objects", self.len() - before);
        Ok(())
    }
}

struct Discovery<'t, 'r> {
    table: &'t mut ObjectTable,
    registry: &'r TypeRegistry,
    config: &'r StreamConfig,
}

impl Discovery<'_, '_> {
    fn walk(&mut self, value: &Value, type_id: TypeId, depth: usize) -> Result<(), ErrorKind> {
        if depth > self.config.max_depth {
            return Err(ErrorKind::LimitExceeded(format!(
                "nesting deeper than {}",
                self.config.max_depth
            )));
        }
        let Ok(kind) = self.registry.kind(type_id) else {
            return Ok(());
        };
        match (kind, value) {
            (TypeKind::Class(class), Value::Class(object)) => {
                for (member, slot) in class.members.iter().zip(&object.members) {
                    let Some(value) = slot else {
                        continue;
                    };
                    if self.config.omit_defaults && member.default.as_ref() == Some(value) {
                        continue;
                    }
                    self.walk(value, member.type_id, depth + 1)?;
                }
            }
            (TypeKind::Choice(choice), Value::Choice(selected)) => {
                if let Some(variant) = choice.variants.get(selected.variant) {
                    self.walk(&selected.value, variant.type_id, depth + 1)?;
                }
            }
            (TypeKind::Container(container), Value::List(items)) => {
                for item in items {
                    self.walk(item, container.element, depth + 1)?;
                }
            }
            (TypeKind::Pointer(_), Value::Pointer(Some(object))) => {
                let (_, new) = self.table.register(object);
                if new {
                    let inner = object.borrow();
                    self.walk(&inner, object.type_id(), depth + 1)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Reader side: objects in arrival order
#[derive(Debug, Default)]
pub struct ReadTable {
    objects: IndexVec<ObjectIndex, ObjectRef>,
}

impl ReadTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn push(&mut self, object: ObjectRef) -> ObjectIndex {
        self.objects.push(object)
    }

    /// The object a wire reference numbered `index` points at
    pub fn resolve(&self, index: u64) -> Result<&ObjectRef, ErrorKind> {
        match u32::try_from(index) {
            Ok(position) => self.objects.try_get(ObjectIndex(position)).map_err(
                |IndexVecError::OutOfBounds { length, .. }| ErrorKind::InvalidObjectIndex {
                    index,
                    count: length,
                },
            ),
            Err(_) => Err(ErrorKind::InvalidObjectIndex {
                index,
                count: self.objects.len(),
            }),
        }
    }

    pub fn truncate(&mut self, len: usize) {
        self.objects
            .truncate(ObjectIndex::from_usize(len.min(self.objects.len())));
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }
}

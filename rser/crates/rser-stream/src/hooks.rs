//! Serializer hooks
//!
//! A hook takes over the reading or writing of one part of a value graph:
//! every value of a type, one class member, one choice variant, or the
//! elements of one container type. Hooks are installed per stream and
//! looked up before the stream does its own work; with no hook installed
//! the stream behaves as if the tables were empty.
//!
//! A hook must consume or produce exactly one value of the type it stands
//! for. It usually does so through the stream it is handed:
//!
//! ```text
//! read_value(T)         -> object hook for T?   -> read_object_default(T)
//! read_class(C) member i -> member hook (C, i)?  -> read_nested(member type)
//! read_choice(C) var. i  -> variant hook (C, i)? -> read_nested(variant type)
//! container L element    -> element hook for L?  -> read_nested(element type)
//! ```
//!
//! Writers number shared objects before emitting anything. A write hook may
//! change values, but shared objects must still be written in that order;
//! a hook that drops or reorders them makes the write fail.

use std::fmt;
use std::io::Write;
use std::rc::Rc;

use rser_type::{MemberInfo, TypeError, TypeId, TypeKind, TypeRegistry, Value};
use rser_util::FxHashMap;

use crate::error::ErrorKind;
use crate::istream::ObjectIStream;
use crate::ostream::ObjectOStream;

/// Result of a hook; the stream locates and records the error
pub type HookResult<T> = std::result::Result<T, ErrorKind>;

/// Reads every value of one type
pub trait ReadObjectHook {
    fn read_object(&self, input: &mut ObjectIStream<'_, '_>, type_id: TypeId) -> HookResult<Value>;
}

/// Reads one class member or choice variant
pub trait ReadMemberHook {
    fn read_member(
        &self,
        input: &mut ObjectIStream<'_, '_>,
        member: &MemberInfo,
    ) -> HookResult<Value>;
}

/// Reads each element of one container type
pub trait ReadElementHook {
    fn read_element(&self, input: &mut ObjectIStream<'_, '_>, element: TypeId)
        -> HookResult<Value>;
}

/// Writes every value of one type
pub trait WriteObjectHook<W: Write> {
    fn write_object(
        &self,
        output: &mut ObjectOStream<'_, W>,
        value: &Value,
        type_id: TypeId,
    ) -> HookResult<()>;
}

/// Writes one class member or choice variant
pub trait WriteMemberHook<W: Write> {
    fn write_member(
        &self,
        output: &mut ObjectOStream<'_, W>,
        member: &MemberInfo,
        value: &Value,
    ) -> HookResult<()>;
}

/// Writes each element of one container type
pub trait WriteElementHook<W: Write> {
    fn write_element(
        &self,
        output: &mut ObjectOStream<'_, W>,
        element: TypeId,
        value: &Value,
    ) -> HookResult<()>;
}

/// Index of the member `name` of class `class`
pub fn member_index(registry: &TypeRegistry, class: TypeId, name: &str) -> Result<usize, TypeError> {
    let info = registry.info(class)?;
    let found = match &info.kind {
        TypeKind::Class(class) => class.member_by_name(name),
        _ => None,
    };
    found.ok_or_else(|| unknown_member(&info.name, name))
}

/// Index of the variant `name` of choice `choice`
pub fn variant_index(registry: &TypeRegistry, choice: TypeId, name: &str) -> Result<usize, TypeError> {
    let info = registry.info(choice)?;
    let found = match &info.kind {
        TypeKind::Choice(choice) => choice.variant_by_name(name),
        _ => None,
    };
    found.ok_or_else(|| unknown_member(&info.name, name))
}

fn unknown_member(type_name: &str, member: &str) -> TypeError {
    TypeError::UnknownMember {
        type_name: type_name.to_owned(),
        member: member.to_owned(),
    }
}

/// Fail unless `type_id` is a container type
pub fn check_container(registry: &TypeRegistry, type_id: TypeId) -> Result<(), TypeError> {
    let info = registry.info(type_id)?;
    match info.kind {
        TypeKind::Container(_) => Ok(()),
        _ => Err(TypeError::WrongKind {
            type_name: info.name.clone(),
            expected: "container",
        }),
    }
}

/// Hook tables of one input stream
#[derive(Default, Clone)]
pub struct ReadHooks {
    objects: FxHashMap<TypeId, Rc<dyn ReadObjectHook>>,
    members: FxHashMap<(TypeId, usize), Rc<dyn ReadMemberHook>>,
    variants: FxHashMap<(TypeId, usize), Rc<dyn ReadMemberHook>>,
    elements: FxHashMap<TypeId, Rc<dyn ReadElementHook>>,
}

impl ReadHooks {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
            && self.members.is_empty()
            && self.variants.is_empty()
            && self.elements.is_empty()
    }

    pub fn object(&self, type_id: TypeId) -> Option<Rc<dyn ReadObjectHook>> {
        self.objects.get(&type_id).cloned()
    }

    pub fn member(&self, class: TypeId, index: usize) -> Option<Rc<dyn ReadMemberHook>> {
        self.members.get(&(class, index)).cloned()
    }

    pub fn variant(&self, choice: TypeId, index: usize) -> Option<Rc<dyn ReadMemberHook>> {
        self.variants.get(&(choice, index)).cloned()
    }

    pub fn element(&self, container: TypeId) -> Option<Rc<dyn ReadElementHook>> {
        self.elements.get(&container).cloned()
    }

    pub fn set_object(&mut self, type_id: TypeId, hook: Rc<dyn ReadObjectHook>) {
        self.objects.insert(type_id, hook);
    }

    pub fn reset_object(&mut self, type_id: TypeId) {
        self.objects.remove(&type_id);
    }

    pub fn set_member(&mut self, class: TypeId, index: usize, hook: Rc<dyn ReadMemberHook>) {
        self.members.insert((class, index), hook);
    }

    pub fn reset_member(&mut self, class: TypeId, index: usize) {
        self.members.remove(&(class, index));
    }

    pub fn set_variant(&mut self, choice: TypeId, index: usize, hook: Rc<dyn ReadMemberHook>) {
        self.variants.insert((choice, index), hook);
    }

    pub fn reset_variant(&mut self, choice: TypeId, index: usize) {
        self.variants.remove(&(choice, index));
    }

    pub fn set_element(&mut self, container: TypeId, hook: Rc<dyn ReadElementHook>) {
        self.elements.insert(container, hook);
    }

    pub fn reset_element(&mut self, container: TypeId) {
        self.elements.remove(&container);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Debug for ReadHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadHooks")
            .field("objects", &self.objects.len())
            .field("members", &self.members.len())
            .field("variants", &self.variants.len())
            .field("elements", &self.elements.len())
            .finish()
    }
}

/// Hook tables of one output stream
pub struct WriteHooks<W: Write> {
    objects: FxHashMap<TypeId, Rc<dyn WriteObjectHook<W>>>,
    members: FxHashMap<(TypeId, usize), Rc<dyn WriteMemberHook<W>>>,
    variants: FxHashMap<(TypeId, usize), Rc<dyn WriteMemberHook<W>>>,
    elements: FxHashMap<TypeId, Rc<dyn WriteElementHook<W>>>,
}

impl<W: Write> Default for WriteHooks<W> {
    fn default() -> Self {
        Self {
            objects: FxHashMap::default(),
            members: FxHashMap::default(),
            variants: FxHashMap::default(),
            elements: FxHashMap::default(),
        }
    }
}

impl<W: Write> Clone for WriteHooks<W> {
    fn clone(&self) -> Self {
        Self {
            objects: self.objects.clone(),
            members: self.members.clone(),
            variants: self.variants.clone(),
            elements: self.elements.clone(),
        }
    }
}

impl<W: Write> WriteHooks<W> {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
            && self.members.is_empty()
            && self.variants.is_empty()
            && self.elements.is_empty()
    }

    pub fn object(&self, type_id: TypeId) -> Option<Rc<dyn WriteObjectHook<W>>> {
        self.objects.get(&type_id).cloned()
    }

    pub fn member(&self, class: TypeId, index: usize) -> Option<Rc<dyn WriteMemberHook<W>>> {
        self.members.get(&(class, index)).cloned()
    }

    pub fn variant(&self, choice: TypeId, index: usize) -> Option<Rc<dyn WriteMemberHook<W>>> {
        self.variants.get(&(choice, index)).cloned()
    }

    pub fn element(&self, container: TypeId) -> Option<Rc<dyn WriteElementHook<W>>> {
        self.elements.get(&container).cloned()
    }

    pub fn set_object(&mut self, type_id: TypeId, hook: Rc<dyn WriteObjectHook<W>>) {
        self.objects.insert(type_id, hook);
    }

    pub fn reset_object(&mut self, type_id: TypeId) {
        self.objects.remove(&type_id);
    }

    pub fn set_member(&mut self, class: TypeId, index: usize, hook: Rc<dyn WriteMemberHook<W>>) {
        self.members.insert((class, index), hook);
    }

    pub fn reset_member(&mut self, class: TypeId, index: usize) {
        self.members.remove(&(class, index));
    }

    pub fn set_variant(&mut self, choice: TypeId, index: usize, hook: Rc<dyn WriteMemberHook<W>>) {
        self.variants.insert((choice, index), hook);
    }

    pub fn reset_variant(&mut self, choice: TypeId, index: usize) {
        self.variants.remove(&(choice, index));
    }

    pub fn set_element(&mut self, container: TypeId, hook: Rc<dyn WriteElementHook<W>>) {
        self.elements.insert(container, hook);
    }

    pub fn reset_element(&mut self, container: TypeId) {
        self.elements.remove(&container);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl<W: Write> fmt::Debug for WriteHooks<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteHooks")
            .field("objects", &self.objects.len())
            .field("members", &self.members.len())
            .field("variants", &self.variants.len())
            .field("elements", &self.elements.len())
            .finish()
    }
}

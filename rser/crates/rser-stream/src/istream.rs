//! Object input stream
//!
//! Reads values of registered types back from BER. Shared objects are
//! numbered in arrival order, which is the order the writer discovered
//! them in, so an `[APPLICATION 2] n` reference resolves to the n-th object
//! read in the current session. An object enters the table before its own
//! value is read; a cycle back to it resolves to the same handle.
//!
//! Values that are not wanted are passed over with [`ObjectIStream::skip`]
//! or [`ObjectIStream::skip_shared`], which still number the objects inside
//! them. [`ObjectIStream::skip_value`] only looks at the framing and is
//! refused once the session has numbered objects.

use std::io::Read;
use std::rc::Rc;

use rser_type::{
    ChoiceInfo, ChoiceValue, ClassInfo, ClassValue, EnumValues, Object, ObjectRef, TypeError,
    TypeId, TypeKind, TypeRegistry, Value,
};

use crate::ber::codec;
use crate::ber::reader::{BerReader, End};
use crate::ber::tag::{self, Tag, TagClass};
use crate::config::StreamConfig;
use crate::error::{ConfigError, ErrorKind, FailFlags, Result, StreamError};
use crate::frame::{Frame, FrameStack};
use crate::graph::ReadTable;
use crate::hooks::{
    self, HookResult, ReadElementHook, ReadHooks, ReadMemberHook, ReadObjectHook,
};
use crate::ostream::{class_tag, container_tag};

type KindResult<T> = std::result::Result<T, ErrorKind>;

fn describe(tag: Tag) -> String {
    tag.universal_name()
        .map_or_else(|| tag.to_string(), str::to_owned)
}

pub struct ObjectIStream<'a, 'r> {
    reader: BerReader<'a>,
    registry: &'r TypeRegistry,
    config: StreamConfig,
    config_error: Option<ConfigError>,
    table: ReadTable,
    hooks: ReadHooks,
    frames: FrameStack<'r>,
    flags: FailFlags,
    depth: usize,
    objects_read: usize,
    references_read: usize,
}

impl<'a, 'r> ObjectIStream<'a, 'r> {
    pub fn new(data: &'a [u8], registry: &'r TypeRegistry) -> Self {
        Self::from_reader_state(BerReader::new(data), registry)
    }

    fn from_reader_state(reader: BerReader<'a>, registry: &'r TypeRegistry) -> Self {
        Self {
            reader,
            registry,
            config: StreamConfig::default(),
            config_error: None,
            table: ReadTable::new(),
            hooks: ReadHooks::default(),
            frames: FrameStack::new(),
            flags: FailFlags::NONE,
            depth: 0,
            objects_read: 0,
            references_read: 0,
        }
    }

    /// Replace the limits
    ///
    /// An invalid configuration is not applied; the stream is left with
    /// `NOT_OPEN` set and every operation reports the configuration error.
    pub fn with_config(mut self, config: StreamConfig) -> Self {
        match config.validate() {
            Ok(()) => self.config = config,
            Err(err) => {
                log::warn!("input stream not opened: {}", err);
                self.flags.insert(FailFlags::NOT_OPEN);
                self.config_error = Some(err);
            }
        }
        self
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    pub fn hooks(&self) -> &ReadHooks {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut ReadHooks {
        &mut self.hooks
    }

    /// Read every value of `type_id` through `hook`
    pub fn set_object_hook(&mut self, type_id: TypeId, hook: Rc<dyn ReadObjectHook>) {
        self.hooks.set_object(type_id, hook);
    }

    pub fn reset_object_hook(&mut self, type_id: TypeId) {
        self.hooks.reset_object(type_id);
    }

    /// Read member `member` of class `class` through `hook`
    pub fn set_member_hook(
        &mut self,
        class: TypeId,
        member: &str,
        hook: Rc<dyn ReadMemberHook>,
    ) -> std::result::Result<(), TypeError> {
        let index = hooks::member_index(self.registry, class, member)?;
        self.hooks.set_member(class, index, hook);
        Ok(())
    }

    pub fn reset_member_hook(
        &mut self,
        class: TypeId,
        member: &str,
    ) -> std::result::Result<(), TypeError> {
        let index = hooks::member_index(self.registry, class, member)?;
        self.hooks.reset_member(class, index);
        Ok(())
    }

    /// Read variant `variant` of choice `choice` through `hook`
    pub fn set_variant_hook(
        &mut self,
        choice: TypeId,
        variant: &str,
        hook: Rc<dyn ReadMemberHook>,
    ) -> std::result::Result<(), TypeError> {
        let index = hooks::variant_index(self.registry, choice, variant)?;
        self.hooks.set_variant(choice, index, hook);
        Ok(())
    }

    pub fn reset_variant_hook(
        &mut self,
        choice: TypeId,
        variant: &str,
    ) -> std::result::Result<(), TypeError> {
        let index = hooks::variant_index(self.registry, choice, variant)?;
        self.hooks.reset_variant(choice, index);
        Ok(())
    }

    /// Read each element of containers of type `container` through `hook`
    pub fn set_element_hook(
        &mut self,
        container: TypeId,
        hook: Rc<dyn ReadElementHook>,
    ) -> std::result::Result<(), TypeError> {
        hooks::check_container(self.registry, container)?;
        self.hooks.set_element(container, hook);
        Ok(())
    }

    pub fn reset_element_hook(&mut self, container: TypeId) {
        self.hooks.reset_element(container);
    }

    pub fn position(&self) -> usize {
        self.reader.position()
    }

    /// Check if all input has been consumed
    pub fn at_end(&self) -> bool {
        self.reader.is_exhausted()
    }

    pub fn fail_flags(&self) -> FailFlags {
        self.flags
    }

    pub fn is_ok(&self) -> bool {
        self.flags.is_empty()
    }

    /// Shared objects read in full so far
    pub fn objects_read(&self) -> usize {
        self.objects_read
    }

    /// Back-references resolved so far
    pub fn references_read(&self) -> usize {
        self.references_read
    }

    /// Read a complete value graph
    pub fn read_root(&mut self, type_id: TypeId) -> Result<Value> {
        self.check_state()?;
        log::debug!("reading root of type {}", self.registry.name(type_id));
        let result = self.read_value(type_id);
        self.end_of_read();
        result.map_err(|kind| self.fail(kind))
    }

    /// Read a value, then forget the objects first read by it
    pub fn read_separate(&mut self, type_id: TypeId) -> Result<Value> {
        self.check_state()?;
        let start = self.table.len();
        let result = self.read_value(type_id);
        self.table.truncate(start);
        result.map_err(|kind| self.fail(kind))
    }

    /// Read a top-level shared object of exactly `type_id`
    ///
    /// The object keeps its number until [`end_of_read`](Self::end_of_read).
    pub fn read_shared(&mut self, type_id: TypeId) -> Result<ObjectRef> {
        self.check_state()?;
        self.read_object(type_id).map_err(|kind| self.fail(kind))
    }

    /// Close the session: forget every numbered object
    pub fn end_of_read(&mut self) {
        self.table.clear();
    }

    /// Start reading a container element by element
    pub fn begin_list(&mut self, type_id: TypeId) -> Result<ListReader<'_, 'a, 'r>> {
        self.check_state()?;
        let (element, end) = match self.open_list(type_id) {
            Ok(opened) => opened,
            Err(kind) => return Err(self.fail(kind)),
        };
        Ok(ListReader {
            table_start: self.table.len(),
            stream: self,
            container: type_id,
            element,
            end,
            read: 0,
            finished: false,
        })
    }

    /// Read and drop a value written by `write_root` or `write_separate`
    ///
    /// Objects inside it are numbered while it is read and forgotten
    /// afterwards, as [`read_separate`](Self::read_separate) does.
    pub fn skip(&mut self, type_id: TypeId) -> Result<()> {
        self.check_state()?;
        log::trace!("skipping value of type {}", self.registry.name(type_id));
        self.read_separate(type_id).map(drop)
    }

    /// Read and drop a top-level shared object
    ///
    /// The object keeps its number, so later references to it and to the
    /// objects inside it still resolve.
    pub fn skip_shared(&mut self, type_id: TypeId) -> Result<()> {
        self.read_shared(type_id).map(drop)
    }

    /// Skip one value by its framing alone
    ///
    /// Objects inside the value are not numbered, so this is only allowed
    /// between sessions. Inside a session use [`skip`](Self::skip).
    pub fn skip_value(&mut self) -> Result<()> {
        self.check_state()?;
        if !self.table.is_empty() {
            let kind = ErrorKind::IllegalCall(format!(
                "skip_value with {} numbered objects; use skip",
                self.table.len()
            ));
            return Err(self.fail(kind));
        }
        let result = self
            .reader
            .skip_value(self.config.max_depth, self.config.max_length);
        match result {
            Ok(_) => Ok(()),
            Err(kind) => Err(self.fail(kind)),
        }
    }

    // === Hook support ===

    /// Read a value of `type_id`, running every installed hook
    pub fn read_nested(&mut self, type_id: TypeId) -> HookResult<Value> {
        self.read_value(type_id)
    }

    /// Read a value of `type_id` without its object hook
    ///
    /// Object hooks call this to do the stream's own work; hooks on the
    /// members and elements inside still run.
    pub fn read_object_default(&mut self, type_id: TypeId) -> HookResult<Value> {
        self.decode_value(type_id)
    }

    /// Fail unless all input has been consumed
    pub fn expect_end(&mut self) -> Result<()> {
        self.check_state()?;
        if self.reader.is_exhausted() {
            return Ok(());
        }
        let remaining = self.reader.remaining();
        Err(self.fail(ErrorKind::TrailingData { remaining }))
    }

    // === State ===

    fn check_state(&self) -> Result<()> {
        if self.flags.is_empty() {
            return Ok(());
        }
        let kind = match &self.config_error {
            Some(err) => ErrorKind::Config(err.clone()),
            None => ErrorKind::Failed(self.flags),
        };
        Err(StreamError::new(kind, self.reader.position(), "(top)"))
    }

    fn fail(&mut self, kind: ErrorKind) -> StreamError {
        self.flags.insert(kind.flag());
        let error = StreamError::new(kind, self.reader.position(), self.frames.path());
        log::warn!("read failed: {}", error);
        self.frames.truncate(0);
        self.depth = 0;
        error
    }

    fn enter(&mut self, name: &'r str) -> KindResult<()> {
        self.depth += 1;
        if self.depth > self.config.max_depth {
            return Err(ErrorKind::LimitExceeded(format!(
                "nesting deeper than {}",
                self.config.max_depth
            )));
        }
        self.frames.push(Frame::Type(name));
        Ok(())
    }

    fn leave(&mut self) {
        self.frames.pop();
        self.depth -= 1;
    }

    // === Decoding ===

    fn expect_tag(&mut self, expected: Tag) -> KindResult<()> {
        let found = self.reader.read_tag()?;
        if found != expected {
            return Err(ErrorKind::format(format!(
                "expected {}, found {}",
                describe(expected),
                describe(found)
            )));
        }
        Ok(())
    }

    fn primitive(&mut self, tag: Tag) -> KindResult<&[u8]> {
        self.expect_tag(tag)?;
        self.reader.read_primitive(self.config.max_length)
    }

    fn open(&mut self, tag: Tag) -> KindResult<End> {
        self.expect_tag(tag)?;
        self.reader.begin_constructed(self.config.max_length)
    }

    fn text(&mut self, tag: Tag) -> KindResult<String> {
        let content = self.primitive(tag)?.to_vec();
        String::from_utf8(content).map_err(|_| ErrorKind::format("string is not valid UTF-8"))
    }

    fn open_list(&mut self, type_id: TypeId) -> KindResult<(TypeId, End)> {
        let registry = self.registry;
        let info = registry.info(type_id)?;
        let TypeKind::Container(container) = registry.kind(type_id)? else {
            return Err(ErrorKind::IllegalCall(format!(
                "{} is not a container",
                info.name
            )));
        };
        let end = self.open(container_tag(container))?;
        self.frames.push(Frame::Type(&info.name));
        Ok((container.element, end))
    }

    fn read_object(&mut self, type_id: TypeId) -> KindResult<ObjectRef> {
        let object = Object::new(type_id, Value::Null);
        self.table.push(object.clone());
        self.objects_read += 1;
        log::trace!("reading object {} of type {}", object.id(), self.registry.name(type_id));
        let value = self.read_value(type_id)?;
        object.replace(value);
        Ok(object)
    }

    fn read_value(&mut self, type_id: TypeId) -> KindResult<Value> {
        match self.hooks.object(type_id) {
            Some(hook) => hook.read_object(self, type_id),
            None => self.decode_value(type_id),
        }
    }

    fn read_element(&mut self, container: TypeId, element: TypeId) -> KindResult<Value> {
        self.frames.push(Frame::Element);
        let value = match self.hooks.element(container) {
            Some(hook) => hook.read_element(self, element)?,
            None => self.read_value(element)?,
        };
        self.frames.pop();
        Ok(value)
    }

    fn decode_value(&mut self, type_id: TypeId) -> KindResult<Value> {
        let registry = self.registry;
        let info = registry.info(type_id)?;
        let kind = registry.kind(type_id)?;
        self.enter(&info.name)?;

        let value = match kind {
            TypeKind::Declared => {
                return Err(ErrorKind::IllegalCall(format!("{} is not defined", info.name)))
            }
            TypeKind::Bool => {
                let content = self.primitive(Tag::universal(tag::BOOLEAN))?;
                Value::Bool(codec::decode_bool(content)?)
            }
            TypeKind::Char => match self.primitive(Tag::universal(tag::GENERAL_STRING))? {
                [byte] => Value::Char(*byte),
                _ => return Err(ErrorKind::format("char must be one byte")),
            },
            TypeKind::Int => {
                let content = self.primitive(Tag::universal(tag::INTEGER))?;
                Value::Int(codec::decode_int(content)?)
            }
            TypeKind::UInt => {
                let content = self.primitive(Tag::universal(tag::INTEGER))?;
                Value::UInt(codec::decode_uint(content)?)
            }
            TypeKind::Real => {
                let content = self.primitive(Tag::universal(tag::REAL))?;
                Value::Real(codec::decode_real(content)?)
            }
            TypeKind::String => Value::String(self.text(Tag::universal(tag::VISIBLE_STRING))?),
            TypeKind::StringStore => {
                Value::String(self.text(Tag::application(tag::STRING_STORE))?)
            }
            TypeKind::Null => {
                self.primitive(Tag::universal(tag::NULL))?;
                Value::Null
            }
            TypeKind::Octets => {
                Value::Octets(self.primitive(Tag::universal(tag::OCTET_STRING))?.to_vec())
            }
            TypeKind::Enumerated(values) => self.read_enum(values)?,
            TypeKind::Class(class) => self.read_class(type_id, class)?,
            TypeKind::Choice(choice) => self.read_choice(type_id, choice)?,
            TypeKind::Container(container) => {
                let end = self.open(container_tag(container))?;
                let mut items = Vec::new();
                while !self.reader.at_end(end)? {
                    items.push(self.read_element(type_id, container.element)?);
                }
                self.reader.finish(end)?;
                Value::List(items)
            }
            TypeKind::Pointer(pointer) => Value::Pointer(self.read_pointer(pointer.pointee)?),
        };

        self.leave();
        Ok(value)
    }

    fn read_enum(&mut self, values: &EnumValues) -> KindResult<Value> {
        let number = if values.integer {
            tag::INTEGER
        } else {
            tag::ENUMERATED
        };
        let content = self.primitive(Tag::universal(number))?;
        let value = codec::decode_int(content)?;
        if !values.integer && !values.is_valid(value) {
            return Err(ErrorKind::format(format!("unknown enumerated value {}", value)));
        }
        Ok(Value::Enum(value))
    }

    fn read_class(&mut self, class_id: TypeId, class: &'r ClassInfo) -> KindResult<Value> {
        let end = self.open(class_tag(class))?;
        let mut slots: Vec<Option<Value>> = vec![None; class.members.len()];
        let mut last: Option<usize> = None;

        while !self.reader.at_end(end)? {
            let member_tag = self.reader.read_tag()?;
            let index = match member_tag {
                Tag {
                    class: TagClass::ContextSpecific,
                    constructed: true,
                    number,
                } => class.member_by_tag(number),
                _ => None,
            }
            .ok_or_else(|| ErrorKind::format(format!("unexpected member: {}", member_tag)))?;

            if slots[index].is_some() {
                return Err(ErrorKind::format(format!("duplicate member: {}", member_tag)));
            }
            if !class.random_order && last.is_some_and(|last| index < last) {
                return Err(ErrorKind::format(format!(
                    "member out of order: {}",
                    member_tag
                )));
            }
            last = Some(index);

            let member = &class.members[index];
            self.frames.push(Frame::Member(&member.name));
            let member_end = self.reader.begin_constructed(self.config.max_length)?;
            let value = match self.hooks.member(class_id, index) {
                Some(hook) => hook.read_member(self, member)?,
                None => self.read_value(member.type_id)?,
            };
            self.reader.finish(member_end)?;
            self.frames.pop();
            slots[index] = Some(value);
        }
        self.reader.finish(end)?;

        for (member, slot) in class.members.iter().zip(slots.iter_mut()) {
            if slot.is_some() {
                continue;
            }
            match &member.default {
                Some(default) => *slot = Some(default.clone()),
                None if member.optional => {}
                None => {
                    return Err(ErrorKind::format(format!("missing member: {}", member.name)))
                }
            }
        }
        Ok(Value::Class(ClassValue::new(slots)))
    }

    fn read_choice(&mut self, choice_id: TypeId, choice: &'r ChoiceInfo) -> KindResult<Value> {
        let variant_tag = self.reader.read_tag()?;
        let index = match variant_tag {
            Tag {
                class: TagClass::ContextSpecific,
                constructed: true,
                number,
            } => choice.variant_by_tag(number),
            _ => None,
        }
        .ok_or_else(|| ErrorKind::format(format!("unexpected variant: {}", variant_tag)))?;

        let variant = &choice.variants[index];
        self.frames.push(Frame::Member(&variant.name));
        let end = self.reader.begin_constructed(self.config.max_length)?;
        let value = match self.hooks.variant(choice_id, index) {
            Some(hook) => hook.read_member(self, variant)?,
            None => self.read_value(variant.type_id)?,
        };
        self.reader.finish(end)?;
        self.frames.pop();
        Ok(Value::Choice(ChoiceValue::new(index, value)))
    }

    fn read_pointer(&mut self, pointee: TypeId) -> KindResult<Option<ObjectRef>> {
        let registry = self.registry;

        if self.reader.at_class_name() {
            let name = self.reader.read_class_name()?;
            let real = registry
                .lookup(&name)
                .ok_or_else(|| ErrorKind::format(format!("unknown class: {}", name)))?;
            if !registry.is_derived(real, pointee) {
                return Err(ErrorKind::IncompatibleType {
                    expected: registry.name(pointee).to_owned(),
                    found: name,
                });
            }
            let end = self.reader.begin_constructed(self.config.max_length)?;
            let object = self.read_object(real)?;
            self.reader.finish(end)?;
            return Ok(Some(object));
        }

        let next = self.reader.peek_tag()?;
        if next == Tag::universal(tag::NULL) {
            self.primitive(next)?;
            return Ok(None);
        }
        if next == Tag::application(tag::OBJECT_REFERENCE) {
            let content = self.primitive(next)?;
            let index = codec::decode_uint(content)?;
            let object = self.table.resolve(index)?.clone();
            if !registry.is_derived(object.type_id(), pointee) {
                return Err(ErrorKind::IncompatibleType {
                    expected: registry.name(pointee).to_owned(),
                    found: registry.name(object.type_id()).to_owned(),
                });
            }
            self.references_read += 1;
            return Ok(Some(object));
        }
        self.read_object(pointee).map(Some)
    }
}

impl<'r> ObjectIStream<'static, 'r> {
    /// Read all of `source` into memory and stream from it
    pub fn from_reader<R: Read>(mut source: R, registry: &'r TypeRegistry) -> Result<Self> {
        let mut data = Vec::new();
        source
            .read_to_end(&mut data)
            .map_err(|e| StreamError::new(ErrorKind::Io(e), 0, "(top)"))?;
        Ok(Self::from_reader_state(BerReader::new(data), registry))
    }
}

/// Incremental container input
///
/// Dropping the reader without calling [`end`](ListReader::end) fails the
/// stream.
pub struct ListReader<'s, 'a, 'r> {
    stream: &'s mut ObjectIStream<'a, 'r>,
    container: TypeId,
    element: TypeId,
    end: End,
    read: usize,
    table_start: usize,
    finished: bool,
}

impl ListReader<'_, '_, '_> {
    /// Elements read so far
    pub fn read(&self) -> usize {
        self.read
    }

    /// Next element, or `None` at the end of the container
    pub fn next_element(&mut self) -> Result<Option<Value>> {
        self.stream.check_state()?;
        let at_end = match self.stream.reader.at_end(self.end) {
            Ok(at_end) => at_end,
            Err(kind) => return Err(self.stream.fail(kind)),
        };
        if at_end {
            return Ok(None);
        }
        let value = match self.stream.read_element(self.container, self.element) {
            Ok(value) => value,
            Err(kind) => return Err(self.stream.fail(kind)),
        };
        self.read += 1;
        Ok(Some(value))
    }

    /// Read and drop the next element; `false` at the end of the container
    ///
    /// Objects inside the element keep their numbers until the list ends.
    pub fn skip_element(&mut self) -> Result<bool> {
        Ok(self.next_element()?.is_some())
    }

    /// Close the container; every element must have been read
    pub fn end(mut self) -> Result<()> {
        self.finished = true;
        self.stream.check_state()?;
        let result = match self.stream.reader.at_end(self.end) {
            Ok(true) => self.stream.reader.finish(self.end),
            Ok(false) => Err(ErrorKind::NotAllRead),
            Err(kind) => Err(kind),
        };
        if let Err(kind) = result {
            return Err(self.stream.fail(kind));
        }
        self.stream.frames.pop();
        self.stream.table.truncate(self.table_start);
        Ok(())
    }
}

impl Drop for ListReader<'_, '_, '_> {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!("list dropped after {} elements without end()", self.read);
            self.stream.flags.insert(FailFlags::FAIL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ostream::ObjectOStream;
    use rser_type::ClassBuilder;

    fn point(registry: &mut TypeRegistry) -> TypeId {
        registry
            .register(
                "Point",
                ClassBuilder::sequence()
                    .member("x", 0, TypeRegistry::INT)
                    .optional_member("y", 1, TypeRegistry::INT)
                    .default_member("z", 2, TypeRegistry::INT, Value::Int(9))
                    .build(),
            )
            .unwrap()
    }

    #[test]
    fn test_absent_members() {
        let mut registry = TypeRegistry::new();
        let point = point(&mut registry);
        // SEQUENCE { [0] INTEGER 1 }
        let data = [0x30, 0x80, 0xA0, 0x80, 0x02, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00];
        let mut stream = ObjectIStream::new(&data, &registry);
        let value = stream.read_root(point).unwrap();
        assert_eq!(
            value,
            Value::Class(ClassValue::new(vec![
                Some(Value::Int(1)),
                None,
                Some(Value::Int(9))
            ]))
        );
        stream.expect_end().unwrap();
    }

    #[test]
    fn test_missing_member() {
        let mut registry = TypeRegistry::new();
        let point = point(&mut registry);
        let data = [0x30, 0x80, 0x00, 0x00];
        let err = ObjectIStream::new(&data, &registry)
            .read_root(point)
            .unwrap_err();
        assert_eq!(err.kind.to_string(), "missing member: x");
        assert_eq!(err.flag(), FailFlags::FORMAT_ERROR);
    }

    #[test]
    fn test_member_order_and_unknown_tags() {
        let mut registry = TypeRegistry::new();
        let point = point(&mut registry);

        // [1] before [0]
        let data = [
            0x30, 0x80, 0xA1, 0x80, 0x02, 0x01, 0x02, 0x00, 0x00, 0xA0, 0x80, 0x02, 0x01,
            0x01, 0x00, 0x00, 0x00, 0x00,
        ];
        let err = ObjectIStream::new(&data, &registry)
            .read_root(point)
            .unwrap_err();
        assert_eq!(err.kind.to_string(), "member out of order: [0]");

        let data = [0x30, 0x80, 0xA7, 0x80, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00];
        let err = ObjectIStream::new(&data, &registry)
            .read_root(point)
            .unwrap_err();
        assert_eq!(err.to_string(), "offset 3 at Point: unexpected member: [7]");
    }

    #[test]
    fn test_wrong_tag() {
        let registry = TypeRegistry::new();
        let data = [0x04, 0x00];
        let err = ObjectIStream::new(&data, &registry)
            .read_root(TypeRegistry::INT)
            .unwrap_err();
        assert_eq!(
            err.kind.to_string(),
            "expected INTEGER, found OCTET STRING"
        );
    }

    #[test]
    fn test_failed_stream_refuses_work() {
        let registry = TypeRegistry::new();
        let data = [0x02];
        let mut stream = ObjectIStream::new(&data, &registry);
        let err = stream.read_root(TypeRegistry::INT).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnexpectedEof));
        assert_eq!(stream.fail_flags(), FailFlags::EOF);
        assert!(matches!(
            stream.skip_value().unwrap_err().kind,
            ErrorKind::Failed(FailFlags::EOF)
        ));
    }

    #[test]
    fn test_trailing_data() {
        let registry = TypeRegistry::new();
        let data = [0x05, 0x00, 0x05, 0x00];
        let mut stream = ObjectIStream::new(&data, &registry);
        stream.read_root(TypeRegistry::NULL).unwrap();
        let err = stream.expect_end().unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TrailingData { remaining: 2 }));
    }

    #[test]
    fn test_skip_then_read() {
        let registry = TypeRegistry::new();
        let data = [0x30, 0x80, 0x05, 0x00, 0x00, 0x00, 0x02, 0x01, 0x2A];
        let mut stream = ObjectIStream::new(&data, &registry);
        stream.skip_value().unwrap();
        assert_eq!(stream.read_root(TypeRegistry::INT).unwrap(), Value::Int(42));
        assert!(stream.at_end());
    }

    #[test]
    fn test_skip_keeps_object_numbering() {
        let mut registry = TypeRegistry::new();
        let int_ref = registry.pointer("IntRef", TypeRegistry::INT).unwrap();
        let holder = registry
            .register(
                "Holder",
                ClassBuilder::sequence().member("p", 0, int_ref).build(),
            )
            .unwrap();
        let hold = |object: &ObjectRef| {
            Value::Class(ClassValue::from_values([Value::from(object.clone())]))
        };

        // b is written in full inside a; the later values refer to it
        let b = Object::new(TypeRegistry::INT, Value::Int(7));
        let a = Object::new(holder, hold(&b));
        let c = Object::new(holder, hold(&b));
        let mut output = ObjectOStream::new(Vec::new(), &registry);
        output.write_shared(&a).unwrap();
        output.write_separate(&hold(&b), holder).unwrap();
        output.write_shared(&c).unwrap();
        output.end_of_write();
        assert_eq!(output.references_written(), 2);
        let bytes = output.into_inner().unwrap();

        let mut input = ObjectIStream::new(&bytes, &registry);
        input.skip_shared(holder).unwrap();
        input.skip(holder).unwrap();
        let copy = input.read_shared(holder).unwrap();
        let value = copy.borrow();
        let Value::Class(class) = &*value else {
            panic!("expected a class value");
        };
        let Some(Value::Pointer(Some(target))) = class.get(0) else {
            panic!("expected a resolved pointer");
        };
        assert_eq!(*target.borrow(), Value::Int(7));
        assert_eq!(input.references_read(), 2);
        assert!(input.at_end());

        let err = input.skip_value().unwrap_err();
        assert!(matches!(err.kind, ErrorKind::IllegalCall(_)));
    }

    #[test]
    fn test_invalid_config_leaves_stream_unopened() {
        let registry = TypeRegistry::new();
        let config = StreamConfig {
            max_depth: 0,
            ..Default::default()
        };
        let data = [0x05, 0x00];
        let mut stream = ObjectIStream::new(&data, &registry).with_config(config);
        assert_eq!(stream.fail_flags(), FailFlags::NOT_OPEN);
        assert_eq!(stream.config(), &StreamConfig::default());
        let err = stream.read_root(TypeRegistry::NULL).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::Config(ConfigError::InvalidMaxDepth(_))
        ));
        assert!(stream.skip_value().is_err());
    }

    #[test]
    fn test_invalid_reference() {
        let mut registry = TypeRegistry::new();
        let int_ref = registry.pointer("IntRef", TypeRegistry::INT).unwrap();
        let data = [0x42, 0x01, 0x03];
        let err = ObjectIStream::new(&data, &registry)
            .read_root(int_ref)
            .unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::InvalidObjectIndex { index: 3, count: 0 }
        ));
    }

    #[test]
    fn test_from_reader() {
        let registry = TypeRegistry::new();
        let data: &[u8] = &[0x01, 0x01, 0xFF];
        let mut stream = ObjectIStream::from_reader(data, &registry).unwrap();
        assert_eq!(
            stream.read_root(TypeRegistry::BOOL).unwrap(),
            Value::Bool(true)
        );
    }
}

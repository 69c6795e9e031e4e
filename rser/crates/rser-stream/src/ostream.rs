//! Object output stream
//!
//! Writes values of registered types as BER. Every top-level write runs a
//! discovery pass over the value first, which numbers the shared objects in
//! the order emission will meet them; the emitter then writes each object
//! in full the first time and an `[APPLICATION 2]` reference to its number
//! afterwards.
//!
//! ```text
//! write_root(list of [A, A, B])
//!   discover   A -> 0, B -> 1
//!   emit       SEQUENCE OF { A..., [APPLICATION 2] 0, B... }
//!   end        table cleared
//! ```
//!
//! Emission must meet each object for the first time in discovery order.
//! Without hooks it always does; a hook that drops or reorders objects
//! fails the write with `IllegalCall` instead of producing numbers the
//! reader would resolve differently.

use std::io::Write;
use std::rc::Rc;

use rser_type::{
    ChoiceInfo, ChoiceValue, ClassInfo, ClassValue, ContainerInfo, ObjectRef, TypeError, TypeId,
    TypeKind, TypeRegistry, Value,
};

use crate::ber::tag::{self, Tag};
use crate::ber::BerWriter;
use crate::config::StreamConfig;
use crate::error::{ConfigError, ErrorKind, FailFlags, Result, StreamError};
use crate::frame::{Frame, FrameStack};
use crate::graph::{ObjectIndex, ObjectTable};
use crate::hooks::{
    self, HookResult, WriteElementHook, WriteHooks, WriteMemberHook, WriteObjectHook,
};

/// Universal tag of a container
pub(crate) fn container_tag(container: &ContainerInfo) -> Tag {
    let number = if container.random_order {
        tag::SET
    } else {
        tag::SEQUENCE
    };
    Tag::universal(number).constructed()
}

/// Universal tag of a class
pub(crate) fn class_tag(class: &ClassInfo) -> Tag {
    let number = if class.random_order {
        tag::SET
    } else {
        tag::SEQUENCE
    };
    Tag::universal(number).constructed()
}

pub struct ObjectOStream<'r, W: Write> {
    writer: BerWriter<W>,
    registry: &'r TypeRegistry,
    config: StreamConfig,
    config_error: Option<ConfigError>,
    table: ObjectTable,
    hooks: WriteHooks<W>,
    frames: FrameStack<'r>,
    flags: FailFlags,
    depth: usize,
    objects_written: usize,
    references_written: usize,
}

impl<'r, W: Write> ObjectOStream<'r, W> {
    pub fn new(writer: W, registry: &'r TypeRegistry) -> Self {
        Self {
            writer: BerWriter::new(writer),
            registry,
            config: StreamConfig::default(),
            config_error: None,
            table: ObjectTable::new(),
            hooks: WriteHooks::default(),
            frames: FrameStack::new(),
            flags: FailFlags::NONE,
            depth: 0,
            objects_written: 0,
            references_written: 0,
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
                log::warn!("output stream not opened: {}", err);
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

    pub fn hooks(&self) -> &WriteHooks<W> {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut WriteHooks<W> {
        &mut self.hooks
    }

    /// Write every value of `type_id` through `hook`
    pub fn set_object_hook(&mut self, type_id: TypeId, hook: Rc<dyn WriteObjectHook<W>>) {
        self.hooks.set_object(type_id, hook);
    }

    pub fn reset_object_hook(&mut self, type_id: TypeId) {
        self.hooks.reset_object(type_id);
    }

    /// Write member `member` of class `class` through `hook`
    pub fn set_member_hook(
        &mut self,
        class: TypeId,
        member: &str,
        hook: Rc<dyn WriteMemberHook<W>>,
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

    /// Write variant `variant` of choice `choice` through `hook`
    pub fn set_variant_hook(
        &mut self,
        choice: TypeId,
        variant: &str,
        hook: Rc<dyn WriteMemberHook<W>>,
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

    /// Write each element of containers of type `container` through `hook`
    pub fn set_element_hook(
        &mut self,
        container: TypeId,
        hook: Rc<dyn WriteElementHook<W>>,
    ) -> std::result::Result<(), TypeError> {
        hooks::check_container(self.registry, container)?;
        self.hooks.set_element(container, hook);
        Ok(())
    }

    pub fn reset_element_hook(&mut self, container: TypeId) {
        self.hooks.reset_element(container);
    }

    pub fn fail_flags(&self) -> FailFlags {
        self.flags
    }

    pub fn is_ok(&self) -> bool {
        self.flags.is_empty()
    }

    /// Shared objects written in full so far
    pub fn objects_written(&self) -> usize {
        self.objects_written
    }

    /// Back-references written so far
    pub fn references_written(&self) -> usize {
        self.references_written
    }

    pub fn bytes_written(&self) -> usize {
        self.writer.position()
    }

    /// Write a complete value graph
    ///
    /// Object numbering starts over after each root.
    pub fn write_root(&mut self, value: &Value, type_id: TypeId) -> Result<()> {
        self.check_state()?;
        log::debug!("writing root of type {}", self.registry.name(type_id));
        let result = self.write_top(value, type_id);
        self.end_of_write();
        result.map_err(|kind| self.fail(kind))
    }

    /// Write a value, then forget the objects first written by it
    ///
    /// Objects written earlier in the same session are still referenced
    /// by number.
    pub fn write_separate(&mut self, value: &Value, type_id: TypeId) -> Result<()> {
        self.check_state()?;
        let start = self.table.len();
        let result = self.write_top(value, type_id);
        self.table.truncate(start);
        result.map_err(|kind| self.fail(kind))
    }

    /// Write a shared object at the top level
    ///
    /// The object keeps its number until [`end_of_write`](Self::end_of_write),
    /// so later writes in the same session refer back to it. Writing the
    /// same object twice in one session is an error.
    pub fn write_shared(&mut self, object: &ObjectRef) -> Result<()> {
        self.check_state()?;
        self.shared(object).map_err(|kind| self.fail(kind))
    }

    /// Close the session: forget every numbered object
    pub fn end_of_write(&mut self) {
        self.table.clear();
    }

    /// Start writing a container element by element
    ///
    /// With `expected`, [`ListWriter::end`] checks that exactly that many
    /// elements were written.
    pub fn begin_list(
        &mut self,
        type_id: TypeId,
        expected: Option<usize>,
    ) -> Result<ListWriter<'_, 'r, W>> {
        self.check_state()?;
        let element = match self.open_list(type_id) {
            Ok(element) => element,
            Err(kind) => return Err(self.fail(kind)),
        };
        Ok(ListWriter {
            table_start: self.table.len(),
            stream: self,
            container: type_id,
            element,
            expected,
            written: 0,
            finished: false,
        })
    }

    pub fn flush(&mut self) -> Result<()> {
        self.check_state()?;
        self.writer.flush().map_err(|kind| self.fail(kind))
    }

    // === Hook support ===

    /// Write a value of `type_id`, running every installed hook
    pub fn write_nested(&mut self, value: &Value, type_id: TypeId) -> HookResult<()> {
        self.write_value(value, type_id)
    }

    /// Write a value of `type_id` without its object hook
    ///
    /// Object hooks call this to do the stream's own work; hooks on the
    /// members and elements inside still run.
    pub fn write_object_default(&mut self, value: &Value, type_id: TypeId) -> HookResult<()> {
        self.encode_value(value, type_id)
    }

    /// Flush and return the sink
    pub fn into_inner(mut self) -> Result<W> {
        self.check_state()?;
        let position = self.writer.position();
        self.writer
            .into_inner()
            .map_err(|kind| StreamError::new(kind, position, "(top)"))
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
        Err(StreamError::new(kind, self.writer.position(), "(top)"))
    }

    /// Record the first error and locate it
    fn fail(&mut self, kind: ErrorKind) -> StreamError {
        self.flags.insert(kind.flag());
        let error = StreamError::new(kind, self.writer.position(), self.frames.path());
        log::warn!("write failed: {}", error);
        self.frames.truncate(0);
        self.depth = 0;
        error
    }

    fn enter(&mut self, name: &'r str) -> std::result::Result<(), ErrorKind> {
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

    // === Emission ===

    fn write_top(&mut self, value: &Value, type_id: TypeId) -> std::result::Result<(), ErrorKind> {
        self.table
            .discover(self.registry, &self.config, value, type_id)?;
        self.write_value(value, type_id)
    }

    fn shared(&mut self, object: &ObjectRef) -> std::result::Result<(), ErrorKind> {
        let (index, _) = self.table.register(object);
        if self.table.is_written(index) {
            return Err(ErrorKind::AlreadyWritten { id: object.id() });
        }
        self.claim(index, object)?;
        let value = object.borrow();
        self.table
            .discover(self.registry, &self.config, &value, object.type_id())?;
        self.write_value(&value, object.type_id())
    }

    fn open_list(&mut self, type_id: TypeId) -> std::result::Result<TypeId, ErrorKind> {
        let registry = self.registry;
        let info = registry.info(type_id)?;
        let TypeKind::Container(container) = registry.kind(type_id)? else {
            return Err(ErrorKind::IllegalCall(format!(
                "{} is not a container",
                info.name
            )));
        };
        self.writer.begin_constructed(container_tag(container))?;
        self.frames.push(Frame::Type(&info.name));
        Ok(container.element)
    }

    /// Mark the object at `index` written; it must be the next one the
    /// reader will number
    fn claim(&mut self, index: ObjectIndex, object: &ObjectRef) -> std::result::Result<(), ErrorKind> {
        let expected = self.table.written_count();
        if index.0 as usize != expected {
            return Err(ErrorKind::IllegalCall(format!(
                "object {} written as number {} but the reader expects number {}",
                object.id(),
                index,
                expected
            )));
        }
        self.table.mark_written(index);
        self.objects_written += 1;
        Ok(())
    }

    fn write_value(&mut self, value: &Value, type_id: TypeId) -> std::result::Result<(), ErrorKind> {
        match self.hooks.object(type_id) {
            Some(hook) => hook.write_object(self, value, type_id),
            None => self.encode_value(value, type_id),
        }
    }

    fn write_element(
        &mut self,
        container: TypeId,
        element: TypeId,
        value: &Value,
    ) -> std::result::Result<(), ErrorKind> {
        self.frames.push(Frame::Element);
        match self.hooks.element(container) {
            Some(hook) => hook.write_element(self, element, value)?,
            None => self.write_value(value, element)?,
        }
        self.frames.pop();
        Ok(())
    }

    fn encode_value(&mut self, value: &Value, type_id: TypeId) -> std::result::Result<(), ErrorKind> {
        let registry = self.registry;
        let info = registry.info(type_id)?;
        let kind = registry.kind(type_id)?;
        self.enter(&info.name)?;

        match (kind, value) {
            (TypeKind::Bool, Value::Bool(v)) => self.writer.write_bool(*v)?,
            (TypeKind::Char, Value::Char(c)) => self
                .writer
                .write_primitive(Tag::universal(tag::GENERAL_STRING), &[*c])?,
            (TypeKind::Int, Value::Int(v)) => {
                self.writer.write_int(Tag::universal(tag::INTEGER), *v)?
            }
            (TypeKind::UInt, Value::UInt(v)) => {
                self.writer.write_uint(Tag::universal(tag::INTEGER), *v)?
            }
            (TypeKind::Real, Value::Real(v)) => self.writer.write_real(*v)?,
            (TypeKind::String, Value::String(text)) => self
                .writer
                .write_primitive(Tag::universal(tag::VISIBLE_STRING), text.as_bytes())?,
            (TypeKind::StringStore, Value::String(text)) => self
                .writer
                .write_primitive(Tag::application(tag::STRING_STORE), text.as_bytes())?,
            (TypeKind::Null, Value::Null) => self.writer.write_null()?,
            (TypeKind::Octets, Value::Octets(bytes)) => self
                .writer
                .write_primitive(Tag::universal(tag::OCTET_STRING), bytes)?,
            (TypeKind::Enumerated(values), Value::Enum(v)) => {
                if !values.integer && !values.is_valid(*v) {
                    return Err(ErrorKind::IllegalCall(format!(
                        "{} is not a value of {}",
                        v, info.name
                    )));
                }
                let number = if values.integer {
                    tag::INTEGER
                } else {
                    tag::ENUMERATED
                };
                self.writer.write_int(Tag::universal(number), *v)?
            }
            (TypeKind::Class(class), Value::Class(object)) => {
                self.write_class(type_id, class, object)?
            }
            (TypeKind::Choice(choice), Value::Choice(selected)) => {
                self.write_choice(type_id, choice, selected)?
            }
            (TypeKind::Container(container), Value::List(items)) => {
                self.writer.begin_constructed(container_tag(container))?;
                for item in items {
                    self.write_element(type_id, container.element, item)?;
                }
                self.writer.end_of_contents()?
            }
            (TypeKind::Pointer(pointer), Value::Pointer(target)) => {
                self.write_pointer(pointer.pointee, target.as_ref())?
            }
            _ => {
                return Err(ErrorKind::TypeMismatch {
                    expected: info.name.clone(),
                    found: value.variant_name(),
                })
            }
        }

        self.leave();
        Ok(())
    }

    fn write_class(
        &mut self,
        class_id: TypeId,
        class: &'r ClassInfo,
        object: &ClassValue,
    ) -> std::result::Result<(), ErrorKind> {
        if object.members.len() > class.members.len() {
            return Err(ErrorKind::IllegalCall(format!(
                "{} member values for {} members",
                object.members.len(),
                class.members.len()
            )));
        }
        self.writer.begin_constructed(class_tag(class))?;
        for (index, member) in class.members.iter().enumerate() {
            let Some(value) = object.get(index) else {
                if member.may_be_absent() {
                    continue;
                }
                return Err(ErrorKind::IllegalCall(format!(
                    "missing member: {}",
                    member.name
                )));
            };
            if self.config.omit_defaults && member.default.as_ref() == Some(value) {
                continue;
            }
            self.frames.push(Frame::Member(&member.name));
            self.writer.begin_constructed(Tag::context(member.tag))?;
            match self.hooks.member(class_id, index) {
                Some(hook) => hook.write_member(self, member, value)?,
                None => self.write_value(value, member.type_id)?,
            }
            self.writer.end_of_contents()?;
            self.frames.pop();
        }
        self.writer.end_of_contents()
    }

    fn write_choice(
        &mut self,
        choice_id: TypeId,
        choice: &'r ChoiceInfo,
        selected: &ChoiceValue,
    ) -> std::result::Result<(), ErrorKind> {
        let variant = choice.variants.get(selected.variant).ok_or_else(|| {
            ErrorKind::IllegalCall(format!("no variant number {}", selected.variant))
        })?;
        self.frames.push(Frame::Member(&variant.name));
        self.writer.begin_constructed(Tag::context(variant.tag))?;
        match self.hooks.variant(choice_id, selected.variant) {
            Some(hook) => hook.write_member(self, variant, &selected.value)?,
            None => self.write_value(&selected.value, variant.type_id)?,
        }
        self.writer.end_of_contents()?;
        self.frames.pop();
        Ok(())
    }

    fn write_pointer(
        &mut self,
        pointee: TypeId,
        target: Option<&ObjectRef>,
    ) -> std::result::Result<(), ErrorKind> {
        let Some(object) = target else {
            return self.writer.write_null();
        };
        let registry = self.registry;
        let real = object.type_id();
        if !registry.is_derived(real, pointee) {
            return Err(ErrorKind::IncompatibleType {
                expected: registry.name(pointee).to_owned(),
                found: registry.name(real).to_owned(),
            });
        }

        let (index, _) = self.table.register(object);
        if self.table.is_written(index) {
            log::trace!("object {} written as reference {}", object.id(), index);
            self.references_written += 1;
            return self
                .writer
                .write_uint(Tag::application(tag::OBJECT_REFERENCE), index.0 as u64);
        }
        self.claim(index, object)?;
        log::trace!("writing object {} as index {}", object.id(), index);

        let value = object.borrow();
        if real == pointee {
            return self.write_value(&value, real);
        }
        self.writer.begin_class_name(registry.name(real))?;
        self.write_value(&value, real)?;
        self.writer.end_of_contents()
    }
}

/// Incremental container output
///
/// Dropping the writer without calling [`end`](ListWriter::end) leaves the
/// container open and fails the stream.
pub struct ListWriter<'s, 'r, W: Write> {
    stream: &'s mut ObjectOStream<'r, W>,
    container: TypeId,
    element: TypeId,
    expected: Option<usize>,
    written: usize,
    table_start: usize,
    finished: bool,
}

impl<W: Write> ListWriter<'_, '_, W> {
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn write_element(&mut self, value: &Value) -> Result<()> {
        self.stream.check_state()?;
        if self.expected.is_some_and(|expected| self.written >= expected) {
            let kind = ErrorKind::IllegalCall(format!(
                "list already has its {} elements",
                self.written
            ));
            return Err(self.stream.fail(kind));
        }
        let (container, element) = (self.container, self.element);
        let stream = &mut *self.stream;
        let result = stream
            .table
            .discover(stream.registry, &stream.config, value, element)
            .and_then(|()| stream.write_element(container, element, value));
        if let Err(kind) = result {
            return Err(self.stream.fail(kind));
        }
        self.written += 1;
        Ok(())
    }

    /// Close the container
    pub fn end(mut self) -> Result<()> {
        self.finished = true;
        self.stream.check_state()?;
        if let Some(expected) = self.expected {
            if self.written != expected {
                let kind = ErrorKind::NotAllWritten {
                    written: self.written,
                    expected,
                };
                return Err(self.stream.fail(kind));
            }
        }
        if let Err(kind) = self.stream.writer.end_of_contents() {
            return Err(self.stream.fail(kind));
        }
        self.stream.frames.pop();
        self.stream.table.truncate(self.table_start);
        Ok(())
    }
}

impl<W: Write> Drop for ListWriter<'_, '_, W> {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!("list dropped after {} elements without end()", self.written);
            self.stream.flags.insert(FailFlags::FAIL);
        }
    }
}

//! Type registry
//!
//! The registry owns every [`TypeInfo`] and hands out [`TypeId`]s in
//! registration order. The nine primitive types are pre-registered under
//! fixed ids (see the associated constants on [`TypeRegistry`]).
//!
//! Recursive types are registered in two steps:
//!
//! ```
//! use rser_type::{ClassBuilder, TypeRegistry};
//!
//! let mut registry = TypeRegistry::new();
//! let node = registry.declare("Node").unwrap();
//! let node_ref = registry.pointer("NodeRef", node).unwrap();
//! let kind = ClassBuilder::sequence()
//!     .member("label", 0, TypeRegistry::STRING)
//!     .optional_member("next", 1, node_ref)
//!     .build();
//! registry.define(node, kind).unwrap();
//! assert!(registry.check_defined().is_ok());
//! ```

use std::ops::Index;

use indexmap::IndexMap;
use rser_util::{FxHashSet, IndexVec};

use crate::error::{Result, TypeError};
use crate::info::{
    ChoiceInfo, ClassInfo, ContainerInfo, MemberInfo, PointerInfo, TypeId, TypeInfo, TypeKind,
};
use crate::value::{ChoiceValue, ClassValue, Value};

/// Owner of all type descriptors
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: IndexVec<TypeId, TypeInfo>,
    by_name: IndexMap<String, TypeId>,
}

impl TypeRegistry {
    pub const BOOL: TypeId = TypeId(0);
    pub const CHAR: TypeId = TypeId(1);
    pub const INT: TypeId = TypeId(2);
    pub const UINT: TypeId = TypeId(3);
    pub const REAL: TypeId = TypeId(4);
    pub const STRING: TypeId = TypeId(5);
    pub const STRING_STORE: TypeId = TypeId(6);
    pub const NULL: TypeId = TypeId(7);
    pub const OCTETS: TypeId = TypeId(8);

    /// Create a registry holding the primitive types
    pub fn new() -> Self {
        let mut registry = Self {
            types: IndexVec::new(),
            by_name: IndexMap::new(),
        };
        let builtins = [
            ("BOOLEAN", TypeKind::Bool),
            ("Char", TypeKind::Char),
            ("INTEGER", TypeKind::Int),
            ("Unsigned", TypeKind::UInt),
            ("REAL", TypeKind::Real),
            ("VisibleString", TypeKind::String),
            ("StringStore", TypeKind::StringStore),
            ("NULL", TypeKind::Null),
            ("OCTET STRING", TypeKind::Octets),
        ];
        for (name, kind) in builtins {
            let id = registry.types.push(TypeInfo::new(name, kind));
            registry.by_name.insert(name.to_owned(), id);
        }
        debug_assert_eq!(registry.by_name["OCTET STRING"], Self::OCTETS);
        registry
    }

    /// Number of registered types, primitives included
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeInfo)> {
        self.types.iter_enumerated()
    }

    // === Registration ===

    /// Reserve a name for a type defined later
    pub fn declare(&mut self, name: impl Into<String>) -> Result<TypeId> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(TypeError::DuplicateType { name });
        }
        let id = self.types.push(TypeInfo::new(name.clone(), TypeKind::Declared));
        self.by_name.insert(name, id);
        Ok(id)
    }

    /// Give a declared type its definition
    pub fn define(&mut self, id: TypeId, kind: TypeKind) -> Result<()> {
        let info = self.info(id)?;
        if info.is_defined() {
            return Err(TypeError::AlreadyDefined {
                name: info.name.clone(),
            });
        }
        let name = info.name.clone();
        let kind = self.validate(&name, kind)?;
        if matches!(kind, TypeKind::Null | TypeKind::Pointer(_)) {
            if let Some(pointer) = self.pointers_to(id).next() {
                return Err(TypeError::InvalidPointee {
                    type_name: self.types[pointer].name.clone(),
                    pointee: name,
                    kind: kind.keyword(),
                });
            }
        }
        log::debug!("defined type {} ({}) as {}", name, id, kind.keyword());
        self.types[id].kind = kind;
        Ok(())
    }

    /// Register a new named type
    pub fn register(&mut self, name: impl Into<String>, kind: TypeKind) -> Result<TypeId> {
        let id = self.declare(name)?;
        if let Err(err) = self.define(id, kind) {
            self.types.truncate(id);
            self.by_name.pop();
            return Err(err);
        }
        Ok(id)
    }

    /// Register a pointer type
    pub fn pointer(&mut self, name: impl Into<String>, pointee: TypeId) -> Result<TypeId> {
        self.register(name, TypeKind::Pointer(PointerInfo { pointee }))
    }

    /// Register a SEQUENCE OF type
    pub fn sequence_of(&mut self, name: impl Into<String>, element: TypeId) -> Result<TypeId> {
        self.register(
            name,
            TypeKind::Container(ContainerInfo {
                element,
                random_order: false,
            }),
        )
    }

    /// Register a SET OF type
    pub fn set_of(&mut self, name: impl Into<String>, element: TypeId) -> Result<TypeId> {
        self.register(
            name,
            TypeKind::Container(ContainerInfo {
                element,
                random_order: true,
            }),
        )
    }

    /// Fail on the first type that was declared but never defined, or on
    /// a pointer whose pointee turned out to be a NULL or pointer type
    pub fn check_defined(&self) -> Result<()> {
        if let Some(info) = self.types.iter().find(|info| !info.is_defined()) {
            return Err(TypeError::Undefined {
                name: info.name.clone(),
            });
        }
        for info in self.types.iter() {
            if let TypeKind::Pointer(pointer) = &info.kind {
                self.check_pointee(&info.name, pointer.pointee)?;
            }
        }
        Ok(())
    }

    /// Pointer types whose pointee is `target`
    fn pointers_to(&self, target: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        self.types
            .iter_enumerated()
            .filter_map(move |(id, info)| match &info.kind {
                TypeKind::Pointer(pointer) if pointer.pointee == target => Some(id),
                _ => None,
            })
    }

    /// A NULL pointee would read back as a null pointer and a pointer
    /// pointee as an object reference, so both are refused. A pointee that
    /// is only declared so far is checked when it gets its definition.
    fn check_pointee(&self, type_name: &str, pointee: TypeId) -> Result<()> {
        let info = self.info(pointee)?;
        match &info.kind {
            TypeKind::Null | TypeKind::Pointer(_) => Err(TypeError::InvalidPointee {
                type_name: type_name.to_owned(),
                pointee: info.name.clone(),
                kind: info.kind.keyword(),
            }),
            _ => Ok(()),
        }
    }

    fn validate(&self, name: &str, kind: TypeKind) -> Result<TypeKind> {
        match kind {
            TypeKind::Declared => Err(TypeError::Undefined {
                name: name.to_owned(),
            }),
            TypeKind::Enumerated(values) => match values.first_duplicate() {
                Some(item) => Err(TypeError::DuplicateEnumItem {
                    type_name: name.to_owned(),
                    item: item.to_owned(),
                }),
                None => Ok(TypeKind::Enumerated(values)),
            },
            TypeKind::Class(class) => self.validate_class(name, class).map(TypeKind::Class),
            TypeKind::Choice(choice) => {
                if choice.variants.is_empty() {
                    return Err(TypeError::EmptyChoice {
                        type_name: name.to_owned(),
                    });
                }
                self.validate_members(name, &choice.variants)?;
                Ok(TypeKind::Choice(choice))
            }
            TypeKind::Container(container) => {
                self.info(container.element)?;
                Ok(TypeKind::Container(container))
            }
            TypeKind::Pointer(pointer) => {
                self.check_pointee(name, pointer.pointee)?;
                Ok(TypeKind::Pointer(pointer))
            }
            primitive => Ok(primitive),
        }
    }

    fn validate_class(&self, name: &str, class: ClassInfo) -> Result<ClassInfo> {
        let mut members = Vec::new();
        if let Some(parent) = class.parent {
            let info = self.info(parent)?;
            match &info.kind {
                TypeKind::Class(base) => members.extend(base.members.iter().cloned()),
                _ => {
                    return Err(TypeError::InvalidParent {
                        type_name: name.to_owned(),
                        parent: info.name.clone(),
                    })
                }
            }
        }
        let inherited = members.len();
        members.extend(class.members);
        self.validate_members(name, &members)?;
        Ok(ClassInfo {
            members,
            random_order: class.random_order,
            parent: class.parent,
            inherited,
        })
    }

    fn validate_members(&self, type_name: &str, members: &[MemberInfo]) -> Result<()> {
        let mut tags = FxHashSet::default();
        let mut names = FxHashSet::default();
        for member in members {
            self.info(member.type_id)?;
            if !tags.insert(member.tag) {
                return Err(TypeError::DuplicateTag {
                    type_name: type_name.to_owned(),
                    tag: member.tag,
                });
            }
            if !names.insert(member.name.as_str()) {
                return Err(TypeError::DuplicateMember {
                    type_name: type_name.to_owned(),
                    member: member.name.clone(),
                });
            }
            if let Some(default) = &member.default {
                if !self.conforms(member.type_id, default) {
                    return Err(TypeError::InvalidDefault {
                        type_name: type_name.to_owned(),
                        member: member.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    // === Lookup ===

    pub fn get(&self, id: TypeId) -> Option<&TypeInfo> {
        self.types.get(id)
    }

    pub fn info(&self, id: TypeId) -> Result<&TypeInfo> {
        self.types
            .get(id)
            .ok_or(TypeError::UnknownTypeId { id: id.0 })
    }

    /// Definition of a type; declared-only types are an error
    pub fn kind(&self, id: TypeId) -> Result<&TypeKind> {
        let info = self.info(id)?;
        match info.kind {
            TypeKind::Declared => Err(TypeError::Undefined {
                name: info.name.clone(),
            }),
            ref kind => Ok(kind),
        }
    }

    /// Type name, or `?` for an unknown id
    pub fn name(&self, id: TypeId) -> &str {
        self.types.get(id).map_or("?", |info| info.name.as_str())
    }

    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn id_of(&self, name: &str) -> Result<TypeId> {
        self.lookup(name).ok_or_else(|| TypeError::UnknownType {
            name: name.to_owned(),
        })
    }

    pub fn class(&self, id: TypeId) -> Option<&ClassInfo> {
        self.types.get(id).and_then(TypeInfo::as_class)
    }

    /// Check if `derived` is `base` or inherits from it
    pub fn is_derived(&self, derived: TypeId, base: TypeId) -> bool {
        let mut current = Some(derived);
        while let Some(id) = current {
            if id == base {
                return true;
            }
            current = self.class(id).and_then(|class| class.parent);
        }
        false
    }

    /// Find a class member by name
    pub fn find_member(&self, class: TypeId, name: &str) -> Option<(usize, &MemberInfo)> {
        let class = self.class(class)?;
        let index = class.member_by_name(name)?;
        Some((index, &class.members[index]))
    }

    // === Values ===

    /// Build the default value of a type
    ///
    /// Mandatory members get their declared default or the default of their
    /// type; optional members are left absent.
    pub fn create_default(&self, id: TypeId) -> Result<Value> {
        self.default_value(id, &mut Vec::new())
    }

    fn default_value(&self, id: TypeId, building: &mut Vec<TypeId>) -> Result<Value> {
        Ok(match self.kind(id)? {
            TypeKind::Declared => unreachable!("kind() rejects declared types"),
            TypeKind::Bool => Value::Bool(false),
            TypeKind::Char => Value::Char(0),
            TypeKind::Int => Value::Int(0),
            TypeKind::UInt => Value::UInt(0),
            TypeKind::Real => Value::Real(0.0),
            TypeKind::String | TypeKind::StringStore => Value::String(String::new()),
            TypeKind::Null => Value::Null,
            TypeKind::Octets => Value::Octets(Vec::new()),
            TypeKind::Enumerated(values) => Value::Enum(values.first_value()),
            TypeKind::Container(_) => Value::List(Vec::new()),
            TypeKind::Pointer(_) => Value::Pointer(None),
            TypeKind::Class(class) => {
                if building.contains(&id) {
                    return Err(TypeError::RecursiveDefault {
                        type_name: self.name(id).to_owned(),
                    });
                }
                building.push(id);
                let mut members = Vec::with_capacity(class.members.len());
                for member in &class.members {
                    members.push(match (&member.default, member.optional) {
                        (Some(default), _) => Some(default.clone()),
                        (None, true) => None,
                        (None, false) => Some(self.default_value(member.type_id, building)?),
                    });
                }
                building.pop();
                Value::Class(ClassValue::new(members))
            }
            TypeKind::Choice(ChoiceInfo { variants }) => {
                if building.contains(&id) {
                    return Err(TypeError::RecursiveDefault {
                        type_name: self.name(id).to_owned(),
                    });
                }
                building.push(id);
                let value = self.default_value(variants[0].type_id, building)?;
                building.pop();
                Value::Choice(ChoiceValue::new(0, value))
            }
        })
    }

    /// Check if `value` has the shape of type `id`
    ///
    /// Pointer targets are checked by type only; the objects behind them
    /// are not visited.
    pub fn conforms(&self, id: TypeId, value: &Value) -> bool {
        let Ok(kind) = self.kind(id) else {
            return false;
        };
        match (kind, value) {
            (TypeKind::Bool, Value::Bool(_))
            | (TypeKind::Char, Value::Char(_))
            | (TypeKind::Int, Value::Int(_))
            | (TypeKind::UInt, Value::UInt(_))
            | (TypeKind::Real, Value::Real(_))
            | (TypeKind::String | TypeKind::StringStore, Value::String(_))
            | (TypeKind::Null, Value::Null)
            | (TypeKind::Octets, Value::Octets(_))
            | (TypeKind::Pointer(_), Value::Pointer(None)) => true,
            (TypeKind::Enumerated(values), Value::Enum(v)) => values.is_valid(*v),
            (TypeKind::Class(class), Value::Class(object)) => {
                object.members.len() == class.members.len()
                    && class
                        .members
                        .iter()
                        .zip(&object.members)
                        .all(|(member, slot)| match slot {
                            Some(value) => self.conforms(member.type_id, value),
                            None => member.may_be_absent(),
                        })
            }
            (TypeKind::Choice(choice), Value::Choice(selected)) => choice
                .variants
                .get(selected.variant)
                .is_some_and(|variant| self.conforms(variant.type_id, &selected.value)),
            (TypeKind::Container(container), Value::List(items)) => items
                .iter()
                .all(|item| self.conforms(container.element, item)),
            (TypeKind::Pointer(pointer), Value::Pointer(Some(object))) => {
                self.is_derived(object.type_id(), pointer.pointee)
            }
            _ => false,
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<TypeId> for TypeRegistry {
    type Output = TypeInfo;

    fn index(&self, id: TypeId) -> &TypeInfo {
        &self.types[id]
    }
}

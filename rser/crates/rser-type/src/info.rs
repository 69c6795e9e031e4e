//! Type descriptors
//!
//! A [`TypeInfo`] tells the streams how to walk a [`Value`]: which members a
//! class has and with which tags, what a container holds, where a pointer
//! points. Descriptors reference each other by [`TypeId`], which makes
//! recursive types a plain index cycle in the registry.
//!
//! ```text
//! TypeKind
//! ├── primitives       Bool Char Int UInt Real String StringStore Null Octets
//! ├── Enumerated       named integers
//! ├── Class            SEQUENCE / SET of tagged members, single inheritance
//! ├── Choice           exactly one tagged variant
//! ├── Container        SEQUENCE OF / SET OF
//! └── Pointer          nullable handle to a shared Object
//! ```

use std::fmt;

use crate::value::Value;

rser_util::define_idx!(
    /// Index of a type in a [`crate::TypeRegistry`]
    TypeId
);

/// A registered type
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: String,
    pub kind: TypeKind,
}

impl TypeInfo {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Class descriptor, if this is a class
    pub fn as_class(&self) -> Option<&ClassInfo> {
        match &self.kind {
            TypeKind::Class(class) => Some(class),
            _ => None,
        }
    }

    /// True once the type has a definition
    pub fn is_defined(&self) -> bool {
        !matches!(self.kind, TypeKind::Declared)
    }
}

/// Shape of a type
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// Placeholder for a type whose definition comes later
    Declared,
    Bool,
    /// Single byte character
    Char,
    Int,
    UInt,
    Real,
    String,
    /// String written under its own application tag
    StringStore,
    Null,
    Octets,
    Enumerated(EnumValues),
    Class(ClassInfo),
    Choice(ChoiceInfo),
    Container(ContainerInfo),
    Pointer(PointerInfo),
}

impl TypeKind {
    /// ASN.1 style keyword for messages
    pub fn keyword(&self) -> &'static str {
        match self {
            TypeKind::Declared => "(declared)",
            TypeKind::Bool => "BOOLEAN",
            TypeKind::Char => "Char",
            TypeKind::Int => "INTEGER",
            TypeKind::UInt => "Unsigned",
            TypeKind::Real => "REAL",
            TypeKind::String => "VisibleString",
            TypeKind::StringStore => "StringStore",
            TypeKind::Null => "NULL",
            TypeKind::Octets => "OCTET STRING",
            TypeKind::Enumerated(values) if values.integer => "INTEGER",
            TypeKind::Enumerated(_) => "ENUMERATED",
            TypeKind::Class(class) if class.random_order => "SET",
            TypeKind::Class(_) => "SEQUENCE",
            TypeKind::Choice(_) => "CHOICE",
            TypeKind::Container(container) if container.random_order => "SET OF",
            TypeKind::Container(_) => "SEQUENCE OF",
            TypeKind::Pointer(_) => "pointer",
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TypeKind::Bool
                | TypeKind::Char
                | TypeKind::Int
                | TypeKind::UInt
                | TypeKind::Real
                | TypeKind::String
                | TypeKind::StringStore
                | TypeKind::Null
                | TypeKind::Octets
        )
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A class member or choice variant
#[derive(Debug, Clone)]
pub struct MemberInfo {
    pub name: String,
    /// Context tag number
    pub tag: u32,
    pub type_id: TypeId,
    pub optional: bool,
    /// Value used when the member is absent on the wire
    pub default: Option<Value>,
}

impl MemberInfo {
    pub fn new(name: impl Into<String>, tag: u32, type_id: TypeId) -> Self {
        Self {
            name: name.into(),
            tag,
            type_id,
            optional: false,
            default: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// May be left out of the encoding
    pub fn may_be_absent(&self) -> bool {
        self.optional || self.default.is_some()
    }
}

/// Named values of an enumerated type
#[derive(Debug, Clone, Default)]
pub struct EnumValues {
    items: Vec<(String, i64)>,
    /// Accept any integer, not only the named ones
    pub integer: bool,
}

impl EnumValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named value
    ///
    /// Clashing names or values are kept and reported when the type is
    /// registered.
    pub fn add(&mut self, name: impl Into<String>, value: i64) {
        self.items.push((name.into(), value));
    }

    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.items
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| *value)
    }

    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.items
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| name.as_str())
    }

    /// First item whose name or value repeats an earlier one
    pub fn first_duplicate(&self) -> Option<&str> {
        self.items.iter().enumerate().find_map(|(i, (name, value))| {
            self.items[..i]
                .iter()
                .any(|(n, v)| n == name || v == value)
                .then_some(name.as_str())
        })
    }

    /// Check if `value` may be written
    pub fn is_valid(&self, value: i64) -> bool {
        self.integer || self.name_of(value).is_some()
    }

    /// Value used for default construction
    pub fn first_value(&self) -> i64 {
        self.items.first().map(|(_, value)| *value).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.items.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// SEQUENCE or SET
#[derive(Debug, Clone, Default)]
pub struct ClassInfo {
    /// All members, inherited ones first
    pub members: Vec<MemberInfo>,
    /// SET: members may arrive in any order
    pub random_order: bool,
    pub parent: Option<TypeId>,
    /// Number of leading members that come from the parent
    pub inherited: usize,
}

impl ClassInfo {
    /// Position of the member with this tag
    pub fn member_by_tag(&self, tag: u32) -> Option<usize> {
        self.members.iter().position(|m| m.tag == tag)
    }

    /// Position of the member with this name
    pub fn member_by_name(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| m.name == name)
    }

    /// Members declared by this class itself
    pub fn own_members(&self) -> &[MemberInfo] {
        &self.members[self.inherited..]
    }
}

/// CHOICE
#[derive(Debug, Clone, Default)]
pub struct ChoiceInfo {
    pub variants: Vec<MemberInfo>,
}

impl ChoiceInfo {
    pub fn variant_by_tag(&self, tag: u32) -> Option<usize> {
        self.variants.iter().position(|v| v.tag == tag)
    }

    pub fn variant_by_name(&self, name: &str) -> Option<usize> {
        self.variants.iter().position(|v| v.name == name)
    }
}

/// SEQUENCE OF or SET OF
#[derive(Debug, Clone, Copy)]
pub struct ContainerInfo {
    pub element: TypeId,
    pub random_order: bool,
}

/// Nullable reference to a shared object
#[derive(Debug, Clone, Copy)]
pub struct PointerInfo {
    /// Declared object type; the real type may derive from it
    pub pointee: TypeId,
}

/// Fluent construction of class descriptors
///
/// # Examples
///
/// ```
/// use rser_type::{ClassBuilder, TypeKind, TypeRegistry, Value};
///
/// let mut registry = TypeRegistry::new();
/// let point = ClassBuilder::sequence()
///     .member("x", 0, TypeRegistry::INT)
///     .member("y", 1, TypeRegistry::INT)
///     .default_member("z", 2, TypeRegistry::INT, Value::Int(0))
///     .build();
/// let id = registry.register("Point", point).unwrap();
/// assert!(matches!(registry[id].kind, TypeKind::Class(_)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClassBuilder {
    members: Vec<MemberInfo>,
    random_order: bool,
    parent: Option<TypeId>,
}

impl ClassBuilder {
    /// Members in tag order
    pub fn sequence() -> Self {
        Self::default()
    }

    /// Members in any order
    pub fn set() -> Self {
        Self {
            random_order: true,
            ..Self::default()
        }
    }

    /// Inherit the members of `parent`
    pub fn parent(mut self, parent: TypeId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn member(mut self, name: impl Into<String>, tag: u32, type_id: TypeId) -> Self {
        self.members.push(MemberInfo::new(name, tag, type_id));
        self
    }

    pub fn optional_member(mut self, name: impl Into<String>, tag: u32, type_id: TypeId) -> Self {
        self.members
            .push(MemberInfo::new(name, tag, type_id).optional());
        self
    }

    pub fn default_member(
        mut self,
        name: impl Into<String>,
        tag: u32,
        type_id: TypeId,
        default: Value,
    ) -> Self {
        self.members
            .push(MemberInfo::new(name, tag, type_id).with_default(default));
        self
    }

    pub fn push(mut self, member: MemberInfo) -> Self {
        self.members.push(member);
        self
    }

    /// Own members only; the registry prepends inherited ones
    pub fn build(self) -> TypeKind {
        TypeKind::Class(ClassInfo {
            members: self.members,
            random_order: self.random_order,
            parent: self.parent,
            inherited: 0,
        })
    }
}

/// Fluent construction of choice descriptors
#[derive(Debug, Clone, Default)]
pub struct ChoiceBuilder {
    variants: Vec<MemberInfo>,
}

impl ChoiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variant(mut self, name: impl Into<String>, tag: u32, type_id: TypeId) -> Self {
        self.variants.push(MemberInfo::new(name, tag, type_id));
        self
    }

    pub fn build(self) -> TypeKind {
        TypeKind::Choice(ChoiceInfo {
            variants: self.variants,
        })
    }
}

/// Fluent construction of enumerated descriptors
#[derive(Debug, Clone, Default)]
pub struct EnumBuilder {
    values: EnumValues,
}

impl EnumBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Named INTEGER: any value is accepted
    pub fn integer() -> Self {
        let mut values = EnumValues::new();
        values.integer = true;
        Self { values }
    }

    pub fn item(mut self, name: impl Into<String>, value: i64) -> Self {
        self.values.add(name, value);
        self
    }

    pub fn build(self) -> TypeKind {
        TypeKind::Enumerated(self.values)
    }
}

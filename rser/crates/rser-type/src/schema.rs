//! Schema files
//!
//! A schema is a list of named type declarations in TOML or JSON. Loading
//! one declares every name first, so types may refer to each other in any
//! order, then defines them with parents and defaulted member types ahead
//! of their users.
//!
//! ```toml
//! [[types]]
//! name = "Node"
//! kind = "sequence"
//! members = [
//!     { name = "label", tag = 0, type = "VisibleString" },
//!     { name = "next", tag = 1, type = "NodeRef", optional = true },
//! ]
//!
//! [[types]]
//! name = "NodeRef"
//! kind = "pointer"
//! pointee = "Node"
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TypeError};
use crate::info::{
    ChoiceInfo, ClassInfo, ContainerInfo, EnumValues, MemberInfo, PointerInfo, TypeId, TypeKind,
};
use crate::registry::TypeRegistry;
use crate::value::Value;

/// A parsed schema document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Schema {
    #[serde(default)]
    pub types: Vec<TypeDecl>,
}

/// One named type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeDecl {
    pub name: String,
    pub kind: DeclKind,
    /// Base class (sequence and set only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Members of a class, variants of a choice
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<MemberDecl>,
    /// Element type of a container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    /// Target type of a pointer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointee: Option<String>,
    /// Named values of an enumeration
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<EnumItemDecl>,
    /// Enumeration accepts any integer
    #[serde(default, skip_serializing_if = "is_false")]
    pub integer: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Kind keyword of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeclKind {
    Sequence,
    Set,
    Choice,
    SequenceOf,
    SetOf,
    Pointer,
    Enumerated,
    Boolean,
    Char,
    Integer,
    Unsigned,
    Real,
    String,
    StringStore,
    Null,
    Octets,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberDecl {
    pub name: String,
    pub tag: u32,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Literal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumItemDecl {
    pub name: String,
    pub value: i64,
}

/// Default value as written in a schema
///
/// Interpreted against the member type: strings name enumeration items,
/// spell one-byte chars or hex-encode octets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
}

impl Schema {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a schema file; `.json` files are JSON, anything else TOML
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let schema = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&text)?,
            _ => Self::from_toml_str(&text)?,
        };
        log::debug!(
            "loaded schema {} with {} types",
            path.display(),
            schema.types.len()
        );
        Ok(schema)
    }

    /// Build a registry holding the primitives plus this schema
    pub fn into_registry(self) -> Result<TypeRegistry> {
        let mut registry = TypeRegistry::new();
        self.apply(&mut registry)?;
        Ok(registry)
    }

    /// Register every declaration
    pub fn apply(&self, registry: &mut TypeRegistry) -> Result<()> {
        let mut pending = IndexMap::new();
        for decl in &self.types {
            let id = registry.declare(decl.name.clone())?;
            pending.insert(decl.name.as_str(), (id, decl));
        }
        let mut loader = Loader {
            registry,
            pending,
            active: Vec::new(),
        };
        for decl in &self.types {
            loader.define(&decl.name)?;
        }
        loader.registry.check_defined()
    }
}

struct Loader<'s, 'r> {
    registry: &'r mut TypeRegistry,
    /// Declared but not yet defined
    pending: IndexMap<&'s str, (TypeId, &'s TypeDecl)>,
    /// Definitions in progress, for cycle detection
    active: Vec<&'s str>,
}

impl<'s> Loader<'s, '_> {
    fn define(&mut self, name: &str) -> Result<()> {
        let Some((key, (id, decl))) = self
            .pending
            .get_key_value(name)
            .map(|(key, entry)| (*key, *entry))
        else {
            return Ok(());
        };
        if self.active.contains(&key) {
            return Err(TypeError::Schema(format!(
                "type {} depends on itself through its parent or defaults",
                key
            )));
        }

        self.active.push(key);
        let result = self.define_decl(id, decl);
        self.active.pop();
        result?;
        self.pending.shift_remove(key);
        Ok(())
    }

    /// Types that must be defined before `decl`
    fn define_dependencies(&mut self, decl: &'s TypeDecl) -> Result<()> {
        if let Some(parent) = &decl.parent {
            self.define(parent)?;
        }
        for member in decl.members.iter().filter(|m| m.default.is_some()) {
            self.define(&member.type_name)?;
        }
        Ok(())
    }

    fn define_decl(&mut self, id: TypeId, decl: &'s TypeDecl) -> Result<()> {
        self.define_dependencies(decl)?;
        let kind = self.build_kind(decl)?;
        self.registry.define(id, kind)
    }

    fn build_kind(&self, decl: &TypeDecl) -> Result<TypeKind> {
        let kind = match decl.kind {
            DeclKind::Sequence | DeclKind::Set => TypeKind::Class(ClassInfo {
                members: self.members(decl)?,
                random_order: decl.kind == DeclKind::Set,
                parent: decl
                    .parent
                    .as_deref()
                    .map(|parent| self.registry.id_of(parent))
                    .transpose()?,
                inherited: 0,
            }),
            DeclKind::Choice => TypeKind::Choice(ChoiceInfo {
                variants: self.members(decl)?,
            }),
            DeclKind::SequenceOf | DeclKind::SetOf => TypeKind::Container(ContainerInfo {
                element: self.required(decl, "element", decl.element.as_deref())?,
                random_order: decl.kind == DeclKind::SetOf,
            }),
            DeclKind::Pointer => TypeKind::Pointer(PointerInfo {
                pointee: self.required(decl, "pointee", decl.pointee.as_deref())?,
            }),
            DeclKind::Enumerated => {
                let mut values = EnumValues::new();
                values.integer = decl.integer;
                for item in &decl.items {
                    values.add(item.name.clone(), item.value);
                }
                TypeKind::Enumerated(values)
            }
            DeclKind::Boolean => TypeKind::Bool,
            DeclKind::Char => TypeKind::Char,
            DeclKind::Integer => TypeKind::Int,
            DeclKind::Unsigned => TypeKind::UInt,
            DeclKind::Real => TypeKind::Real,
            DeclKind::String => TypeKind::String,
            DeclKind::StringStore => TypeKind::StringStore,
            DeclKind::Null => TypeKind::Null,
            DeclKind::Octets => TypeKind::Octets,
        };
        if decl.parent.is_some() && !matches!(decl.kind, DeclKind::Sequence | DeclKind::Set) {
            return Err(TypeError::Schema(format!(
                "type {}: only sequence and set may have a parent",
                decl.name
            )));
        }
        Ok(kind)
    }

    fn required(&self, decl: &TypeDecl, field: &str, value: Option<&str>) -> Result<TypeId> {
        match value {
            Some(name) => self.registry.id_of(name),
            None => Err(TypeError::Schema(format!(
                "type {}: missing field '{}'",
                decl.name, field
            ))),
        }
    }

    fn members(&self, decl: &TypeDecl) -> Result<Vec<MemberInfo>> {
        decl.members
            .iter()
            .map(|member| {
                let type_id = self.registry.id_of(&member.type_name)?;
                let mut info = MemberInfo::new(member.name.clone(), member.tag, type_id);
                info.optional = member.optional;
                if let Some(literal) = &member.default {
                    let value = literal_value(self.registry, type_id, literal).ok_or_else(|| {
                        TypeError::InvalidDefault {
                            type_name: decl.name.clone(),
                            member: member.name.clone(),
                        }
                    })?;
                    info.default = Some(value);
                }
                Ok(info)
            })
            .collect()
    }
}

/// Interpret a literal as a value of type `id`
pub fn literal_value(registry: &TypeRegistry, id: TypeId, literal: &Literal) -> Option<Value> {
    let kind = registry.kind(id).ok()?;
    match (kind, literal) {
        (TypeKind::Bool, Literal::Bool(b)) => Some(Value::Bool(*b)),
        (TypeKind::Int, Literal::Int(i)) => Some(Value::Int(*i)),
        (TypeKind::UInt, Literal::Int(i)) => u64::try_from(*i).ok().map(Value::UInt),
        (TypeKind::Real, Literal::Real(f)) => Some(Value::Real(*f)),
        (TypeKind::Real, Literal::Int(i)) => Some(Value::Real(*i as f64)),
        (TypeKind::String | TypeKind::StringStore, Literal::Text(s)) => {
            Some(Value::String(s.clone()))
        }
        (TypeKind::Char, Literal::Text(s)) if s.len() == 1 => Some(Value::Char(s.as_bytes()[0])),
        (TypeKind::Octets, Literal::Text(s)) => decode_hex(s).map(Value::Octets),
        (TypeKind::Enumerated(values), Literal::Text(name)) => {
            values.value_of(name).map(Value::Enum)
        }
        (TypeKind::Enumerated(values), Literal::Int(i)) if values.is_valid(*i) => {
            Some(Value::Enum(*i))
        }
        _ => None,
    }
}

/// Decode a hex string such as `"0aff"`
pub fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(text.get(i..i + 2)?, 16).ok())
        .collect()
}

/// Encode bytes as lowercase hex
pub fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

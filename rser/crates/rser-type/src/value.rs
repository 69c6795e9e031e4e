//! Dynamic value model
//!
//! [`Value`] is a tree; [`Value::Pointer`] is where it becomes a graph. Each
//! pointer target is an [`Object`] behind a counted [`Ref`], so two pointers
//! may share a target and a target may point back at itself.
//!
//! Object identity is the [`ObjectId`] handed out at construction. Stream
//! side tables key on it; nothing hashes addresses.

use std::cell::{Ref as CellRef, RefCell, RefMut};
use std::fmt;

use rser_obj::Ref;
use rser_util::{FxHashMap, IdGenerator};

use crate::info::TypeId;

static OBJECT_IDS: IdGenerator = IdGenerator::new();

/// Process-unique object identity
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u64);

impl ObjectId {
    fn fresh() -> Self {
        ObjectId(OBJECT_IDS.next())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Counted handle to a shared object
pub type ObjectRef = Ref<Object>;

/// An independently reference-counted value with a runtime type
pub struct Object {
    id: ObjectId,
    type_id: TypeId,
    value: RefCell<Value>,
}

impl Object {
    /// Allocate a new shared object
    pub fn new(type_id: TypeId, value: Value) -> ObjectRef {
        Ref::new(Object {
            id: ObjectId::fresh(),
            type_id,
            value: RefCell::new(value),
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Real type of the object
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn borrow(&self) -> CellRef<'_, Value> {
        self.value.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Value> {
        self.value.borrow_mut()
    }

    /// Swap in a new value, returning the old one
    pub fn replace(&self, value: Value) -> Value {
        self.value.replace(value)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Object {}

// Values may be cyclic: identity only.
impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({}, type {})", self.id, self.type_id)
    }
}

/// A value of any registered type
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Char(u8),
    Int(i64),
    UInt(u64),
    Real(f64),
    String(String),
    Octets(Vec<u8>),
    Enum(i64),
    Class(ClassValue),
    Choice(ChoiceValue),
    List(Vec<Value>),
    /// Compares by object identity
    Pointer(Option<ObjectRef>),
}

impl Value {
    /// Short name of the variant for messages
    pub fn variant_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Real(_) => "real",
            Value::String(_) => "string",
            Value::Octets(_) => "octets",
            Value::Enum(_) => "enum",
            Value::Class(_) => "class",
            Value::Choice(_) => "choice",
            Value::List(_) => "list",
            Value::Pointer(_) => "pointer",
        }
    }

    /// Shorthand for a pointer to a new object
    pub fn new_object(type_id: TypeId, value: Value) -> Value {
        Value::Pointer(Some(Object::new(type_id, value)))
    }

    pub fn as_class(&self) -> Option<&ClassValue> {
        match self {
            Value::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_class_mut(&mut self) -> Option<&mut ClassValue> {
        match self {
            Value::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<&ObjectRef> {
        match self {
            Value::Pointer(Some(object)) => Some(object),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::UInt(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(object: ObjectRef) -> Self {
        Value::Pointer(Some(object))
    }
}

/// Member slots of a class value, in descriptor order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassValue {
    /// `None` marks an absent optional member
    pub members: Vec<Option<Value>>,
}

impl ClassValue {
    pub fn new(members: Vec<Option<Value>>) -> Self {
        Self { members }
    }

    /// All members present
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            members: values.into_iter().map(Some).collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.members.get(index).and_then(Option::as_ref)
    }

    pub fn set(&mut self, index: usize, value: Option<Value>) {
        if index >= self.members.len() {
            self.members.resize(index + 1, None);
        }
        self.members[index] = value;
    }
}

/// The selected variant of a choice
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceValue {
    /// Position in the descriptor's variant list
    pub variant: usize,
    pub value: Box<Value>,
}

impl ChoiceValue {
    pub fn new(variant: usize, value: Value) -> Self {
        Self {
            variant,
            value: Box::new(value),
        }
    }
}

/// Check if two value graphs have the same shape, aliasing included
///
/// Objects are matched up as they are met: once `a`'s object X has been
/// paired with `b`'s object Y, every later X on the left must meet Y on the
/// right and the other way round. Cycles terminate on the pairing.
pub fn isomorphic(a: &Value, b: &Value) -> bool {
    Isomorphism::default().values(a, b)
}

#[derive(Default)]
struct Isomorphism {
    forward: FxHashMap<ObjectId, ObjectId>,
    backward: FxHashMap<ObjectId, ObjectId>,
}

impl Isomorphism {
    fn values(&mut self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Char(x), Value::Char(y)) => x == y,
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::UInt(x), Value::UInt(y)) => x == y,
            (Value::Real(x), Value::Real(y)) => x == y || (x.is_nan() && y.is_nan()),
            (Value::String(x), Value::String(y)) => x == y,
            (Value::Octets(x), Value::Octets(y)) => x == y,
            (Value::Enum(x), Value::Enum(y)) => x == y,
            (Value::Class(x), Value::Class(y)) => {
                x.members.len() == y.members.len()
                    && x.members
                        .iter()
                        .zip(&y.members)
                        .all(|pair| match pair {
                            (None, None) => true,
                            (Some(x), Some(y)) => self.values(x, y),
                            _ => false,
                        })
            }
            (Value::Choice(x), Value::Choice(y)) => {
                x.variant == y.variant && self.values(&x.value, &y.value)
            }
            (Value::List(x), Value::List(y)) => {
                x.len() == y.len() && x.iter().zip(y).all(|(x, y)| self.values(x, y))
            }
            (Value::Pointer(None), Value::Pointer(None)) => true,
            (Value::Pointer(Some(x)), Value::Pointer(Some(y))) => self.objects(x, y),
            _ => false,
        }
    }

    fn objects(&mut self, x: &ObjectRef, y: &ObjectRef) -> bool {
        match (self.forward.get(&x.id()), self.backward.get(&y.id())) {
            (Some(mapped), _) => return *mapped == y.id(),
            (None, Some(_)) => return false,
            (None, None) => {}
        }
        if x.type_id() != y.type_id() {
            return false;
        }
        self.forward.insert(x.id(), y.id());
        self.backward.insert(y.id(), x.id());
        let (left, right) = (x.borrow(), y.borrow());
        self.values(&left, &right)
    }
}

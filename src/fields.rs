use crate::config;
use crate::types::{Op, Type};
use std::hash::{Hash, Hasher};

// Wrapper for the two concrete field kinds a Type can produce.
#[derive(Debug, Clone)]
pub enum FieldVal {
    IntField(IntField),
    StringField(StringField),
}

impl FieldVal {
    pub fn into_int(self) -> Option<IntField> {
        match self {
            FieldVal::IntField(int_field) => Some(int_field),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<StringField> {
        match self {
            FieldVal::StringField(string_field) => Some(string_field),
            _ => None,
        }
    }

    pub fn get_type(&self) -> Type {
        match self {
            FieldVal::IntField(f) => f.get_type(),
            FieldVal::StringField(f) => f.get_type(),
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        match self {
            FieldVal::IntField(f) => f.serialize(),
            FieldVal::StringField(f) => f.serialize(),
        }
    }

    // Evaluates self <op> other. INT and STRING never compare across
    // types; mismatched types compare unequal / false for ordering ops.
    pub fn compare(&self, op: Op, other: &FieldVal) -> bool {
        match (self, other) {
            (FieldVal::IntField(a), FieldVal::IntField(b)) => a.compare(op, b),
            (FieldVal::StringField(a), FieldVal::StringField(b)) => a.compare(op, b),
            _ => false,
        }
    }
}

impl PartialEq for FieldVal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldVal::IntField(a), FieldVal::IntField(b)) => a == b,
            (FieldVal::StringField(a), FieldVal::StringField(b)) => a == b,
            _ => false,
        }
    }
}
impl Eq for FieldVal {}

impl Hash for FieldVal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            FieldVal::IntField(f) => {
                0u8.hash(state);
                f.value.hash(state);
            }
            FieldVal::StringField(f) => {
                1u8.hash(state);
                f.value.hash(state);
            }
        }
    }
}

// Common behavior for a concrete field value.
pub trait Field {
    fn get_type(&self) -> Type;
    fn serialize(&self) -> Vec<u8>;
}

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct IntField {
    value: i32,
}

impl IntField {
    pub fn new(value: i32) -> Self {
        IntField { value }
    }

    pub fn get_value(&self) -> i32 {
        self.value
    }

    // INT only supports ordering comparisons; Like degrades to Equals.
    pub fn compare(&self, op: Op, other: &IntField) -> bool {
        match op {
            Op::Equals | Op::Like => self.value == other.value,
            Op::NotEquals => self.value != other.value,
            Op::LessThan => self.value < other.value,
            Op::LessThanOrEq => self.value <= other.value,
            Op::GreaterThan => self.value > other.value,
            Op::GreaterThanOrEq => self.value >= other.value,
        }
    }
}

impl Field for IntField {
    fn get_type(&self) -> Type {
        Type::IntType
    }

    fn serialize(&self) -> Vec<u8> {
        self.value.to_be_bytes().to_vec()
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct StringField {
    value: String,
}

impl StringField {
    // Constructs a field from value, truncating to STRING_LEN bytes if
    // necessary (matches on-disk capacity).
    pub fn new(value: String) -> Self {
        let cap = config::string_len();
        if value.len() > cap {
            StringField {
                value: value[..cap].to_string(),
            }
        } else {
            StringField { value }
        }
    }

    pub fn get_value(&self) -> String {
        self.value.clone()
    }

    // STRING supports the usual orderings lexicographically; Like
    // degrades to substring containment.
    pub fn compare(&self, op: Op, other: &StringField) -> bool {
        match op {
            Op::Equals => self.value == other.value,
            Op::NotEquals => self.value != other.value,
            Op::LessThan => self.value < other.value,
            Op::LessThanOrEq => self.value <= other.value,
            Op::GreaterThan => self.value > other.value,
            Op::GreaterThanOrEq => self.value >= other.value,
            Op::Like => self.value.contains(other.value.as_str()),
        }
    }
}

impl Field for StringField {
    fn get_type(&self) -> Type {
        Type::StringType
    }

    fn serialize(&self) -> Vec<u8> {
        let cap = config::string_len();
        let mut bytes = vec![0u8; cap + 4];
        let str_bytes = self.value.as_bytes();
        let copy_len = std::cmp::min(str_bytes.len(), cap);
        bytes[0..4].copy_from_slice(&(copy_len as u32).to_be_bytes());
        bytes[4..4 + copy_len].copy_from_slice(&str_bytes[..copy_len]);
        bytes
    }
}

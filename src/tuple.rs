use std::fmt::{Display, Formatter};

use crate::error::{DbError, DbResult};
use crate::fields::{Field, FieldVal};
use crate::heap_page::HeapPageId;
use crate::types::Type;

// The on-disk location of a tuple: which page, and which slot within it.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct RecordId {
    pid: HeapPageId,
    tuple_no: usize,
}

impl RecordId {
    pub fn new(pid: HeapPageId, tuple_no: usize) -> Self {
        RecordId { pid, tuple_no }
    }

    pub fn get_page_id(&self) -> HeapPageId {
        self.pid
    }

    pub fn get_tuple_no(&self) -> usize {
        self.tuple_no
    }
}

// Ordered sequence of (Type, name) describing a row's shape. Two
// TupleDescs compare equal iff their type sequences match elementwise;
// field names are not part of equality.
#[derive(Debug, Clone)]
pub struct TupleDesc {
    types: Vec<Type>,
    fields: Vec<String>,
}

impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.types == other.types
    }
}
impl Eq for TupleDesc {}

impl TupleDesc {
    pub fn new(types: Vec<Type>, fields: Vec<String>) -> Self {
        assert!(!types.is_empty(), "TupleDesc must have at least one field");
        TupleDesc { types, fields }
    }

    // Concatenates two schemas into one with td1's fields first.
    pub fn combine(td1: &TupleDesc, td2: &TupleDesc) -> TupleDesc {
        let mut types = td1.types.clone();
        types.extend(td2.types.clone());
        let mut field_names = td1.fields.clone();
        field_names.extend(td2.fields.clone());
        TupleDesc::new(types, field_names)
    }

    pub fn get_num_fields(&self) -> usize {
        self.types.len()
    }

    pub fn get_field_name(&self, i: usize) -> Option<&String> {
        self.fields.get(i)
    }

    pub fn name_to_id(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|n| n == name)
    }

    pub fn get_field_type(&self, i: usize) -> Option<&Type> {
        self.types.get(i)
    }

    // Serialized size of a tuple of this shape, in bytes.
    pub fn get_size(&self) -> usize {
        self.types.iter().fold(0, |acc, t| acc + t.get_len())
    }
}

// A row: a TupleDesc-shaped sequence of field values plus an optional
// locator for where it lives on disk.
#[derive(Debug, Clone)]
pub struct Tuple {
    fields: Vec<FieldVal>,
    td: TupleDesc,
    rid: Option<RecordId>,
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields && self.td == other.td
    }
}
impl Eq for Tuple {}

impl Display for Tuple {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut s = String::new();
        for (i, field) in self.fields.iter().enumerate() {
            let name = self
                .td
                .get_field_name(i)
                .map(|n| n.as_str())
                .unwrap_or("?");
            match field {
                FieldVal::IntField(int_field) => {
                    s.push_str(&format!("{}: {}", name, int_field.get_value()))
                }
                FieldVal::StringField(string_field) => {
                    s.push_str(&format!("{}: {}", name, string_field.get_value()))
                }
            }
            if i != self.fields.len() - 1 {
                s.push_str(", ");
            }
        }
        write!(f, "{{{}}}", s)
    }
}

impl Tuple {
    pub fn new(fields: Vec<FieldVal>, td: &TupleDesc) -> Self {
        Tuple {
            fields,
            td: td.clone(),
            rid: None,
        }
    }

    // A tuple with no live fields, used to fill unused page slots.
    pub fn empty(td: &TupleDesc) -> Self {
        Tuple {
            fields: Vec::new(),
            td: td.clone(),
            rid: None,
        }
    }

    pub fn get_tuple_desc(&self) -> &TupleDesc {
        &self.td
    }

    pub fn get_record_id(&self) -> Option<RecordId> {
        self.rid
    }

    pub fn set_record_id(&mut self, rid: RecordId) {
        self.rid = Some(rid);
    }

    pub fn get_field(&self, i: usize) -> DbResult<&FieldVal> {
        self.fields.get(i).ok_or(DbError::FieldIndexOutOfRange(i))
    }

    pub fn set_field(&mut self, i: usize, field: FieldVal) -> DbResult<()> {
        if i >= self.fields.len() {
            return Err(DbError::FieldIndexOutOfRange(i));
        }
        self.fields[i] = field;
        Ok(())
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = vec![];
        for field in self.fields.iter() {
            bytes.extend(field.serialize());
        }
        bytes
    }

    pub fn deserialize(bytes: &[u8], td: &TupleDesc) -> DbResult<Self> {
        let mut offset = 0;
        let mut fields = vec![];
        for t in td.types.iter() {
            let field = t.parse(&bytes[offset..])?;
            offset += t.get_len();
            fields.push(field);
        }
        Ok(Tuple::new(fields, td))
    }

    pub fn get_fields(&self) -> &[FieldVal] {
        &self.fields
    }
}

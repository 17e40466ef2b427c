use crate::config;
use crate::error::{DbError, DbResult};
use crate::fields::{FieldVal, IntField, StringField};

// The closed set of field types the engine understands.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Type {
    IntType,
    StringType,
}

impl Type {
    // Serialized size of a field of this type, in bytes.
    pub fn get_len(&self) -> usize {
        match self {
            Type::IntType => 4,
            Type::StringType => config::string_len() + 4,
        }
    }

    // Parses one field of this type out of the front of bytes.
    pub fn parse(&self, bytes: &[u8]) -> DbResult<FieldVal> {
        match self {
            Type::IntType => {
                let mut int_bytes = [0; 4];
                int_bytes.copy_from_slice(&bytes[..4]);
                Ok(FieldVal::IntField(IntField::new(i32::from_be_bytes(
                    int_bytes,
                ))))
            }
            Type::StringType => {
                let mut len_bytes = [0; 4];
                len_bytes.copy_from_slice(&bytes[..4]);
                let len = u32::from_be_bytes(len_bytes) as usize;
                let cap = config::string_len();
                if len > cap {
                    return Err(DbError::SchemaMismatch(format!(
                        "string length prefix {} exceeds STRING_LEN {}",
                        len, cap
                    )));
                }
                let string_bytes = &bytes[4..4 + len];
                let value = String::from_utf8_lossy(string_bytes).into_owned();
                Ok(FieldVal::StringField(StringField::new(value)))
            }
        }
    }
}

// Comparison operators available to predicates, join predicates, and
// histogram selectivity estimates.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Op {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEq,
    GreaterThan,
    GreaterThanOrEq,
    Like,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_round_trips_through_parse() {
        let field = IntField::new(-7);
        let bytes = field.serialize();
        let parsed = Type::IntType.parse(&bytes).unwrap();
        assert_eq!(parsed, FieldVal::IntField(IntField::new(-7)));
    }

    #[test]
    fn string_len_reflects_config() {
        assert_eq!(Type::StringType.get_len(), config::string_len() + 4);
    }
}

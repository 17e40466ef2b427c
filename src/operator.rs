//! Pull-based operator protocol: every node in the execution tree
//! exposes `open`/`has_next`/`next`/`close`/`rewind` over a single
//! output schema.
//!
//! Concrete operators (`SeqScan`, `Filter`, `Insert`, `Delete`) each keep
//! their own `is_open` flag and one buffered lookahead tuple, and
//! implement `has_next`/`next` on top of a private `fetch_next` that
//! returns the next tuple or `None` at end of stream. A shared base
//! *trait* can't own that buffer (Rust has no field inheritance), so
//! each operator repeats the small state machine rather than inheriting
//! it; the shape is identical across all four.

use crate::error::{DbError, DbResult};
use crate::fields::FieldVal;
use crate::tuple::{Tuple, TupleDesc};
use crate::types::Op;

/// Uniform iterator contract for a node in the execution tree.
pub trait Operator {
    /// Idempotent-ish transition `closed -> open`. Fails with
    /// `DbError::AlreadyOpen` if already open.
    fn open(&mut self) -> DbResult<()>;

    /// Transition to `closed`. Always succeeds.
    fn close(&mut self);

    /// `true` iff another tuple is available without consuming it.
    /// Fails with `DbError::IteratorNotOpen` if called before `open`.
    fn has_next(&mut self) -> DbResult<bool>;

    /// Consume and return the next tuple. Fails with
    /// `DbError::NoMoreTuples` past the end, `DbError::IteratorNotOpen`
    /// before `open`.
    fn next(&mut self) -> DbResult<Tuple>;

    /// Schema of the tuples this operator produces. Defined before open.
    fn get_tuple_desc(&self) -> &TupleDesc;

    /// `close(); open()`, restarting iteration from the top.
    fn rewind(&mut self) -> DbResult<()> {
        self.close();
        self.open()
    }

    /// This operator's children, for inspecting or rewriting the tree.
    /// Leaf operators (e.g. `SeqScan`) have none; the default covers them.
    fn get_children(&self) -> Vec<&dyn Operator> {
        Vec::new()
    }

    /// Replace this operator's children. The default panics: only
    /// operators that actually have children need to override it, and a
    /// caller handing children to a leaf operator is a programming error.
    fn set_children(&mut self, children: Vec<Box<dyn Operator>>) {
        assert!(
            children.is_empty(),
            "set_children called with children on a leaf operator"
        );
    }
}

/// `t.field(field_index) <op> operand`.
pub struct Predicate {
    field_index: usize,
    op: Op,
    operand: FieldVal,
}

impl Predicate {
    pub fn new(field_index: usize, op: Op, operand: FieldVal) -> Self {
        Predicate {
            field_index,
            op,
            operand,
        }
    }

    pub fn filter(&self, t: &Tuple) -> DbResult<bool> {
        Ok(t.get_field(self.field_index)?.compare(self.op, &self.operand))
    }
}

/// `l.field(left_index) <op> r.field(right_index)`, for join operators.
/// No join operator is in scope here; kept alongside `Predicate` since
/// both are pure predicate values with no operator
/// state of their own.
pub struct JoinPredicate {
    left_index: usize,
    op: Op,
    right_index: usize,
}

impl JoinPredicate {
    pub fn new(left_index: usize, op: Op, right_index: usize) -> Self {
        JoinPredicate {
            left_index,
            op,
            right_index,
        }
    }

    pub fn filter(&self, l: &Tuple, r: &Tuple) -> DbResult<bool> {
        Ok(l.get_field(self.left_index)?
            .compare(self.op, r.get_field(self.right_index)?))
    }
}

/// Shared bookkeeping for the lookahead state machine every concrete
/// operator in this module embeds: whether it's open, and the one tuple
/// buffered ahead of the caller.
#[derive(Default)]
pub(crate) struct Lookahead {
    open: bool,
    buffered: Option<Tuple>,
}

impl Lookahead {
    pub(crate) fn is_open(&self) -> bool {
        self.open
    }

    pub(crate) fn mark_opened(&mut self, first: Option<Tuple>) -> DbResult<()> {
        if self.open {
            return Err(DbError::AlreadyOpen);
        }
        self.open = true;
        self.buffered = first;
        Ok(())
    }

    pub(crate) fn mark_closed(&mut self) {
        self.open = false;
        self.buffered = None;
    }

    pub(crate) fn has_next(&self) -> DbResult<bool> {
        if !self.open {
            return Err(DbError::IteratorNotOpen);
        }
        Ok(self.buffered.is_some())
    }

    /// Take the buffered tuple, replacing it with `refill`. Fails with
    /// `NoMoreTuples` if nothing was buffered.
    pub(crate) fn take(&mut self, refill: Option<Tuple>) -> DbResult<Tuple> {
        if !self.open {
            return Err(DbError::IteratorNotOpen);
        }
        let current = self.buffered.take().ok_or(DbError::NoMoreTuples)?;
        self.buffered = refill;
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::IntField;
    use crate::tuple::TupleDesc;
    use crate::types::Type;

    fn tuple(a: i32, b: i32) -> Tuple {
        let td = TupleDesc::new(
            vec![Type::IntType, Type::IntType],
            vec!["a".to_string(), "b".to_string()],
        );
        Tuple::new(
            vec![FieldVal::IntField(IntField::new(a)), FieldVal::IntField(IntField::new(b))],
            &td,
        )
    }

    #[test]
    fn predicate_compares_named_field() {
        let pred = Predicate::new(0, Op::GreaterThan, FieldVal::IntField(IntField::new(1)));
        assert!(!pred.filter(&tuple(1, 10)).unwrap());
        assert!(pred.filter(&tuple(2, 20)).unwrap());
    }

    #[test]
    fn join_predicate_compares_across_tuples() {
        let pred = JoinPredicate::new(0, Op::Equals, 1);
        assert!(pred.filter(&tuple(5, 5), &tuple(99, 5)).unwrap());
        assert!(!pred.filter(&tuple(5, 6), &tuple(99, 5)).unwrap());
    }

    #[test]
    fn lookahead_drives_has_next_and_next() {
        let mut la = Lookahead::default();
        assert!(matches!(la.has_next(), Err(DbError::IteratorNotOpen)));
        la.mark_opened(Some(tuple(1, 1))).unwrap();
        assert!(la.has_next().unwrap());
        let t = la.take(Some(tuple(2, 2))).unwrap();
        assert_eq!(t, tuple(1, 1));
        assert!(la.has_next().unwrap());
        let t = la.take(None).unwrap();
        assert_eq!(t, tuple(2, 2));
        assert!(!la.has_next().unwrap());
        assert!(matches!(la.take(None), Err(DbError::NoMoreTuples)));
    }
}

//! `Insert` and `Delete`: single-emission operators that drain their
//! child and route every tuple through the `BufferPool`. Both produce
//! exactly one output tuple: a single INT field holding the number of
//! tuples affected.

use crate::buffer_pool::BufferPool;
use crate::error::DbResult;
use crate::fields::{FieldVal, IntField};
use crate::operator::{Lookahead, Operator};
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};
use crate::types::Type;

fn count_schema() -> TupleDesc {
    TupleDesc::new(vec![Type::IntType], vec!["count".to_string()])
}

fn count_tuple(n: i32) -> Tuple {
    Tuple::new(vec![FieldVal::IntField(IntField::new(n))], &count_schema())
}

pub struct Insert<'a> {
    tid: TransactionId,
    table_id: usize,
    child: Box<dyn Operator>,
    bp: &'a BufferPool,
    td: TupleDesc,
    lookahead: Lookahead,
    drained: bool,
}

impl<'a> Insert<'a> {
    pub fn new(tid: TransactionId, table_id: usize, child: Box<dyn Operator>, bp: &'a BufferPool) -> Self {
        Insert {
            tid,
            table_id,
            child,
            bp,
            td: count_schema(),
            lookahead: Lookahead::default(),
            drained: false,
        }
    }

    /// Drain the child, inserting each tuple through the buffer pool, and
    /// return the count as a single tuple. Only ever produces once: after
    /// this, `fetch_next` returns `None` forever.
    fn fetch_next(&mut self) -> DbResult<Option<Tuple>> {
        if self.drained {
            return Ok(None);
        }
        self.drained = true;
        let mut count = 0i32;
        while self.child.has_next()? {
            let t = self.child.next()?;
            self.bp.insert_tuple(self.tid, self.table_id, t)?;
            count += 1;
        }
        Ok(Some(count_tuple(count)))
    }
}

impl<'a> Operator for Insert<'a> {
    fn open(&mut self) -> DbResult<()> {
        self.child.open()?;
        let first = self.fetch_next()?;
        self.lookahead.mark_opened(first)
    }

    fn close(&mut self) {
        self.child.close();
        self.lookahead.mark_closed();
    }

    fn has_next(&mut self) -> DbResult<bool> {
        self.lookahead.has_next()
    }

    fn next(&mut self) -> DbResult<Tuple> {
        let refill = self.fetch_next()?;
        self.lookahead.take(refill)
    }

    fn get_tuple_desc(&self) -> &TupleDesc {
        &self.td
    }

    fn get_children(&self) -> Vec<&dyn Operator> {
        vec![self.child.as_ref()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn Operator>>) {
        assert_eq!(children.len(), 1, "Insert takes exactly one child");
        self.child = children.remove(0);
    }
}

pub struct Delete<'a> {
    tid: TransactionId,
    child: Box<dyn Operator>,
    bp: &'a BufferPool,
    td: TupleDesc,
    lookahead: Lookahead,
    drained: bool,
}

impl<'a> Delete<'a> {
    pub fn new(tid: TransactionId, child: Box<dyn Operator>, bp: &'a BufferPool) -> Self {
        Delete {
            tid,
            child,
            bp,
            td: count_schema(),
            lookahead: Lookahead::default(),
            drained: false,
        }
    }

    fn fetch_next(&mut self) -> DbResult<Option<Tuple>> {
        if self.drained {
            return Ok(None);
        }
        self.drained = true;
        let mut count = 0i32;
        while self.child.has_next()? {
            let t = self.child.next()?;
            self.bp.delete_tuple(self.tid, &t)?;
            count += 1;
        }
        Ok(Some(count_tuple(count)))
    }
}

impl<'a> Operator for Delete<'a> {
    fn open(&mut self) -> DbResult<()> {
        self.child.open()?;
        let first = self.fetch_next()?;
        self.lookahead.mark_opened(first)
    }

    fn close(&mut self) {
        self.child.close();
        self.lookahead.mark_closed();
    }

    fn has_next(&mut self) -> DbResult<bool> {
        self.lookahead.has_next()
    }

    fn next(&mut self) -> DbResult<Tuple> {
        let refill = self.fetch_next()?;
        self.lookahead.take(refill)
    }

    fn get_tuple_desc(&self) -> &TupleDesc {
        &self.td
    }

    fn get_children(&self) -> Vec<&dyn Operator> {
        vec![self.child.as_ref()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn Operator>>) {
        assert_eq!(children.len(), 1, "Delete takes exactly one child");
        self.child = children.remove(0);
    }
}

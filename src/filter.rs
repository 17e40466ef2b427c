//! `Filter`: emits only the child's tuples that satisfy a `Predicate`.

use crate::error::DbResult;
use crate::operator::{Lookahead, Operator, Predicate};
use crate::tuple::{Tuple, TupleDesc};

pub struct Filter {
    predicate: Predicate,
    child: Box<dyn Operator>,
    lookahead: Lookahead,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn Operator>) -> Self {
        Filter {
            predicate,
            child,
            lookahead: Lookahead::default(),
        }
    }

    fn fetch_next(&mut self) -> DbResult<Option<Tuple>> {
        while self.child.has_next()? {
            let t = self.child.next()?;
            if self.predicate.filter(&t)? {
                return Ok(Some(t));
            }
        }
        Ok(None)
    }
}

impl Operator for Filter {
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
        self.child.get_tuple_desc()
    }

    fn get_children(&self) -> Vec<&dyn Operator> {
        vec![self.child.as_ref()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn Operator>>) {
        assert_eq!(children.len(), 1, "Filter takes exactly one child");
        self.child = children.remove(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer_pool::BufferPool;
    use crate::catalog::Catalog;
    use crate::config;
    use crate::fields::{FieldVal, IntField};
    use crate::heap_file::HeapFile;
    use crate::seq_scan::SeqScan;
    use crate::transaction::TransactionId;
    use crate::tuple::{Tuple, TupleDesc};
    use crate::types::{Op, Type};
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    #[test]
    fn filter_on_a_scan_keeps_only_matching_rows() {
        // T(a,b) with rows (1,10),(2,20),(3,30); Filter(a > 1, SeqScan(T))
        // emits (2,20),(3,30).
        let schema = TupleDesc::new(
            vec![Type::IntType, Type::IntType],
            vec!["a".to_string(), "b".to_string()],
        );
        let tmp = NamedTempFile::new().unwrap();
        let file = HeapFile::open(tmp.path(), schema.clone()).unwrap();
        let catalog = Arc::new(Catalog::new());
        catalog.add_table(Arc::new(file), "t".to_string(), None);
        let table_id = catalog.get_file_id_by_name("t").unwrap();
        let bp = BufferPool::new(Arc::clone(&catalog), config::buffer_pool_default_pages());
        let tid = TransactionId::new();

        for (a, b) in [(1, 10), (2, 20), (3, 30)] {
            bp.insert_tuple(
                tid,
                table_id,
                Tuple::new(
                    vec![FieldVal::IntField(IntField::new(a)), FieldVal::IntField(IntField::new(b))],
                    &schema,
                ),
            )
            .unwrap();
        }

        let scan = SeqScan::new(tid, table_id, "t", Arc::clone(&catalog), &bp).unwrap();
        let pred = crate::operator::Predicate::new(0, Op::GreaterThan, FieldVal::IntField(IntField::new(1)));
        let mut filter = Filter::new(pred, Box::new(scan));

        filter.open().unwrap();
        let mut rows = Vec::new();
        while filter.has_next().unwrap() {
            let t = filter.next().unwrap();
            rows.push((
                t.get_field(0).unwrap().clone().into_int().unwrap().get_value(),
                t.get_field(1).unwrap().clone().into_int().unwrap().get_value(),
            ));
        }
        assert_eq!(rows, vec![(2, 20), (3, 30)]);
    }

    #[test]
    fn get_and_set_children_expose_the_scan() {
        let schema = TupleDesc::new(vec![Type::IntType], vec!["a".to_string()]);
        let tmp = NamedTempFile::new().unwrap();
        let file = HeapFile::open(tmp.path(), schema.clone()).unwrap();
        let catalog = Arc::new(Catalog::new());
        catalog.add_table(Arc::new(file), "t".to_string(), None);
        let table_id = catalog.get_file_id_by_name("t").unwrap();
        let bp = BufferPool::new(Arc::clone(&catalog), config::buffer_pool_default_pages());
        let tid = TransactionId::new();

        let scan = SeqScan::new(tid, table_id, "t", Arc::clone(&catalog), &bp).unwrap();
        let pred = crate::operator::Predicate::new(0, Op::GreaterThan, FieldVal::IntField(IntField::new(1)));
        let mut filter = Filter::new(pred, Box::new(scan));
        assert_eq!(filter.get_children().len(), 1);

        let replacement = SeqScan::new(tid, table_id, "t2", Arc::clone(&catalog), &bp).unwrap();
        filter.set_children(vec![Box::new(replacement)]);
        assert_eq!(filter.get_tuple_desc().get_field_name(0), Some(&"t2.a".to_string()));
    }
}

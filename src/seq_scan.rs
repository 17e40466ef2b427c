//! `SeqScan`: emits every tuple of a table, page by page, through the
//! buffer pool.
//!
//! `heap_file.rs` exposes the same page-by-page cursor as a `HeapFile`
//! method (`HeapFileIterator`); `SeqScan` implements the same
//! closed/open/exhausted state machine itself rather than holding a
//! borrowed `HeapFileIterator`, since the iterator borrows the `HeapFile`
//! for its own lifetime and an operator that must outlive a single
//! `open()` call can't hold both the file and a borrow into it in the
//! same struct. The logic is identical; only the ownership shape differs.

use std::sync::Arc;

use crate::buffer_pool::BufferPool;
use crate::catalog::Catalog;
use crate::error::DbResult;
use crate::heap_page::{HeapPageId, Permission};
use crate::operator::{Lookahead, Operator};
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};

pub struct SeqScan<'a> {
    tid: TransactionId,
    table_id: usize,
    alias: String,
    catalog: Arc<Catalog>,
    bp: &'a BufferPool,
    td: TupleDesc,
    page_no: usize,
    tuples: Vec<Tuple>,
    pos: usize,
    lookahead: Lookahead,
}

impl<'a> SeqScan<'a> {
    /// `alias` prefixes every output field name as `"{alias}.{name}"`,
    /// independent of the underlying table's own name.
    pub fn new(
        tid: TransactionId,
        table_id: usize,
        alias: impl Into<String>,
        catalog: Arc<Catalog>,
        bp: &'a BufferPool,
    ) -> DbResult<Self> {
        let alias = alias.into();
        let file_td = catalog.get_tuple_desc(table_id)?;
        let aliased_names = (0..file_td.get_num_fields())
            .map(|i| {
                let name = file_td
                    .get_field_name(i)
                    .cloned()
                    .unwrap_or_else(|| i.to_string());
                format!("{alias}.{name}")
            })
            .collect();
        let types = (0..file_td.get_num_fields())
            .map(|i| *file_td.get_field_type(i).unwrap())
            .collect();
        let td = TupleDesc::new(types, aliased_names);

        Ok(SeqScan {
            tid,
            table_id,
            alias,
            catalog,
            bp,
            td,
            page_no: 0,
            tuples: Vec::new(),
            pos: 0,
            lookahead: Lookahead::default(),
        })
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn table_id(&self) -> usize {
        self.table_id
    }

    /// Skip forward from `page_no` to the first non-empty page (or past
    /// the end), loading its tuples and returning the first one.
    fn advance_to_page(&mut self, mut page_no: usize) -> DbResult<Option<Tuple>> {
        let file = self.catalog.get_file(self.table_id)?;
        let total = file.num_pages();
        loop {
            if page_no >= total {
                self.page_no = page_no;
                self.tuples.clear();
                self.pos = 0;
                return Ok(None);
            }
            let pid = HeapPageId::new(self.table_id, page_no);
            let page = self.bp.get_page(self.tid, pid, Permission::Read)?;
            let tuples: Vec<Tuple> = page.read().unwrap().iterate_tuples().cloned().collect();
            if !tuples.is_empty() {
                self.page_no = page_no;
                let first = tuples[0].clone();
                self.tuples = tuples;
                self.pos = 1;
                return Ok(Some(first));
            }
            page_no += 1;
        }
    }

    fn fetch_next(&mut self) -> DbResult<Option<Tuple>> {
        if self.pos < self.tuples.len() {
            let t = self.tuples[self.pos].clone();
            self.pos += 1;
            Ok(Some(t))
        } else {
            self.advance_to_page(self.page_no + 1)
        }
    }
}

impl<'a> Operator for SeqScan<'a> {
    fn open(&mut self) -> DbResult<()> {
        let first = self.advance_to_page(0)?;
        self.lookahead.mark_opened(first)
    }

    fn close(&mut self) {
        self.tuples.clear();
        self.pos = 0;
        self.page_no = 0;
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::error::DbError;
    use crate::fields::{FieldVal, IntField};
    use crate::heap_file::HeapFile;
    use crate::tuple::TupleDesc;
    use crate::types::Type;
    use tempfile::NamedTempFile;

    fn schema() -> TupleDesc {
        TupleDesc::new(
            vec![Type::IntType, Type::IntType],
            vec!["a".to_string(), "b".to_string()],
        )
    }

    fn setup(n: i32) -> (Arc<Catalog>, BufferPool, usize, TransactionId, NamedTempFile) {
        let tmp = NamedTempFile::new().unwrap();
        let file = HeapFile::open(tmp.path(), schema()).unwrap();
        let catalog = Arc::new(Catalog::new());
        catalog.add_table(Arc::new(file), "t".to_string(), None);
        let table_id = catalog.get_file_id_by_name("t").unwrap();
        let bp = BufferPool::new(Arc::clone(&catalog), config::buffer_pool_default_pages());
        let tid = TransactionId::new();
        for i in 0..n {
            bp.insert_tuple(
                tid,
                table_id,
                Tuple::new(
                    vec![FieldVal::IntField(IntField::new(i)), FieldVal::IntField(IntField::new(i * 10))],
                    &schema(),
                ),
            )
            .unwrap();
        }
        (catalog, bp, table_id, tid, tmp)
    }

    #[test]
    fn scan_emits_every_tuple_with_aliased_schema() {
        // Driven through the operator rather than the raw HeapFile
        // cursor: 17 tuples spanning (at default page size)
        // more than one page, in insertion order.
        let (catalog, bp, table_id, tid, _tmp) = setup(17);
        let mut scan = SeqScan::new(tid, table_id, "t", Arc::clone(&catalog), &bp).unwrap();
        assert_eq!(scan.get_tuple_desc().get_field_name(0), Some(&"t.a".to_string()));

        scan.open().unwrap();
        let mut seen = Vec::new();
        while scan.has_next().unwrap() {
            let tup = scan.next().unwrap();
            seen.push(tup.get_field(0).unwrap().clone().into_int().unwrap().get_value());
        }
        assert_eq!(seen, (0..17).collect::<Vec<_>>());
        assert!(matches!(scan.next(), Err(DbError::NoMoreTuples)));
    }

    #[test]
    fn rewind_restarts_from_the_top() {
        let (catalog, bp, table_id, tid, _tmp) = setup(3);
        let mut scan = SeqScan::new(tid, table_id, "t", catalog, &bp).unwrap();
        scan.open().unwrap();
        scan.next().unwrap();
        scan.rewind().unwrap();
        let first = scan.next().unwrap();
        assert_eq!(first.get_field(0).unwrap().clone().into_int().unwrap().get_value(), 0);
    }

    #[test]
    fn double_open_is_an_error() {
        let (catalog, bp, table_id, tid, _tmp) = setup(1);
        let mut scan = SeqScan::new(tid, table_id, "t", catalog, &bp).unwrap();
        scan.open().unwrap();
        assert!(matches!(scan.open(), Err(DbError::AlreadyOpen)));
    }
}

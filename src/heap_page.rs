use crate::config;
use crate::error::{DbError, DbResult};
use crate::transaction::TransactionId;
use crate::tuple::{RecordId, Tuple, TupleDesc};

// The kind of access a caller intends to make through the buffer pool.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Copy)]
pub enum Permission {
    Read,
    Write,
}

/// Identity of a page within a table: table id plus page number.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Copy)]
pub struct HeapPageId {
    table_id: usize,
    page_number: usize,
}

impl HeapPageId {
    pub fn new(table_id: usize, page_number: usize) -> Self {
        HeapPageId {
            table_id,
            page_number,
        }
    }

    pub fn get_table_id(&self) -> usize {
        self.table_id
    }

    pub fn get_page_number(&self) -> usize {
        self.page_number
    }
}

// One on-disk page: a header bitmap marking which slots are in use,
// followed by num_slots fixed-size tuple slots. numSlots = floor((PAGE_SIZE
// * 8) / (tuple_size * 8 + 1)); header is ceil(numSlots / 8) bytes, bit i
// (low-bit-first within each byte) set iff slot i is live.
#[derive(Debug, Clone)]
pub struct HeapPage {
    pid: HeapPageId,
    td: TupleDesc,
    header_size: usize,
    header: Vec<u8>,
    tuples: Vec<Tuple>,
    num_slots: usize,
    before_image: Vec<u8>,
    dirtied_by: Option<TransactionId>,
}

impl HeapPage {
    pub fn num_slots_for(td: &TupleDesc) -> usize {
        let page_size = config::page_size();
        (page_size * 8) / (td.get_size() * 8 + 1)
    }

    pub fn header_size_for(num_slots: usize) -> usize {
        (num_slots + 7) / 8
    }

    // Parses a page of exactly PAGE_SIZE bytes into a HeapPage.
    pub fn new(pid: HeapPageId, data: Vec<u8>, td: TupleDesc) -> DbResult<Self> {
        let page_size = config::page_size();
        if data.len() != page_size {
            return Err(DbError::ShortRead {
                expected: page_size,
                actual: data.len(),
            });
        }

        let num_slots = Self::num_slots_for(&td);
        let header_size = Self::header_size_for(num_slots);
        let header = data[..header_size].to_vec();

        let mut tuples = Vec::with_capacity(num_slots);
        for i in 0..num_slots {
            if Self::get_slot(&header, i) {
                let start = header_size + i * td.get_size();
                let end = start + td.get_size();
                let mut tuple = Tuple::deserialize(&data[start..end], &td)?;
                tuple.set_record_id(RecordId::new(pid, i));
                tuples.push(tuple);
            } else {
                tuples.push(Tuple::empty(&td));
            }
        }

        Ok(HeapPage {
            pid,
            td,
            header_size,
            header,
            tuples,
            num_slots,
            before_image: data,
            dirtied_by: None,
        })
    }

    pub fn get_id(&self) -> HeapPageId {
        self.pid
    }

    // Snapshot taken at load time; recovery hook, recovery itself is out
    // of scope here.
    pub fn get_before_image(&self) -> DbResult<HeapPage> {
        HeapPage::new(self.pid, self.before_image.clone(), self.td.clone())
    }

    pub fn set_before_image(&mut self) {
        self.before_image = self.get_page_data();
    }

    // Serializes back to exactly PAGE_SIZE bytes: header, then body, then
    // zero padding.
    pub fn get_page_data(&self) -> Vec<u8> {
        let mut data = self.header.clone();
        for i in 0..self.num_slots {
            if Self::get_slot(&self.header, i) {
                data.extend(self.tuples[i].serialize());
            } else {
                data.extend(vec![0; self.td.get_size()]);
            }
        }
        let page_size = config::page_size();
        data.resize(page_size, 0);
        data
    }

    fn get_slot(header: &[u8], i: usize) -> bool {
        let idx = i / 8;
        let bit = i % 8;
        if idx >= header.len() {
            return false;
        }
        (header[idx] & (1 << bit)) != 0
    }

    fn set_slot(header: &mut [u8], i: usize, value: bool) {
        let idx = i / 8;
        let bit = i % 8;
        if value {
            header[idx] |= 1 << bit;
        } else {
            header[idx] &= !(1 << bit);
        }
    }

    pub fn is_slot_used(&self, i: usize) -> bool {
        Self::get_slot(&self.header, i)
    }

    pub fn mark_slot_used(&mut self, i: usize, used: bool) {
        Self::set_slot(&mut self.header, i, used);
    }

    // Inserts t into the lowest-index unused slot. NoEmptySlot if full.
    pub fn insert_tuple(&mut self, mut t: Tuple, tid: TransactionId) -> DbResult<()> {
        if t.get_tuple_desc() != &self.td {
            return Err(DbError::SchemaMismatch(
                "tuple schema does not match page schema".to_string(),
            ));
        }
        for i in 0..self.num_slots {
            if !self.is_slot_used(i) {
                t.set_record_id(RecordId::new(self.pid, i));
                self.tuples[i] = t;
                self.mark_slot_used(i, true);
                self.mark_dirty(true, tid);
                return Ok(());
            }
        }
        Err(DbError::NoEmptySlot)
    }

    // Removes the tuple named by t.get_record_id(). TupleNotOnPage if the
    // record id doesn't name a live slot on this page.
    pub fn delete_tuple(&mut self, t: &Tuple, tid: TransactionId) -> DbResult<()> {
        let rid = t.get_record_id().ok_or(DbError::TupleNotOnPage)?;
        let tuple_no = rid.get_tuple_no();
        if rid.get_page_id() != self.pid || tuple_no >= self.num_slots {
            return Err(DbError::TupleNotOnPage);
        }
        if !self.is_slot_used(tuple_no) {
            return Err(DbError::TupleNotOnPage);
        }
        self.tuples[tuple_no] = Tuple::empty(&self.td);
        self.mark_slot_used(tuple_no, false);
        self.mark_dirty(true, tid);
        Ok(())
    }

    pub fn get_num_empty_slots(&self) -> usize {
        (0..self.num_slots).filter(|&i| !self.is_slot_used(i)).count()
    }

    pub fn mark_dirty(&mut self, dirty: bool, tid: TransactionId) {
        self.dirtied_by = if dirty { Some(tid) } else { None };
    }

    pub fn is_dirty(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    pub fn iterate_tuples(&self) -> HeapPageIterator<'_> {
        HeapPageIterator {
            page: self,
            index: 0,
        }
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    pub fn header_size(&self) -> usize {
        self.header_size
    }
}

pub struct HeapPageIterator<'a> {
    page: &'a HeapPage,
    index: usize,
}

impl<'a> Iterator for HeapPageIterator<'a> {
    type Item = &'a Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.page.num_slots {
            let i = self.index;
            self.index += 1;
            if HeapPage::get_slot(&self.page.header, i) {
                return Some(&self.page.tuples[i]);
            }
        }
        None
    }
}

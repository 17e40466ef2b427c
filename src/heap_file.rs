// On-disk table storage: a flat file of fixed-size HeapPages.

use std::collections::hash_map::DefaultHasher;
use std::fs::{File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{Read as IoRead, Seek, SeekFrom, Write as IoWrite};
use std::path::Path;
use std::sync::Mutex;

use crate::buffer_pool::BufferPool;
use crate::config;
use crate::error::{DbError, DbResult};
use crate::heap_page::{HeapPage, HeapPageId, Permission};
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};

// Abstraction over "a file backing a table", so the catalog and buffer
// pool never hard-code HeapFile as the only storage format.
pub trait DbFile {
    fn get_id(&self) -> usize;
    fn get_tuple_desc(&self) -> &TupleDesc;
    fn read_page(&self, pid: &HeapPageId) -> DbResult<HeapPage>;
    fn write_page(&self, page: &HeapPage) -> DbResult<()>;
    fn num_pages(&self) -> usize;
    fn insert_tuple(
        &self,
        tid: TransactionId,
        tuple: Tuple,
        bp: &BufferPool,
    ) -> DbResult<Vec<HeapPageId>>;
    fn delete_tuple(
        &self,
        tid: TransactionId,
        tuple: &Tuple,
        bp: &BufferPool,
    ) -> DbResult<HeapPageId>;
    fn as_any(&self) -> &dyn std::any::Any;
}

// Recovers the concrete storage format behind a DbFile trait object.
// HeapFile is the only format implemented; operators that need the
// page-cursor downcast here rather than widening the trait.
pub trait DbFileExt {
    fn as_any_heap_file(&self) -> &HeapFile;
}

impl DbFileExt for dyn DbFile + Send + Sync {
    fn as_any_heap_file(&self) -> &HeapFile {
        self.as_any()
            .downcast_ref::<HeapFile>()
            .expect("DbFile implementation is not a HeapFile")
    }
}

// A table stored as a flat heap file on disk.
pub struct HeapFile {
    file: Mutex<File>,
    td: TupleDesc,
    id: usize,
}

impl HeapFile {
    // Opens (creating if necessary) the file at path as a heap file with
    // schema td. The table id is a stable hash of the canonicalized path,
    // so the same file resolves to the same id across runs.
    pub fn open(path: &Path, td: TupleDesc) -> DbResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let mut hasher = DefaultHasher::new();
        canonical.hash(&mut hasher);
        let id = hasher.finish() as usize;
        Ok(HeapFile {
            file: Mutex::new(file),
            td,
            id,
        })
    }

    fn num_pages_locked(file: &File) -> DbResult<usize> {
        let len = file.metadata()?.len() as usize;
        let page_size = config::page_size();
        Ok(len / page_size)
    }

    // Extends the file by one zero-filled page and returns its id.
    pub(crate) fn append_empty_page(&self) -> DbResult<HeapPageId> {
        let page_size = config::page_size();
        let mut file = self.file.lock().unwrap();
        let num_pages = Self::num_pages_locked(&file)?;
        file.seek(SeekFrom::Start((num_pages * page_size) as u64))?;
        file.write_all(&vec![0u8; page_size])?;
        Ok(HeapPageId::new(self.id, num_pages))
    }

    // Builds a cursor over this file's tuples in page/slot order, reading
    // through bp so touched pages are cached like any other access.
    pub fn iterator<'a>(&'a self, bp: &'a BufferPool, tid: TransactionId) -> HeapFileIterator<'a> {
        HeapFileIterator::new(self, bp, tid)
    }
}

impl DbFile for HeapFile {
    fn get_id(&self) -> usize {
        self.id
    }

    fn get_tuple_desc(&self) -> &TupleDesc {
        &self.td
    }

    // Positioned read of one page. ReadPastEnd if pid is beyond the
    // file's current length, ShortRead if the file is truncated.
    fn read_page(&self, pid: &HeapPageId) -> DbResult<HeapPage> {
        let page_size = config::page_size();
        let mut file = self.file.lock().unwrap();
        let num_pages = Self::num_pages_locked(&file)?;
        let page_no = pid.get_page_number();
        if page_no >= num_pages {
            return Err(DbError::ReadPastEnd {
                page_number: page_no,
                num_pages,
            });
        }

        let mut data = vec![0u8; page_size];
        file.seek(SeekFrom::Start((page_no * page_size) as u64))?;
        if let Err(e) = file.read_exact(&mut data) {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                return Err(DbError::ShortRead {
                    expected: page_size,
                    actual: 0,
                });
            }
            return Err(e.into());
        }
        HeapPage::new(*pid, data, self.td.clone())
    }

    fn write_page(&self, page: &HeapPage) -> DbResult<()> {
        let pid = page.get_id();
        let data = page.get_page_data();
        let page_size = config::page_size();
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start((pid.get_page_number() * page_size) as u64))?;
        file.write_all(&data)?;
        Ok(())
    }

    fn num_pages(&self) -> usize {
        let file = self.file.lock().unwrap();
        Self::num_pages_locked(&file).unwrap_or(0)
    }

    // Finds the first page with a free slot and inserts there through bp.
    // Falls back to a brand-new page if every existing page is full.
    fn insert_tuple(
        &self,
        tid: TransactionId,
        tuple: Tuple,
        bp: &BufferPool,
    ) -> DbResult<Vec<HeapPageId>> {
        let table_id = self.get_id();
        let existing_pages = self.num_pages();
        for page_no in 0..existing_pages {
            let pid = HeapPageId::new(table_id, page_no);
            let page = bp.get_page(tid, pid, Permission::Read)?;
            let has_room = page.read().unwrap().get_num_empty_slots() > 0;
            if has_room {
                let page = bp.get_page(tid, pid, Permission::Write)?;
                let mut guard = page.write().unwrap();
                guard.insert_tuple(tuple, tid)?;
                return Ok(vec![pid]);
            }
        }

        let pid = self.append_empty_page()?;
        let page = bp.get_page(tid, pid, Permission::Write)?;
        let mut guard = page.write().unwrap();
        guard.insert_tuple(tuple, tid)?;
        Ok(vec![pid])
    }

    fn delete_tuple(
        &self,
        tid: TransactionId,
        tuple: &Tuple,
        bp: &BufferPool,
    ) -> DbResult<HeapPageId> {
        let rid = tuple.get_record_id().ok_or(DbError::TupleNotOnPage)?;
        let pid = rid.get_page_id();
        let page = bp.get_page(tid, pid, Permission::Write)?;
        let mut guard = page.write().unwrap();
        guard.delete_tuple(tuple, tid)?;
        Ok(pid)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

enum IterState {
    Closed,
    Open {
        page_no: usize,
        tuples: Vec<Tuple>,
        pos: usize,
    },
}

// Explicit open/has_next/next/rewind/close cursor over a heap file's
// tuples, page by page. Skips empty pages rather than yielding nothing
// for them.
pub struct HeapFileIterator<'a> {
    file: &'a HeapFile,
    bp: &'a BufferPool,
    tid: TransactionId,
    state: IterState,
}

impl<'a> HeapFileIterator<'a> {
    fn new(file: &'a HeapFile, bp: &'a BufferPool, tid: TransactionId) -> Self {
        HeapFileIterator {
            file,
            bp,
            tid,
            state: IterState::Closed,
        }
    }

    pub fn open(&mut self) -> DbResult<()> {
        self.advance_to_page(0)
    }

    fn advance_to_page(&mut self, mut page_no: usize) -> DbResult<()> {
        let total = self.file.num_pages();
        loop {
            if page_no >= total {
                self.state = IterState::Closed;
                return Ok(());
            }
            let pid = HeapPageId::new(self.file.get_id(), page_no);
            let page = self.bp.get_page(self.tid, pid, Permission::Read)?;
            let tuples: Vec<Tuple> = page.read().unwrap().iterate_tuples().cloned().collect();
            if !tuples.is_empty() {
                self.state = IterState::Open {
                    page_no,
                    tuples,
                    pos: 0,
                };
                return Ok(());
            }
            page_no += 1;
        }
    }

    pub fn has_next(&mut self) -> bool {
        loop {
            match &self.state {
                IterState::Closed => return false,
                IterState::Open { tuples, pos, .. } if *pos < tuples.len() => return true,
                IterState::Open { page_no, .. } => {
                    let next_page = *page_no + 1;
                    if self.advance_to_page(next_page).is_err() {
                        return false;
                    }
                }
            }
        }
    }

    pub fn next(&mut self) -> DbResult<Option<Tuple>> {
        match &mut self.state {
            IterState::Open { page_no, tuples, pos } => {
                if *pos < tuples.len() {
                    let t = tuples[*pos].clone();
                    *pos += 1;
                    Ok(Some(t))
                } else {
                    let next_page = *page_no + 1;
                    self.advance_to_page(next_page)?;
                    self.next()
                }
            }
            IterState::Closed => Ok(None),
        }
    }

    pub fn rewind(&mut self) -> DbResult<()> {
        self.open()
    }

    pub fn close(&mut self) {
        self.state = IterState::Closed;
    }
}

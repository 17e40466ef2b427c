// The bounded in-memory cache of pages: the sole portal through which any
// operator or HeapFile touches page contents.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, RwLock};

use log::{debug, trace};
use lru::LruCache;

use crate::catalog::Catalog;
use crate::config;
use crate::error::DbResult;
use crate::heap_page::{HeapPage, HeapPageId, Permission};
use crate::transaction::TransactionId;
use crate::tuple::Tuple;

type CachedPage = Arc<RwLock<HeapPage>>;

// Bounded, LRU-evicting cache of HeapPages. At most max_pages pages are
// resident at once; get_page is the only way to read a page, and always
// moves the requested page to MRU whether it was a hit or a miss.
pub struct BufferPool {
    catalog: Arc<Catalog>,
    cache: Mutex<LruCache<HeapPageId, CachedPage>>,
    max_pages: usize,
}

impl BufferPool {
    pub fn new(catalog: Arc<Catalog>, max_pages: usize) -> Self {
        let cap = NonZeroUsize::new(max_pages).unwrap_or(NonZeroUsize::new(1).unwrap());
        BufferPool {
            catalog,
            cache: Mutex::new(LruCache::new(cap)),
            max_pages,
        }
    }

    pub fn with_default_capacity(catalog: Arc<Catalog>) -> Self {
        Self::new(catalog, config::buffer_pool_default_pages())
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Fetches pid, reading it from disk on a miss. perm is currently
    // advisory (no page-level locking is implemented) but is kept in the
    // signature since every call site names the access mode it intends.
    pub fn get_page(
        &self,
        _tid: TransactionId,
        pid: HeapPageId,
        _perm: Permission,
    ) -> DbResult<CachedPage> {
        let mut cache = self.cache.lock().unwrap();
        if let Some(page) = cache.get(&pid) {
            trace!("buffer pool hit for {:?}", pid);
            return Ok(Arc::clone(page));
        }

        let file = self.catalog.get_file(pid.get_table_id())?;
        let page = file.read_page(&pid)?;
        let page = Arc::new(RwLock::new(page));
        self.insert_evicting(&mut cache, pid, Arc::clone(&page))?;
        Ok(page)
    }

    // Pushes page into the cache at MRU, evicting (and flushing if dirty)
    // until there is room.
    fn insert_evicting(
        &self,
        cache: &mut LruCache<HeapPageId, CachedPage>,
        pid: HeapPageId,
        page: CachedPage,
    ) -> DbResult<()> {
        while cache.len() >= self.max_pages && !cache.contains(&pid) {
            if let Some((victim_pid, victim_page)) = cache.pop_lru() {
                self.flush_if_dirty(victim_pid, &victim_page)?;
                debug!("evicted {:?}", victim_pid);
            } else {
                break;
            }
        }
        cache.put(pid, page);
        Ok(())
    }

    fn flush_if_dirty(&self, pid: HeapPageId, page: &CachedPage) -> DbResult<()> {
        let mut guard = page.write().unwrap();
        if guard.is_dirty().is_some() {
            let file = self.catalog.get_file(pid.get_table_id())?;
            file.write_page(&guard)?;
            guard.mark_dirty(false, TransactionId::new());
            guard.set_before_image();
        }
        Ok(())
    }

    // Inserts tuple into table_id's file, ensuring every page the file
    // dirties ends up cached at MRU.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: usize,
        tuple: Tuple,
    ) -> DbResult<Vec<HeapPageId>> {
        let file = self.catalog.get_file(table_id)?;
        let dirtied = file.insert_tuple(tid, tuple, self)?;
        Ok(dirtied)
    }

    // Deletes the tuple named by its own RecordId.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> DbResult<HeapPageId> {
        let rid = tuple
            .get_record_id()
            .ok_or(crate::error::DbError::TupleNotOnPage)?;
        let table_id = rid.get_page_id().get_table_id();
        let file = self.catalog.get_file(table_id)?;
        file.delete_tuple(tid, tuple, self)
    }

    // Writes every cached dirty page to disk without evicting it.
    pub fn flush_all(&self) -> DbResult<()> {
        let cache = self.cache.lock().unwrap();
        for (pid, page) in cache.iter() {
            self.flush_if_dirty(*pid, page)?;
        }
        Ok(())
    }

    // Writes pid to disk if it is cached and dirty.
    pub fn flush_page(&self, pid: HeapPageId) -> DbResult<()> {
        let cache = self.cache.lock().unwrap();
        if let Some(page) = cache.peek(&pid) {
            self.flush_if_dirty(pid, page)?;
        }
        Ok(())
    }

    // Removes pid from the cache without flushing it. A no-op if pid
    // isn't cached, rather than panicking on a missing key.
    pub fn discard_page(&self, pid: HeapPageId) {
        self.cache.lock().unwrap().pop(&pid);
    }

    // Snapshot of the page ids currently cached, MRU first. Test/debug
    // helper only.
    pub fn cached_page_ids(&self) -> Vec<HeapPageId> {
        self.cache.lock().unwrap().iter().map(|(k, _)| *k).collect()
    }

    // The catalog this pool resolves table ids against.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config;
    use crate::fields::{FieldVal, IntField};
    use crate::heap_file::HeapFile;
    use crate::tuple::{Tuple, TupleDesc};
    use crate::types::Type;
    use tempfile::NamedTempFile;

    fn schema() -> TupleDesc {
        TupleDesc::new(vec![Type::IntType], vec!["a".to_string()])
    }

    fn make_table(catalog: &Catalog, name: &str) -> (usize, NamedTempFile) {
        let tmp = NamedTempFile::new().unwrap();
        let file = HeapFile::open(tmp.path(), schema()).unwrap();
        let id = file.get_id();
        catalog.add_table(Arc::new(file), name.to_string(), None);
        (id, tmp)
    }

    // Grows table_id's file to at least n pages so tests can load a
    // specific page number without first filling it with tuples.
    fn grow_to(catalog: &Catalog, table_id: usize, n: usize) {
        use crate::heap_file::{DbFile, DbFileExt};
        let file = catalog.get_file(table_id).unwrap();
        let heap_file = file.as_any_heap_file();
        while heap_file.num_pages() < n {
            heap_file.append_empty_page().unwrap();
        }
    }

    #[test]
    fn lru_eviction_order_under_repeated_access() {
        // capacity 3, access A,B,C,A,D evicts B, leaving {A, C, D} with
        // MRU order D, A, C.
        let catalog = Arc::new(Catalog::new());
        let (table_a, _tmp) = make_table(&catalog, "a");
        grow_to(&catalog, table_a, 4);
        let bp = BufferPool::new(catalog, 3);
        let tid = TransactionId::new();

        let pid_a = HeapPageId::new(table_a, 0);
        let pid_b = HeapPageId::new(table_a, 1);
        let pid_c = HeapPageId::new(table_a, 2);
        let pid_d = HeapPageId::new(table_a, 3);

        bp.get_page(tid, pid_a, Permission::Read).unwrap();
        bp.get_page(tid, pid_b, Permission::Read).unwrap();
        bp.get_page(tid, pid_c, Permission::Read).unwrap();
        bp.get_page(tid, pid_a, Permission::Read).unwrap();
        bp.get_page(tid, pid_d, Permission::Read).unwrap();

        let ids = bp.cached_page_ids();
        assert_eq!(ids, vec![pid_d, pid_a, pid_c]);
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let catalog = Arc::new(Catalog::new());
        let (table_a, _tmp) = make_table(&catalog, "a");
        grow_to(&catalog, table_a, 10);
        let bp = BufferPool::new(catalog, 2);
        let tid = TransactionId::new();
        for i in 0..10 {
            bp.get_page(tid, HeapPageId::new(table_a, i), Permission::Read)
                .unwrap();
            assert!(bp.len() <= 2);
        }
    }

    #[test]
    fn dirty_eviction_flushes_to_disk() {
        let catalog = Arc::new(Catalog::new());
        let (table_a, _tmp_a) = make_table(&catalog, "a");
        let (table_b, _tmp_b) = make_table(&catalog, "b");
        let bp = BufferPool::new(catalog, 1);
        let tid = TransactionId::new();

        bp.insert_tuple(
            tid,
            table_a,
            Tuple::new(vec![FieldVal::IntField(IntField::new(42))], &schema()),
        )
        .unwrap();

        // loading a page of a second table with capacity 1 evicts table
        // a's dirty page 0, which must flush before the slot is reused.
        bp.insert_tuple(
            tid,
            table_b,
            Tuple::new(vec![FieldVal::IntField(IntField::new(7))], &schema()),
        )
        .unwrap();

        let file = bp.catalog().get_file(table_a).unwrap();
        let reread = file.read_page(&HeapPageId::new(table_a, 0)).unwrap();
        let values: Vec<_> = reread.iterate_tuples().collect();
        assert_eq!(values.len(), 1);
        assert_eq!(
            values[0]
                .get_field(0)
                .unwrap()
                .clone()
                .into_int()
                .unwrap()
                .get_value(),
            42
        );
    }

    #[test]
    fn discard_missing_page_is_a_no_op() {
        let catalog = Arc::new(Catalog::new());
        let (_table_a, _tmp) = make_table(&catalog, "a");
        let bp = BufferPool::new(catalog, config::buffer_pool_default_pages());
        bp.discard_page(HeapPageId::new(999, 0));
    }
}

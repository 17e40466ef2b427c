//! Per-table, per-column statistics for cardinality/selectivity
//! estimation: two scan passes (min/max, then histogram population)
//! over a table, plus a registry that swaps in precomputed stats
//! through one explicit method rather than reflection.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::buffer_pool::BufferPool;
use crate::catalog::Catalog;
use crate::config;
use crate::error::{DbError, DbResult};
use crate::fields::FieldVal;
use crate::histogram::{IntHistogram, StringHistogram};
use crate::operator::Operator;
use crate::seq_scan::SeqScan;
use crate::transaction::TransactionId;
use crate::types::{Op, Type};

enum FieldHistogram {
    Int(IntHistogram),
    Str(StringHistogram),
}

/// Page count, tuple count, and per-field histograms for one table, plus
/// the I/O cost model built on top of them.
pub struct TableStats {
    num_pages: usize,
    num_tuples: usize,
    io_cost_per_page: usize,
    histograms: Vec<FieldHistogram>,
}

impl TableStats {
    /// First pass: per-INT-field min/max. Second pass: populate one
    /// histogram per field (Int or String, by type) with `config::num_hist_bins()`
    /// buckets.
    pub fn compute(
        catalog: &Arc<Catalog>,
        bp: &BufferPool,
        table_id: usize,
        io_cost_per_page: usize,
    ) -> DbResult<Self> {
        let td = catalog.get_tuple_desc(table_id)?;
        let num_fields = td.get_num_fields();
        let tid = TransactionId::new();

        let mut int_min = vec![i32::MAX; num_fields];
        let mut int_max = vec![i32::MIN; num_fields];
        let mut num_tuples = 0usize;

        let mut pass_one = SeqScan::new(tid, table_id, "stats", Arc::clone(catalog), bp)?;
        pass_one.open()?;
        while pass_one.has_next()? {
            let t = pass_one.next()?;
            num_tuples += 1;
            for i in 0..num_fields {
                if let FieldVal::IntField(f) = t.get_field(i)? {
                    let v = f.get_value();
                    int_min[i] = int_min[i].min(v);
                    int_max[i] = int_max[i].max(v);
                }
            }
        }
        pass_one.close();

        let bins = config::num_hist_bins();
        let mut histograms = Vec::with_capacity(num_fields);
        for i in 0..num_fields {
            match td.get_field_type(i).unwrap() {
                Type::IntType => {
                    let (min, max) = if int_min[i] <= int_max[i] {
                        (int_min[i], int_max[i])
                    } else {
                        (0, 0)
                    };
                    histograms.push(FieldHistogram::Int(IntHistogram::new(bins, min, max)));
                }
                Type::StringType => histograms.push(FieldHistogram::Str(StringHistogram::new(bins))),
            }
        }

        let mut pass_two = SeqScan::new(tid, table_id, "stats", Arc::clone(catalog), bp)?;
        pass_two.open()?;
        while pass_two.has_next()? {
            let t = pass_two.next()?;
            for i in 0..num_fields {
                match (&mut histograms[i], t.get_field(i)?) {
                    (FieldHistogram::Int(h), FieldVal::IntField(f)) => h.add_value(f.get_value()),
                    (FieldHistogram::Str(h), FieldVal::StringField(f)) => h.add_value(&f.get_value()),
                    _ => {}
                }
            }
        }
        pass_two.close();

        let file = catalog.get_file(table_id)?;
        Ok(TableStats {
            num_pages: file.num_pages(),
            num_tuples,
            io_cost_per_page,
            histograms,
        })
    }

    pub fn estimate_scan_cost(&self) -> usize {
        self.num_pages * self.io_cost_per_page
    }

    pub fn estimate_table_cardinality(&self, selectivity: f64) -> usize {
        (selectivity * self.num_tuples as f64).floor().max(0.0) as usize
    }

    pub fn estimate_selectivity(&self, field: usize, op: Op, constant: &FieldVal) -> DbResult<f64> {
        let hist = self
            .histograms
            .get(field)
            .ok_or(DbError::FieldIndexOutOfRange(field))?;
        match (hist, constant) {
            (FieldHistogram::Int(h), FieldVal::IntField(f)) => Ok(h.estimate_selectivity(op, f.get_value())),
            (FieldHistogram::Str(h), FieldVal::StringField(f)) => Ok(h.estimate_selectivity(op, &f.get_value())),
            _ => Err(DbError::SchemaMismatch(
                "constant type does not match field's histogram".to_string(),
            )),
        }
    }

    pub fn num_tuples(&self) -> usize {
        self.num_tuples
    }

    pub fn num_pages(&self) -> usize {
        self.num_pages
    }
}

/// Table name → `TableStats`, computed lazily and cached per engine.
pub struct StatsRegistry {
    by_name: RwLock<HashMap<String, Arc<TableStats>>>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        StatsRegistry {
            by_name: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<TableStats>> {
        self.by_name.read().unwrap().get(name).cloned()
    }

    pub fn set(&self, name: String, stats: TableStats) {
        self.by_name.write().unwrap().insert(name, Arc::new(stats));
    }

    /// Injection seam for tests: replaces the whole map in one call.
    pub fn replace_stats_map(&self, stats: HashMap<String, TableStats>) {
        let mut guard = self.by_name.write().unwrap();
        *guard = stats.into_iter().map(|(k, v)| (k, Arc::new(v))).collect();
    }
}

impl Default for StatsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldVal, IntField};
    use crate::heap_file::HeapFile;
    use crate::tuple::{Tuple, TupleDesc};
    use tempfile::NamedTempFile;

    fn schema() -> TupleDesc {
        TupleDesc::new(vec![Type::IntType], vec!["v".to_string()])
    }

    #[test]
    fn computed_stats_match_scan_cost_and_cardinality() {
        let tmp = NamedTempFile::new().unwrap();
        let file = HeapFile::open(tmp.path(), schema()).unwrap();
        let catalog = Arc::new(Catalog::new());
        catalog.add_table(Arc::new(file), "t".to_string(), None);
        let table_id = catalog.get_file_id_by_name("t").unwrap();
        let bp = BufferPool::new(Arc::clone(&catalog), config::buffer_pool_default_pages());
        let tid = TransactionId::new();

        for v in 1..=100 {
            bp.insert_tuple(
                tid,
                table_id,
                Tuple::new(vec![FieldVal::IntField(IntField::new(v))], &schema()),
            )
            .unwrap();
        }

        let stats = TableStats::compute(&catalog, &bp, table_id, 37).unwrap();
        assert_eq!(stats.num_tuples(), 100);
        assert_eq!(stats.estimate_scan_cost(), stats.num_pages() * 37);
        assert_eq!(stats.estimate_table_cardinality(0.5), 50);

        let sel = stats
            .estimate_selectivity(0, Op::GreaterThan, &FieldVal::IntField(IntField::new(50)))
            .unwrap();
        assert!((sel - 0.50).abs() < 0.05);
    }

    #[test]
    fn replace_stats_map_overrides_computed_entries() {
        let registry = StatsRegistry::new();
        assert!(registry.get("t").is_none());
        let mut override_map = HashMap::new();
        override_map.insert(
            "t".to_string(),
            TableStats {
                num_pages: 1,
                num_tuples: 10,
                io_cost_per_page: 1,
                histograms: vec![],
            },
        );
        registry.replace_stats_map(override_map);
        assert_eq!(registry.get("t").unwrap().num_tuples(), 10);
    }
}

//! Per-group incremental aggregation.
//!
//! `merge_tuple_into_group` folds one input tuple into its group's running
//! accumulator; `iterator()` materializes the result relation as a pull
//! operator once every input tuple has been merged. `IntegerAggregator`
//! and `StringAggregator` differ only in what they track per group.

use std::collections::HashMap;

use crate::error::{DbError, DbResult};
use crate::fields::FieldVal;
use crate::operator::{Lookahead, Operator};
use crate::tuple::{Tuple, TupleDesc};
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
    SumCount,
}

impl AggregateOp {
    fn label(&self) -> &'static str {
        match self {
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Count => "count",
            AggregateOp::SumCount => "sum_count",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    None,
    Int(i32),
    Str(String),
}

fn group_key(t: &Tuple, group_by_index: Option<usize>) -> DbResult<GroupKey> {
    let Some(index) = group_by_index else {
        return Ok(GroupKey::None);
    };
    match t.get_field(index)? {
        FieldVal::IntField(f) => Ok(GroupKey::Int(f.get_value())),
        FieldVal::StringField(f) => Ok(GroupKey::Str(f.get_value())),
    }
}

fn group_field(key: &GroupKey) -> Option<FieldVal> {
    match key {
        GroupKey::None => None,
        GroupKey::Int(v) => Some(FieldVal::IntField(crate::fields::IntField::new(*v))),
        GroupKey::Str(v) => Some(FieldVal::StringField(crate::fields::StringField::new(v.clone()))),
    }
}

fn output_desc(
    group_by_type: Option<Type>,
    group_field_name: Option<&str>,
    op: AggregateOp,
    afield_name: &str,
) -> TupleDesc {
    let agg_name = format!("{} ({})", op.label(), afield_name);
    match group_by_type {
        None => TupleDesc::new(vec![Type::IntType], vec![agg_name]),
        Some(ty) => TupleDesc::new(
            vec![ty, Type::IntType],
            vec![group_field_name.unwrap_or("group").to_string(), agg_name],
        ),
    }
}

/// Materialized result relation, walked like any other operator.
pub struct AggregateResult {
    td: TupleDesc,
    rows: Vec<Tuple>,
    pos: usize,
    lookahead: Lookahead,
}

impl AggregateResult {
    fn new(td: TupleDesc, rows: Vec<Tuple>) -> Self {
        AggregateResult {
            td,
            rows,
            pos: 0,
            lookahead: Lookahead::default(),
        }
    }

    fn fetch_next(&mut self) -> DbResult<Option<Tuple>> {
        if self.pos < self.rows.len() {
            let t = self.rows[self.pos].clone();
            self.pos += 1;
            Ok(Some(t))
        } else {
            Ok(None)
        }
    }
}

impl Operator for AggregateResult {
    fn open(&mut self) -> DbResult<()> {
        self.pos = 0;
        let first = self.fetch_next()?;
        self.lookahead.mark_opened(first)
    }

    fn close(&mut self) {
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

#[derive(Debug, Clone, Copy)]
struct IntAccum {
    min: i32,
    max: i32,
    sum: i64,
    count: i64,
}

impl IntAccum {
    fn new(first: i32) -> Self {
        IntAccum {
            min: first,
            max: first,
            sum: first as i64,
            count: 1,
        }
    }

    fn merge(&mut self, v: i32) {
        self.min = self.min.min(v);
        self.max = self.max.max(v);
        self.sum += v as i64;
        self.count += 1;
    }

    /// `AVG` truncates toward zero, matching plain integer division on a
    /// two's-complement sum. `SUM_COUNT` needs both a sum and a count,
    /// but the one-or-two-field output schema has no slot for a pair, so
    /// it emits the sum; the count stays reachable only through the raw
    /// accumulator (see DESIGN.md for this tradeoff).
    fn value(&self, op: AggregateOp) -> i32 {
        match op {
            AggregateOp::Min => self.min,
            AggregateOp::Max => self.max,
            AggregateOp::Sum | AggregateOp::SumCount => self.sum as i32,
            AggregateOp::Avg => (self.sum / self.count) as i32,
            AggregateOp::Count => self.count as i32,
        }
    }
}

/// Incremental MIN/MAX/SUM/AVG/COUNT/SUM_COUNT over an INT field,
/// optionally grouped by another field. `group_by_index = None` means
/// everything falls into one synthetic bucket.
pub struct IntegerAggregator {
    group_by_index: Option<usize>,
    group_by_type: Option<Type>,
    group_field_name: Option<String>,
    afield: usize,
    afield_name: String,
    op: AggregateOp,
    groups: HashMap<GroupKey, IntAccum>,
    group_insertion_order: Vec<GroupKey>,
}

impl IntegerAggregator {
    pub fn new(
        child_desc: &TupleDesc,
        group_by_index: Option<usize>,
        afield: usize,
        op: AggregateOp,
    ) -> DbResult<Self> {
        let (group_by_type, group_field_name) = match group_by_index {
            None => (None, None),
            Some(index) => {
                let ty = *child_desc
                    .get_field_type(index)
                    .ok_or(DbError::FieldIndexOutOfRange(index))?;
                (Some(ty), child_desc.get_field_name(index).cloned())
            }
        };
        if child_desc.get_field_type(afield) != Some(&Type::IntType) {
            return Err(DbError::SchemaMismatch(
                "IntegerAggregator's afield must be INT".to_string(),
            ));
        }
        Ok(IntegerAggregator {
            group_by_index,
            group_by_type,
            group_field_name,
            afield,
            afield_name: child_desc.get_field_name(afield).cloned().unwrap_or_default(),
            op,
            groups: HashMap::new(),
            group_insertion_order: Vec::new(),
        })
    }

    pub fn merge_tuple_into_group(&mut self, t: &Tuple) -> DbResult<()> {
        let key = group_key(t, self.group_by_index)?;
        let value = match t.get_field(self.afield)? {
            FieldVal::IntField(f) => f.get_value(),
            FieldVal::StringField(_) => {
                return Err(DbError::SchemaMismatch(
                    "IntegerAggregator's afield must be INT".to_string(),
                ))
            }
        };
        match self.groups.get_mut(&key) {
            Some(acc) => acc.merge(value),
            None => {
                self.groups.insert(key.clone(), IntAccum::new(value));
                self.group_insertion_order.push(key);
            }
        }
        Ok(())
    }

    pub fn get_tuple_desc(&self) -> TupleDesc {
        output_desc(self.group_by_type, self.group_field_name.as_deref(), self.op, &self.afield_name)
    }

    pub fn iterator(&self) -> AggregateResult {
        let td = self.get_tuple_desc();
        let rows = self
            .group_insertion_order
            .iter()
            .map(|key| {
                let acc = self.groups[key];
                let value = FieldVal::IntField(crate::fields::IntField::new(acc.value(self.op)));
                let fields = match group_field(key) {
                    Some(g) => vec![g, value],
                    None => vec![value],
                };
                Tuple::new(fields, &td)
            })
            .collect();
        AggregateResult::new(td, rows)
    }
}

/// COUNT-only aggregator over a STRING field. Any other op fails
/// immediately at construction with `UnsupportedAggregate`.
pub struct StringAggregator {
    group_by_index: Option<usize>,
    group_by_type: Option<Type>,
    group_field_name: Option<String>,
    afield_name: String,
    counts: HashMap<GroupKey, i64>,
    group_insertion_order: Vec<GroupKey>,
}

impl StringAggregator {
    pub fn new(
        child_desc: &TupleDesc,
        group_by_index: Option<usize>,
        afield: usize,
        op: AggregateOp,
    ) -> DbResult<Self> {
        if op != AggregateOp::Count {
            return Err(DbError::UnsupportedAggregate);
        }
        let (group_by_type, group_field_name) = match group_by_index {
            None => (None, None),
            Some(index) => {
                let ty = *child_desc
                    .get_field_type(index)
                    .ok_or(DbError::FieldIndexOutOfRange(index))?;
                (Some(ty), child_desc.get_field_name(index).cloned())
            }
        };
        Ok(StringAggregator {
            group_by_index,
            group_by_type,
            group_field_name,
            afield_name: child_desc.get_field_name(afield).cloned().unwrap_or_default(),
            counts: HashMap::new(),
            group_insertion_order: Vec::new(),
        })
    }

    pub fn merge_tuple_into_group(&mut self, t: &Tuple) -> DbResult<()> {
        let key = group_key(t, self.group_by_index)?;
        let entry = self.counts.entry(key.clone()).or_insert(0);
        if *entry == 0 && !self.group_insertion_order.contains(&key) {
            self.group_insertion_order.push(key);
        }
        *entry += 1;
        Ok(())
    }

    pub fn get_tuple_desc(&self) -> TupleDesc {
        output_desc(self.group_by_type, self.group_field_name.as_deref(), AggregateOp::Count, &self.afield_name)
    }

    pub fn iterator(&self) -> AggregateResult {
        let td = self.get_tuple_desc();
        let rows = self
            .group_insertion_order
            .iter()
            .map(|key| {
                let count = self.counts[key];
                let value = FieldVal::IntField(crate::fields::IntField::new(count as i32));
                let fields = match group_field(key) {
                    Some(g) => vec![g, value],
                    None => vec![value],
                };
                Tuple::new(fields, &td)
            })
            .collect();
        AggregateResult::new(td, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{IntField, StringField};
    use std::collections::HashSet;

    fn gv_schema() -> TupleDesc {
        TupleDesc::new(
            vec![Type::IntType, Type::IntType],
            vec!["g".to_string(), "v".to_string()],
        )
    }

    fn row(g: i32, v: i32) -> Tuple {
        let td = gv_schema();
        Tuple::new(
            vec![FieldVal::IntField(IntField::new(g)), FieldVal::IntField(IntField::new(v))],
            &td,
        )
    }

    #[test]
    fn grouped_average_over_two_groups() {
        // (1,10),(1,20),(2,5),(2,15) grouped-AVG on field 1 by field 0
        // yields {(1,15),(2,10)}, order unspecified.
        let td = gv_schema();
        let mut agg = IntegerAggregator::new(&td, Some(0), 1, AggregateOp::Avg).unwrap();
        for (g, v) in [(1, 10), (1, 20), (2, 5), (2, 15)] {
            agg.merge_tuple_into_group(&row(g, v)).unwrap();
        }
        let mut iter = agg.iterator();
        iter.open().unwrap();
        let mut seen = HashSet::new();
        while iter.has_next().unwrap() {
            let t = iter.next().unwrap();
            let g = t.get_field(0).unwrap().clone().into_int().unwrap().get_value();
            let v = t.get_field(1).unwrap().clone().into_int().unwrap().get_value();
            seen.insert((g, v));
        }
        assert_eq!(seen, HashSet::from([(1, 15), (2, 10)]));
    }

    #[test]
    fn ungrouped_count_has_single_bucket() {
        let td = gv_schema();
        let mut agg = IntegerAggregator::new(&td, None, 1, AggregateOp::Count).unwrap();
        for (g, v) in [(1, 10), (1, 20), (2, 5)] {
            agg.merge_tuple_into_group(&row(g, v)).unwrap();
        }
        let mut iter = agg.iterator();
        iter.open().unwrap();
        let t = iter.next().unwrap();
        assert_eq!(t.get_tuple_desc().get_num_fields(), 1);
        assert_eq!(t.get_field(0).unwrap().clone().into_int().unwrap().get_value(), 3);
        assert!(!iter.has_next().unwrap());
    }

    #[test]
    fn string_aggregator_rejects_non_count_ops() {
        let td = TupleDesc::new(
            vec![Type::IntType, Type::StringType],
            vec!["g".to_string(), "s".to_string()],
        );
        assert!(matches!(
            StringAggregator::new(&td, Some(0), 1, AggregateOp::Sum),
            Err(DbError::UnsupportedAggregate)
        ));
    }

    #[test]
    fn string_aggregator_counts_per_group() {
        let td = TupleDesc::new(
            vec![Type::IntType, Type::StringType],
            vec!["g".to_string(), "s".to_string()],
        );
        let mut agg = StringAggregator::new(&td, Some(0), 1, AggregateOp::Count).unwrap();
        for (g, s) in [(1, "a"), (1, "b"), (2, "c")] {
            let t = Tuple::new(
                vec![
                    FieldVal::IntField(IntField::new(g)),
                    FieldVal::StringField(StringField::new(s.to_string())),
                ],
                &td,
            );
            agg.merge_tuple_into_group(&t).unwrap();
        }
        let mut iter = agg.iterator();
        iter.open().unwrap();
        let mut total = 0;
        while iter.has_next().unwrap() {
            let t = iter.next().unwrap();
            total += t.get_field(1).unwrap().clone().into_int().unwrap().get_value();
        }
        assert_eq!(total, 3);
    }

    #[test]
    fn average_truncates_toward_zero() {
        let td = gv_schema();
        let mut agg = IntegerAggregator::new(&td, None, 1, AggregateOp::Avg).unwrap();
        agg.merge_tuple_into_group(&row(0, -7)).unwrap();
        agg.merge_tuple_into_group(&row(0, 0)).unwrap();
        let mut iter = agg.iterator();
        iter.open().unwrap();
        let t = iter.next().unwrap();
        assert_eq!(t.get_field(0).unwrap().clone().into_int().unwrap().get_value(), -3);
    }
}

//! Distributable aggregators
//!
//! An aggregator runs in two phases: `accumulate` reduces the matching
//! entries of one partition to a partial result, `combine` merges the
//! partials of every partition into the final payload. Partials are plain
//! JSON values so they could cross a process boundary.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::result::Payload;

use super::errors::{StoreError, StoreResult};
use super::extractor::ValueExtractor;
use super::values::{arith, canonical, compare, ArithOp};
use super::Entry;

/// Two-phase reducer over store entries
pub trait EntryAggregator: Send + Sync + fmt::Debug {
    /// Reduces one partition's matching entries to a partial result
    fn accumulate(&self, entries: &[Entry]) -> StoreResult<Value>;

    /// Merges partial results into the final payload
    fn combine(&self, partials: Vec<Value>) -> StoreResult<Payload>;

    /// Human-readable rendition for show-plan output
    fn describe(&self) -> String;
}

fn project(extractors: &[Arc<dyn ValueExtractor>], entry: &Entry) -> Value {
    if extractors.len() == 1 {
        extractors[0].extract(&entry.key, &entry.value)
    } else {
        Value::Array(
            extractors
                .iter()
                .map(|x| x.extract(&entry.key, &entry.value))
                .collect(),
        )
    }
}

fn describe_all(extractors: &[Arc<dyn ValueExtractor>]) -> String {
    extractors
        .iter()
        .map(|x| x.describe())
        .collect::<Vec<_>>()
        .join(", ")
}

fn partial_items(partial: Value) -> StoreResult<Vec<Value>> {
    match partial {
        Value::Array(items) => Ok(items),
        other => Err(StoreError::AggregationFailed(format!(
            "malformed partial result: {}",
            other
        ))),
    }
}

fn key_value_pair(item: Value) -> StoreResult<(Value, Value)> {
    match item {
        Value::Array(mut pair) if pair.len() == 2 => {
            let second = pair.pop().unwrap_or(Value::Null);
            let first = pair.pop().unwrap_or(Value::Null);
            Ok((first, second))
        }
        other => Err(StoreError::AggregationFailed(format!(
            "malformed partial entry: {}",
            other
        ))),
    }
}

fn sorted_by_key(mut entries: Vec<(Value, Value)>) -> Vec<(Value, Value)> {
    entries.sort_by_cached_key(|(k, _)| canonical(k));
    entries
}

/// Per-entry projection keyed by entry key.
///
/// This is a plain projection, not a cross-entry aggregation; partials are
/// simply concatenated.
#[derive(Debug, Clone)]
pub struct ReducerAggregator {
    extractors: Vec<Arc<dyn ValueExtractor>>,
}

impl ReducerAggregator {
    pub fn new(extractors: Vec<Arc<dyn ValueExtractor>>) -> Self {
        Self { extractors }
    }
}

impl EntryAggregator for ReducerAggregator {
    fn accumulate(&self, entries: &[Entry]) -> StoreResult<Value> {
        Ok(Value::Array(
            entries
                .iter()
                .map(|e| Value::Array(vec![e.key.clone(), project(&self.extractors, e)]))
                .collect(),
        ))
    }

    fn combine(&self, partials: Vec<Value>) -> StoreResult<Payload> {
        let mut entries = Vec::new();
        for partial in partials {
            for item in partial_items(partial)? {
                entries.push(key_value_pair(item)?);
            }
        }
        Ok(Payload::Keyed(sorted_by_key(entries)))
    }

    fn describe(&self) -> String {
        format!("ReducerAggregator({})", describe_all(&self.extractors))
    }
}

/// Set of distinct non-null projected values
#[derive(Debug, Clone)]
pub struct DistinctValuesAggregator {
    extractors: Vec<Arc<dyn ValueExtractor>>,
}

impl DistinctValuesAggregator {
    pub fn new(extractors: Vec<Arc<dyn ValueExtractor>>) -> Self {
        Self { extractors }
    }
}

impl EntryAggregator for DistinctValuesAggregator {
    fn accumulate(&self, entries: &[Entry]) -> StoreResult<Value> {
        let mut seen = BTreeMap::new();
        for entry in entries {
            let value = project(&self.extractors, entry);
            if !value.is_null() {
                seen.entry(canonical(&value)).or_insert(value);
            }
        }
        Ok(Value::Array(seen.into_values().collect()))
    }

    fn combine(&self, partials: Vec<Value>) -> StoreResult<Payload> {
        let mut seen = BTreeMap::new();
        for partial in partials {
            for value in partial_items(partial)? {
                seen.entry(canonical(&value)).or_insert(value);
            }
        }
        Ok(Payload::Collection(seen.into_values().collect()))
    }

    fn describe(&self) -> String {
        format!("DistinctValuesAggregator({})", describe_all(&self.extractors))
    }
}

/// Aggregate function applied to a selected column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    /// Resolves a function name, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "COUNT" => Some(AggregateFunction::Count),
            "SUM" => Some(AggregateFunction::Sum),
            "AVG" => Some(AggregateFunction::Avg),
            "MIN" => Some(AggregateFunction::Min),
            "MAX" => Some(AggregateFunction::Max),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        }
    }

    fn initial(&self) -> Value {
        match self {
            AggregateFunction::Count => Value::from(0),
            AggregateFunction::Avg => Value::Array(vec![Value::from(0), Value::from(0)]),
            _ => Value::Null,
        }
    }

    fn update(&self, state: &mut Value, value: Option<Value>) {
        match self {
            AggregateFunction::Count => {
                if value.map_or(true, |v| !v.is_null()) {
                    *state = arith(ArithOp::Add, state, &Value::from(1));
                }
            }
            _ => {
                if let Some(v) = value {
                    self.merge(state, &self.lift(v));
                }
            }
        }
    }

    /// Converts one extracted value into a single-entry state
    fn lift(&self, value: Value) -> Value {
        match self {
            AggregateFunction::Avg if value.is_number() => {
                Value::Array(vec![value, Value::from(1)])
            }
            AggregateFunction::Avg => self.initial(),
            AggregateFunction::Sum if !value.is_number() => Value::Null,
            _ => value,
        }
    }

    fn merge(&self, state: &mut Value, other: &Value) {
        match self {
            AggregateFunction::Count => *state = arith(ArithOp::Add, state, other),
            AggregateFunction::Sum => {
                if state.is_null() {
                    *state = other.clone();
                } else if !other.is_null() {
                    *state = arith(ArithOp::Add, state, other);
                }
            }
            AggregateFunction::Avg => {
                if let (Value::Array(a), Value::Array(b)) = (&*state, other) {
                    if a.len() == 2 && b.len() == 2 {
                        *state = Value::Array(vec![
                            arith(ArithOp::Add, &a[0], &b[0]),
                            arith(ArithOp::Add, &a[1], &b[1]),
                        ]);
                    }
                }
            }
            AggregateFunction::Min | AggregateFunction::Max => {
                if other.is_null() {
                    return;
                }
                let replace = state.is_null()
                    || match (self, compare(other, state)) {
                        (AggregateFunction::Min, Some(std::cmp::Ordering::Less)) => true,
                        (AggregateFunction::Max, Some(std::cmp::Ordering::Greater)) => true,
                        _ => false,
                    };
                if replace {
                    *state = other.clone();
                }
            }
        }
    }

    fn finish(&self, state: Value) -> Value {
        match self {
            AggregateFunction::Avg => match state {
                Value::Array(parts) if parts.len() == 2 => {
                    match (parts[0].as_f64(), parts[1].as_f64()) {
                        (Some(sum), Some(count)) if count > 0.0 => serde_json::Number::from_f64(
                            sum / count,
                        )
                        .map(Value::Number)
                        .unwrap_or(Value::Null),
                        _ => Value::Null,
                    }
                }
                _ => Value::Null,
            },
            _ => state,
        }
    }
}

/// One selected column of an aggregating SELECT
#[derive(Debug, Clone)]
pub struct Column {
    /// Display name, e.g. `COUNT(*)`
    pub name: String,
    /// Source of the column's values; `None` stands for `*`
    pub extractor: Option<Arc<dyn ValueExtractor>>,
    /// Aggregate applied to the values, if any
    pub function: Option<AggregateFunction>,
}

impl Column {
    fn extract(&self, entry: &Entry) -> Option<Value> {
        self.extractor
            .as_ref()
            .map(|x| x.extract(&entry.key, &entry.value))
    }

    fn initial(&self) -> Value {
        self.function.map_or(Value::Null, |f| f.initial())
    }

    fn update(&self, state: &mut Value, value: Option<Value>) {
        match self.function {
            Some(function) => function.update(state, value),
            None => {
                if state.is_null() {
                    *state = value.unwrap_or(Value::Null);
                }
            }
        }
    }

    fn merge(&self, state: &mut Value, other: &Value) {
        match self.function {
            Some(function) => function.merge(state, other),
            None => {
                if state.is_null() {
                    *state = other.clone();
                }
            }
        }
    }

    fn finish(&self, state: Value) -> Value {
        match self.function {
            Some(function) => function.finish(state),
            None => state,
        }
    }
}

/// Full entry aggregator for SELECT lists with computed expressions.
///
/// The first `group_by` columns form the group key; the remaining columns
/// are aggregated per group. Without a group-by the whole match set is one
/// group and the result is a single row. A list with neither aggregate
/// functions nor a group-by projects every entry, keyed by entry key.
#[derive(Debug, Clone)]
pub struct GroupAggregator {
    columns: Vec<Column>,
    group_by: usize,
}

impl GroupAggregator {
    pub fn new(columns: Vec<Column>, group_by: usize) -> Self {
        let group_by = group_by.min(columns.len());
        Self { columns, group_by }
    }

    fn is_per_entry(&self) -> bool {
        self.group_by == 0 && self.columns.iter().all(|c| c.function.is_none())
    }

    fn group_key(&self, entry: &Entry) -> Value {
        let mut parts: Vec<Value> = self.columns[..self.group_by]
            .iter()
            .map(|c| c.extract(entry).unwrap_or(Value::Null))
            .collect();
        match parts.len() {
            0 => Value::Null,
            1 => parts.pop().unwrap_or(Value::Null),
            _ => Value::Array(parts),
        }
    }

    fn aggregated(&self) -> &[Column] {
        &self.columns[self.group_by..]
    }

    fn initial_states(&self) -> Vec<Value> {
        self.aggregated().iter().map(Column::initial).collect()
    }

    fn finish_row(&self, states: Vec<Value>) -> Value {
        let mut row: Vec<Value> = self
            .aggregated()
            .iter()
            .zip(states)
            .map(|(column, state)| column.finish(state))
            .collect();
        match row.len() {
            0 => Value::Null,
            1 => row.pop().unwrap_or(Value::Null),
            _ => Value::Array(row),
        }
    }
}

impl EntryAggregator for GroupAggregator {
    fn accumulate(&self, entries: &[Entry]) -> StoreResult<Value> {
        if self.is_per_entry() {
            let rows = entries
                .iter()
                .map(|entry| {
                    let row: Vec<Value> = self
                        .columns
                        .iter()
                        .map(|c| c.extract(entry).unwrap_or(Value::Null))
                        .collect();
                    let row = if row.len() == 1 {
                        row.into_iter().next().unwrap_or(Value::Null)
                    } else {
                        Value::Array(row)
                    };
                    Value::Array(vec![entry.key.clone(), row])
                })
                .collect();
            return Ok(Value::Array(rows));
        }

        let mut groups: BTreeMap<String, (Value, Vec<Value>)> = BTreeMap::new();
        for entry in entries {
            let key = self.group_key(entry);
            let (_, states) = groups
                .entry(canonical(&key))
                .or_insert_with(|| (key, self.initial_states()));
            for (column, state) in self.aggregated().iter().zip(states.iter_mut()) {
                column.update(state, column.extract(entry));
            }
        }

        Ok(Value::Array(
            groups
                .into_values()
                .map(|(key, states)| Value::Array(vec![key, Value::Array(states)]))
                .collect(),
        ))
    }

    fn combine(&self, partials: Vec<Value>) -> StoreResult<Payload> {
        if self.is_per_entry() {
            let mut entries = Vec::new();
            for partial in partials {
                for item in partial_items(partial)? {
                    entries.push(key_value_pair(item)?);
                }
            }
            return Ok(Payload::Keyed(sorted_by_key(entries)));
        }

        let mut groups: BTreeMap<String, (Value, Vec<Value>)> = BTreeMap::new();
        for partial in partials {
            for item in partial_items(partial)? {
                let (key, states) = key_value_pair(item)?;
                let states = partial_items(states)?;
                match groups.get_mut(&canonical(&key)) {
                    Some((_, merged)) => {
                        for ((column, state), other) in
                            self.aggregated().iter().zip(merged.iter_mut()).zip(&states)
                        {
                            column.merge(state, other);
                        }
                    }
                    None => {
                        groups.insert(canonical(&key), (key, states));
                    }
                }
            }
        }

        if self.group_by == 0 {
            let states = groups
                .into_values()
                .next()
                .map(|(_, states)| states)
                .unwrap_or_else(|| self.initial_states());
            return Ok(Payload::Scalar(self.finish_row(states)));
        }

        Ok(Payload::Keyed(
            groups
                .into_values()
                .map(|(key, states)| (key, self.finish_row(states)))
                .collect(),
        ))
    }

    fn describe(&self) -> String {
        let columns: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        format!(
            "GroupAggregator(columns=[{}], groupBy={})",
            columns.join(", "),
            self.group_by
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Field(&'static str);

    impl ValueExtractor for Field {
        fn extract(&self, _key: &Value, value: &Value) -> Value {
            value.get(self.0).cloned().unwrap_or(Value::Null)
        }

        fn describe(&self) -> String {
            self.0.to_string()
        }
    }

    fn field(name: &'static str) -> Arc<dyn ValueExtractor> {
        Arc::new(Field(name))
    }

    fn entry(key: i64, city: &str, age: i64) -> Entry {
        Entry::new(json!(key), json!({"city": city, "age": age}))
    }

    fn run(aggregator: &dyn EntryAggregator, partitions: &[Vec<Entry>]) -> Payload {
        let partials = partitions
            .iter()
            .map(|p| aggregator.accumulate(p).unwrap())
            .collect();
        aggregator.combine(partials).unwrap()
    }

    #[test]
    fn test_reducer_keys_each_entry() {
        let agg = ReducerAggregator::new(vec![field("age")]);
        let payload = run(&agg, &[vec![entry(2, "Oslo", 40)], vec![entry(1, "Rome", 30)]]);

        assert_eq!(
            payload,
            Payload::Keyed(vec![(json!(1), json!(30)), (json!(2), json!(40))])
        );
    }

    #[test]
    fn test_distinct_merges_partitions() {
        let agg = DistinctValuesAggregator::new(vec![field("city")]);
        let payload = run(
            &agg,
            &[
                vec![entry(1, "Oslo", 1), entry(2, "Rome", 2)],
                vec![entry(3, "Oslo", 3)],
            ],
        );

        assert_eq!(payload, Payload::Collection(vec![json!("Oslo"), json!("Rome")]));
        assert_eq!(agg.describe(), "DistinctValuesAggregator(city)");
    }

    #[test]
    fn test_group_by_with_count_and_avg() {
        let columns = vec![
            Column {
                name: "city".into(),
                extractor: Some(field("city")),
                function: None,
            },
            Column {
                name: "COUNT(*)".into(),
                extractor: None,
                function: Some(AggregateFunction::Count),
            },
            Column {
                name: "AVG(age)".into(),
                extractor: Some(field("age")),
                function: Some(AggregateFunction::Avg),
            },
        ];
        let agg = GroupAggregator::new(columns, 1);
        let payload = run(
            &agg,
            &[
                vec![entry(1, "Oslo", 30), entry(2, "Rome", 20)],
                vec![entry(3, "Oslo", 40)],
            ],
        );

        assert_eq!(
            payload,
            Payload::Keyed(vec![
                (json!("Oslo"), json!([2, 35.0])),
                (json!("Rome"), json!([1, 20.0])),
            ])
        );
    }

    #[test]
    fn test_group_keeps_first_plain_value() {
        let columns = vec![
            Column {
                name: "city".into(),
                extractor: Some(field("city")),
                function: None,
            },
            Column {
                name: "age".into(),
                extractor: Some(field("age")),
                function: None,
            },
            Column {
                name: "COUNT(*)".into(),
                extractor: None,
                function: Some(AggregateFunction::Count),
            },
        ];
        let agg = GroupAggregator::new(columns, 1);
        let payload = run(
            &agg,
            &[
                vec![entry(1, "Oslo", 30), entry(2, "Rome", 20)],
                vec![entry(3, "Oslo", 40)],
            ],
        );

        assert_eq!(
            payload,
            Payload::Keyed(vec![
                (json!("Oslo"), json!([30, 2])),
                (json!("Rome"), json!([20, 1])),
            ])
        );
    }

    #[test]
    fn test_aggregate_without_group_is_single_row() {
        let columns = vec![
            Column {
                name: "MIN(age)".into(),
                extractor: Some(field("age")),
                function: Some(AggregateFunction::Min),
            },
            Column {
                name: "MAX(age)".into(),
                extractor: Some(field("age")),
                function: Some(AggregateFunction::Max),
            },
            Column {
                name: "SUM(age)".into(),
                extractor: Some(field("age")),
                function: Some(AggregateFunction::Sum),
            },
        ];
        let agg = GroupAggregator::new(columns, 0);
        let payload = run(
            &agg,
            &[vec![entry(1, "a", 5), entry(2, "b", 9)], vec![entry(3, "c", 2)]],
        );

        assert_eq!(payload, Payload::Scalar(json!([2, 9, 16])));
    }

    #[test]
    fn test_count_of_nothing_is_zero() {
        let columns = vec![Column {
            name: "COUNT(*)".into(),
            extractor: None,
            function: Some(AggregateFunction::Count),
        }];
        let agg = GroupAggregator::new(columns, 0);
        assert_eq!(run(&agg, &[vec![], vec![]]), Payload::Scalar(json!(0)));
    }

    #[test]
    fn test_function_names() {
        assert_eq!(AggregateFunction::from_name("count"), Some(AggregateFunction::Count));
        assert_eq!(AggregateFunction::from_name("Avg"), Some(AggregateFunction::Avg));
        assert_eq!(AggregateFunction::from_name("median"), None);
    }
}

//! Group-by aggregations over order rows.
//!
//! Every function takes a slice of record references so the same code runs
//! over the whole table and over a filtered subset.

use crate::orders::{Dimension, Measure, OrderRecord};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregated value of one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub value: f64,
}

/// Sum of a measure for a single day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateTotal {
    pub date: NaiveDate,
    pub value: f64,
}

/// Sums `measure` per distinct value of `dimension`, ordered by key
pub fn sum_by(rows: &[&OrderRecord], dimension: Dimension, measure: Measure) -> Vec<GroupTotal> {
    let mut groups: BTreeMap<&str, f64> = BTreeMap::new();
    for row in rows {
        *groups.entry(dimension.key(row)).or_insert(0.0) += measure.value(row);
    }
    into_totals(groups)
}

/// Counts rows per distinct value of `dimension`, ordered by key
pub fn count_by(rows: &[&OrderRecord], dimension: Dimension) -> Vec<GroupTotal> {
    let mut groups: BTreeMap<&str, f64> = BTreeMap::new();
    for row in rows {
        *groups.entry(dimension.key(row)).or_insert(0.0) += 1.0;
    }
    into_totals(groups)
}

fn into_totals(groups: BTreeMap<&str, f64>) -> Vec<GroupTotal> {
    groups
        .into_iter()
        .map(|(key, value)| GroupTotal {
            key: key.to_string(),
            value,
        })
        .collect()
}

/// Orders totals by value, largest first
///
/// The sort is stable, so groups with equal values keep their incoming
/// (key) order.
pub fn sort_descending(mut totals: Vec<GroupTotal>) -> Vec<GroupTotal> {
    totals.sort_by(|a, b| b.value.total_cmp(&a.value));
    totals
}

/// Keeps the `n` largest totals, largest first
pub fn top_n(totals: Vec<GroupTotal>, n: usize) -> Vec<GroupTotal> {
    let mut sorted = sort_descending(totals);
    sorted.truncate(n);
    sorted
}

/// Sums `measure` per order date, oldest first
pub fn sum_by_date(rows: &[&OrderRecord], measure: Measure) -> Vec<DateTotal> {
    let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for row in rows {
        *days.entry(row.order_date).or_insert(0.0) += measure.value(row);
    }
    days.into_iter()
        .map(|(date, value)| DateTotal { date, value })
        .collect()
}

/// Sum of `measure` over all rows
pub fn total(rows: &[&OrderRecord], measure: Measure) -> f64 {
    rows.iter().map(|r| measure.value(r)).sum()
}

/// Collects `(x, y)` points per distinct value of `dimension`
///
/// Groups are ordered by key; points within a group keep row order.
pub fn scatter_by(
    rows: &[&OrderRecord],
    dimension: Dimension,
    x: Measure,
    y: Measure,
) -> Vec<(String, Vec<(f64, f64)>)> {
    let mut groups: BTreeMap<&str, Vec<(f64, f64)>> = BTreeMap::new();
    for row in rows {
        groups
            .entry(dimension.key(row))
            .or_default()
            .push((x.value(row), y.value(row)));
    }
    groups
        .into_iter()
        .map(|(key, points)| (key.to_string(), points))
        .collect()
}

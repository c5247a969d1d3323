//! Pivot of band aggregates into fixed triples and the left join onto the extract.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::config::ItemMetricPolicy;
use crate::error::ExtractError;
use crate::model::{BandPivot, ExtractRow, ItemAggregate, MergedRow};

fn add(sum: Decimal, value: Decimal, agg: &ItemAggregate) -> Result<Decimal, ExtractError> {
    sum.checked_add(value)
        .ok_or_else(|| ExtractError::Overflow(format!("order '{}': {}", agg.order_id, agg.vat_band)))
}

/// One `BandPivot` per order. Bands without items stay zero.
pub fn pivot_items(aggregates: &[ItemAggregate]) -> Result<HashMap<&str, BandPivot>, ExtractError> {
    let mut pivots: HashMap<&str, BandPivot> = HashMap::new();
    for agg in aggregates {
        let totals = pivots
            .entry(agg.order_id.as_str())
            .or_default()
            .get_mut(agg.vat_band);
        totals.quantity = add(totals.quantity, agg.quantity, agg)?;
        totals.total_inc_vat = add(totals.total_inc_vat, agg.total_inc_vat, agg)?;
        totals.total_exc_vat = add(totals.total_exc_vat, agg.total_exc_vat, agg)?;
    }
    Ok(pivots)
}

/// Left-join pivoted band triples onto every row of the extract.
///
/// Rows are never dropped. Output is sorted by (order_id, transaction index).
pub fn merge_items(
    rows: Vec<ExtractRow>,
    aggregates: &[ItemAggregate],
    policy: ItemMetricPolicy,
) -> Result<Vec<MergedRow>, ExtractError> {
    let pivots = pivot_items(aggregates)?;

    let mut merged: Vec<MergedRow> = rows
        .into_iter()
        .map(|row| {
            let carries_items = match policy {
                ItemMetricPolicy::Repeat => true,
                ItemMetricPolicy::AnchorOnly => row.transaction.is_anchor(),
            };
            let items = if carries_items {
                pivots.get(row.order.order_id.as_str()).copied()
            } else {
                None
            };
            MergedRow { row, items }
        })
        .collect();

    merged.sort_by(|a, b| {
        a.row
            .order
            .order_id
            .cmp(&b.row.order.order_id)
            .then_with(|| a.row.transaction.index().cmp(&b.row.transaction.index()))
    });
    Ok(merged)
}

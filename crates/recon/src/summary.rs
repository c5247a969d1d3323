use std::collections::{BTreeMap, BTreeSet};

use crate::error::ExtractError;
use crate::items::ItemStats;
use crate::model::{checked_sum, ExplodedTransaction, ExtractSummary, ItemAggregate, MergedRow, VatBand, VendorGroup};

/// Compute run statistics from the merged extract and the band aggregates.
pub fn compute_summary(
    rows: &[MergedRow],
    aggregates: &[ItemAggregate],
    stats: &ItemStats,
) -> Result<ExtractSummary, ExtractError> {
    let mut orders = BTreeSet::new();
    let mut multi = BTreeSet::new();
    let mut placeholder_rows = 0;
    let mut marketplace_rows = 0;
    let mut marketplace_linked = 0;
    let mut primary_matched = 0;
    let mut secondary_matched = 0;

    for m in rows {
        let r = &m.row;
        orders.insert(r.order.order_id.as_str());

        match r.transaction {
            ExplodedTransaction::Placeholder => placeholder_rows += 1,
            ExplodedTransaction::Listed { index, .. } if index > 1 => {
                multi.insert(r.order.order_id.as_str());
            }
            ExplodedTransaction::Listed { .. } => {}
        }

        if r.order.vendor_group == VendorGroup::Mp {
            marketplace_rows += 1;
            if r.mp_order_id.is_some() {
                marketplace_linked += 1;
            }
        }
        if r.financials.is_some() {
            primary_matched += 1;
        }
        if r.alt_financials.is_some() {
            secondary_matched += 1;
        }
    }

    let item_orders: BTreeSet<&str> = aggregates.iter().map(|a| a.order_id.as_str()).collect();
    let mut band_totals_exc_vat = BTreeMap::new();
    for band in VatBand::ALL {
        let in_band = aggregates.iter().filter(|a| a.vat_band == band).map(|a| a.total_exc_vat);
        let total = checked_sum(in_band)
            .ok_or_else(|| ExtractError::Overflow(format!("{band} exc-VAT total over all orders")))?;
        band_totals_exc_vat.insert(band, total);
    }

    Ok(ExtractSummary {
        orders_selected: orders.len(),
        rows: rows.len(),
        placeholder_rows,
        multi_transaction_orders: multi.len(),
        marketplace_rows,
        marketplace_linked,
        primary_matched,
        secondary_matched,
        item_lines_considered: stats.lines_considered,
        item_orders: item_orders.len(),
        null_quantity_lines: stats.null_quantity_lines,
        other_band_lines: stats.other_band_lines,
        band_totals_exc_vat,
    })
}

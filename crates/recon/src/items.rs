//! Item-level quantity derivation and VAT-band aggregation.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::error::ExtractError;
use crate::model::{ItemAggregate, ItemLine, OrderIdFilter, VatBand};

/// `revenue / unit_price`, or `None` when an operand is missing or the price is zero.
fn ratio(revenue: Option<Decimal>, unit_price: Option<Decimal>) -> Option<Decimal> {
    let price = unit_price.filter(|p| !p.is_zero())?;
    revenue?.checked_div(price)
}

/// Quantity of a line: post-promo pair first, then the pre-promo pair.
pub fn line_quantity(line: &ItemLine) -> Option<Decimal> {
    ratio(line.revenue_inc_vat, line.unit_price_inc_vat)
        .or_else(|| ratio(line.pre_promo_revenue_inc_vat, line.pre_promo_unit_price_inc_vat))
}

/// Counters collected while aggregating, for the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemStats {
    pub lines_considered: usize,
    pub null_quantity_lines: usize,
    pub other_band_lines: usize,
}

/// Null values contribute zero.
fn accumulate(sum: &mut Decimal, value: Option<Decimal>, line: &ItemLine, field: &str) -> Result<(), ExtractError> {
    if let Some(value) = value {
        *sum = sum
            .checked_add(value)
            .ok_or_else(|| ExtractError::Overflow(format!("order '{}': item {field}", line.order_id)))?;
    }
    Ok(())
}

/// Group lines of the filtered orders by (order_id, band) with null-safe sums.
///
/// Output is sorted by order id, then band.
pub fn aggregate_items(
    items: &[ItemLine],
    filter: &OrderIdFilter,
) -> Result<(Vec<ItemAggregate>, ItemStats), ExtractError> {
    let mut groups: BTreeMap<(&str, VatBand), [Decimal; 3]> = BTreeMap::new();
    let mut stats = ItemStats::default();

    for line in items.iter().filter(|l| filter.contains(&l.order_id)) {
        stats.lines_considered += 1;

        let band = VatBand::classify(line.vat_rate);
        if band == VatBand::Other {
            stats.other_band_lines += 1;
        }

        let quantity = line_quantity(line);
        if quantity.is_none() {
            stats.null_quantity_lines += 1;
        }

        let sums = groups
            .entry((line.order_id.as_str(), band))
            .or_insert([Decimal::ZERO; 3]);
        accumulate(&mut sums[0], quantity, line, "quantity")?;
        accumulate(&mut sums[1], line.revenue_inc_vat, line, "revenue_inc_vat")?;
        accumulate(&mut sums[2], line.revenue_exc_vat, line, "revenue_exc_vat")?;
    }

    let aggregates = groups
        .into_iter()
        .map(|((order_id, vat_band), [quantity, total_inc_vat, total_exc_vat])| ItemAggregate {
            order_id: order_id.to_string(),
            vat_band,
            quantity,
            total_inc_vat,
            total_exc_vat,
        })
        .collect();

    Ok((aggregates, stats))
}

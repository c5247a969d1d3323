//! Tax-aware monetary fields from the regional P&L sources.
//!
//! Both sources are joined only onto the anchor transaction row of an order
//! (index 1, or the placeholder), so an order-level total is never counted
//! once per payment transaction.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::error::ExtractError;
use crate::model::{checked_sum, ExtractRow, FinancialRecord, PrimaryPnl, SecondaryPnl, STANDARD_FEE_VAT_FACTOR};

/// Index a source table by order id. First occurrence wins.
pub fn index_by_order_id<'a, T>(
    table: &str,
    rows: &'a [T],
    key: impl Fn(&T) -> &str,
) -> HashMap<&'a str, &'a T> {
    let mut index = HashMap::with_capacity(rows.len());
    let mut duplicates = 0usize;
    for row in rows {
        let k = key(row);
        if index.contains_key(k) {
            duplicates += 1;
            continue;
        }
        index.insert(k, row);
    }
    if duplicates > 0 {
        log::warn!("{table}: {duplicates} duplicate order id(s) ignored");
    }
    index
}

fn scale(amount: Option<Decimal>, factor: Option<Decimal>) -> Option<Decimal> {
    amount?.checked_mul(factor?)
}

fn overflow(pnl: &PrimaryPnl, field: &str) -> ExtractError {
    ExtractError::Overflow(format!("order '{}': {field}", pnl.order_id))
}

/// Null components contribute zero.
fn sum_present(pnl: &PrimaryPnl, field: &str, components: &[Option<Decimal>]) -> Result<Decimal, ExtractError> {
    checked_sum(components.iter().flatten().copied()).ok_or_else(|| overflow(pnl, field))
}

/// Derive the financial record of one order from its primary P&L row.
pub fn compute_financials(pnl: &PrimaryPnl) -> Result<FinancialRecord, ExtractError> {
    let blended_factor = match pnl.blended_vat_rate {
        Some(rate) => Some(
            Decimal::ONE
                .checked_add(rate)
                .ok_or_else(|| overflow(pnl, "blended_vat_rate"))?,
        ),
        None => None,
    };
    let standard = Some(STANDARD_FEE_VAT_FACTOR);

    let mut record = FinancialRecord {
        blended_vat_rate: pnl.blended_vat_rate,
        post_promo_sales_exc_vat: pnl.post_promo_sales_exc_vat,
        delivery_fee_exc_vat: pnl.delivery_fee_exc_vat,
        priority_fee_exc_vat: pnl.priority_fee_exc_vat,
        small_order_fee_exc_vat: pnl.small_order_fee_exc_vat,
        mp_bag_fee_exc_vat: pnl.mp_bag_fee_exc_vat,
        post_promo_sales_inc_vat: scale(pnl.post_promo_sales_exc_vat, blended_factor),
        delivery_fee_inc_vat: scale(pnl.delivery_fee_exc_vat, blended_factor),
        priority_fee_inc_vat: scale(pnl.priority_fee_exc_vat, standard),
        small_order_fee_inc_vat: scale(pnl.small_order_fee_exc_vat, standard),
        mp_bag_fee_inc_vat: scale(pnl.mp_bag_fee_exc_vat, standard),
        tips_amount: pnl.tips_amount,
        // The source cost figure already includes VAT; the exclusive value is derived from it.
        cost_of_goods_inc_vat: pnl.cost_of_goods,
        cost_of_goods_exc_vat: match (pnl.cost_of_goods, blended_factor) {
            (Some(cost), Some(factor)) => cost.checked_div(factor),
            _ => None,
        },
        ..FinancialRecord::default()
    };

    record.total_payment_inc_vat =
        sum_present(pnl, "total_payment_inc_vat", &record.inclusive_components())?;
    record.total_payment_with_tips_inc_vat = sum_present(
        pnl,
        "total_payment_with_tips_inc_vat",
        &[Some(record.total_payment_inc_vat), record.tips_amount],
    )?;
    record.total_revenue_exc_vat =
        sum_present(pnl, "total_revenue_exc_vat", &record.exclusive_components())?;
    Ok(record)
}

/// Attach primary and secondary financials to anchor rows.
pub fn augment_financials(
    rows: Vec<ExtractRow>,
    primary: &[PrimaryPnl],
    secondary: &[SecondaryPnl],
) -> Result<Vec<ExtractRow>, ExtractError> {
    let primary = index_by_order_id("primary_pnl", primary, |p| p.order_id.as_str());
    let secondary = index_by_order_id("secondary_pnl", secondary, |s| s.order_id.as_str());

    rows.into_iter()
        .map(|mut row| {
            if row.transaction.is_anchor() {
                let order_id = row.order.order_id.as_str();
                row.financials = primary.get(order_id).map(|p| compute_financials(p)).transpose()?;
                row.alt_financials = secondary.get(order_id).map(|s| (*s).clone());
            } else {
                row.financials = None;
                row.alt_financials = None;
            }
            Ok(row)
        })
        .collect()
}

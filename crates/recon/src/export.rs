//! Deterministic CSV writers for the order-level extract and the item aggregates.
//!
//! Decimals are rounded half away from zero to a fixed number of places on
//! write; null values are written as empty fields.

use std::io::Write;

use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::ExtractError;
use crate::model::{DateFamily, FinancialRecord, ItemAggregate, MergedRow, VatBand};

pub const EXTRACT_COLUMNS: [&str; 58] = [
    "ORDER_ID",
    "ORDER_ID_OBFUSCATED",
    "MP_ORDER_ID",
    "PAYMENT_SYSTEM",
    "TX_INDEX",
    "TX_ID",
    "LOCATION_NAME",
    "ORDER_VENDOR",
    "VENDOR_GROUP",
    "ORDER_COMPLETED",
    "CREATED_AT_TIMESTAMP",
    "DELIVERED_AT_TIMESTAMP",
    "CREATED_AT_UTC_OFFSET_HOURS",
    "CREATED_AT_DAY",
    "CREATED_AT_WEEK",
    "CREATED_AT_MONTH",
    "DELIVERED_AT_DAY",
    "DELIVERED_AT_WEEK",
    "DELIVERED_AT_MONTH",
    "OPS_DATE_DAY",
    "OPS_DATE_WEEK",
    "OPS_DATE_MONTH",
    "EARLIEST_ORDER_DATE",
    "LATEST_ORDER_DATE",
    "POST_PROMO_SALES_INC_VAT",
    "DELIVERY_FEE_INC_VAT",
    "PRIORITY_FEE_INC_VAT",
    "SMALL_ORDER_FEE_INC_VAT",
    "MP_BAG_FEE_INC_VAT",
    "TOTAL_PAYMENT_INC_VAT",
    "TIPS_AMOUNT",
    "TOTAL_PAYMENT_WITH_TIPS_INC_VAT",
    "POST_PROMO_SALES_EXC_VAT",
    "DELIVERY_FEE_EXC_VAT",
    "PRIORITY_FEE_EXC_VAT",
    "SMALL_ORDER_FEE_EXC_VAT",
    "MP_BAG_FEE_EXC_VAT",
    "TOTAL_REVENUE_EXC_VAT",
    "COST_OF_GOODS_INC_VAT",
    "COST_OF_GOODS_EXC_VAT",
    "ALT_POST_PROMO_SALES_INC_VAT",
    "ALT_DELIVERY_FEE_EXC_VAT",
    "ALT_PRIORITY_FEE_EXC_VAT",
    "ALT_SMALL_ORDER_FEE_EXC_VAT",
    "ALT_TOTAL_PAYMENT_WITH_TIPS_INC_VAT",
    "TOTAL_PRODUCTS",
    "ITEM_QUANTITY_COUNT_0",
    "ITEM_QUANTITY_COUNT_5",
    "ITEM_QUANTITY_COUNT_20",
    "ITEM_QUANTITY_COUNT_OTHER",
    "TOTAL_PRICE_EXC_VAT_0",
    "TOTAL_PRICE_EXC_VAT_5",
    "TOTAL_PRICE_EXC_VAT_20",
    "TOTAL_PRICE_EXC_VAT_OTHER",
    "TOTAL_PRICE_INC_VAT_0",
    "TOTAL_PRICE_INC_VAT_5",
    "TOTAL_PRICE_INC_VAT_20",
    "TOTAL_PRICE_INC_VAT_OTHER",
];

pub const ITEM_COLUMNS: [&str; 5] = [
    "ORDER_ID",
    "VAT_BAND",
    "ITEM_QUANTITY_COUNT",
    "TOTAL_PRICE_INC_VAT",
    "TOTAL_PRICE_EXC_VAT",
];

/// Round half away from zero and pad to exactly `dp` places.
pub fn format_decimal(value: Decimal, dp: u32) -> String {
    let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(dp);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded.to_string()
}

fn opt_decimal(value: Option<Decimal>, dp: u32) -> String {
    value.map(|v| format_decimal(v, dp)).unwrap_or_default()
}

fn opt_date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

fn opt_timestamp(value: Option<DateTime<FixedOffset>>) -> String {
    value
        .map(|t| t.format("%Y-%m-%dT%H:%M:%S%:z").to_string())
        .unwrap_or_default()
}

fn family_fields(family: Option<DateFamily>) -> [String; 3] {
    [
        opt_date(family.map(|f| f.day)),
        opt_date(family.map(|f| f.week)),
        opt_date(family.map(|f| f.month)),
    ]
}

fn extract_record(m: &MergedRow, dp: u32) -> Vec<String> {
    let r = &m.row;
    let o = &r.order;
    let f = r.financials.as_ref();
    let alt = r.alt_financials.as_ref();

    let mut record = Vec::with_capacity(EXTRACT_COLUMNS.len());
    record.extend([
        o.order_id.clone(),
        o.order_id_obfuscated.clone(),
        r.mp_order_id.clone().unwrap_or_default(),
        o.payment_system.clone(),
        r.transaction.index().to_string(),
        r.transaction.transaction_id().unwrap_or("").to_string(),
        o.location_name.clone(),
        o.order_vendor.clone(),
        o.vendor_group.to_string(),
        o.order_completed.clone(),
        opt_timestamp(o.created_at),
        opt_timestamp(o.delivered_at),
        o.created_at_utc_offset_hours
            .map(|h| h.to_string())
            .unwrap_or_default(),
    ]);
    record.extend(family_fields(o.created));
    record.extend(family_fields(o.delivered));
    record.extend(family_fields(o.ops));
    record.push(opt_date(o.earliest_order_date));
    record.push(opt_date(o.latest_order_date));

    let money = |get: fn(&FinancialRecord) -> Option<Decimal>| opt_decimal(f.and_then(get), dp);
    record.extend([
        money(|f| f.post_promo_sales_inc_vat),
        money(|f| f.delivery_fee_inc_vat),
        money(|f| f.priority_fee_inc_vat),
        money(|f| f.small_order_fee_inc_vat),
        money(|f| f.mp_bag_fee_inc_vat),
        money(|f| Some(f.total_payment_inc_vat)),
        money(|f| f.tips_amount),
        money(|f| Some(f.total_payment_with_tips_inc_vat)),
        money(|f| f.post_promo_sales_exc_vat),
        money(|f| f.delivery_fee_exc_vat),
        money(|f| f.priority_fee_exc_vat),
        money(|f| f.small_order_fee_exc_vat),
        money(|f| f.mp_bag_fee_exc_vat),
        money(|f| Some(f.total_revenue_exc_vat)),
        money(|f| f.cost_of_goods_inc_vat),
        money(|f| f.cost_of_goods_exc_vat),
    ]);

    record.extend([
        opt_decimal(alt.and_then(|a| a.alt_post_promo_sales_inc_vat), dp),
        opt_decimal(alt.and_then(|a| a.alt_delivery_fee_exc_vat), dp),
        opt_decimal(alt.and_then(|a| a.alt_priority_fee_exc_vat), dp),
        opt_decimal(alt.and_then(|a| a.alt_small_order_fee_exc_vat), dp),
        opt_decimal(alt.and_then(|a| a.alt_total_payment_with_tips_inc_vat), dp),
    ]);

    record.push(opt_decimal(m.total_products(), dp));
    let items = m.items.as_ref();
    for band in VatBand::ALL {
        record.push(opt_decimal(items.map(|p| p.get(band).quantity), dp));
    }
    for band in VatBand::ALL {
        record.push(opt_decimal(items.map(|p| p.get(band).total_exc_vat), dp));
    }
    for band in VatBand::ALL {
        record.push(opt_decimal(items.map(|p| p.get(band).total_inc_vat), dp));
    }
    record
}

/// Write the order-level extract in the row order given.
pub fn write_extract_csv(
    rows: &[&MergedRow],
    decimal_places: u32,
    writer: impl Write,
) -> Result<(), ExtractError> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv.write_record(EXTRACT_COLUMNS)?;
    for row in rows {
        csv.write_record(extract_record(row, decimal_places))?;
    }

    csv.flush()?;
    Ok(())
}

/// Write one row per (order_id, vat_band) aggregate.
pub fn write_item_aggregates_csv(
    aggregates: &[ItemAggregate],
    decimal_places: u32,
    writer: impl Write,
) -> Result<(), ExtractError> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv.write_record(ITEM_COLUMNS)?;
    for agg in aggregates {
        csv.write_record([
            agg.order_id.clone(),
            agg.vat_band.label().to_string(),
            format_decimal(agg.quantity, decimal_places),
            format_decimal(agg.total_inc_vat, decimal_places),
            format_decimal(agg.total_exc_vat, decimal_places),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

//! Header-indexed CSV loaders for the five source tables.
//!
//! Columns are located by header name, so extra columns and any column
//! order are accepted. Empty cells (and the literals `null` / `NaN`) load
//! as absent values; a present value that does not parse is an error
//! carrying the table, 1-based data row and column.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::error::ExtractError;
use crate::model::{ItemLine, OrderRecord, PartnerOrder, PrimaryPnl, SecondaryPnl};

const NAIVE_TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

// ---------------------------------------------------------------------------
// Table reader
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Column {
    name: &'static str,
    idx: usize,
}

struct Table<'a> {
    name: &'static str,
    headers: Vec<String>,
    reader: csv::Reader<&'a [u8]>,
}

impl<'a> Table<'a> {
    fn open(name: &'static str, csv_data: &'a str) -> Result<Self, ExtractError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv_data.as_bytes());
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();
        Ok(Self { name, headers, reader })
    }

    fn column(&self, name: &'static str) -> Result<Column, ExtractError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .map(|idx| Column { name, idx })
            .ok_or_else(|| ExtractError::MissingColumn {
                table: self.name.into(),
                column: name.into(),
            })
    }

    /// Visit every data row with its 1-based row number.
    fn rows<T>(
        mut self,
        mut build: impl FnMut(&Cells<'_>) -> Result<T, ExtractError>,
    ) -> Result<Vec<T>, ExtractError> {
        let mut out = Vec::new();
        for (i, record) in self.reader.records().enumerate() {
            let record = record?;
            let cells = Cells {
                table: self.name,
                row: i + 1,
                record: &record,
            };
            out.push(build(&cells)?);
        }
        log::debug!("{}: loaded {} rows", self.name, out.len());
        Ok(out)
    }
}

struct Cells<'r> {
    table: &'static str,
    row: usize,
    record: &'r csv::StringRecord,
}

impl Cells<'_> {
    fn raw(&self, col: Column) -> &str {
        self.record.get(col.idx).unwrap_or("").trim()
    }

    fn text(&self, col: Column) -> String {
        self.raw(col).to_string()
    }

    fn present(&self, col: Column) -> Option<&str> {
        let v = self.raw(col);
        if is_null_literal(v) {
            None
        } else {
            Some(v)
        }
    }

    fn decimal(&self, col: Column) -> Result<Option<Decimal>, ExtractError> {
        self.present(col)
            .map(|v| {
                parse_decimal(v).ok_or_else(|| ExtractError::DecimalParse {
                    table: self.table.into(),
                    row: self.row,
                    column: col.name.into(),
                    value: v.into(),
                })
            })
            .transpose()
    }

    fn date(&self, col: Column) -> Result<Option<NaiveDate>, ExtractError> {
        self.present(col)
            .map(|v| parse_date(v).ok_or_else(|| self.date_error(col, v)))
            .transpose()
    }

    fn timestamp(&self, col: Column) -> Result<Option<DateTime<FixedOffset>>, ExtractError> {
        self.present(col)
            .map(|v| parse_timestamp(v).ok_or_else(|| self.date_error(col, v)))
            .transpose()
    }

    fn date_error(&self, col: Column, value: &str) -> ExtractError {
        ExtractError::DateParse {
            table: self.table.into(),
            row: self.row,
            column: col.name.into(),
            value: value.into(),
        }
    }
}

fn is_null_literal(v: &str) -> bool {
    v.is_empty() || v.eq_ignore_ascii_case("null") || v.eq_ignore_ascii_case("nan")
}

// ---------------------------------------------------------------------------
// Value parsing
// ---------------------------------------------------------------------------

/// Plain or scientific notation (`1.5E-3`).
pub fn parse_decimal(value: &str) -> Option<Decimal> {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .ok()
}

/// `YYYY-MM-DD`, or the date part of a timestamp.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(value).map(|t| t.date_naive()))
}

/// RFC 3339 with offset, `YYYY-MM-DD HH:MM:SS+HH:MM`, or a naive timestamp taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Some(t);
    }
    if let Ok(t) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(t);
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive).into())
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

pub fn load_orders(csv_data: &str) -> Result<Vec<OrderRecord>, ExtractError> {
    let table = Table::open("orders", csv_data)?;
    let order_id = table.column("order_id")?;
    let obfuscated = table.column("order_id_obfuscated")?;
    let location = table.column("location_name")?;
    let vendor = table.column("order_vendor")?;
    let payment = table.column("payment_system")?;
    let completed = table.column("order_completed")?;
    let country = table.column("country")?;
    let created = table.column("created_at")?;
    let delivered = table.column("delivered_at")?;
    let ops = table.column("ops_date")?;
    let transactions = table.column("transaction_ids")?;

    table.rows(|c| {
        Ok(OrderRecord {
            order_id: c.text(order_id),
            order_id_obfuscated: c.text(obfuscated),
            location_name: c.text(location),
            order_vendor: c.text(vendor),
            payment_system: c.text(payment),
            order_completed: c.text(completed),
            country: c.text(country),
            created_at: c.timestamp(created)?,
            delivered_at: c.timestamp(delivered)?,
            ops_date: c.date(ops)?,
            transaction_ids: c.present(transactions).map(String::from),
        })
    })
}

pub fn load_partner_orders(csv_data: &str) -> Result<Vec<PartnerOrder>, ExtractError> {
    let table = Table::open("partner_orders", csv_data)?;
    let obfuscated = table.column("order_id_obfuscated")?;
    let number = table.column("partner_order_number")?;

    let rows = table.rows(|c| {
        Ok(c.present(number).map(|n| PartnerOrder {
            order_id_obfuscated: c.text(obfuscated),
            partner_order_number: n.to_string(),
        }))
    })?;
    // A partner row without a number links nothing.
    Ok(rows.into_iter().flatten().collect())
}

pub fn load_primary_pnl(csv_data: &str) -> Result<Vec<PrimaryPnl>, ExtractError> {
    let table = Table::open("primary_pnl", csv_data)?;
    let order_id = table.column("order_id")?;
    let rate = table.column("blended_vat_rate")?;
    let sales = table.column("post_promo_sales_exc_vat")?;
    let delivery = table.column("delivery_fee_exc_vat")?;
    let priority = table.column("priority_fee_exc_vat")?;
    let small_order = table.column("small_order_fee_exc_vat")?;
    let bag = table.column("mp_bag_fee_exc_vat")?;
    let tips = table.column("tips_amount")?;
    let cost = table.column("cost_of_goods")?;

    table.rows(|c| {
        Ok(PrimaryPnl {
            order_id: c.text(order_id),
            blended_vat_rate: c.decimal(rate)?,
            post_promo_sales_exc_vat: c.decimal(sales)?,
            delivery_fee_exc_vat: c.decimal(delivery)?,
            priority_fee_exc_vat: c.decimal(priority)?,
            small_order_fee_exc_vat: c.decimal(small_order)?,
            mp_bag_fee_exc_vat: c.decimal(bag)?,
            tips_amount: c.decimal(tips)?,
            cost_of_goods: c.decimal(cost)?,
        })
    })
}

pub fn load_secondary_pnl(csv_data: &str) -> Result<Vec<SecondaryPnl>, ExtractError> {
    let table = Table::open("secondary_pnl", csv_data)?;
    let order_id = table.column("order_id")?;
    let sales = table.column("alt_post_promo_sales_inc_vat")?;
    let delivery = table.column("alt_delivery_fee_exc_vat")?;
    let priority = table.column("alt_priority_fee_exc_vat")?;
    let small_order = table.column("alt_small_order_fee_exc_vat")?;
    let total = table.column("alt_total_payment_with_tips_inc_vat")?;

    table.rows(|c| {
        Ok(SecondaryPnl {
            order_id: c.text(order_id),
            alt_post_promo_sales_inc_vat: c.decimal(sales)?,
            alt_delivery_fee_exc_vat: c.decimal(delivery)?,
            alt_priority_fee_exc_vat: c.decimal(priority)?,
            alt_small_order_fee_exc_vat: c.decimal(small_order)?,
            alt_total_payment_with_tips_inc_vat: c.decimal(total)?,
        })
    })
}

pub fn load_items(csv_data: &str) -> Result<Vec<ItemLine>, ExtractError> {
    let table = Table::open("items", csv_data)?;
    let order_id = table.column("order_id")?;
    let rate = table.column("vat_rate")?;
    let inc = table.column("revenue_inc_vat")?;
    let exc = table.column("revenue_exc_vat")?;
    let unit = table.column("unit_price_inc_vat")?;
    let pre_inc = table.column("pre_promo_revenue_inc_vat")?;
    let pre_unit = table.column("pre_promo_unit_price_inc_vat")?;

    table.rows(|c| {
        Ok(ItemLine {
            order_id: c.text(order_id),
            vat_rate: c.decimal(rate)?,
            revenue_inc_vat: c.decimal(inc)?,
            revenue_exc_vat: c.decimal(exc)?,
            unit_price_inc_vat: c.decimal(unit)?,
            pre_promo_revenue_inc_vat: c.decimal(pre_inc)?,
            pre_promo_unit_price_inc_vat: c.decimal(pre_unit)?,
        })
    })
}

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One row of the core order ledger.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub order_id: String,
    pub order_id_obfuscated: String,
    pub location_name: String,
    pub order_vendor: String,
    pub payment_system: String,
    pub order_completed: String,
    pub country: String,
    pub created_at: Option<DateTime<FixedOffset>>,
    pub delivered_at: Option<DateTime<FixedOffset>>,
    pub ops_date: Option<NaiveDate>,
    /// Raw transaction-id array text as exported by the warehouse, e.g. `["tx1", null]`.
    pub transaction_ids: Option<String>,
}

/// Partner/marketplace order table row, keyed by the obfuscated order id.
#[derive(Debug, Clone)]
pub struct PartnerOrder {
    pub order_id_obfuscated: String,
    pub partner_order_number: String,
}

/// Primary-region P&L row.
///
/// `cost_of_goods` holds a VAT-inclusive figure despite the source naming.
#[derive(Debug, Clone, Default)]
pub struct PrimaryPnl {
    pub order_id: String,
    pub blended_vat_rate: Option<Decimal>,
    pub post_promo_sales_exc_vat: Option<Decimal>,
    pub delivery_fee_exc_vat: Option<Decimal>,
    pub priority_fee_exc_vat: Option<Decimal>,
    pub small_order_fee_exc_vat: Option<Decimal>,
    pub mp_bag_fee_exc_vat: Option<Decimal>,
    pub tips_amount: Option<Decimal>,
    pub cost_of_goods: Option<Decimal>,
}

/// Secondary-region (EU) order source row. Values are taken verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SecondaryPnl {
    pub order_id: String,
    pub alt_post_promo_sales_inc_vat: Option<Decimal>,
    pub alt_delivery_fee_exc_vat: Option<Decimal>,
    pub alt_priority_fee_exc_vat: Option<Decimal>,
    pub alt_small_order_fee_exc_vat: Option<Decimal>,
    pub alt_total_payment_with_tips_inc_vat: Option<Decimal>,
}

/// A single item line of an order.
#[derive(Debug, Clone, Default)]
pub struct ItemLine {
    pub order_id: String,
    pub vat_rate: Option<Decimal>,
    pub revenue_inc_vat: Option<Decimal>,
    pub revenue_exc_vat: Option<Decimal>,
    pub unit_price_inc_vat: Option<Decimal>,
    pub pre_promo_revenue_inc_vat: Option<Decimal>,
    pub pre_promo_unit_price_inc_vat: Option<Decimal>,
}

/// Pre-loaded source tables for one run.
#[derive(Debug, Clone, Default)]
pub struct ExtractInput {
    pub orders: Vec<OrderRecord>,
    pub partner_orders: Vec<PartnerOrder>,
    pub primary_pnl: Vec<PrimaryPnl>,
    pub secondary_pnl: Vec<SecondaryPnl>,
    pub items: Vec<ItemLine>,
}

// ---------------------------------------------------------------------------
// Reporting window
// ---------------------------------------------------------------------------

/// Inclusive day-granularity reporting window.
///
/// `start > end` is allowed and simply selects nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportingWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportingWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// First to last day of a calendar month. `None` for an invalid month.
    pub fn for_month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self { start, end: next.pred_opt()? })
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    /// `yy.mm` label of the start date, used in export file names.
    pub fn period_label(&self) -> String {
        format!("{:02}.{:02}", self.start.year() % 100, self.start.month())
    }
}

// ---------------------------------------------------------------------------
// Order level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VendorGroup {
    #[serde(rename = "DTC", alias = "dtc")]
    Dtc,
    #[serde(rename = "MP", alias = "mp")]
    Mp,
}

impl VendorGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dtc => "DTC",
            Self::Mp => "MP",
        }
    }
}

impl std::fmt::Display for VendorGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A date truncated to day, ISO week (Monday) and month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFamily {
    pub day: NaiveDate,
    pub week: NaiveDate,
    pub month: NaiveDate,
}

/// Output of the order selection stage.
#[derive(Debug, Clone)]
pub struct OrderRow {
    pub order_id: String,
    pub order_id_obfuscated: String,
    pub location_name: String,
    pub order_vendor: String,
    pub vendor_group: VendorGroup,
    pub payment_system: String,
    pub order_completed: String,
    pub created_at: Option<DateTime<FixedOffset>>,
    pub delivered_at: Option<DateTime<FixedOffset>>,
    pub created: Option<DateFamily>,
    pub delivered: Option<DateFamily>,
    pub ops: Option<DateFamily>,
    pub earliest_order_date: Option<NaiveDate>,
    pub latest_order_date: Option<NaiveDate>,
    pub created_at_utc_offset_hours: Option<i32>,
    pub transaction_ids: Option<String>,
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// One payment-transaction slot of an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplodedTransaction {
    /// Element `index` (1-based) of the order's transaction list. The element itself may be null.
    Listed { index: u32, transaction_id: Option<String> },
    /// The order had no usable transaction list.
    Placeholder,
}

impl ExplodedTransaction {
    pub fn index(&self) -> u32 {
        match self {
            Self::Listed { index, .. } => *index,
            Self::Placeholder => 1,
        }
    }

    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            Self::Listed { transaction_id, .. } => transaction_id.as_deref(),
            Self::Placeholder => None,
        }
    }

    /// The single row per order that carries order-level monetary totals.
    pub fn is_anchor(&self) -> bool {
        self.index() == 1
    }
}

// ---------------------------------------------------------------------------
// Financials
// ---------------------------------------------------------------------------

/// Fixed multiplier for priority, small-order and marketplace bag fees.
pub const STANDARD_FEE_VAT_FACTOR: Decimal = dec!(1.2);

/// Sum of decimals, `None` instead of a panic when the total leaves the decimal range.
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialRecord {
    pub blended_vat_rate: Option<Decimal>,
    pub post_promo_sales_exc_vat: Option<Decimal>,
    pub delivery_fee_exc_vat: Option<Decimal>,
    pub priority_fee_exc_vat: Option<Decimal>,
    pub small_order_fee_exc_vat: Option<Decimal>,
    pub mp_bag_fee_exc_vat: Option<Decimal>,
    pub post_promo_sales_inc_vat: Option<Decimal>,
    pub delivery_fee_inc_vat: Option<Decimal>,
    pub priority_fee_inc_vat: Option<Decimal>,
    pub small_order_fee_inc_vat: Option<Decimal>,
    pub mp_bag_fee_inc_vat: Option<Decimal>,
    pub tips_amount: Option<Decimal>,
    pub total_payment_inc_vat: Decimal,
    pub total_payment_with_tips_inc_vat: Decimal,
    pub total_revenue_exc_vat: Decimal,
    pub cost_of_goods_inc_vat: Option<Decimal>,
    pub cost_of_goods_exc_vat: Option<Decimal>,
}

impl FinancialRecord {
    pub fn inclusive_components(&self) -> [Option<Decimal>; 5] {
        [
            self.post_promo_sales_inc_vat,
            self.delivery_fee_inc_vat,
            self.priority_fee_inc_vat,
            self.small_order_fee_inc_vat,
            self.mp_bag_fee_inc_vat,
        ]
    }

    pub fn exclusive_components(&self) -> [Option<Decimal>; 5] {
        [
            self.post_promo_sales_exc_vat,
            self.delivery_fee_exc_vat,
            self.priority_fee_exc_vat,
            self.small_order_fee_exc_vat,
            self.mp_bag_fee_exc_vat,
        ]
    }
}

/// An order × transaction row as it moves through stages 2–4.
#[derive(Debug, Clone)]
pub struct ExtractRow {
    pub order: OrderRow,
    pub transaction: ExplodedTransaction,
    pub mp_order_id: Option<String>,
    pub financials: Option<FinancialRecord>,
    pub alt_financials: Option<SecondaryPnl>,
}

/// Materialized set of order ids selected by the order-level stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderIdFilter(BTreeSet<String>);

impl OrderIdFilter {
    pub fn from_rows(rows: &[ExtractRow]) -> Self {
        Self(rows.iter().map(|r| r.order.order_id.clone()).collect())
    }

    pub fn contains(&self, order_id: &str) -> bool {
        self.0.contains(order_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for OrderIdFilter {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum VatBand {
    #[serde(rename = "0% VAT Band")]
    Zero,
    #[serde(rename = "5% VAT Band")]
    Five,
    #[serde(rename = "20% VAT Band")]
    Twenty,
    #[serde(rename = "Other/Unknown VAT Band")]
    Other,
}

impl VatBand {
    pub const ALL: [VatBand; 4] = [Self::Zero, Self::Five, Self::Twenty, Self::Other];

    /// Exact-match classification. Never fails: anything unrecognized is `Other`.
    pub fn classify(rate: Option<Decimal>) -> Self {
        match rate {
            Some(r) if r == Decimal::ZERO => Self::Zero,
            Some(r) if r == dec!(0.05) => Self::Five,
            Some(r) if r == dec!(0.2) => Self::Twenty,
            _ => Self::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Zero => "0% VAT Band",
            Self::Five => "5% VAT Band",
            Self::Twenty => "20% VAT Band",
            Self::Other => "Other/Unknown VAT Band",
        }
    }
}

impl std::fmt::Display for VatBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemAggregate {
    pub order_id: String,
    pub vat_band: VatBand,
    pub quantity: Decimal,
    pub total_inc_vat: Decimal,
    pub total_exc_vat: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BandTotals {
    pub quantity: Decimal,
    pub total_inc_vat: Decimal,
    pub total_exc_vat: Decimal,
}

/// The four band triples of one order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BandPivot {
    pub zero: BandTotals,
    pub five: BandTotals,
    pub twenty: BandTotals,
    pub other: BandTotals,
}

impl BandPivot {
    pub fn get(&self, band: VatBand) -> &BandTotals {
        match band {
            VatBand::Zero => &self.zero,
            VatBand::Five => &self.five,
            VatBand::Twenty => &self.twenty,
            VatBand::Other => &self.other,
        }
    }

    pub fn get_mut(&mut self, band: VatBand) -> &mut BandTotals {
        match band {
            VatBand::Zero => &mut self.zero,
            VatBand::Five => &mut self.five,
            VatBand::Twenty => &mut self.twenty,
            VatBand::Other => &mut self.other,
        }
    }

    /// Item count over all four bands. `None` past the decimal range.
    pub fn total_products(&self) -> Option<Decimal> {
        checked_sum(VatBand::ALL.iter().map(|b| self.get(*b).quantity))
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Final extract row: order × transaction with band triples.
#[derive(Debug, Clone)]
pub struct MergedRow {
    pub row: ExtractRow,
    /// `None` when the order has no items (or, under the anchor-only policy, on non-anchor rows).
    pub items: Option<BandPivot>,
}

impl MergedRow {
    pub fn total_products(&self) -> Option<Decimal> {
        self.items.as_ref().and_then(BandPivot::total_products)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractSummary {
    pub orders_selected: usize,
    pub rows: usize,
    pub placeholder_rows: usize,
    pub multi_transaction_orders: usize,
    pub marketplace_rows: usize,
    pub marketplace_linked: usize,
    pub primary_matched: usize,
    pub secondary_matched: usize,
    pub item_lines_considered: usize,
    pub item_orders: usize,
    pub null_quantity_lines: usize,
    pub other_band_lines: usize,
    pub band_totals_exc_vat: BTreeMap<VatBand, Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractMeta {
    pub config_name: String,
    pub window: ReportingWindow,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone)]
pub struct ExtractResult {
    pub meta: ExtractMeta,
    pub summary: ExtractSummary,
    pub rows: Vec<MergedRow>,
    pub item_aggregates: Vec<ItemAggregate>,
}

// Property-based tests for the extract stages.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;

use ordercash_recon::config::ItemMetricPolicy;
use ordercash_recon::explode::{explode_orders, explode_transaction_ids};
use ordercash_recon::financials::compute_financials;
use ordercash_recon::items::aggregate_items;
use ordercash_recon::merge::merge_items;
use ordercash_recon::model::{ItemLine, OrderIdFilter, OrderRow, PrimaryPnl, VatBand, VendorGroup};
use ordercash_recon::orders::{in_window, order_date_bounds};
use ordercash_recon::ReportingWindow;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Money in pence, including zero and negatives (refunds).
fn arb_money() -> impl Strategy<Value = Option<Decimal>> {
    prop::option::of((-1_000_000i64..1_000_000).prop_map(|p| Decimal::new(p, 2)))
}

fn arb_rate() -> impl Strategy<Value = Option<Decimal>> {
    prop::option::of(prop_oneof![
        Just(Decimal::ZERO),
        Just(Decimal::new(5, 2)),
        Just(Decimal::new(2, 1)),
        (-1000i64..1000).prop_map(|r| Decimal::new(r, 3)),
    ])
}

fn arb_pnl() -> impl Strategy<Value = PrimaryPnl> {
    (
        arb_rate(),
        arb_money(),
        arb_money(),
        arb_money(),
        arb_money(),
        arb_money(),
        arb_money(),
        arb_money(),
    )
        .prop_map(|(rate, sales, delivery, priority, small, bag, tips, cost)| PrimaryPnl {
            order_id: "O".into(),
            blended_vat_rate: rate,
            post_promo_sales_exc_vat: sales,
            delivery_fee_exc_vat: delivery,
            priority_fee_exc_vat: priority,
            small_order_fee_exc_vat: small,
            mp_bag_fee_exc_vat: bag,
            tips_amount: tips,
            cost_of_goods: cost,
        })
}

fn arb_item(order_ids: &'static [&'static str]) -> impl Strategy<Value = ItemLine> {
    (
        prop::sample::select(order_ids),
        arb_rate(),
        arb_money(),
        arb_money(),
        arb_money(),
    )
        .prop_map(|(order_id, vat_rate, inc, exc, unit)| ItemLine {
            order_id: order_id.into(),
            vat_rate,
            revenue_inc_vat: inc,
            revenue_exc_vat: exc,
            unit_price_inc_vat: unit,
            ..ItemLine::default()
        })
}

fn arb_day() -> impl Strategy<Value = Option<NaiveDate>> {
    prop::option::of((0i64..120).prop_map(|d| {
        NaiveDate::from_ymd_opt(2025, 10, 1).unwrap() + Duration::days(d)
    }))
}

fn arb_transaction_list() -> impl Strategy<Value = Vec<Option<u32>>> {
    prop::collection::vec(prop::option::of(any::<u32>()), 0..6)
}

fn order_row(id: &str, transaction_ids: Option<String>) -> OrderRow {
    OrderRow {
        order_id: id.into(),
        order_id_obfuscated: format!("obf_{id}"),
        location_name: String::new(),
        order_vendor: "Web".into(),
        vendor_group: VendorGroup::Dtc,
        payment_system: "braintree".into(),
        order_completed: "true".into(),
        created_at: None,
        delivered_at: None,
        created: None,
        delivered: None,
        ops: None,
        earliest_order_date: None,
        latest_order_date: None,
        created_at_utc_offset_hours: None,
        transaction_ids,
    }
}

fn to_json(list: &[Option<u32>]) -> String {
    let parts: Vec<String> = list
        .iter()
        .map(|v| v.map(|n| n.to_string()).unwrap_or_else(|| "null".into()))
        .collect();
    format!("[{}]", parts.join(", "))
}

// ---------------------------------------------------------------------------
// Financials
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn total_payment_is_sum_of_inclusive_components(pnl in arb_pnl()) {
        let f = compute_financials(&pnl).unwrap();
        let sum: Decimal = f.inclusive_components().iter().flatten().copied().sum();
        prop_assert_eq!(f.total_payment_inc_vat, sum);

        let with_tips = sum + f.tips_amount.unwrap_or(Decimal::ZERO);
        prop_assert_eq!(f.total_payment_with_tips_inc_vat, with_tips);

        let exc: Decimal = f.exclusive_components().iter().flatten().copied().sum();
        prop_assert_eq!(f.total_revenue_exc_vat, exc);
    }
}

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn inclusive_component_null_iff_operand_missing(pnl in arb_pnl()) {
        let f = compute_financials(&pnl).unwrap();
        let rate_known = pnl.blended_vat_rate.is_some();
        prop_assert_eq!(f.post_promo_sales_inc_vat.is_some(), rate_known && pnl.post_promo_sales_exc_vat.is_some());
        prop_assert_eq!(f.delivery_fee_inc_vat.is_some(), rate_known && pnl.delivery_fee_exc_vat.is_some());
        prop_assert_eq!(f.priority_fee_inc_vat.is_some(), pnl.priority_fee_exc_vat.is_some());
        prop_assert_eq!(f.mp_bag_fee_inc_vat.is_some(), pnl.mp_bag_fee_exc_vat.is_some());
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn rows_per_order_is_max_one_and_list_length(lists in prop::collection::vec(arb_transaction_list(), 1..8)) {
        let orders: Vec<OrderRow> = lists
            .iter()
            .enumerate()
            .map(|(i, l)| order_row(&format!("O{i}"), Some(to_json(l))))
            .collect();
        let rows = explode_orders(orders);

        for (i, list) in lists.iter().enumerate() {
            let id = format!("O{i}");
            let mine: Vec<_> = rows.iter().filter(|r| r.order.order_id == id).collect();
            prop_assert_eq!(mine.len(), list.len().max(1));
            prop_assert_eq!(mine.iter().filter(|r| r.transaction.is_anchor()).count(), 1);
            for (slot, r) in mine.iter().enumerate() {
                prop_assert_eq!(r.transaction.index() as usize, slot + 1);
            }
        }
    }
}

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn explode_never_panics_on_arbitrary_text(raw in ".{0,40}") {
        let slots = explode_transaction_ids(Some(&raw));
        prop_assert!(!slots.is_empty());
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn earliest_not_after_latest(days in [arb_day(), arb_day(), arb_day()]) {
        let (earliest, latest) = order_date_bounds(&days);
        prop_assert_eq!(earliest.is_some(), latest.is_some());
        if let (Some(e), Some(l)) = (earliest, latest) {
            prop_assert!(e <= l);
        }
    }
}

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn window_pass_means_present_days_inside(days in [arb_day(), arb_day(), arb_day()]) {
        let window = ReportingWindow::for_month(2025, 11).unwrap();
        let inside = days.iter().flatten().all(|d| *d >= window.start && *d <= window.end);
        prop_assert_eq!(in_window(&days, &window), inside);
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

const ITEM_ORDERS: &[&str] = &["A", "B", "C", "D"];

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn band_totals_conserve_item_revenue(items in prop::collection::vec(arb_item(ITEM_ORDERS), 0..40)) {
        let filter: OrderIdFilter = ["A", "B", "C"].into_iter().collect();
        let (aggs, stats) = aggregate_items(&items, &filter).unwrap();

        for order in ["A", "B", "C"] {
            let lines: Decimal = items
                .iter()
                .filter(|l| l.order_id == order)
                .filter_map(|l| l.revenue_exc_vat)
                .sum();
            let bands: Decimal = aggs
                .iter()
                .filter(|a| a.order_id == order)
                .map(|a| a.total_exc_vat)
                .sum();
            prop_assert_eq!(lines, bands);
        }
        prop_assert!(aggs.iter().all(|a| a.order_id != "D"));

        let considered = items.iter().filter(|l| l.order_id != "D").count();
        prop_assert_eq!(stats.lines_considered, considered);
        let other = items
            .iter()
            .filter(|l| l.order_id != "D" && VatBand::classify(l.vat_rate) == VatBand::Other)
            .count();
        prop_assert_eq!(stats.other_band_lines, other);
    }
}

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn merge_keeps_every_row(
        lists in prop::collection::vec(arb_transaction_list(), 1..5),
        items in prop::collection::vec(arb_item(ITEM_ORDERS), 0..20),
        anchor_only in any::<bool>(),
    ) {
        let orders: Vec<OrderRow> = lists
            .iter()
            .zip(ITEM_ORDERS.iter().cycle())
            .map(|(l, id)| order_row(id, Some(to_json(l))))
            .collect();
        let rows = explode_orders(orders);
        let before = rows.len();
        let filter = OrderIdFilter::from_rows(&rows);
        let (aggs, _) = aggregate_items(&items, &filter).unwrap();
        let policy = if anchor_only { ItemMetricPolicy::AnchorOnly } else { ItemMetricPolicy::Repeat };

        let merged = merge_items(rows, &aggs, policy).unwrap();
        prop_assert_eq!(merged.len(), before);

        for pair in merged.windows(2) {
            let a = (&pair[0].row.order.order_id, pair[0].row.transaction.index());
            let b = (&pair[1].row.order.order_id, pair[1].row.transaction.index());
            prop_assert!(a <= b);
        }
        for m in &merged {
            let has_items = aggs.iter().any(|a| a.order_id == m.row.order.order_id);
            if !has_items {
                prop_assert!(m.items.is_none());
            }
        }
    }
}

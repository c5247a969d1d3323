//! Order selection: date bucketing, jurisdiction filter and the reporting-window test.

use chrono::{Datelike, Duration, NaiveDate};

use crate::config::VendorConfig;
use crate::model::{DateFamily, OrderRecord, OrderRow, ReportingWindow};

/// Country codes accepted for the single reporting jurisdiction.
const ORDER_COUNTRY_CODES: [&str; 2] = ["GB", "UK"];

/// Truncate a day to its ISO week (Monday) and month.
pub fn date_family(day: NaiveDate) -> DateFamily {
    let week = day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
    let month = day.with_day(1).unwrap_or(day);
    DateFamily { day, week, month }
}

/// Min/max over the present day values. Absent values do not take part.
pub fn order_date_bounds(days: &[Option<NaiveDate>; 3]) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let present = days.iter().flatten();
    (present.clone().min().copied(), present.max().copied())
}

/// Window test with sentinel substitution.
///
/// An absent day counts as infinitely late for the lower bound and infinitely
/// early for the upper bound, so an order with no dates at all passes.
pub fn in_window(days: &[Option<NaiveDate>; 3], window: &ReportingWindow) -> bool {
    let earliest = days
        .iter()
        .map(|d| d.unwrap_or(NaiveDate::MAX))
        .min()
        .unwrap_or(NaiveDate::MAX);
    let latest = days
        .iter()
        .map(|d| d.unwrap_or(NaiveDate::MIN))
        .max()
        .unwrap_or(NaiveDate::MIN);
    earliest >= window.start && latest <= window.end
}

fn in_jurisdiction(country: &str) -> bool {
    let country = country.trim();
    // Empty country: already restricted by the upstream query.
    country.is_empty()
        || ORDER_COUNTRY_CODES
            .iter()
            .any(|c| c.eq_ignore_ascii_case(country))
}

/// Build one `OrderRow` per qualifying order.
pub fn select_orders(
    orders: &[OrderRecord],
    window: &ReportingWindow,
    vendors: &VendorConfig,
) -> Vec<OrderRow> {
    if window.is_inverted() {
        log::warn!(
            "reporting window start {} is after end {}; no orders selected",
            window.start,
            window.end
        );
        return Vec::new();
    }

    let mut out_of_jurisdiction = 0usize;
    let mut out_of_window = 0usize;
    let mut rows = Vec::new();

    for order in orders {
        if !in_jurisdiction(&order.country) {
            out_of_jurisdiction += 1;
            continue;
        }

        let created_day = order.created_at.map(|t| t.date_naive());
        let delivered_day = order.delivered_at.map(|t| t.date_naive());
        let days = [created_day, delivered_day, order.ops_date];

        if !in_window(&days, window) {
            out_of_window += 1;
            continue;
        }

        let (earliest_order_date, latest_order_date) = order_date_bounds(&days);

        rows.push(OrderRow {
            order_id: order.order_id.clone(),
            order_id_obfuscated: order.order_id_obfuscated.clone(),
            location_name: order.location_name.clone(),
            order_vendor: order.order_vendor.clone(),
            vendor_group: vendors.vendor_group(&order.order_vendor),
            payment_system: order.payment_system.clone(),
            order_completed: order.order_completed.clone(),
            created_at: order.created_at,
            delivered_at: order.delivered_at,
            created: created_day.map(date_family),
            delivered: delivered_day.map(date_family),
            ops: order.ops_date.map(date_family),
            earliest_order_date,
            latest_order_date,
            created_at_utc_offset_hours: order
                .created_at
                .map(|t| t.offset().local_minus_utc() / 3600),
            transaction_ids: order.transaction_ids.clone(),
        });
    }

    log::debug!(
        "order selection: {} kept, {} outside jurisdiction, {} outside window",
        rows.len(),
        out_of_jurisdiction,
        out_of_window
    );

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VendorGroup;
    use chrono::DateTime;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn november() -> ReportingWindow {
        ReportingWindow::new(d("2025-11-01"), d("2025-11-30"))
    }

    fn order(id: &str, created: Option<&str>, delivered: Option<&str>, ops: Option<&str>) -> OrderRecord {
        OrderRecord {
            order_id: id.into(),
            order_id_obfuscated: format!("obf_{id}"),
            location_name: "Shoreditch".into(),
            order_vendor: "Web".into(),
            payment_system: "braintree".into(),
            order_completed: "true".into(),
            country: "GB".into(),
            created_at: created.map(|s| DateTime::parse_from_rfc3339(s).unwrap()),
            delivered_at: delivered.map(|s| DateTime::parse_from_rfc3339(s).unwrap()),
            ops_date: ops.map(d),
            transaction_ids: None,
        }
    }

    #[test]
    fn date_family_truncation() {
        // 2025-11-13 is a Thursday
        let f = date_family(d("2025-11-13"));
        assert_eq!(f.day, d("2025-11-13"));
        assert_eq!(f.week, d("2025-11-10"));
        assert_eq!(f.month, d("2025-11-01"));

        // Monday truncates to itself; week may start in the previous month
        assert_eq!(date_family(d("2025-11-10")).week, d("2025-11-10"));
        assert_eq!(date_family(d("2025-11-01")).week, d("2025-10-27"));
    }

    #[test]
    fn bounds_exclude_absent_values() {
        let days = [Some(d("2025-11-05")), None, Some(d("2025-11-03"))];
        assert_eq!(order_date_bounds(&days), (Some(d("2025-11-03")), Some(d("2025-11-05"))));
        assert_eq!(order_date_bounds(&[None, None, None]), (None, None));
    }

    #[test]
    fn window_requires_all_present_days_inside() {
        let w = november();
        assert!(in_window(&[Some(d("2025-11-01")), Some(d("2025-11-30")), None], &w));
        assert!(!in_window(&[Some(d("2025-10-31")), Some(d("2025-11-02")), None], &w));
        assert!(!in_window(&[Some(d("2025-11-29")), Some(d("2025-12-01")), None], &w));
    }

    #[test]
    fn window_sentinels_for_absent_days() {
        let w = november();
        assert!(in_window(&[None, None, Some(d("2025-11-15"))], &w));
        assert!(!in_window(&[None, Some(d("2025-12-15")), None], &w));
        // No dates at all: both sentinel checks pass.
        assert!(in_window(&[None, None, None], &w));
    }

    #[test]
    fn select_orders_filters_and_buckets() {
        let mut foreign = order("o3", Some("2025-11-10T10:00:00+01:00"), None, None);
        foreign.country = "IE".into();

        let orders = vec![
            order("o1", Some("2025-11-10T09:30:00+00:00"), Some("2025-11-10T10:15:00+00:00"), Some("2025-11-10")),
            order("o2", Some("2025-10-31T23:30:00+00:00"), Some("2025-11-01T00:20:00+00:00"), Some("2025-11-01")),
            foreign,
            order("o4", Some("2025-11-20T12:00:00+00:00"), None, None),
        ];
        let rows = select_orders(&orders, &november(), &VendorConfig::default());
        let ids: Vec<_> = rows.iter().map(|r| r.order_id.as_str()).collect();
        assert_eq!(ids, vec!["o1", "o4"]);

        let o1 = &rows[0];
        assert_eq!(o1.vendor_group, VendorGroup::Dtc);
        assert_eq!(o1.created.unwrap().week, d("2025-11-10"));
        assert_eq!(o1.ops.unwrap().month, d("2025-11-01"));
        assert_eq!(o1.earliest_order_date, Some(d("2025-11-10")));
        assert_eq!(o1.latest_order_date, Some(d("2025-11-10")));

        let o4 = &rows[1];
        assert!(o4.delivered.is_none());
        assert_eq!(o4.earliest_order_date, o4.latest_order_date);
    }

    #[test]
    fn utc_offset_hours_from_creation_timestamp() {
        let orders = vec![
            order("bst", Some("2025-06-10T09:30:00+01:00"), None, None),
            order("gmt", Some("2025-06-10T09:30:00+00:00"), None, None),
            order("none", None, None, Some("2025-06-10")),
        ];
        let window = ReportingWindow::new(d("2025-06-01"), d("2025-06-30"));
        let rows = select_orders(&orders, &window, &VendorConfig::default());
        assert_eq!(rows[0].created_at_utc_offset_hours, Some(1));
        assert_eq!(rows[1].created_at_utc_offset_hours, Some(0));
        assert_eq!(rows[2].created_at_utc_offset_hours, None);
    }

    #[test]
    fn inverted_window_selects_nothing() {
        let orders = vec![order("o1", None, None, None)];
        let window = ReportingWindow::new(d("2025-11-30"), d("2025-11-01"));
        assert!(select_orders(&orders, &window, &VendorConfig::default()).is_empty());
    }

    #[test]
    fn marketplace_vendor_grouping() {
        let mut o = order("o1", None, None, Some("2025-11-02"));
        o.order_vendor = "Just Eat".into();
        let rows = select_orders(&[o], &november(), &VendorConfig::default());
        assert_eq!(rows[0].vendor_group, VendorGroup::Mp);
    }
}

//! Row builders shared by the stage unit tests.

use crate::model::{OrderRow, VendorGroup};

/// A direct (DTC) order row with no dates and the given raw transaction list.
pub fn order_row(id: &str, transaction_ids: Option<&str>) -> OrderRow {
    OrderRow {
        order_id: id.into(),
        order_id_obfuscated: format!("obf_{id}"),
        location_name: "Shoreditch".into(),
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
        transaction_ids: transaction_ids.map(String::from),
    }
}

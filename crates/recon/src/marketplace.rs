//! Marketplace order-number lookup for non-direct orders.

use std::collections::HashMap;

use crate::model::{ExtractRow, PartnerOrder, VendorGroup};

/// Partner order numbers keyed by obfuscated order id. First occurrence wins.
#[derive(Debug, Default)]
pub struct MarketplaceLookup {
    by_obfuscated_id: HashMap<String, String>,
}

impl MarketplaceLookup {
    pub fn new(partner_orders: &[PartnerOrder]) -> Self {
        let mut by_obfuscated_id = HashMap::with_capacity(partner_orders.len());
        let mut duplicates = 0usize;
        for p in partner_orders {
            if by_obfuscated_id.contains_key(&p.order_id_obfuscated) {
                duplicates += 1;
                continue;
            }
            by_obfuscated_id.insert(p.order_id_obfuscated.clone(), p.partner_order_number.clone());
        }
        if duplicates > 0 {
            log::warn!("partner orders: {duplicates} duplicate obfuscated id(s) ignored");
        }
        Self { by_obfuscated_id }
    }

    pub fn get(&self, order_id_obfuscated: &str) -> Option<&str> {
        self.by_obfuscated_id.get(order_id_obfuscated).map(String::as_str)
    }
}

/// Attach `mp_order_id` to marketplace rows. Direct orders always stay null.
pub fn resolve_marketplace(rows: Vec<ExtractRow>, lookup: &MarketplaceLookup) -> Vec<ExtractRow> {
    rows.into_iter()
        .map(|mut row| {
            row.mp_order_id = match row.order.vendor_group {
                VendorGroup::Mp => lookup.get(&row.order.order_id_obfuscated).map(String::from),
                VendorGroup::Dtc => None,
            };
            row
        })
        .collect()
}

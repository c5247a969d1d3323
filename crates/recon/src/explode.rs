//! Outer-flatten of an order's payment-transaction list.

use serde_json::Value;

use crate::model::{ExplodedTransaction, ExtractRow, OrderRow};

/// Parse the raw transaction-id array into slots.
///
/// Always yields at least one slot: an empty, absent or malformed list
/// becomes a single `Placeholder`.
pub fn explode_transaction_ids(raw: Option<&str>) -> Vec<ExplodedTransaction> {
    let elements = match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(elements)) => elements,
            Ok(_) | Err(_) => {
                log::debug!("transaction list is not a JSON array: {text:?}");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    if elements.is_empty() {
        return vec![ExplodedTransaction::Placeholder];
    }

    elements
        .into_iter()
        .enumerate()
        .map(|(i, element)| ExplodedTransaction::Listed {
            index: i as u32 + 1,
            transaction_id: element_id(element),
        })
        .collect()
}

fn element_id(element: Value) -> Option<String> {
    match element {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// One `ExtractRow` per transaction slot of each order.
pub fn explode_orders(orders: Vec<OrderRow>) -> Vec<ExtractRow> {
    let mut rows = Vec::with_capacity(orders.len());
    for order in orders {
        let slots = explode_transaction_ids(order.transaction_ids.as_deref());
        for transaction in slots {
            rows.push(ExtractRow {
                order: order.clone(),
                transaction,
                mp_order_id: None,
                financials: None,
                alt_financials: None,
            });
        }
    }
    rows
}

use crate::config::ExtractConfig;
use crate::error::ExtractError;
use crate::explode::explode_orders;
use crate::financials::augment_financials;
use crate::items::{aggregate_items, ItemStats};
use crate::marketplace::{resolve_marketplace, MarketplaceLookup};
use crate::merge::merge_items;
use crate::model::{
    ExtractInput, ExtractMeta, ExtractResult, ExtractRow, ItemAggregate, OrderIdFilter, ReportingWindow,
};
use crate::orders::select_orders;
use crate::summary::compute_summary;

/// Run the full extract for one reporting window.
pub fn run(
    config: &ExtractConfig,
    window: &ReportingWindow,
    input: &ExtractInput,
) -> Result<ExtractResult, ExtractError> {
    config.validate()?;

    let rows = order_level_rows(config, window, input);

    let lookup = MarketplaceLookup::new(&input.partner_orders);
    let rows = resolve_marketplace(rows, &lookup);

    let rows = augment_financials(rows, &input.primary_pnl, &input.secondary_pnl)?;
    log::info!(
        "financials: {} anchor rows with primary P&L, {} with secondary",
        rows.iter().filter(|r| r.financials.is_some()).count(),
        rows.iter().filter(|r| r.alt_financials.is_some()).count()
    );

    // Materialized before item aggregation starts.
    let filter = OrderIdFilter::from_rows(&rows);
    let (item_aggregates, stats) = item_stage(&input.items, &filter)?;

    let merged = merge_items(rows, &item_aggregates, config.merge.item_metrics)?;
    let summary = compute_summary(&merged, &item_aggregates, &stats)?;
    log::info!(
        "extract: {} orders, {} rows ({} placeholder)",
        summary.orders_selected,
        summary.rows,
        summary.placeholder_rows
    );

    Ok(ExtractResult {
        meta: meta(config, window),
        summary,
        rows: merged,
        item_aggregates,
    })
}

/// Item aggregates for the orders the window selects, without the order-level extract.
pub fn run_items(
    config: &ExtractConfig,
    window: &ReportingWindow,
    input: &ExtractInput,
) -> Result<(Vec<ItemAggregate>, ItemStats), ExtractError> {
    config.validate()?;
    let rows = order_level_rows(config, window, input);
    let filter = OrderIdFilter::from_rows(&rows);
    item_stage(&input.items, &filter)
}

/// Selection and explosion. Later order-level stages never add or drop rows.
fn order_level_rows(config: &ExtractConfig, window: &ReportingWindow, input: &ExtractInput) -> Vec<ExtractRow> {
    let orders = select_orders(&input.orders, window, &config.vendors);
    log::info!(
        "orders: {} of {} selected for {}..{}",
        orders.len(),
        input.orders.len(),
        window.start,
        window.end
    );

    let rows = explode_orders(orders);
    log::info!("transactions: {} rows after explode", rows.len());
    rows
}

fn item_stage(
    items: &[crate::model::ItemLine],
    filter: &OrderIdFilter,
) -> Result<(Vec<ItemAggregate>, ItemStats), ExtractError> {
    let (aggregates, stats) = aggregate_items(items, filter)?;
    log::info!(
        "items: {} lines over {} orders into {} band groups",
        stats.lines_considered,
        filter.len(),
        aggregates.len()
    );
    if stats.null_quantity_lines > 0 {
        log::debug!("items: {} lines with undefined quantity", stats.null_quantity_lines);
    }
    Ok((aggregates, stats))
}

fn meta(config: &ExtractConfig, window: &ReportingWindow) -> ExtractMeta {
    ExtractMeta {
        config_name: config.name.clone(),
        window: *window,
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        run_at: chrono::Utc::now().to_rfc3339(),
    }
}

//! Per-provider slices of the merged extract.

use std::path::{Path, PathBuf};

use crate::config::ProviderConfig;
use crate::model::{MergedRow, OrderRow, ReportingWindow};

fn eq_any(list: &[String], value: &str) -> bool {
    let value = value.trim();
    list.iter().any(|v| v.trim().eq_ignore_ascii_case(value))
}

impl ProviderConfig {
    /// Every configured criterion must hold. Comparisons ignore case.
    pub fn matches(&self, order: &OrderRow) -> bool {
        if let Some(group) = self.vendor_group {
            if order.vendor_group != group {
                return false;
            }
        }
        if !self.vendors.is_empty() && !eq_any(&self.vendors, &order.order_vendor) {
            return false;
        }
        if !self.payment_systems.is_empty() && !eq_any(&self.payment_systems, &order.payment_system) {
            return false;
        }
        if eq_any(&self.payment_system_not, &order.payment_system) {
            return false;
        }
        true
    }
}

#[derive(Debug)]
pub struct ProviderSlice<'a> {
    pub provider: &'a ProviderConfig,
    pub rows: Vec<&'a MergedRow>,
}

/// Split the extract by provider. Slices may overlap; rows matching no provider are left out.
/// Providers with no rows are skipped.
pub fn partition_rows<'a>(rows: &'a [MergedRow], providers: &'a [ProviderConfig]) -> Vec<ProviderSlice<'a>> {
    let mut slices = Vec::with_capacity(providers.len());
    for provider in providers {
        let matched: Vec<&MergedRow> = rows.iter().filter(|m| provider.matches(&m.row.order)).collect();
        if matched.is_empty() {
            log::warn!("no rows found for provider '{}', skipping", provider.name);
            continue;
        }
        log::debug!("provider '{}': {} rows", provider.name, matched.len());
        slices.push(ProviderSlice {
            provider,
            rows: matched,
        });
    }
    slices
}

/// `"{yy.mm} - {provider} DWH data.csv"`, labelled by the window start.
pub fn file_name(window: &ReportingWindow, provider: &str) -> String {
    format!("{} - {} DWH data.csv", window.period_label(), provider)
}

/// `<out_dir>/<folder>/<file name>`. Without a folder the file lands in `out_dir`.
pub fn output_path(out_dir: &Path, window: &ReportingWindow, provider: &ProviderConfig) -> PathBuf {
    let dir = match provider.folder.as_deref() {
        Some(folder) => out_dir.join(folder),
        None => out_dir.to_path_buf(),
    };
    dir.join(file_name(window, &provider.name))
}

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::ExtractError;
use crate::model::{ReportingWindow, VendorGroup};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ExtractConfig {
    pub name: String,
    #[serde(default)]
    pub period: Option<PeriodConfig>,
    pub sources: SourcesConfig,
    #[serde(default)]
    pub vendors: VendorConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

/// Inclusive reporting period. Overridable from the command line.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PeriodConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodConfig {
    pub fn window(&self) -> ReportingWindow {
        ReportingWindow::new(self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// CSV file per source table, relative to the config file's directory.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    pub orders: String,
    pub partner_orders: String,
    pub primary_pnl: String,
    #[serde(default)]
    pub secondary_pnl: Option<String>,
    pub items: String,
}

// ---------------------------------------------------------------------------
// Vendors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct VendorConfig {
    /// Vendor names (case-insensitive) classified as marketplace orders.
    #[serde(default = "default_marketplace_vendors")]
    pub marketplace: Vec<String>,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            marketplace: default_marketplace_vendors(),
        }
    }
}

fn default_marketplace_vendors() -> Vec<String> {
    ["uber", "uber eats", "deliveroo", "just eat", "justeat", "amazon uk", "amazon"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl VendorConfig {
    pub fn vendor_group(&self, vendor: &str) -> VendorGroup {
        let vendor = vendor.trim();
        if self
            .marketplace
            .iter()
            .any(|m| m.trim().eq_ignore_ascii_case(vendor))
        {
            VendorGroup::Mp
        } else {
            VendorGroup::Dtc
        }
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MergeConfig {
    #[serde(default)]
    pub item_metrics: ItemMetricPolicy,
}

/// How order-level item metrics are spread over an order's transaction rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemMetricPolicy {
    /// Repeat the band triples on every transaction row.
    #[default]
    Repeat,
    /// Only the anchor row (index 1) carries band triples; other rows are null.
    AnchorOnly,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            decimal_places: default_decimal_places(),
        }
    }
}

fn default_decimal_places() -> u32 {
    2
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// A per-provider slice of the extract. All given criteria must hold.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub vendor_group: Option<VendorGroup>,
    #[serde(default)]
    pub vendors: Vec<String>,
    #[serde(default)]
    pub payment_systems: Vec<String>,
    #[serde(default)]
    pub payment_system_not: Vec<String>,
}

impl ProviderConfig {
    fn has_criteria(&self) -> bool {
        self.vendor_group.is_some()
            || !self.vendors.is_empty()
            || !self.payment_systems.is_empty()
            || !self.payment_system_not.is_empty()
    }
}

/// The six built-in provider slices.
pub fn default_providers() -> Vec<ProviderConfig> {
    fn provider(name: &str, folder: &str) -> ProviderConfig {
        ProviderConfig {
            name: name.into(),
            folder: Some(folder.into()),
            vendor_group: None,
            vendors: Vec::new(),
            payment_systems: Vec::new(),
            payment_system_not: Vec::new(),
        }
    }
    let list = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    vec![
        ProviderConfig {
            vendor_group: Some(VendorGroup::Dtc),
            payment_system_not: list(&["paypal"]),
            ..provider("Braintree", "01 Braintree/03 DWH")
        },
        ProviderConfig {
            vendor_group: Some(VendorGroup::Dtc),
            payment_systems: list(&["paypal"]),
            ..provider("PayPal", "02 Paypal/03 DWH")
        },
        ProviderConfig {
            vendors: list(&["uber"]),
            ..provider("Uber", "03 Uber Eats/03 DWH")
        },
        ProviderConfig {
            vendors: list(&["deliveroo"]),
            ..provider("Deliveroo", "04 Deliveroo/03 DWH")
        },
        ProviderConfig {
            vendors: list(&["just eat", "justeat"]),
            ..provider("Just Eat", "05 Just Eat/03 DWH")
        },
        ProviderConfig {
            vendors: list(&["amazon uk"]),
            ..provider("Amazon", "06 Amazon/03 DWH")
        },
    ]
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ExtractConfig {
    pub fn from_toml(input: &str) -> Result<Self, ExtractError> {
        let config: ExtractConfig =
            toml::from_str(input).map_err(|e| ExtractError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.name.trim().is_empty() {
            return Err(ExtractError::ConfigValidation("name must not be empty".into()));
        }

        let required = [
            ("orders", &self.sources.orders),
            ("partner_orders", &self.sources.partner_orders),
            ("primary_pnl", &self.sources.primary_pnl),
            ("items", &self.sources.items),
        ];
        for (key, path) in required {
            if path.trim().is_empty() {
                return Err(ExtractError::ConfigValidation(format!(
                    "sources.{key} must not be empty"
                )));
            }
        }
        if matches!(self.sources.secondary_pnl.as_deref(), Some(p) if p.trim().is_empty()) {
            return Err(ExtractError::ConfigValidation(
                "sources.secondary_pnl must not be empty when given".into(),
            ));
        }

        if self.output.decimal_places > 10 {
            return Err(ExtractError::ConfigValidation(format!(
                "output.decimal_places must be at most 10, got {}",
                self.output.decimal_places
            )));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if provider.name.trim().is_empty() {
                return Err(ExtractError::ConfigValidation(
                    "provider name must not be empty".into(),
                ));
            }
            if !seen.insert(provider.name.to_lowercase()) {
                return Err(ExtractError::ConfigValidation(format!(
                    "duplicate provider '{}'",
                    provider.name
                )));
            }
            if !provider.has_criteria() {
                return Err(ExtractError::ConfigValidation(format!(
                    "provider '{}' has no selection criteria",
                    provider.name
                )));
            }
        }

        Ok(())
    }

    /// Configured providers, or the built-in six when none are configured.
    pub fn providers(&self) -> Vec<ProviderConfig> {
        if self.providers.is_empty() {
            default_providers()
        } else {
            self.providers.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

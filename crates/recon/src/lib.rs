//! `ordercash-recon`: monthly order-to-cash extract engine.
//!
//! Pure engine crate: loaders take CSV text, stages take pre-loaded records,
//! writers take any `io::Write`. File system access lives in the CLI.

pub mod config;
pub mod engine;
pub mod error;
pub mod explode;
pub mod export;
pub mod financials;
pub mod items;
pub mod load;
pub mod marketplace;
pub mod merge;
pub mod model;
pub mod orders;
pub mod partition;
pub mod summary;

#[cfg(test)]
mod test_support;

pub use config::ExtractConfig;
pub use engine::{run, run_items};
pub use error::ExtractError;
pub use model::{ExtractInput, ExtractResult, MergedRow, OrderIdFilter, ReportingWindow, VatBand};

//! Table components.
//!
//! A table owns its name, its schema history and the commands that read and
//! write its rows. Tables only append to caller-owned transactions, so the
//! commands of several tables can commit together.

use serde::{Deserialize, Serialize};

use crate::sqlite::Transaction;

pub mod geo_targets;

pub use geo_targets::GeoTargets;

pub trait Table {
    fn table_name(&self) -> &'static str;

    /// Append the DDL for `to_version` to `transaction`; unknown versions
    /// append nothing.
    fn migrate(&self, transaction: &mut Transaction, to_version: u32);
}

/// A creative ad as delivered by the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeAd {
    pub creative_instance_id: String,
    pub campaign_id: String,
    pub geo_targets: Vec<String>,
}

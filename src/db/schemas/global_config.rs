//! Global default-configuration document schema
//!
//! A single document carrying the default item catalog and role templates
//! applied to newly configured communities, plus operational toggles.

use std::collections::HashMap;

use bson::Document;
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{ItemConfig, Metadata, RolePolicy};

/// Collection name for global configuration
pub const CONFIG_COLLECTION: &str = "config";

/// Fixed document id of the global configuration
pub const GLOBAL_CONFIG_ID: &str = "global_config";

/// Global default-configuration document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct GlobalConfigDoc {
    #[serde(rename = "_id", default)]
    pub id: String,

    #[serde(default)]
    pub metadata: Metadata,

    /// Default item catalog applied to new communities
    #[serde(rename = "default_cookies", default)]
    pub default_items: HashMap<String, ItemConfig>,

    /// Default role templates keyed by template name
    #[serde(default)]
    pub default_roles: HashMap<String, RolePolicy>,

    /// Default operator channel identifiers keyed by purpose
    #[serde(default)]
    pub default_channels: HashMap<String, i64>,

    /// When set, claim evaluation is suspended for everyone
    #[serde(default)]
    pub maintenance_mode: bool,
}

impl IntoIndexes for GlobalConfigDoc {
    // Singleton document addressed by its fixed _id, nothing to index
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        Vec::new()
    }
}

impl MutMetadata for GlobalConfigDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

//! Community policy document schema
//!
//! One document per community, holding the item catalog (storage location,
//! base cost, base cooldown) and the per-role access overrides. Wire field
//! names match the deployed document shape (`server_id`, `cookies`).

use std::collections::HashMap;

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for community policies
pub const COMMUNITY_COLLECTION: &str = "servers";

/// Wildcard access key matching every item type
pub const WILDCARD_ITEM: &str = "all";

/// Community policy document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CommunityDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Community identifier
    #[serde(rename = "server_id")]
    pub community_id: i64,

    /// Human-readable community name
    #[serde(rename = "server_name", default)]
    pub name: String,

    /// Item catalog keyed by item-type name
    #[serde(rename = "cookies", default)]
    pub items: HashMap<String, ItemConfig>,

    /// Role policies keyed by role identifier
    #[serde(default)]
    pub roles: HashMap<String, RolePolicy>,

    /// Whether access terms vary by role
    #[serde(default)]
    pub role_based: bool,

    /// Whether distribution is enabled for this community
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Per-item base configuration
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ItemConfig {
    /// Storage location backing this item's stock
    pub directory: String,

    /// Base cost in points
    #[serde(default)]
    pub cost: i64,

    /// Base cooldown between claims, in hours
    #[serde(default)]
    pub cooldown: i64,

    /// Whether this item may be claimed at all
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Role policy attached to a community, keyed by role identifier
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RolePolicy {
    /// Human-readable role name
    #[serde(default)]
    pub name: String,

    /// Access entries keyed by item-type name or [`WILDCARD_ITEM`].
    /// Absence of a key means "inherit base item config".
    #[serde(default)]
    pub access: HashMap<String, AccessRule>,
}

/// One access entry in a role policy.
///
/// Stored either as a bare bool (legacy permission flag) or as a structured
/// override object; the resolver only considers structured overrides when
/// picking the winning role.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum AccessRule {
    /// Bare permission flag with no terms attached
    Flag(bool),
    /// Structured override of the base item config
    Override(ItemOverride),
}

/// Sparse override of a base [`ItemConfig`]; absent fields inherit
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ItemOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<i64>,

    /// Claims per user per day; -1 or absent means unlimited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_limit: Option<i64>,
}

fn default_true() -> bool {
    true
}

impl IntoIndexes for CommunityDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "server_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("server_id_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for CommunityDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

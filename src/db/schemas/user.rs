//! User document schema
//!
//! Point balance, blacklist state, and per-item claim records. The claim
//! records carry the day scope used for daily-limit rollover: a record whose
//! `day` differs from the current UTC day reads as zero claimed.

use std::collections::HashMap;

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// User identifier
    pub user_id: i64,

    /// Last-seen username, for display only
    #[serde(default)]
    pub username: String,

    /// Point balance
    #[serde(default)]
    pub points: i64,

    /// Lifetime points spent on claims
    #[serde(default)]
    pub total_spent: i64,

    /// Lifetime successful claims
    #[serde(default)]
    pub total_claims: i64,

    /// Whether the user is currently blacklisted
    #[serde(default)]
    pub blacklisted: bool,

    /// When the blacklist lapses; None means indefinite
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blacklist_expires: Option<DateTime>,

    /// Per-item claim records keyed by item-type name
    #[serde(default)]
    pub claims: HashMap<String, ClaimRecord>,
}

/// Per-item claim record scoped to one UTC calendar day
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ClaimRecord {
    /// UTC day this record counts against, formatted YYYY-MM-DD
    pub day: String,

    /// Units claimed within `day`
    #[serde(default)]
    pub count: i64,

    /// Timestamp of the most recent claim of this item
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_claim: Option<DateTime>,
}

impl UserDoc {
    /// Create a new user document with an empty claim history
    pub fn new(user_id: i64, username: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id,
            username,
            points: 0,
            total_spent: 0,
            total_claims: 0,
            blacklisted: false,
            blacklist_expires: None,
            claims: HashMap::new(),
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_id_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

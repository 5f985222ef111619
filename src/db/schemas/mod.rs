//! Database schemas for Depot
//!
//! MongoDB document structures for community policies, the global default
//! configuration, and per-user claim records.

mod community;
mod global_config;
mod metadata;
mod user;

pub use community::{
    AccessRule, CommunityDoc, ItemConfig, ItemOverride, RolePolicy, COMMUNITY_COLLECTION,
    WILDCARD_ITEM,
};
pub use global_config::{GlobalConfigDoc, CONFIG_COLLECTION, GLOBAL_CONFIG_ID};
pub use metadata::Metadata;
pub use user::{ClaimRecord, UserDoc, USER_COLLECTION};

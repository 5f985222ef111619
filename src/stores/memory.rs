//! In-memory store implementations
//!
//! Trait doubles for tests and local development. `MemoryClaimStore` mirrors
//! the MongoDB conditional-update semantics exactly (rollover, limit, and
//! balance checked under one lock) so pipeline behavior stays testable
//! without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use super::claims::{day_key, ClaimSnapshot, ClaimStore};
use super::policy::PolicyStore;
use crate::db::schemas::{ClaimRecord, CommunityDoc, GlobalConfigDoc, UserDoc};
use crate::types::Result;

/// Fixed set of community policies served from memory
#[derive(Default)]
pub struct MemoryPolicyStore {
    communities: RwLock<Vec<CommunityDoc>>,
    config: RwLock<Option<GlobalConfigDoc>>,
}

impl MemoryPolicyStore {
    pub fn new(communities: Vec<CommunityDoc>, config: Option<GlobalConfigDoc>) -> Self {
        Self {
            communities: RwLock::new(communities),
            config: RwLock::new(config),
        }
    }

    /// Replace the community set (simulates out-of-band admin writes)
    pub async fn set_communities(&self, communities: Vec<CommunityDoc>) {
        *self.communities.write().await = communities;
    }
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    async fn community(&self, community_id: i64) -> Result<Option<CommunityDoc>> {
        Ok(self
            .communities
            .read()
            .await
            .iter()
            .find(|c| c.community_id == community_id)
            .cloned())
    }

    async fn enabled_communities(&self) -> Result<Vec<CommunityDoc>> {
        Ok(self
            .communities
            .read()
            .await
            .iter()
            .filter(|c| c.enabled)
            .cloned()
            .collect())
    }

    async fn global_config(&self) -> Result<Option<GlobalConfigDoc>> {
        Ok(self.config.read().await.clone())
    }
}

/// Claim store held in a single mutex-guarded map
#[derive(Default)]
pub struct MemoryClaimStore {
    users: Mutex<HashMap<i64, UserDoc>>,
}

impl MemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user record directly (test setup)
    pub async fn insert_user(&self, user: UserDoc) {
        self.users.lock().await.insert(user.user_id, user);
    }

    pub async fn user(&self, user_id: i64) -> Option<UserDoc> {
        self.users.lock().await.get(&user_id).cloned()
    }
}

#[async_trait]
impl ClaimStore for MemoryClaimStore {
    async fn get_or_create_user(&self, user_id: i64, username: &str) -> Result<UserDoc> {
        let mut users = self.users.lock().await;
        let user = users
            .entry(user_id)
            .or_insert_with(|| UserDoc::new(user_id, username.to_string()));
        Ok(user.clone())
    }

    async fn claim_snapshot(
        &self,
        user_id: i64,
        item_type: &str,
        now: DateTime<Utc>,
    ) -> Result<ClaimSnapshot> {
        let users = self.users.lock().await;

        let Some(record) = users.get(&user_id).and_then(|u| u.claims.get(item_type)) else {
            return Ok(ClaimSnapshot {
                claimed_today: 0,
                last_claim: None,
            });
        };

        let claimed_today = if record.day == day_key(now) {
            record.count
        } else {
            0
        };

        Ok(ClaimSnapshot {
            claimed_today,
            last_claim: record.last_claim.map(|dt| dt.to_chrono()),
        })
    }

    async fn try_claim(
        &self,
        user_id: i64,
        item_type: &str,
        daily_limit: i64,
        cost: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<UserDoc>> {
        let today = day_key(now);
        let mut users = self.users.lock().await;

        let Some(user) = users.get_mut(&user_id) else {
            return Ok(None);
        };

        if user.points < cost {
            return Ok(None);
        }

        let claimed_today = match user.claims.get(item_type) {
            Some(record) if record.day == today => record.count,
            _ => 0,
        };

        if daily_limit >= 0 && claimed_today >= daily_limit {
            return Ok(None);
        }

        user.points -= cost;
        user.total_spent += cost;
        user.total_claims += 1;
        user.claims.insert(
            item_type.to_string(),
            ClaimRecord {
                day: today,
                count: claimed_today + 1,
                last_claim: Some(bson::DateTime::from_chrono(now)),
            },
        );

        Ok(Some(user.clone()))
    }
}

//! Claim-record store
//!
//! Owns the lifecycle of per-user claim state: creation on first claim,
//! day-boundary rollover, and the atomic check-then-increment that prevents
//! concurrent claims from exceeding a daily limit. The rate limiter only
//! reads what this store exposes.

use async_trait::async_trait;
use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::UpdateModifications;

use crate::db::schemas::{UserDoc, USER_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::types::Result;

/// Read-only view of one user's claim state for one item type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimSnapshot {
    /// Units claimed within the current UTC day (rollover already applied)
    pub claimed_today: i64,
    /// Timestamp of the most recent claim of this item, any day
    pub last_claim: Option<DateTime<Utc>>,
}

/// Claim-record persistence
#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Fetch a user, creating the record on first contact
    async fn get_or_create_user(&self, user_id: i64, username: &str) -> Result<UserDoc>;

    /// Read the claim state for one (user, item) pair.
    ///
    /// A record from a prior UTC day reads as zero claimed.
    async fn claim_snapshot(
        &self,
        user_id: i64,
        item_type: &str,
        now: DateTime<Utc>,
    ) -> Result<ClaimSnapshot>;

    /// Atomically record a claim: deduct the cost and bump today's counter,
    /// but only when the daily limit (if any) and the point balance allow it.
    ///
    /// Returns the updated user document, or None when the claim was
    /// rejected. Two racing calls can never both pass a limit of N; this is
    /// the enforcement point the advisory checks in `ratelimit` rely on.
    async fn try_claim(
        &self,
        user_id: i64,
        item_type: &str,
        daily_limit: i64,
        cost: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<UserDoc>>;
}

/// Format a timestamp as the UTC day key used in claim records
pub(crate) fn day_key(now: DateTime<Utc>) -> String {
    now.date_naive().format("%Y-%m-%d").to_string()
}

/// MongoDB-backed claim store
pub struct MongoClaimStore {
    users: MongoCollection<UserDoc>,
}

impl MongoClaimStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: client.collection(USER_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl ClaimStore for MongoClaimStore {
    async fn get_or_create_user(&self, user_id: i64, username: &str) -> Result<UserDoc> {
        if let Some(user) = self.users.find_one(doc! { "user_id": user_id }).await? {
            return Ok(user);
        }

        let mut user = UserDoc::new(user_id, username.to_string());
        let id = self.users.insert_one(user.clone()).await?;
        user._id = Some(id);
        Ok(user)
    }

    async fn claim_snapshot(
        &self,
        user_id: i64,
        item_type: &str,
        now: DateTime<Utc>,
    ) -> Result<ClaimSnapshot> {
        let user = self.users.find_one(doc! { "user_id": user_id }).await?;

        let Some(record) = user.as_ref().and_then(|u| u.claims.get(item_type)) else {
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
        let record_path = format!("claims.{}", item_type);
        let day_path = format!("{}.day", record_path);
        let count_path = format!("{}.count", record_path);

        let mut filter = doc! {
            "user_id": user_id,
            "points": { "$gte": cost },
        };

        // With a finite limit, admit the write only when the stored day
        // rolled over or the counter is still under the limit.
        if daily_limit >= 0 {
            filter.insert(
                "$or",
                vec![
                    doc! { &day_path: { "$ne": &today } },
                    doc! { &count_path: { "$lt": daily_limit } },
                ],
            );
        }

        let day_ref = format!("${}", day_path);
        let count_ref = format!("${}", count_path);

        let pipeline: Vec<Document> = vec![doc! {
            "$set": {
                "points": { "$subtract": ["$points", cost] },
                "total_spent": { "$add": [{ "$ifNull": ["$total_spent", 0] }, cost] },
                "total_claims": { "$add": [{ "$ifNull": ["$total_claims", 0] }, 1] },
                record_path: {
                    "$cond": [
                        { "$eq": [{ "$ifNull": [&day_ref, ""] }, &today] },
                        {
                            "day": &today,
                            "count": { "$add": [&count_ref, 1] },
                            "last_claim": "$$NOW",
                        },
                        {
                            "day": &today,
                            "count": 1,
                            "last_claim": "$$NOW",
                        },
                    ]
                },
                "metadata.updated_at": "$$NOW",
            }
        }];

        self.users
            .find_one_and_update(filter, UpdateModifications::Pipeline(pipeline))
            .await
    }
}
